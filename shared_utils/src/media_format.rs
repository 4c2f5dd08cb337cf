//! Media format classification
//!
//! 识别上传文件的格式：声明的 MIME 类型、扩展名、以及文件头魔数。
//! 魔数与声明冲突时以魔数为准。

use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::errors::CompressError;

/// Formats the compressor reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
}

/// Which search handles a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Still,
    Animated,
}

/// Output format used when the source is not one of the still raster formats.
pub const FALLBACK_STILL_FORMAT: MediaFormat = MediaFormat::Jpeg;

impl MediaFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "image/jpeg",
            MediaFormat::Png => "image/png",
            MediaFormat::WebP => "image/webp",
            MediaFormat::Gif => "image/gif",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "jpg",
            MediaFormat::Png => "png",
            MediaFormat::WebP => "webp",
            MediaFormat::Gif => "gif",
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            MediaFormat::Gif => MediaKind::Animated,
            _ => MediaKind::Still,
        }
    }

    pub fn supports_alpha(&self) -> bool {
        !matches!(self, MediaFormat::Jpeg)
    }

    /// Output format for the still search: keep the source format when it is
    /// a still raster format, otherwise fall back.
    pub fn preferred_still_output(&self) -> MediaFormat {
        match self.kind() {
            MediaKind::Still => *self,
            MediaKind::Animated => FALLBACK_STILL_FORMAT,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(MediaFormat::Jpeg),
            "png" => Some(MediaFormat::Png),
            "webp" => Some(MediaFormat::WebP),
            "gif" => Some(MediaFormat::Gif),
            _ => None,
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        // "image/jpeg; charset=binary" 之类的参数忽略
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(MediaFormat::Jpeg),
            "image/png" => Some(MediaFormat::Png),
            "image/webp" => Some(MediaFormat::WebP),
            "image/gif" => Some(MediaFormat::Gif),
            _ => None,
        }
    }

    /// Magic-byte sniffing over the first bytes of a file.
    pub fn sniff(header: &[u8]) -> Option<Self> {
        if header.len() >= 3 && header[..3] == [0xFF, 0xD8, 0xFF] {
            return Some(MediaFormat::Jpeg);
        }
        if header.len() >= 8 && header[..8] == [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A] {
            return Some(MediaFormat::Png);
        }
        if header.len() >= 6 && (&header[..6] == b"GIF87a" || &header[..6] == b"GIF89a") {
            return Some(MediaFormat::Gif);
        }
        if header.len() >= 12 && &header[..4] == b"RIFF" && &header[8..12] == b"WEBP" {
            return Some(MediaFormat::WebP);
        }
        None
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaFormat::Jpeg => "JPEG",
            MediaFormat::Png => "PNG",
            MediaFormat::WebP => "WebP",
            MediaFormat::Gif => "GIF",
        };
        write!(f, "{}", name)
    }
}

/// What the caller told us about the upload.
#[derive(Debug, Clone, Default)]
pub struct DeclaredFormat<'a> {
    pub file_name: Option<&'a str>,
    pub mime: Option<&'a str>,
}

/// Decide the source format.
///
/// Sniffed bytes win; if the content is unrecognised the declaration must
/// name a supported format (MIME first, then extension), mirroring how the
/// upload form accepted files.
pub fn classify(declared: &DeclaredFormat<'_>, header: &[u8]) -> Result<MediaFormat, CompressError> {
    let from_mime = declared.mime.and_then(MediaFormat::from_mime);
    let from_name = declared
        .file_name
        .and_then(|n| Path::new(n).extension().and_then(|e| e.to_str()))
        .and_then(MediaFormat::from_extension);
    let declared_format = from_mime.or(from_name);

    match (MediaFormat::sniff(header), declared_format) {
        (Some(sniffed), Some(claimed)) if sniffed != claimed => {
            tracing::debug!(
                sniffed = %sniffed,
                declared = %claimed,
                "Declared format disagrees with file content, using content"
            );
            Ok(sniffed)
        }
        (Some(sniffed), _) => Ok(sniffed),
        (None, Some(_)) if !header.is_empty() => Err(CompressError::UnsupportedFormat(
            "file content is not a JPEG, PNG, WebP or GIF image".to_string(),
        )),
        (None, Some(claimed)) => Ok(claimed),
        (None, None) => Err(CompressError::UnsupportedFormat(describe_declared(declared))),
    }
}

fn describe_declared(declared: &DeclaredFormat<'_>) -> String {
    let mut parts = Vec::new();
    if let Some(mime) = declared.mime {
        parts.push(format!("type '{}'", mime));
    }
    if let Some(name) = declared.file_name {
        parts.push(format!("file '{}'", name));
    }
    if parts.is_empty() {
        "unknown file (only JPG, PNG, WEBP, or GIF files are supported)".to_string()
    } else {
        format!(
            "{} (only JPG, PNG, WEBP, or GIF files are supported)",
            parts.join(", ")
        )
    }
}
