//! Header-only probe for still images.

use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

use shared_utils::{CompressError, MediaFormat, MediaInfo, Probe, Result};

/// Reads width/height from the image header without decoding pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageHeaderProbe;

impl ImageHeaderProbe {
    pub fn new() -> Self {
        Self
    }

    pub fn inspect_bytes(&self, bytes: &[u8]) -> std::result::Result<MediaInfo, String> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| e.to_string())?;
        let format = reader
            .format()
            .and_then(to_media_format)
            .ok_or_else(|| "unrecognised image header".to_string())?;
        let (width, height) = reader.into_dimensions().map_err(|e| e.to_string())?;
        if width == 0 || height == 0 {
            return Err("image has zero dimensions".to_string());
        }
        Ok(MediaInfo::still(width, height, format))
    }
}

impl Probe for ImageHeaderProbe {
    fn inspect(&self, path: &Path) -> Result<MediaInfo> {
        let bytes = std::fs::read(path).map_err(|e| CompressError::probe(path, e.to_string()))?;
        self.inspect_bytes(&bytes)
            .map_err(|message| CompressError::probe(path, message))
    }
}

fn to_media_format(format: ImageFormat) -> Option<MediaFormat> {
    match format {
        ImageFormat::Jpeg => Some(MediaFormat::Jpeg),
        ImageFormat::Png => Some(MediaFormat::Png),
        ImageFormat::WebP => Some(MediaFormat::WebP),
        ImageFormat::Gif => Some(MediaFormat::Gif),
        _ => None,
    }
}
