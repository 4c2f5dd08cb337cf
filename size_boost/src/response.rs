//! Request / response types of the dispatcher boundary
//!
//! 响应元数据对应原服务的响应头：原始大小、压缩后大小、目标字节数、
//! 是否达标、MIME 类型和建议的下载文件名。

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

use shared_utils::{FileSize, MediaFormat, SizeTarget, TrialParams};

/// One compression request as received at the boundary.
#[derive(Debug, Clone)]
pub struct CompressRequest {
    pub bytes: Vec<u8>,
    pub target: SizeTarget,
    /// Uploaded file name (used for format hints and the download name).
    pub file_name: Option<String>,
    /// Declared MIME type.
    pub mime: Option<String>,
}

impl CompressRequest {
    pub fn new(bytes: Vec<u8>, target: SizeTarget) -> Self {
        Self {
            bytes,
            target,
            file_name: None,
            mime: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompressResponse {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub achieved: bool,
    pub original_size: u64,
    pub compressed_size: u64,
    pub target_bytes: u64,
    pub source_format: MediaFormat,
    pub format: MediaFormat,
    pub mime: &'static str,
    pub extension: &'static str,
    pub suggested_name: String,
    pub params: TrialParams,
    pub trials: u32,
    pub elapsed_ms: u64,
    pub finished_at: DateTime<Utc>,
}

impl CompressResponse {
    pub fn original(&self) -> FileSize {
        FileSize::new(self.original_size)
    }

    pub fn compressed(&self) -> FileSize {
        FileSize::new(self.compressed_size)
    }

    /// Negative when the output is smaller than the source.
    pub fn size_change_percent(&self) -> Option<f64> {
        self.compressed().size_change_percent(self.original())
    }
}

/// `compressed-<stem>.<ext>`; `compressed-file.<ext>` without a usable name.
pub fn suggested_name(file_name: Option<&str>, extension: &str) -> String {
    let stem = file_name
        .and_then(|n| Path::new(n).file_stem())
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("file");
    format!("compressed-{}.{}", stem, extension)
}
