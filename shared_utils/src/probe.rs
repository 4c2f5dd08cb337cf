//! Probe seam: source → {width, height, format}
//!
//! Two implementations live in the workspace: `ffprobe::FfprobeProbe` (any
//! container ffmpeg understands) and `img_target::ImageHeaderProbe` (still
//! images, header-only decode).

use serde::Serialize;
use std::path::Path;

use crate::errors::Result;
use crate::ladder::Dimensions;
use crate::media_format::MediaFormat;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    /// Raw container/codec name reported by the prober (`gif`, `png_pipe`, `mov,mp4,...`).
    pub format_name: String,
    /// Set when the container is one of the formats we compress.
    pub format: Option<MediaFormat>,
    pub frame_count: Option<u64>,
    pub frame_rate: Option<f64>,
    pub duration_secs: Option<f64>,
}

impl MediaInfo {
    pub fn still(width: u32, height: u32, format: MediaFormat) -> Self {
        Self {
            width,
            height,
            format_name: format.extension().to_string(),
            format: Some(format),
            frame_count: Some(1),
            frame_rate: None,
            duration_secs: None,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

pub trait Probe {
    fn inspect(&self, path: &Path) -> Result<MediaInfo>;
}

impl<P: Probe + ?Sized> Probe for Box<P> {
    fn inspect(&self, path: &Path) -> Result<MediaInfo> {
        (**self).inspect(path)
    }
}
