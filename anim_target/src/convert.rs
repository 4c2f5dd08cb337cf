//! Video / animation → GIF conversion
//!
//! 一次性转换（不做目标体积搜索）：fps 与宽高由调用方给定，
//! 高度为 0 时按源宽高比自动计算。

use std::path::Path;
use std::time::Instant;

use shared_utils::{CompressError, FileSize, Result};

use crate::palette::{render_gif, GifRender};

pub const DEFAULT_GIF_FPS: u32 = 15;
pub const DEFAULT_GIF_WIDTH: u32 = 480;
pub const MAX_GIF_FPS: u32 = 60;
pub const MAX_GIF_SIDE: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GifConvertOptions {
    pub fps: u32,
    pub width: u32,
    /// 0 = auto.
    pub height: u32,
}

impl Default for GifConvertOptions {
    fn default() -> Self {
        Self {
            fps: DEFAULT_GIF_FPS,
            width: DEFAULT_GIF_WIDTH,
            height: 0,
        }
    }
}

impl GifConvertOptions {
    pub fn validate(&self) -> Result<()> {
        if self.fps == 0 || self.fps > MAX_GIF_FPS {
            return Err(CompressError::InvalidConfig(format!(
                "fps must be between 1 and {}, got {}",
                MAX_GIF_FPS, self.fps
            )));
        }
        if self.width == 0 || self.width > MAX_GIF_SIDE {
            return Err(CompressError::InvalidConfig(format!(
                "width must be between 1 and {}, got {}",
                MAX_GIF_SIDE, self.width
            )));
        }
        if self.height > MAX_GIF_SIDE {
            return Err(CompressError::InvalidConfig(format!(
                "height must be at most {}, got {}",
                MAX_GIF_SIDE, self.height
            )));
        }
        Ok(())
    }

    fn render(&self) -> GifRender {
        GifRender {
            width: self.width,
            height: (self.height > 0).then_some(self.height),
            fps: self.fps,
        }
    }
}

/// Convert `source` (any ffmpeg-readable video or animation) into a GIF.
pub fn convert_to_gif(source: &Path, output: &Path, options: GifConvertOptions) -> Result<FileSize> {
    options.validate()?;
    if !source.is_file() {
        return Err(CompressError::probe(source, "not a regular file"));
    }

    let started = Instant::now();
    render_gif(source, output, options.render())?;
    let size = std::fs::metadata(output)
        .map(|m| FileSize::new(m.len()))
        .map_err(|e| CompressError::workspace(output, e))?;

    tracing::info!(
        source = ?source,
        output = ?output,
        fps = options.fps,
        width = options.width,
        height = options.height,
        size = size.bytes(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "GIF conversion finished"
    );
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = GifConvertOptions::default();
        assert_eq!((opts.fps, opts.width, opts.height), (15, 480, 0));
        assert!(opts.validate().is_ok());
        assert_eq!(opts.render().height, None);
    }

    #[test]
    fn test_explicit_height() {
        let opts = GifConvertOptions {
            height: 270,
            ..Default::default()
        };
        assert_eq!(opts.render().height, Some(270));
    }

    #[test]
    fn test_validation() {
        let bad_fps = GifConvertOptions {
            fps: 0,
            ..Default::default()
        };
        assert_eq!(bad_fps.validate().unwrap_err().kind(), "invalid_config");

        let bad_width = GifConvertOptions {
            width: 10_000,
            ..Default::default()
        };
        assert!(bad_width.validate().is_err());

        let bad_height = GifConvertOptions {
            height: 5000,
            ..Default::default()
        };
        assert!(bad_height.validate().is_err());
    }

    #[test]
    fn test_missing_source() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = convert_to_gif(
            &dir.path().join("missing.mp4"),
            &dir.path().join("out.gif"),
            GifConvertOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "probe_failure");
    }
}
