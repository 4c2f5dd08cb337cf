//! Animated codec backend.

use std::path::Path;

use shared_utils::Result;

use crate::palette::{render_gif, GifRender};

/// Single-shot animated encoder: `(source, width, frame rate) → file at output`.
///
/// Height follows the source aspect ratio; the output loops forever.
pub trait AnimatedCodec {
    fn encode(&self, source: &Path, width: u32, frame_rate: u32, output: &Path) -> Result<()>;
}

impl<C: AnimatedCodec + ?Sized> AnimatedCodec for &C {
    fn encode(&self, source: &Path, width: u32, frame_rate: u32, output: &Path) -> Result<()> {
        (**self).encode(source, width, frame_rate, output)
    }
}

/// ffmpeg palette pipeline producing GIF.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegGifCodec;

impl FfmpegGifCodec {
    pub fn new() -> Self {
        Self
    }
}

impl AnimatedCodec for FfmpegGifCodec {
    fn encode(&self, source: &Path, width: u32, frame_rate: u32, output: &Path) -> Result<()> {
        render_gif(
            source,
            output,
            GifRender {
                width,
                height: None,
                fps: frame_rate,
            },
        )
    }
}
