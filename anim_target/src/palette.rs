//! Two-pass palette GIF pipeline
//!
//! 1. `palettegen`: 256 色调色板（lanczos 缩放后统计）
//! 2. `paletteuse`: bayer 抖动 (scale 5)，`-loop 0` 无限循环
//!
//! 调色板是 `ScratchFile`，无论成功失败都会被删除。

use std::ffi::OsString;
use std::path::Path;

use shared_utils::ffmpeg_process::{run_ffmpeg, safe_path_arg};
use shared_utils::thread_manager::ffmpeg_threads;
use shared_utils::{CompressError, Result, ScratchFile};

/// Output geometry and timing of one GIF render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GifRender {
    pub width: u32,
    /// `None` keeps the aspect ratio.
    pub height: Option<u32>,
    pub fps: u32,
}

impl GifRender {
    /// `fps=F,scale=W:H:flags=lanczos`
    pub fn filter_prefix(&self) -> String {
        let height = match self.height {
            Some(h) if h > 0 => h.to_string(),
            _ => "-1".to_string(),
        };
        format!("fps={},scale={}:{}:flags=lanczos", self.fps, self.width, height)
    }

    pub fn palettegen_filter(&self) -> String {
        format!("{},palettegen=max_colors=256", self.filter_prefix())
    }

    pub fn paletteuse_filter(&self) -> String {
        format!("{}[x];[x][1:v]paletteuse=dither=bayer:bayer_scale=5", self.filter_prefix())
    }

    pub fn label(&self) -> String {
        match self.height {
            Some(h) if h > 0 => format!("{}x{}, {} fps", self.width, h, self.fps),
            _ => format!("width {}, {} fps", self.width, self.fps),
        }
    }
}

fn base_args() -> Vec<OsString> {
    vec![
        "-hide_banner".into(),
        "-nostdin".into(),
        "-y".into(),
        "-v".into(),
        "error".into(),
        "-threads".into(),
        ffmpeg_threads().to_string().into(),
    ]
}

/// Render `source` to an infinitely looping GIF at `output`.
pub fn render_gif(source: &Path, output: &Path, render: GifRender) -> Result<()> {
    let label = render.label();
    let palette = ScratchFile::new(output.with_extension("palette.png"));

    let mut pass1 = base_args();
    pass1.extend([
        "-i".into(),
        safe_path_arg(source),
        "-vf".into(),
        render.palettegen_filter().into(),
        safe_path_arg(palette.path()),
    ]);
    run_ffmpeg(&pass1, &label)?;

    let mut pass2 = base_args();
    pass2.extend([
        "-i".into(),
        safe_path_arg(source),
        "-i".into(),
        safe_path_arg(palette.path()),
        "-lavfi".into(),
        render.paletteuse_filter().into(),
        "-loop".into(),
        "0".into(),
        safe_path_arg(output),
    ]);
    run_ffmpeg(&pass2, &label)?;

    let written = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
    if written == 0 {
        return Err(CompressError::EncodeFailure {
            params: label,
            message: "GIF output file is empty".to_string(),
            suggestion: Some("The source may have no decodable frames".to_string()),
        });
    }
    Ok(())
}
