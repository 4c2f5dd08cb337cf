//! Contain-resize tool
//!
//! 把图片缩放到 W×H 画布内（保持宽高比、居中、透明填充）。
//! 与目标大小搜索不同，这里允许放大。
//! - 省略高度 → 按源宽高比自动计算
//! - 输出保持源格式（JPEG / PNG / WebP），其他格式输出 PNG
//! - JPEG 没有 alpha，填充区域为黑色

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageReader, Rgba, RgbaImage};
use serde::Serialize;
use std::io::Cursor;

use shared_utils::{CompressError, Dimensions, MediaFormat, Result};

/// JPEG quality used for contain-resize output.
pub const RESIZE_JPEG_QUALITY: u8 = 90;

/// Largest canvas side accepted.
pub const MAX_CANVAS_SIDE: u32 = 16_384;

#[derive(Debug, Serialize)]
pub struct ResizedImage {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub format: MediaFormat,
    pub canvas: Dimensions,
    /// Size of the scaled image inside the canvas.
    pub content: Dimensions,
}

/// Canvas size for a requested width and optional height.
pub fn canvas_size(source: Dimensions, width: u32, height: Option<u32>) -> Result<Dimensions> {
    let invalid = |msg: String| CompressError::InvalidConfig(msg);
    if width == 0 || width > MAX_CANVAS_SIDE {
        return Err(invalid(format!("width must be between 1 and {}", MAX_CANVAS_SIDE)));
    }
    let height = match height {
        Some(0) | None => {
            let h = (f64::from(width) * f64::from(source.height) / f64::from(source.width.max(1))).round();
            (h as u32).max(1)
        }
        Some(h) => h,
    };
    if height > MAX_CANVAS_SIDE {
        return Err(invalid(format!("height must be at most {}", MAX_CANVAS_SIDE)));
    }
    Ok(Dimensions::new(width, height))
}

/// Size of the source scaled to fit inside `canvas` (may enlarge).
pub fn contain_size(source: Dimensions, canvas: Dimensions) -> Dimensions {
    let ratio = (f64::from(canvas.width) / f64::from(source.width.max(1)))
        .min(f64::from(canvas.height) / f64::from(source.height.max(1)));
    Dimensions::new(
        ((f64::from(source.width) * ratio).round() as u32).clamp(1, canvas.width),
        ((f64::from(source.height) * ratio).round() as u32).clamp(1, canvas.height),
    )
}

pub fn resize_contain(source: &[u8], width: u32, height: Option<u32>) -> Result<ResizedImage> {
    let reader = ImageReader::new(Cursor::new(source)).with_guessed_format()?;
    let format = match reader.format() {
        Some(image::ImageFormat::Jpeg) => MediaFormat::Jpeg,
        Some(image::ImageFormat::WebP) => MediaFormat::WebP,
        _ => MediaFormat::Png,
    };
    let img = reader
        .decode()
        .map_err(|e| CompressError::UnsupportedFormat(format!("cannot decode image: {}", e)))?;

    let (sw, sh) = img.dimensions();
    let src = Dimensions::new(sw, sh);
    let canvas = canvas_size(src, width, height)?;
    let content = contain_size(src, canvas);

    let scaled = img.resize_exact(content.width, content.height, FilterType::Lanczos3).to_rgba8();
    // 无 alpha 的格式用不透明黑色填充
    let padding = if format.supports_alpha() { Rgba([0, 0, 0, 0]) } else { Rgba([0, 0, 0, 255]) };
    let mut board = RgbaImage::from_pixel(canvas.width, canvas.height, padding);
    let x = i64::from((canvas.width - content.width) / 2);
    let y = i64::from((canvas.height - content.height) / 2);
    imageops::overlay(&mut board, &scaled, x, y);

    let bytes = encode_canvas(DynamicImage::ImageRgba8(board), format)?;
    tracing::debug!(%src, %canvas, %content, format = %format, size = bytes.len(), "Contain resize");

    Ok(ResizedImage {
        bytes,
        format,
        canvas,
        content,
    })
}

fn encode_canvas(board: DynamicImage, format: MediaFormat) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let written = match format {
        MediaFormat::Jpeg => DynamicImage::ImageRgb8(board.to_rgb8())
            .write_with_encoder(JpegEncoder::new_with_quality(&mut out, RESIZE_JPEG_QUALITY)),
        MediaFormat::WebP => board.write_with_encoder(WebPEncoder::new_lossless(&mut out)),
        MediaFormat::Png | MediaFormat::Gif => board.write_with_encoder(PngEncoder::new(&mut out)),
    };
    written.map_err(|e| CompressError::encode(format!("resize {}", format), e.to_string()))?;
    Ok(out)
}
