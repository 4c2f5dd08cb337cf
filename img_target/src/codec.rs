//! Still-image codec backend
//!
//! The search only needs three operations: decode once, resize once per
//! scale, encode once per (scale, quality) trial. `ImageRsCodec` implements
//! them with the `image` crate:
//!
//! | format | quality knob |
//! |---|---|
//! | JPEG | native encoder quality |
//! | PNG  | posterize (drop low bits) + best deflate |
//! | WebP | posterize + lossless VP8L |
//!
//! PNG and WebP have no lossy quality parameter in the `image` crate, so
//! quality is approximated by reducing colour depth before a lossless encode.
//! Output size stays monotone (not strictly) in quality.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use std::io::Cursor;

use shared_utils::{CompressError, Dimensions, MediaFormat, Result};

pub trait ImageCodec {
    type Frame;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Frame>;

    fn dimensions(&self, frame: &Self::Frame) -> Dimensions;

    /// Exact resize; the caller has already fitted `size` to the aspect ratio.
    fn resize(&self, frame: &Self::Frame, size: Dimensions) -> Result<Self::Frame>;

    fn encode(&self, frame: &Self::Frame, format: MediaFormat, quality: u8) -> Result<Vec<u8>>;
}

impl<C: ImageCodec + ?Sized> ImageCodec for &C {
    type Frame = C::Frame;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Frame> {
        (**self).decode(bytes)
    }

    fn dimensions(&self, frame: &Self::Frame) -> Dimensions {
        (**self).dimensions(frame)
    }

    fn resize(&self, frame: &Self::Frame, size: Dimensions) -> Result<Self::Frame> {
        (**self).resize(frame, size)
    }

    fn encode(&self, frame: &Self::Frame, format: MediaFormat, quality: u8) -> Result<Vec<u8>> {
        (**self).encode(frame, format, quality)
    }
}

/// `image`-crate backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRsCodec;

impl ImageRsCodec {
    pub fn new() -> Self {
        Self
    }
}

impl ImageCodec for ImageRsCodec {
    type Frame = DynamicImage;

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage> {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .decode()
            .map_err(|e| CompressError::encode("decode", e.to_string()))
    }

    fn dimensions(&self, frame: &DynamicImage) -> Dimensions {
        let (width, height) = frame.dimensions();
        Dimensions::new(width, height)
    }

    fn resize(&self, frame: &DynamicImage, size: Dimensions) -> Result<DynamicImage> {
        if size.width == 0 || size.height == 0 {
            return Err(CompressError::encode(
                format!("resize {}", size),
                "target dimensions must be non-zero",
            ));
        }
        if frame.dimensions() == (size.width, size.height) {
            return Ok(frame.clone());
        }
        Ok(frame.resize_exact(size.width, size.height, FilterType::Lanczos3))
    }

    fn encode(&self, frame: &DynamicImage, format: MediaFormat, quality: u8) -> Result<Vec<u8>> {
        let label = || format!("{} quality {}", format, quality);
        let mut out = Vec::new();
        match format {
            MediaFormat::Jpeg => {
                let rgb = DynamicImage::ImageRgb8(frame.to_rgb8());
                let encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
                rgb.write_with_encoder(encoder)
                    .map_err(|e| CompressError::encode(label(), e.to_string()))?;
            }
            MediaFormat::Png => {
                let reduced = posterize(frame, posterize_shift(quality));
                let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, PngFilter::Adaptive);
                reduced
                    .write_with_encoder(encoder)
                    .map_err(|e| CompressError::encode(label(), e.to_string()))?;
            }
            MediaFormat::WebP => {
                let reduced = posterize(frame, posterize_shift(quality));
                let encoder = WebPEncoder::new_lossless(&mut out);
                reduced
                    .write_with_encoder(encoder)
                    .map_err(|e| CompressError::encode(label(), e.to_string()))?;
            }
            MediaFormat::Gif => {
                return Err(CompressError::UnsupportedFormat(
                    "GIF is not a still-image output format".to_string(),
                ));
            }
        }
        Ok(out)
    }
}

/// Bits dropped per colour channel at `quality`.
pub fn posterize_shift(quality: u8) -> u8 {
    match quality {
        90..=u8::MAX => 0,
        75..=89 => 1,
        55..=74 => 2,
        35..=54 => 3,
        _ => 4,
    }
}

/// Zero the low `shift` bits of every colour channel (alpha untouched).
/// Output is RGBA8 when the source has alpha, RGB8 otherwise.
fn posterize(frame: &DynamicImage, shift: u8) -> DynamicImage {
    let mask = 0xFFu8 << shift;
    if frame.color().has_alpha() {
        let mut rgba = frame.to_rgba8();
        if shift > 0 {
            for px in rgba.pixels_mut() {
                px[0] &= mask;
                px[1] &= mask;
                px[2] &= mask;
            }
        }
        DynamicImage::ImageRgba8(rgba)
    } else {
        let mut rgb = frame.to_rgb8();
        if shift > 0 {
            for px in rgb.pixels_mut() {
                px[0] &= mask;
                px[1] &= mask;
                px[2] &= mask;
            }
        }
        DynamicImage::ImageRgb8(rgb)
    }
}
