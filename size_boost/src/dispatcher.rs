//! Request dispatcher
//!
//! 流程：分类格式 → 申请搜索槽位 → 创建请求工作目录 → 写入源文件 → 探测
//! → 按格式分派到图片 / 动图搜索 → 读出结果 → 清理工作目录。
//!
//! - 格式不支持：在任何资源分配之前失败
//! - 探测失败：在任何编码之前失败
//! - 工作目录在所有退出路径上都会被删除（drop）

use std::path::Path;
use std::time::Instant;

use anim_target::{search_animated, AnimatedCodec, AnimatedSearchRequest, FfmpegGifCodec};
use chrono::Utc;
use img_target::{search_image, ImageCodec, ImageHeaderProbe, ImageRsCodec, ImageSearchRequest};
use shared_utils::{
    classify, CompressError, DeclaredFormat, FfprobeProbe, MediaFormat, MediaInfo, MediaKind,
    Probe, Result, SearchPool, ServiceConfig, Workspace,
};

use crate::response::{suggested_name, CompressRequest, CompressResponse};

/// Bytes inspected for magic-number sniffing.
const SNIFF_LEN: usize = 16;

type BoxedProbe = Box<dyn Probe + Send + Sync>;

/// Entry point for compression requests. One instance serves many requests;
/// the search pool bounds how many run at once.
pub struct Compressor<I = ImageRsCodec, A = FfmpegGifCodec> {
    config: ServiceConfig,
    pool: SearchPool,
    image_codec: I,
    animated_codec: A,
    still_probe: BoxedProbe,
    animated_probe: BoxedProbe,
}

impl Compressor<ImageRsCodec, FfmpegGifCodec> {
    /// `image`-crate stills, ffmpeg GIFs, header probe for stills and ffprobe for animations.
    pub fn new(config: ServiceConfig) -> Self {
        Self::with_backends(
            config,
            ImageRsCodec::new(),
            FfmpegGifCodec::new(),
            Box::new(ImageHeaderProbe::new()),
            Box::new(FfprobeProbe::new()),
        )
    }
}

impl<I: ImageCodec, A: AnimatedCodec> Compressor<I, A> {
    pub fn with_backends(
        config: ServiceConfig,
        image_codec: I,
        animated_codec: A,
        still_probe: BoxedProbe,
        animated_probe: BoxedProbe,
    ) -> Self {
        let pool = SearchPool::new(config.max_concurrent_searches, config.admission);
        Self {
            config,
            pool,
            image_codec,
            animated_codec,
            still_probe,
            animated_probe,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn pool(&self) -> &SearchPool {
        &self.pool
    }

    fn probe_for(&self, format: MediaFormat) -> &dyn Probe {
        match format.kind() {
            MediaKind::Still => self.still_probe.as_ref(),
            MediaKind::Animated => self.animated_probe.as_ref(),
        }
    }

    /// Classify and probe a file on disk without compressing it.
    pub fn inspect(&self, path: &Path) -> Result<(MediaFormat, MediaInfo)> {
        let bytes = std::fs::read(path).map_err(|e| CompressError::probe(path, e.to_string()))?;
        let declared = DeclaredFormat {
            file_name: path.to_str(),
            mime: None,
        };
        let format = classify(&declared, &bytes[..bytes.len().min(SNIFF_LEN)])?;
        let info = self.probe_for(format).inspect(path)?;
        Ok((format, info))
    }

    pub fn compress(&self, request: &CompressRequest) -> Result<CompressResponse> {
        let started = Instant::now();
        let declared = DeclaredFormat {
            file_name: request.file_name.as_deref(),
            mime: request.mime.as_deref(),
        };
        let header = &request.bytes[..request.bytes.len().min(SNIFF_LEN)];
        let source_format = classify(&declared, header)?;

        let _permit = self.pool.acquire()?;
        let workspace = Workspace::create(&self.config.workspace_root)?;
        let source_path = workspace.write_source(
            request.file_name.as_deref().unwrap_or("source"),
            &request.bytes,
        )?;

        let info = self.probe_for(source_format).inspect(&source_path)?;
        tracing::info!(
            format = %source_format,
            width = info.width,
            height = info.height,
            size = request.bytes.len() as u64,
            target = request.target.bytes(),
            "Compression request"
        );

        let search = &self.config.search;
        let outcome = match source_format.kind() {
            MediaKind::Still => search_image(
                &self.image_codec,
                ImageSearchRequest {
                    source: &request.bytes,
                    dimensions: info.dimensions(),
                    target: request.target,
                    format: source_format.preferred_still_output(),
                },
                search,
            )?,
            MediaKind::Animated => search_animated(
                &self.animated_codec,
                AnimatedSearchRequest {
                    source: &source_path,
                    source_width: info.width,
                    target: request.target,
                },
                &workspace,
                search,
            )?,
        };

        let format = outcome.format;
        let achieved = outcome.achieved;
        let params = outcome.params;
        let trials = outcome.trials;
        let bytes = outcome.into_bytes()?;
        workspace.close();

        let response = CompressResponse {
            achieved,
            original_size: request.bytes.len() as u64,
            compressed_size: bytes.len() as u64,
            target_bytes: request.target.bytes(),
            source_format,
            format,
            mime: format.mime(),
            extension: format.extension(),
            suggested_name: suggested_name(request.file_name.as_deref(), format.extension()),
            params,
            trials,
            elapsed_ms: started.elapsed().as_millis() as u64,
            finished_at: Utc::now(),
            bytes,
        };

        if !achieved {
            tracing::warn!(
                target = response.target_bytes,
                size = response.compressed_size,
                over_by = response.compressed().overshoot(request.target),
                "Target not reached, returning smallest candidate"
            );
        }
        tracing::info!(
            original = response.original_size,
            compressed = response.compressed_size,
            achieved,
            params = %params,
            trials,
            elapsed_ms = response.elapsed_ms,
            "Compression finished"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs::File;
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, RgbImage};
    use shared_utils::{AdmissionPolicy, SizeTarget};
    use tempfile::TempDir;

    // ------------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------------

    fn noisy_image(format: ImageFormat, width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            let v = x.wrapping_mul(2654435761).wrapping_add(y.wrapping_mul(40503));
            image::Rgb([(v >> 3) as u8, (v >> 11) as u8, (v >> 19) as u8])
        });
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), format)
            .unwrap();
        out
    }

    struct FixedProbe(std::result::Result<MediaInfo, String>);

    impl Probe for FixedProbe {
        fn inspect(&self, path: &Path) -> Result<MediaInfo> {
            self.0.clone().map_err(|m| CompressError::probe(path, m))
        }
    }

    /// Sparse GIF-sized files: width × fps × 100 bytes.
    struct SparseGifCodec {
        calls: Cell<u32>,
    }

    impl AnimatedCodec for SparseGifCodec {
        fn encode(&self, _source: &Path, width: u32, frame_rate: u32, output: &Path) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            let file = File::create(output)?;
            file.set_len(u64::from(width) * u64::from(frame_rate) * 100)?;
            Ok(())
        }
    }

    fn service(root: &Path) -> ServiceConfig {
        ServiceConfig::new()
            .with_workspace_root(root)
            .with_max_concurrent_searches(2)
    }

    fn gif_compressor(
        root: &Path,
        probe: FixedProbe,
    ) -> Compressor<ImageRsCodec, SparseGifCodec> {
        Compressor::with_backends(
            service(root),
            ImageRsCodec::new(),
            SparseGifCodec { calls: Cell::new(0) },
            Box::new(ImageHeaderProbe::new()),
            Box::new(probe),
        )
    }

    fn leftover(root: &Path) -> usize {
        std::fs::read_dir(root).map(|rd| rd.count()).unwrap_or(0)
    }

    // ------------------------------------------------------------------------
    // Still images
    // ------------------------------------------------------------------------

    #[test]
    fn test_still_jpeg_request() {
        let root = TempDir::new().unwrap();
        let compressor = Compressor::new(service(root.path()));
        let source = noisy_image(ImageFormat::Jpeg, 256, 192);
        let target = (source.len() / 3) as u64;
        let request = CompressRequest::new(source.clone(), SizeTarget::from_bytes(target).unwrap())
            .with_file_name("holiday.jpg")
            .with_mime("image/jpeg");

        let response = compressor.compress(&request).unwrap();

        assert!(response.achieved);
        assert!(response.compressed_size <= target);
        assert_eq!(response.compressed_size, response.bytes.len() as u64);
        assert_eq!(response.original_size, source.len() as u64);
        assert_eq!(response.mime, "image/jpeg");
        assert_eq!(response.suggested_name, "compressed-holiday.jpg");
        assert_eq!(MediaFormat::sniff(&response.bytes), Some(MediaFormat::Jpeg));
        assert_eq!(leftover(root.path()), 0);
    }

    #[test]
    fn test_content_wins_over_declared_type() {
        let root = TempDir::new().unwrap();
        let compressor = Compressor::new(service(root.path()));
        let source = noisy_image(ImageFormat::Png, 64, 64);
        let request = CompressRequest::new(source, SizeTarget::from_megabytes(1.0).unwrap())
            .with_file_name("mislabeled.jpg")
            .with_mime("image/jpeg");

        let response = compressor.compress(&request).unwrap();
        assert_eq!(response.source_format, MediaFormat::Png);
        assert_eq!(response.format, MediaFormat::Png);
        assert_eq!(response.suggested_name, "compressed-mislabeled.png");
    }

    #[test]
    fn test_unsupported_format_allocates_nothing() {
        let root = TempDir::new().unwrap();
        let compressor = Compressor::new(service(root.path()));
        let request = CompressRequest::new(b"BM\x00\x00 not an image".to_vec(), SizeTarget::from_bytes(100).unwrap())
            .with_file_name("picture.bmp");

        let err = compressor.compress(&request).unwrap_err();
        assert_eq!(err.kind(), "unsupported_format");
        assert!(err.is_client_error());
        assert!(!root.path().exists() || leftover(root.path()) == 0);
        assert_eq!(compressor.pool().available(), 2);
    }

    #[test]
    fn test_truncated_still_is_probe_failure() {
        let root = TempDir::new().unwrap();
        let compressor = Compressor::new(service(root.path()));
        let mut source = noisy_image(ImageFormat::Png, 32, 32);
        source.truncate(12);
        let request = CompressRequest::new(source, SizeTarget::from_bytes(100).unwrap());

        let err = compressor.compress(&request).unwrap_err();
        assert_eq!(err.kind(), "probe_failure");
        assert_eq!(leftover(root.path()), 0);
    }

    // ------------------------------------------------------------------------
    // Animated
    // ------------------------------------------------------------------------

    fn gif_info(width: u32, height: u32) -> MediaInfo {
        MediaInfo {
            width,
            height,
            format_name: "gif".to_string(),
            format: Some(MediaFormat::Gif),
            frame_count: Some(24),
            frame_rate: Some(10.0),
            duration_secs: Some(2.4),
        }
    }

    #[test]
    fn test_animated_request_returns_file_bytes() {
        let root = TempDir::new().unwrap();
        let compressor = gif_compressor(root.path(), FixedProbe(Ok(gif_info(400, 300))));
        // 400 × 15 × 100 = 600000 > 500000；400 × 12 × 100 = 480000 命中
        let request = CompressRequest::new(b"GIF89a....".to_vec(), SizeTarget::from_bytes(500_000).unwrap())
            .with_file_name("party.gif");

        let response = compressor.compress(&request).unwrap();
        assert!(response.achieved);
        assert_eq!(response.trials, 2);
        assert_eq!(response.compressed_size, 480_000);
        assert_eq!(response.bytes.len(), 480_000);
        assert_eq!(response.mime, "image/gif");
        assert_eq!(response.suggested_name, "compressed-party.gif");
        assert_eq!(leftover(root.path()), 0);
    }

    #[test]
    fn test_animated_probe_failure_skips_encoding() {
        let root = TempDir::new().unwrap();
        let compressor = gif_compressor(root.path(), FixedProbe(Err("no video stream".to_string())));
        let request = CompressRequest::new(b"GIF89a....".to_vec(), SizeTarget::from_bytes(1).unwrap());

        let err = compressor.compress(&request).unwrap_err();
        assert_eq!(err.kind(), "probe_failure");
        assert_eq!(compressor.animated_codec.calls.get(), 0);
        assert_eq!(leftover(root.path()), 0);
        assert_eq!(compressor.pool().available(), 2);
    }

    #[test]
    fn test_busy_when_pool_rejects() {
        let root = TempDir::new().unwrap();
        let config = service(root.path())
            .with_max_concurrent_searches(1)
            .with_admission(AdmissionPolicy::Reject);
        let compressor = Compressor::with_backends(
            config,
            ImageRsCodec::new(),
            SparseGifCodec { calls: Cell::new(0) },
            Box::new(ImageHeaderProbe::new()),
            Box::new(FixedProbe(Ok(gif_info(100, 100)))),
        );

        let held = compressor.pool().acquire().unwrap();
        let request = CompressRequest::new(b"GIF89a....".to_vec(), SizeTarget::from_bytes(1).unwrap());
        let err = compressor.compress(&request).unwrap_err();
        assert_eq!(err.kind(), "busy");
        assert!(!err.is_client_error());

        drop(held);
        assert!(compressor.compress(&request).is_ok());
    }

    #[test]
    fn test_inspect_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("still.png");
        std::fs::write(&path, noisy_image(ImageFormat::Png, 48, 20)).unwrap();

        let compressor = Compressor::new(service(dir.path()));
        let (format, info) = compressor.inspect(&path).unwrap();
        assert_eq!(format, MediaFormat::Png);
        assert_eq!((info.width, info.height), (48, 20));
    }
}
