//! Still-image target-size search
//!
//! 外层：缩放阶梯（从大到小，全部跑完，不提前退出）
//! 内层：每个缩放下对整数质量 [min, max] 做有界二分
//!
//! - size ≤ target → 记录为候选，`low = mid + 1`（往更高质量找）
//! - size > target → `high = mid - 1`
//!
//! 每个试编码都更新全局最小候选；最终按两级策略选择。
//! 全程在内存中进行，不落盘。
//!
//! 假设：同一尺寸下输出大小随质量单调不减。违反时结果仍满足
//! 「achieved ⇒ ≤ target」，只是可能不是最高质量。

use std::sync::Arc;
use std::time::Instant;

use shared_utils::ladder::image_trial_dimensions;
use shared_utils::{
    Candidate, CandidateTracker, CompressError, Dimensions, MediaFormat, QualityBisection,
    OutputPayload, Result, SearchConfig, SearchOutcome, SizeTarget, TrialParams,
};

use crate::codec::ImageCodec;

/// Inputs of one still-image search.
#[derive(Debug, Clone, Copy)]
pub struct ImageSearchRequest<'a> {
    pub source: &'a [u8],
    /// Probed source dimensions.
    pub dimensions: Dimensions,
    pub target: SizeTarget,
    pub format: MediaFormat,
}

pub fn search_image<C: ImageCodec>(
    codec: &C,
    request: ImageSearchRequest<'_>,
    config: &SearchConfig,
) -> Result<SearchOutcome> {
    let started = Instant::now();
    let frame = codec.decode(request.source)?;
    let decoded = codec.dimensions(&frame);
    if decoded != request.dimensions {
        tracing::debug!(
            probed = %request.dimensions,
            decoded = %decoded,
            "Probed and decoded dimensions differ, using probed"
        );
    }

    let mut tracker: CandidateTracker<Arc<Vec<u8>>> = CandidateTracker::new(request.target);

    for scale in config.scales.iter() {
        let dims = image_trial_dimensions(request.dimensions, scale, config.image_min_side);
        let resized = codec.resize(&frame, dims)?;

        let mut bisect =
            QualityBisection::new(config.quality.min, config.quality.max, config.max_iterations);

        while let Some(quality) = bisect.next_probe() {
            let params = TrialParams::Image {
                scale,
                width: dims.width,
                height: dims.height,
                quality,
            };

            let bytes = codec.encode(&resized, request.format, quality)?;
            let size = bytes.len() as u64;
            let fits = tracker.offer(Candidate::new(Arc::new(bytes), size, params));

            tracing::debug!(
                scale,
                width = dims.width,
                height = dims.height,
                quality,
                size,
                target = request.target.bytes(),
                fits,
                "Image trial"
            );

            bisect.record(fits);
        }
    }

    let trials = tracker.trials();
    let selection = tracker
        .finish()
        .ok_or_else(|| CompressError::encode("image search", "no trial was encoded"))?;
    let candidate = selection.candidate;
    let bytes = Arc::try_unwrap(candidate.payload).unwrap_or_else(|shared| (*shared).clone());

    tracing::info!(
        format = %request.format,
        target = request.target.bytes(),
        size = candidate.size.bytes(),
        achieved = selection.achieved,
        params = %candidate.params,
        trials,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Image search finished"
    );

    Ok(SearchOutcome {
        payload: OutputPayload::Memory(bytes),
        size: candidate.size,
        format: request.format,
        achieved: selection.achieved,
        params: candidate.params,
        trials,
    })
}
