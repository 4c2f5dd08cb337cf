//! Animated target-size search
//!
//! 网格搜索：缩放（外层）× 帧率（内层，从高到低）。
//! 每个试编码都落盘（请求工作目录内），只保留当前最小的一个产物。
//!
//! - 第一个 ≤ target 的候选 → 立即结束，`achieved = true`
//! - 全部跑完仍未满足 → 返回最小候选，`achieved = false`
//! - 编码失败 → `EncodeFailurePolicy`：Abort 清理后返回错误；SkipPair 记录后继续
//!
//! 任何退出路径上，工作目录中最多只剩返回的那个产物。

use std::path::Path;
use std::time::Instant;

use shared_utils::ladder::animated_trial_width;
use shared_utils::{
    CompressError, EncodeFailurePolicy, MediaFormat, OutputPayload, Result, SearchConfig,
    SearchOutcome, SizeTarget, TrialParams, Workspace,
};

use crate::best_slot::{BestSlot, Trial};
use crate::codec::AnimatedCodec;

#[derive(Debug, Clone, Copy)]
pub struct AnimatedSearchRequest<'a> {
    pub source: &'a Path,
    /// Probed source width.
    pub source_width: u32,
    pub target: SizeTarget,
}

pub fn search_animated<C: AnimatedCodec>(
    codec: &C,
    request: AnimatedSearchRequest<'_>,
    workspace: &Workspace,
    config: &SearchConfig,
) -> Result<SearchOutcome> {
    let started = Instant::now();
    let mut slot = BestSlot::new();
    let mut trials = 0u32;
    let mut skipped = 0u32;
    let mut last_error: Option<CompressError> = None;
    let mut achieved = false;

    'grid: for scale in config.scales.iter() {
        let width = animated_trial_width(request.source_width, scale, config.animated_min_width);

        for frame_rate in config.frame_rates.iter() {
            let params = TrialParams::Animated {
                scale,
                width,
                frame_rate,
            };
            let scratch = workspace.scratch("trial", MediaFormat::Gif.extension());
            trials += 1;

            let encoded = codec
                .encode(request.source, width, frame_rate, scratch.path())
                .and_then(|()| scratch.size());

            let size = match encoded {
                Ok(size) => size,
                Err(e) => match config.on_encode_failure {
                    // slot 与 scratch 在返回时 drop → 产物全部删除
                    EncodeFailurePolicy::Abort => return Err(e),
                    EncodeFailurePolicy::SkipPair => {
                        tracing::warn!(params = %params, error = %e, "Animated trial failed, skipping pair");
                        skipped += 1;
                        last_error = Some(e);
                        continue;
                    }
                },
            };

            let fits = size.fits(request.target);
            let kept = slot.offer(Trial {
                file: scratch,
                size,
                params,
            });
            tracing::debug!(
                scale,
                width,
                frame_rate,
                size = size.bytes(),
                target = request.target.bytes(),
                fits,
                kept,
                "Animated trial"
            );

            if fits {
                achieved = true;
                break 'grid;
            }
        }
    }

    let best = match slot.take() {
        Some(best) => best,
        None => {
            return Err(last_error.unwrap_or_else(|| {
                CompressError::encode("animated search", "no trial was encoded")
            }))
        }
    };

    tracing::info!(
        target = request.target.bytes(),
        size = best.size.bytes(),
        achieved,
        params = %best.params,
        trials,
        skipped,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Animated search finished"
    );

    let size = best.size;
    let params = best.params;
    Ok(SearchOutcome {
        payload: OutputPayload::File(best.into_path()),
        size,
        format: MediaFormat::Gif,
        achieved,
        params,
        trials,
    })
}
