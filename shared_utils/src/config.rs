//! Search & service configuration
//!
//! `SearchConfig` 控制单次搜索的参数空间；`ServiceConfig` 控制跨请求的资源边界
//! （工作目录根、并发搜索上限、准入策略）。
//!
//! 两者都采用 builder 风格：`SearchConfig::new().with_max_iterations(5)`。

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::CompressError;
use crate::ladder::{FrameRateLadder, ScaleLadder, ANIMATED_MIN_WIDTH, IMAGE_MIN_SIDE};
use crate::thread_manager::{default_search_capacity, MAX_SEARCHES_ENV};
use crate::types::iteration::BINARY_SEARCH_MAX_ITERATIONS;

pub const DEFAULT_QUALITY_MIN: u8 = 20;
pub const DEFAULT_QUALITY_MAX: u8 = 95;

/// Workspace directory name under the system temp dir.
pub const WORKSPACE_DIR_NAME: &str = "size_boost";

/// Default wait for a free search slot under `AdmissionPolicy::Queue`.
pub const DEFAULT_QUEUE_TIMEOUT: Duration = Duration::from_secs(120);

/// What the animated search does when one (scale, frame rate) pair fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodeFailurePolicy {
    /// Clean up and fail the whole request.
    #[default]
    Abort,
    /// Log, drop the pair and continue with the next one.
    SkipPair,
}

impl std::str::FromStr for EncodeFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(EncodeFailurePolicy::Abort),
            "skip-pair" | "skip_pair" | "skip" => Ok(EncodeFailurePolicy::SkipPair),
            other => Err(format!("unknown encode failure policy '{}'", other)),
        }
    }
}

/// Inclusive integer quality range for the still-image binary search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityRange {
    pub min: u8,
    pub max: u8,
}

impl QualityRange {
    pub fn new(min: u8, max: u8) -> Result<Self, CompressError> {
        if min == 0 || max > 100 || min > max {
            return Err(CompressError::InvalidConfig(format!(
                "quality range [{}, {}] must satisfy 1 <= min <= max <= 100",
                min, max
            )));
        }
        Ok(Self { min, max })
    }
}

impl Default for QualityRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_QUALITY_MIN,
            max: DEFAULT_QUALITY_MAX,
        }
    }
}

// ============================================================================
// SearchConfig
// ============================================================================

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub scales: ScaleLadder,
    pub frame_rates: FrameRateLadder,
    pub quality: QualityRange,
    /// Per-scale binary search bound.
    pub max_iterations: u32,
    pub image_min_side: u32,
    pub animated_min_width: u32,
    pub on_encode_failure: EncodeFailurePolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            scales: ScaleLadder::default(),
            frame_rates: FrameRateLadder::default(),
            quality: QualityRange::default(),
            max_iterations: BINARY_SEARCH_MAX_ITERATIONS,
            image_min_side: IMAGE_MIN_SIDE,
            animated_min_width: ANIMATED_MIN_WIDTH,
            on_encode_failure: EncodeFailurePolicy::Abort,
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scales(mut self, scales: ScaleLadder) -> Self {
        self.scales = scales;
        self
    }

    pub fn with_frame_rates(mut self, rates: FrameRateLadder) -> Self {
        self.frame_rates = rates;
        self
    }

    pub fn with_quality(mut self, quality: QualityRange) -> Self {
        self.quality = quality;
        self
    }

    /// Zero is bumped to one.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_image_min_side(mut self, side: u32) -> Self {
        self.image_min_side = side.max(1);
        self
    }

    pub fn with_animated_min_width(mut self, width: u32) -> Self {
        self.animated_min_width = width.max(1);
        self
    }

    pub fn with_encode_failure_policy(mut self, policy: EncodeFailurePolicy) -> Self {
        self.on_encode_failure = policy;
        self
    }
}

// ============================================================================
// ServiceConfig
// ============================================================================

/// Behaviour when every search slot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionPolicy {
    /// Wait up to `timeout` for a slot, then fail with `Busy`.
    Queue { timeout: Duration },
    /// Fail with `Busy` immediately.
    Reject,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        AdmissionPolicy::Queue {
            timeout: DEFAULT_QUEUE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub workspace_root: PathBuf,
    pub max_concurrent_searches: usize,
    pub admission: AdmissionPolicy,
    pub search: SearchConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            workspace_root: std::env::temp_dir().join(WORKSPACE_DIR_NAME),
            max_concurrent_searches: default_search_capacity(),
            admission: AdmissionPolicy::default(),
            search: SearchConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults plus environment overrides (`SIZE_BOOST_MAX_SEARCHES`).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(MAX_SEARCHES_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.max_concurrent_searches = n,
                _ => tracing::warn!(
                    env = MAX_SEARCHES_ENV,
                    value = %raw,
                    "Ignoring invalid search capacity override"
                ),
            }
        }
        config
    }

    pub fn with_workspace_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.workspace_root = root.as_ref().to_path_buf();
        self
    }

    pub fn with_max_concurrent_searches(mut self, n: usize) -> Self {
        self.max_concurrent_searches = n.max(1);
        self
    }

    pub fn with_admission(mut self, admission: AdmissionPolicy) -> Self {
        self.admission = admission;
        self
    }

    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_config_default() {
        let config = SearchConfig::default();
        assert_eq!(config.quality, QualityRange { min: 20, max: 95 });
        assert_eq!(config.max_iterations, 7);
        assert_eq!(config.image_min_side, 64);
        assert_eq!(config.animated_min_width, 80);
        assert_eq!(config.on_encode_failure, EncodeFailurePolicy::Abort);
        assert_eq!(config.scales.len(), 8);
        assert_eq!(config.frame_rates.len(), 5);
    }

    #[test]
    fn test_search_config_builder() {
        let config = SearchConfig::new()
            .with_max_iterations(0)
            .with_quality(QualityRange::new(30, 80).unwrap())
            .with_encode_failure_policy(EncodeFailurePolicy::SkipPair);
        assert_eq!(config.max_iterations, 1);
        assert_eq!(config.quality.min, 30);
        assert_eq!(config.on_encode_failure, EncodeFailurePolicy::SkipPair);
    }

    #[test]
    fn test_quality_range_validation() {
        assert!(QualityRange::new(0, 50).is_err());
        assert!(QualityRange::new(60, 50).is_err());
        assert!(QualityRange::new(10, 101).is_err());
        assert!(QualityRange::new(50, 50).is_ok());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("abort".parse::<EncodeFailurePolicy>().unwrap(), EncodeFailurePolicy::Abort);
        assert_eq!("Skip-Pair".parse::<EncodeFailurePolicy>().unwrap(), EncodeFailurePolicy::SkipPair);
        assert!("retry".parse::<EncodeFailurePolicy>().is_err());
    }

    #[test]
    fn test_service_config_defaults() {
        let config = ServiceConfig::default();
        assert!(config.workspace_root.ends_with(WORKSPACE_DIR_NAME));
        assert!(config.max_concurrent_searches >= 1);
        assert!(matches!(config.admission, AdmissionPolicy::Queue { .. }));

        let config = ServiceConfig::new()
            .with_max_concurrent_searches(0)
            .with_admission(AdmissionPolicy::Reject);
        assert_eq!(config.max_concurrent_searches, 1);
        assert_eq!(config.admission, AdmissionPolicy::Reject);
    }
}
