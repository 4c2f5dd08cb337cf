//! Scale / frame-rate ladders and trial geometry
//!
//! 两个搜索共享的离散参数阶梯：
//! - `ScaleLadder`: 分辨率缩放因子，降序
//! - `FrameRateLadder`: 动图帧率，降序

use serde::Serialize;
use std::fmt;

pub const DEFAULT_SCALE_LADDER: &[f64] = &[1.0, 0.9, 0.8, 0.7, 0.6, 0.5, 0.4, 0.3];
pub const DEFAULT_FRAME_RATE_LADDER: &[u32] = &[15, 12, 10, 8, 6];

/// Minimum bounding-box side for still images.
pub const IMAGE_MIN_SIDE: u32 = 64;
/// Minimum output width for animated images.
pub const ANIMATED_MIN_WIDTH: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LadderError {
    #[error("ladder is empty")]
    Empty,
    #[error("ladder step {0} is out of range")]
    OutOfRange(String),
    #[error("ladder must be strictly descending")]
    NotDescending,
}

// ============================================================================
// ScaleLadder
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScaleLadder(Vec<f64>);

impl ScaleLadder {
    /// Factors must be in (0, 1] and strictly descending.
    pub fn new(factors: Vec<f64>) -> Result<Self, LadderError> {
        if factors.is_empty() {
            return Err(LadderError::Empty);
        }
        if let Some(bad) = factors.iter().find(|f| !f.is_finite() || **f <= 0.0 || **f > 1.0) {
            return Err(LadderError::OutOfRange(bad.to_string()));
        }
        if factors.windows(2).any(|w| w[1] >= w[0]) {
            return Err(LadderError::NotDescending);
        }
        Ok(Self(factors))
    }

    pub fn factors(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }
}

impl Default for ScaleLadder {
    fn default() -> Self {
        Self(DEFAULT_SCALE_LADDER.to_vec())
    }
}

// ============================================================================
// FrameRateLadder
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FrameRateLadder(Vec<u32>);

impl FrameRateLadder {
    pub fn new(rates: Vec<u32>) -> Result<Self, LadderError> {
        if rates.is_empty() {
            return Err(LadderError::Empty);
        }
        if let Some(bad) = rates.iter().find(|r| **r == 0 || **r > 120) {
            return Err(LadderError::OutOfRange(bad.to_string()));
        }
        if rates.windows(2).any(|w| w[1] >= w[0]) {
            return Err(LadderError::NotDescending);
        }
        Ok(Self(rates))
    }

    pub fn rates(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

impl Default for FrameRateLadder {
    fn default() -> Self {
        Self(DEFAULT_FRAME_RATE_LADDER.to_vec())
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Fit `source` inside `bounds`, keeping aspect ratio and never enlarging.
pub fn fit_inside(source: Dimensions, bounds: Dimensions) -> Dimensions {
    if source.width == 0 || source.height == 0 {
        return source;
    }
    if bounds.width >= source.width && bounds.height >= source.height {
        return source;
    }
    let ratio = (f64::from(bounds.width) / f64::from(source.width))
        .min(f64::from(bounds.height) / f64::from(source.height));
    Dimensions {
        width: ((f64::from(source.width) * ratio).round() as u32).max(1),
        height: ((f64::from(source.height) * ratio).round() as u32).max(1),
    }
}

/// Target pixel size of one still-image trial at `scale`.
///
/// Each bounding-box side is `round(side × scale)` clamped to `min_side`; the
/// source is then fitted inside that box.
pub fn image_trial_dimensions(source: Dimensions, scale: f64, min_side: u32) -> Dimensions {
    let bounds = Dimensions {
        width: ((f64::from(source.width) * scale).round() as u32).max(min_side),
        height: ((f64::from(source.height) * scale).round() as u32).max(min_side),
    };
    fit_inside(source, bounds)
}

/// Target width of one animated trial at `scale` (height follows the aspect
/// ratio). Floored at `min_width` but never wider than the source.
pub fn animated_trial_width(source_width: u32, scale: f64, min_width: u32) -> u32 {
    let scaled = (f64::from(source_width) * scale).round() as u32;
    scaled.max(min_width).min(source_width.max(1))
}
