//! Candidate selection policy (shared by both searches)
//!
//! 两级选择策略：
//! 1. 满足目标大小的候选中选最好的（图片：最大的那个 = 质量最高；动图：当前最优）
//! 2. 没有满足目标的候选 → 退回全局最小的候选
//!
//! `achieved` 当且仅当第一级非空。

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::media_format::MediaFormat;
use crate::types::{FileSize, SizeTarget};

/// Parameters that produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "search", rename_all = "snake_case")]
pub enum TrialParams {
    Image {
        scale: f64,
        width: u32,
        height: u32,
        quality: u8,
    },
    Animated {
        scale: f64,
        width: u32,
        frame_rate: u32,
    },
}

impl TrialParams {
    pub fn scale(&self) -> f64 {
        match self {
            TrialParams::Image { scale, .. } | TrialParams::Animated { scale, .. } => *scale,
        }
    }
}

impl fmt::Display for TrialParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialParams::Image { scale, width, height, quality } => {
                write!(f, "scale {:.2} ({}x{}), quality {}", scale, width, height, quality)
            }
            TrialParams::Animated { scale, width, frame_rate } => {
                write!(f, "scale {:.2} (width {}), {} fps", scale, width, frame_rate)
            }
        }
    }
}

/// One trial's output.
#[derive(Debug, Clone)]
pub struct Candidate<P> {
    pub payload: P,
    pub size: FileSize,
    pub params: TrialParams,
}

impl<P> Candidate<P> {
    pub fn new(payload: P, size: impl Into<FileSize>, params: TrialParams) -> Self {
        Self {
            payload,
            size: size.into(),
            params,
        }
    }
}

/// Winner of a search plus whether the first tier was non-empty.
#[derive(Debug)]
pub struct Selection<P> {
    pub candidate: Candidate<P>,
    pub achieved: bool,
}

/// Apply the two-tier policy to the two trackers a search maintains.
pub fn select<P>(
    best_fit: Option<Candidate<P>>,
    smallest: Option<Candidate<P>>,
) -> Option<Selection<P>> {
    match (best_fit, smallest) {
        (Some(candidate), _) => Some(Selection {
            candidate,
            achieved: true,
        }),
        (None, Some(candidate)) => Some(Selection {
            candidate,
            achieved: false,
        }),
        (None, None) => None,
    }
}

/// In-memory tracker used by the still-image search.
///
/// - `best_fit`: largest size ≤ target (later candidate wins ties)
/// - `smallest`: smallest size overall (earlier candidate wins ties)
#[derive(Debug)]
pub struct CandidateTracker<P> {
    target: SizeTarget,
    best_fit: Option<Candidate<P>>,
    smallest: Option<Candidate<P>>,
    trials: u32,
}

impl<P: Clone> CandidateTracker<P> {
    pub fn new(target: SizeTarget) -> Self {
        Self {
            target,
            best_fit: None,
            smallest: None,
            trials: 0,
        }
    }

    /// Record a candidate. Returns whether it fits the target.
    pub fn offer(&mut self, candidate: Candidate<P>) -> bool {
        self.trials += 1;
        let fits = candidate.size.fits(self.target);

        if self
            .smallest
            .as_ref()
            .map_or(true, |s| candidate.size < s.size)
        {
            self.smallest = Some(candidate.clone());
        }

        if fits
            && self
                .best_fit
                .as_ref()
                .map_or(true, |b| candidate.size >= b.size)
        {
            self.best_fit = Some(candidate);
        }

        fits
    }

    pub fn target(&self) -> SizeTarget {
        self.target
    }

    pub fn best_fit(&self) -> Option<&Candidate<P>> {
        self.best_fit.as_ref()
    }

    pub fn smallest(&self) -> Option<&Candidate<P>> {
        self.smallest.as_ref()
    }

    pub fn trials(&self) -> u32 {
        self.trials
    }

    pub fn finish(self) -> Option<Selection<P>> {
        select(self.best_fit, self.smallest)
    }
}

// ============================================================================
// SearchOutcome
// ============================================================================

/// Where the winning bytes live.
#[derive(Debug)]
pub enum OutputPayload {
    /// Still-image search keeps everything in memory.
    Memory(Vec<u8>),
    /// Animated search hands over the single surviving artifact.
    File(PathBuf),
}

/// Final decision of a search.
#[derive(Debug)]
pub struct SearchOutcome {
    pub payload: OutputPayload,
    pub size: FileSize,
    pub format: MediaFormat,
    pub achieved: bool,
    pub params: TrialParams,
    pub trials: u32,
}

impl SearchOutcome {
    pub fn mime(&self) -> &'static str {
        self.format.mime()
    }

    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }

    /// Load the payload into memory (reads the artifact for file payloads).
    pub fn into_bytes(self) -> std::io::Result<Vec<u8>> {
        match self.payload {
            OutputPayload::Memory(bytes) => Ok(bytes),
            OutputPayload::File(path) => std::fs::read(path),
        }
    }
}
