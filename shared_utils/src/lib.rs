//! Shared Utilities for the size_boost tools
//!
//! Common building blocks used by `img_target`, `anim_target` and the
//! `size_boost` dispatcher:
//! - Size types (`SizeTarget`, `FileSize`) and bounded quality bisection
//! - Scale / frame-rate ladders and trial geometry
//! - Media format classification
//! - Candidate selection policy and `SearchOutcome`
//! - Typed errors
//! - Logging, ffprobe / ffmpeg runners
//! - Request workspace, search pool and thread budget
//! - Search / service configuration

pub mod types;
pub mod errors;
pub mod media_format;
pub mod ladder;
pub mod selection;
pub mod config;
pub mod logging;
pub mod probe;
pub mod ffprobe;
pub mod ffmpeg_process;
pub mod workspace;
pub mod search_pool;
pub mod thread_manager;

pub use types::{FileSize, QualityBisection, SizeTarget};
pub use errors::{CompressError, Result};
pub use media_format::{classify, DeclaredFormat, MediaFormat, MediaKind};
pub use ladder::{Dimensions, FrameRateLadder, LadderError, ScaleLadder};
pub use selection::{
    select, Candidate, CandidateTracker, OutputPayload, SearchOutcome, Selection, TrialParams,
};
pub use config::{AdmissionPolicy, EncodeFailurePolicy, QualityRange, SearchConfig, ServiceConfig};
pub use logging::{init_logging, LogConfig};
pub use probe::{MediaInfo, Probe};
pub use ffprobe::FfprobeProbe;
pub use workspace::{ScratchFile, Workspace};
pub use search_pool::{SearchPermit, SearchPool};
