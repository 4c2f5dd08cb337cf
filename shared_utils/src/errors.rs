use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompressError {
    #[error("Invalid target size: {0}")]
    InvalidTarget(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to probe {path}: {message}")]
    ProbeFailure { path: PathBuf, message: String },

    #[error("Encode failed ({params}): {message}")]
    EncodeFailure {
        params: String,
        message: String,
        suggestion: Option<String>,
    },

    #[error("Search pool is full ({capacity} concurrent searches)")]
    Busy { capacity: usize },

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Workspace error at {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompressError {
    pub fn probe(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        CompressError::ProbeFailure {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn encode(params: impl Into<String>, message: impl Into<String>) -> Self {
        CompressError::EncodeFailure {
            params: params.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn workspace(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CompressError::Workspace {
            path: path.into(),
            source,
        }
    }

    /// Stable label for the request boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            CompressError::InvalidTarget(_) => "invalid_target",
            CompressError::InvalidConfig(_) => "invalid_config",
            CompressError::UnsupportedFormat(_) => "unsupported_format",
            CompressError::ProbeFailure { .. } => "probe_failure",
            CompressError::EncodeFailure { .. } => "encode_failure",
            CompressError::Busy { .. } => "busy",
            CompressError::ToolNotFound(_) => "tool_not_found",
            CompressError::Workspace { .. } => "workspace",
            CompressError::Io(_) => "io",
        }
    }

    /// Request problems (the caller can fix them) vs. server-side failures.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CompressError::InvalidTarget(_)
                | CompressError::InvalidConfig(_)
                | CompressError::UnsupportedFormat(_)
                | CompressError::ProbeFailure { .. }
        )
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self {
            CompressError::EncodeFailure { suggestion, .. } => suggestion.as_deref(),
            CompressError::ToolNotFound(_) => Some("Install ffmpeg and make sure it is in PATH"),
            CompressError::Busy { .. } => Some("Retry later or raise the search pool capacity"),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompressError>;
