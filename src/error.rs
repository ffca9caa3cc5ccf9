//! Error handling module for stackrefresh
//!
//! Provides the refresh error taxonomy using thiserror. Every variant maps to
//! a process exit code so `main` can report failures verbatim and exit with
//! the matching status.

use crate::types::StepKind;
use thiserror::Error;

/// Exit code for usage, configuration and plan validation errors (EX_USAGE)
pub const EXIT_USAGE: i32 = 64;

/// Exit code when a required external tool is missing
pub const EXIT_UNAVAILABLE: i32 = 127;

/// Main error type for a refresh run
#[derive(Error, Debug)]
pub enum RefreshError {
    /// Required external tools are not on PATH; raised before any step runs
    #[error("Required tools not found on PATH: {}", tools.join(", "))]
    CollaboratorUnavailable { tools: Vec<String> },

    /// A step's collaborator returned non-zero or failed to run
    #[error("Step {kind} failed: {detail}")]
    StepFailed { kind: StepKind, detail: String },

    /// A step lacked the privilege it needed
    #[error("Step {kind} permission denied: {detail}")]
    PermissionDenied { kind: StepKind, detail: String },

    /// The plan has a missing or empty parameter
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors while reading or writing configuration
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for refresh operations
pub type Result<T> = std::result::Result<T, RefreshError>;

impl RefreshError {
    /// Create a step failure
    pub fn step_failed(kind: StepKind, detail: impl Into<String>) -> Self {
        Self::StepFailed {
            kind,
            detail: detail.into(),
        }
    }

    /// Create a permission failure
    pub fn permission_denied(kind: StepKind, detail: impl Into<String>) -> Self {
        Self::PermissionDenied {
            kind,
            detail: detail.into(),
        }
    }

    /// Create an invalid plan error
    pub fn invalid_plan(msg: impl Into<String>) -> Self {
        Self::InvalidPlan(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// The step that failed, if this error came from running one
    pub fn step_kind(&self) -> Option<StepKind> {
        match self {
            Self::StepFailed { kind, .. } | Self::PermissionDenied { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Process exit code for this error
    ///
    /// `1` pull, `2` directory or ownership, `3` stack stop, `4` stack start,
    /// `64` usage/config/plan, `127` missing tool.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::StepFailed { kind, .. } | Self::PermissionDenied { kind, .. } => kind.exit_code(),
            Self::CollaboratorUnavailable { .. } => EXIT_UNAVAILABLE,
            Self::InvalidPlan(_) | Self::Config(_) | Self::Io(_) | Self::Json(_) => EXIT_USAGE,
        }
    }
}
