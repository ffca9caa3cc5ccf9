//! Refresh plan engine
//!
//! Translates a `RefreshConfig` into the ordered sequence of `Step`s that the
//! refresher executes:
//!
//! | # | Step        | Collaborator |
//! |---|-------------|--------------|
//! | 1 | PullImage   | container runtime |
//! | 2 | EnsureDir   | filesystem |
//! | 3 | Chown       | privilege escalation + chown |
//! | 4 | StopStack   | compose tool (`down`) |
//! | 5 | StartStack  | compose tool (`up -d`) |
//!
//! The pull comes first so a registry or network failure aborts before the
//! data directory or the running stack are touched.

use crate::config_file::RefreshConfig;
use crate::error::{RefreshError, Result};
use crate::types::{OwnerSpec, StepKind};
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Step Types
// ============================================================================

/// A single step of a refresh plan with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Pull the latest layers for an image reference
    PullImage { image: String },

    /// Create a directory and its parents if absent
    EnsureDir { path: PathBuf },

    /// Recursively set ownership of a directory
    Chown { path: PathBuf, owner: OwnerSpec },

    /// Tear down the stack defined by a compose descriptor
    StopStack { descriptor: PathBuf },

    /// Start the stack detached, recreating containers
    StartStack { descriptor: PathBuf },
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Self::PullImage { .. } => StepKind::PullImage,
            Self::EnsureDir { .. } => StepKind::EnsureDir,
            Self::Chown { .. } => StepKind::Chown,
            Self::StopStack { .. } => StepKind::StopStack,
            Self::StartStack { .. } => StepKind::StartStack,
        }
    }

    /// Check that every parameter is non-empty
    pub fn validate(&self) -> Result<()> {
        fn empty_path(p: &Path) -> bool {
            p.as_os_str().is_empty()
        }
        let kind = self.kind();

        match self {
            Self::PullImage { image } if image.trim().is_empty() => Err(
                RefreshError::invalid_plan(format!("{} has an empty image reference", kind)),
            ),
            Self::EnsureDir { path } | Self::Chown { path, .. } if empty_path(path) => {
                Err(RefreshError::invalid_plan(format!("{} has an empty path", kind)))
            }
            Self::StopStack { descriptor } | Self::StartStack { descriptor }
                if empty_path(descriptor) =>
            {
                Err(RefreshError::invalid_plan(format!(
                    "{} has an empty stack descriptor",
                    kind
                )))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PullImage { image } => write!(f, "PULL_IMAGE({})", image),
            Self::EnsureDir { path } => write!(f, "ENSURE_DIR({})", path.display()),
            Self::Chown { path, owner } => {
                write!(f, "CHOWN({}, owner={})", path.display(), owner)
            }
            Self::StopStack { descriptor } => write!(f, "STOP_STACK({})", descriptor.display()),
            Self::StartStack { descriptor } => {
                write!(f, "START_STACK({})", descriptor.display())
            }
        }
    }
}

// ============================================================================
// Plan
// ============================================================================

/// An ordered list of steps, built once per invocation and executed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshPlan {
    pub steps: Vec<Step>,
}

impl RefreshPlan {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// The fixed five-step refresh for a configuration.
    pub fn default_plan(config: &RefreshConfig) -> Self {
        Self::new(vec![
            Step::PullImage {
                image: config.image.clone(),
            },
            Step::EnsureDir {
                path: config.data_dir.clone(),
            },
            Step::Chown {
                path: config.data_dir.clone(),
                owner: config.owner.clone(),
            },
            Step::StopStack {
                descriptor: config.compose_file.clone(),
            },
            Step::StartStack {
                descriptor: config.compose_file.clone(),
            },
        ])
    }

    /// Reject empty plans and steps with empty parameters.
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(RefreshError::invalid_plan("plan has no steps"));
        }
        self.steps.iter().try_for_each(Step::validate)
    }

    pub fn kinds(&self) -> Vec<StepKind> {
        self.steps.iter().map(Step::kind).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns true if the plan touches anything beyond the image cache.
    pub fn is_destructive(&self) -> bool {
        self.steps.iter().any(|s| s.kind().is_mutating())
    }

    /// Returns a summary of the plan for logging/display.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Refresh Plan ({} steps):", self.steps.len())];
        for (i, step) in self.steps.iter().enumerate() {
            lines.push(format!("  {}. {}", i + 1, step));
        }
        lines.join("\n")
    }
}
