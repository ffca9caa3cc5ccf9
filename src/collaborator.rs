//! The capability set a refresh delegates to.
//!
//! Every step of a plan maps to exactly one method here. The production
//! implementation is `system::SystemCollaborators`; tests substitute a
//! recording fake to assert call order and fail-fast behaviour.

use crate::error::RefreshError;
use crate::types::{OwnerSpec, StepKind};
use std::path::Path;
use thiserror::Error;

/// Failure reported by a collaborator, before the refresher attaches the step
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// The external call failed; the detail is its diagnostic output
    #[error("{0}")]
    Failed(String),

    /// The external call lacked privilege
    #[error("{0}")]
    PermissionDenied(String),
}

impl CollaboratorError {
    pub fn failed(detail: impl Into<String>) -> Self {
        Self::Failed(detail.into())
    }

    pub fn permission_denied(detail: impl Into<String>) -> Self {
        Self::PermissionDenied(detail.into())
    }

    /// Attach the step that produced this failure
    pub fn into_refresh_error(self, kind: StepKind) -> RefreshError {
        match self {
            Self::Failed(detail) => RefreshError::step_failed(kind, detail),
            Self::PermissionDenied(detail) => RefreshError::permission_denied(kind, detail),
        }
    }
}

/// Result of a single collaborator call
pub type CollaboratorResult = std::result::Result<(), CollaboratorError>;

/// External collaborators for each refresh step.
///
/// Implementations block until the external call has returned.
pub trait Collaborators {
    /// Fetch the latest layers for `image`.
    fn pull_image(&mut self, image: &str) -> CollaboratorResult;

    /// Create `path` and its parents if absent; succeed without change if it
    /// already is a directory.
    fn ensure_dir(&mut self, path: &Path) -> CollaboratorResult;

    /// Recursively set ownership of `path` to `owner`.
    fn chown(&mut self, path: &Path, owner: &OwnerSpec) -> CollaboratorResult;

    /// Tear down the stack defined by `descriptor`; succeed if already stopped.
    fn stop_stack(&mut self, descriptor: &Path) -> CollaboratorResult;

    /// Start the stack defined by `descriptor` detached.
    fn start_stack(&mut self, descriptor: &Path) -> CollaboratorResult;
}

impl<C: Collaborators + ?Sized> Collaborators for &mut C {
    fn pull_image(&mut self, image: &str) -> CollaboratorResult {
        (**self).pull_image(image)
    }

    fn ensure_dir(&mut self, path: &Path) -> CollaboratorResult {
        (**self).ensure_dir(path)
    }

    fn chown(&mut self, path: &Path, owner: &OwnerSpec) -> CollaboratorResult {
        (**self).chown(path, owner)
    }

    fn stop_stack(&mut self, descriptor: &Path) -> CollaboratorResult {
        (**self).stop_stack(descriptor)
    }

    fn start_stack(&mut self, descriptor: &Path) -> CollaboratorResult {
        (**self).start_stack(descriptor)
    }
}
