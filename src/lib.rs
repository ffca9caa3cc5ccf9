//! stackrefresh library
//!
//! Core functionality for refreshing a container-compose deployment: build a
//! fixed plan (pull, ensure dir, chown, stop, start) and run it fail-fast
//! against a set of external collaborators.

pub mod cli;
pub mod collaborator;
pub mod command_args;
pub mod command_runner;
pub mod commands;
pub mod config_file;
pub mod engine;
pub mod error;
pub mod preflight;
pub mod process_guard;
pub mod refresher;
pub mod system;
pub mod types;

// Re-export main types for convenience
pub use collaborator::{CollaboratorError, CollaboratorResult, Collaborators};
pub use command_args::CommandArgs;
pub use command_runner::{CommandOutput, run_command_safe};
pub use config_file::{ConfigOverrides, RefreshConfig};
pub use engine::plan::{RefreshPlan, Step};
pub use error::RefreshError;
pub use process_guard::{ChildRegistry, CommandProcessGroup, ProcessGuard};
pub use refresher::{CompletedStep, DeploymentRefresher, RefreshReport};
pub use system::SystemCollaborators;
pub use types::{OwnerSpec, StepKind};
