//! Production collaborators
//!
//! `SystemCollaborators` runs each step for real: the container runtime and
//! compose tool through `run_command_safe`, directory creation through the
//! filesystem, and ownership through `chown` behind an optional escalation
//! prefix.
//!
//! In dry-run mode destructive commands are logged and skipped. The image
//! pull is not destructive and still runs, so a dry run verifies that the
//! reference resolves.

use crate::collaborator::{CollaboratorError, CollaboratorResult, Collaborators};
use crate::command_args::CommandArgs;
use crate::command_runner::{CommandOutput, run_command_safe};
use crate::commands::image::PullImageArgs;
use crate::commands::ownership::ChownArgs;
use crate::commands::stack::{ComposeDownArgs, ComposeUpArgs};
use crate::config_file::RefreshConfig;
use crate::types::OwnerSpec;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Fragments of chown/sudo stderr that mean "not allowed" rather than
/// "something broke"
const PERMISSION_MARKERS: &[&str] = &[
    "operation not permitted",
    "permission denied",
    "a password is required",
    "a terminal is required",
    "is not in the sudoers file",
];

/// Collaborators backed by real processes and the local filesystem
#[derive(Debug, Clone)]
pub struct SystemCollaborators {
    runtime: String,
    compose_command: Vec<String>,
    escalate: Vec<String>,
    step_timeout: Option<Duration>,
    dry_run: bool,
}

impl SystemCollaborators {
    /// Build collaborators from a resolved configuration
    ///
    /// The escalation prefix is dropped when already running as root.
    pub fn from_config(config: &RefreshConfig, dry_run: bool) -> Self {
        let escalate = if nix::unistd::geteuid().is_root() {
            Vec::new()
        } else {
            config.escalate.clone()
        };

        Self {
            runtime: config.runtime.clone(),
            compose_command: config.compose_command.clone(),
            escalate,
            step_timeout: config.step_timeout(),
            dry_run,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Escalation prefix actually used for chown
    pub fn escalate(&self) -> &[String] {
        &self.escalate
    }

    fn execute<T: CommandArgs>(&self, args: &T) -> std::result::Result<(), CommandOutput> {
        if self.dry_run && args.is_destructive() {
            info!(command = %args.display_command(), "[DRY RUN] skipped");
            return Ok(());
        }

        match run_command_safe(args, self.step_timeout) {
            Ok(output) if output.success => Ok(()),
            Ok(output) => Err(output),
            Err(e) => Err(CommandOutput {
                stdout: String::new(),
                stderr: format!("{:#}", e),
                exit_code: None,
                success: false,
                timed_out_after: None,
            }),
        }
    }

    fn run_step<T: CommandArgs>(&self, args: &T) -> CollaboratorResult {
        self.execute(args)
            .map_err(|output| CollaboratorError::failed(output.diagnostic()))
    }
}

/// Whether a failed command's output says it lacked privilege
pub fn is_permission_failure(output: &CommandOutput) -> bool {
    let stderr = output.stderr.to_lowercase();
    PERMISSION_MARKERS.iter().any(|m| stderr.contains(m))
}

fn io_failure(path: &Path, e: std::io::Error) -> CollaboratorError {
    let detail = format!("{}: {}", path.display(), e);
    if e.kind() == ErrorKind::PermissionDenied {
        CollaboratorError::permission_denied(detail)
    } else {
        CollaboratorError::failed(detail)
    }
}

impl Collaborators for SystemCollaborators {
    fn pull_image(&mut self, image: &str) -> CollaboratorResult {
        self.run_step(&PullImageArgs {
            runtime: self.runtime.clone(),
            image: image.to_string(),
        })
    }

    fn ensure_dir(&mut self, path: &Path) -> CollaboratorResult {
        match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => {
                debug!(path = %path.display(), "directory already present");
                Ok(())
            }
            Ok(_) => Err(CollaboratorError::failed(format!(
                "{} exists and is not a directory",
                path.display()
            ))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if self.dry_run {
                    info!(path = %path.display(), "[DRY RUN] would create directory");
                    return Ok(());
                }
                info!(path = %path.display(), "creating directory");
                fs::create_dir_all(path).map_err(|e| io_failure(path, e))
            }
            Err(e) => Err(io_failure(path, e)),
        }
    }

    fn chown(&mut self, path: &Path, owner: &OwnerSpec) -> CollaboratorResult {
        let args = ChownArgs {
            escalate: self.escalate.clone(),
            owner: owner.clone(),
            path: path.to_path_buf(),
        };
        self.execute(&args).map_err(|output| {
            if is_permission_failure(&output) {
                CollaboratorError::permission_denied(output.diagnostic())
            } else {
                CollaboratorError::failed(output.diagnostic())
            }
        })
    }

    fn stop_stack(&mut self, descriptor: &Path) -> CollaboratorResult {
        self.run_step(&ComposeDownArgs {
            compose: self.compose_command.clone(),
            file: descriptor.to_path_buf(),
        })
    }

    fn start_stack(&mut self, descriptor: &Path) -> CollaboratorResult {
        self.run_step(&ComposeUpArgs {
            compose: self.compose_command.clone(),
            file: descriptor.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn collaborators(dry_run: bool) -> SystemCollaborators {
        SystemCollaborators {
            runtime: "stackrefresh-missing-runtime".to_string(),
            compose_command: vec!["stackrefresh-missing-compose".to_string()],
            escalate: vec![],
            step_timeout: None,
            dry_run,
        }
    }

    fn failed_output(stderr: &str) -> CommandOutput {
        CommandOutput {
            stdout: String::new(),
            stderr: stderr.to_string(),
            exit_code: Some(1),
            success: false,
            timed_out_after: None,
        }
    }

    #[test]
    fn test_ensure_dir_creates_parents() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("a/b/data");

        collaborators(false).ensure_dir(&target).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn test_ensure_dir_existing_is_noop() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("data");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep.txt"), "x").unwrap();
        let before = fs::metadata(&target).unwrap().modified().unwrap();

        let mut c = collaborators(false);
        c.ensure_dir(&target).unwrap();
        c.ensure_dir(&target).unwrap();

        assert_eq!(fs::metadata(&target).unwrap().modified().unwrap(), before);
        assert!(target.join("keep.txt").exists());
    }

    #[test]
    fn test_ensure_dir_rejects_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("data");
        fs::write(&target, "not a dir").unwrap();

        let err = collaborators(false).ensure_dir(&target).unwrap_err();
        assert!(matches!(err, CollaboratorError::Failed(ref d) if d.contains("not a directory")));
    }

    #[test]
    fn test_ensure_dir_dry_run_creates_nothing() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("data");

        collaborators(true).ensure_dir(&target).unwrap();
        assert!(!target.exists());
    }

    #[test]
    fn test_io_permission_error_is_permission_denied() {
        let err = io_failure(
            Path::new("/srv/data"),
            std::io::Error::from(ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, CollaboratorError::PermissionDenied(ref d) if d.starts_with("/srv/data")));
        assert_eq!(
            err.into_refresh_error(crate::types::StepKind::EnsureDir).exit_code(),
            2
        );

        let err = io_failure(Path::new("/srv/data"), std::io::Error::other("disk full"));
        assert!(matches!(err, CollaboratorError::Failed(ref d) if d.contains("disk full")));
    }

    #[test]
    fn test_missing_runtime_is_step_failure() {
        let err = collaborators(false).pull_image("img:latest").unwrap_err();
        assert!(matches!(err, CollaboratorError::Failed(ref d) if d.contains("stackrefresh-missing-runtime")));
    }

    #[test]
    fn test_dry_run_skips_destructive_commands() {
        let mut c = collaborators(true);
        assert!(c.stop_stack(Path::new("stack.yml")).is_ok());
        assert!(c.start_stack(Path::new("stack.yml")).is_ok());
        assert!(c.chown(Path::new("data"), &"u:g".parse().unwrap()).is_ok());
        // Pull still runs, and the runtime does not exist
        assert!(c.pull_image("img:latest").is_err());
    }

    #[test]
    fn test_permission_markers() {
        assert!(is_permission_failure(&failed_output(
            "chown: changing ownership of 'data': Operation not permitted"
        )));
        assert!(is_permission_failure(&failed_output(
            "sudo: a password is required"
        )));
        assert!(!is_permission_failure(&failed_output(
            "chown: invalid user: 'nobody-here'"
        )));
    }

    #[test]
    fn test_from_config_copies_commands() {
        let mut config = RefreshConfig::default();
        config.runtime = "podman".to_string();
        config.step_timeout_secs = Some(5);

        let c = SystemCollaborators::from_config(&config, true);
        assert!(c.is_dry_run());
        assert_eq!(c.runtime, "podman");
        assert_eq!(c.step_timeout, Some(Duration::from_secs(5)));
        if !nix::unistd::geteuid().is_root() {
            assert_eq!(c.escalate(), ["sudo", "-n"]);
        } else {
            assert!(c.escalate().is_empty());
        }
    }
}
