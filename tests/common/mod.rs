//! Shared fixtures for integration tests
//!
//! - `FakeCollaborators`: records every call and fails on demand
//! - `FakeTools`: shell scripts standing in for docker, compose and sudo,
//!   logging their argv to a file so tests can assert what ran

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use stackrefresh::{CollaboratorError, CollaboratorResult, Collaborators, OwnerSpec, StepKind};
use tempfile::TempDir;

// =============================================================================
// Recording fake
// =============================================================================

#[derive(Debug, Default)]
pub struct FakeCollaborators {
    pub calls: Vec<StepKind>,
    pub failures: HashMap<StepKind, CollaboratorError>,
    /// Directories reported as already present by `ensure_dir`
    pub existing_dirs: Vec<PathBuf>,
    /// Directories `ensure_dir` had to create
    pub created_dirs: Vec<PathBuf>,
}

impl FakeCollaborators {
    pub fn failing(kind: StepKind, err: CollaboratorError) -> Self {
        let mut fake = Self::default();
        fake.failures.insert(kind, err);
        fake
    }

    pub fn count(&self, kind: StepKind) -> usize {
        self.calls.iter().filter(|k| **k == kind).count()
    }

    fn record(&mut self, kind: StepKind) -> CollaboratorResult {
        self.calls.push(kind);
        match self.failures.get(&kind) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl Collaborators for FakeCollaborators {
    fn pull_image(&mut self, _image: &str) -> CollaboratorResult {
        self.record(StepKind::PullImage)
    }

    fn ensure_dir(&mut self, path: &Path) -> CollaboratorResult {
        self.record(StepKind::EnsureDir)?;
        if !self.existing_dirs.iter().any(|d| d == path) {
            self.created_dirs.push(path.to_path_buf());
            self.existing_dirs.push(path.to_path_buf());
        }
        Ok(())
    }

    fn chown(&mut self, _path: &Path, _owner: &OwnerSpec) -> CollaboratorResult {
        self.record(StepKind::Chown)
    }

    fn stop_stack(&mut self, _descriptor: &Path) -> CollaboratorResult {
        self.record(StepKind::StopStack)
    }

    fn start_stack(&mut self, _descriptor: &Path) -> CollaboratorResult {
        self.record(StepKind::StartStack)
    }
}

// =============================================================================
// Fake tool scripts
// =============================================================================

pub struct FakeTools {
    pub dir: TempDir,
}

impl FakeTools {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// File every fake tool appends its argv to
    pub fn log_path(&self) -> PathBuf {
        self.dir.path().join("calls.log")
    }

    /// Install an executable named `name` that logs its argv and then runs
    /// `body` (shell)
    pub fn install(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        let script = format!(
            "#!/bin/sh\necho \"{name} $*\" >> \"{log}\"\n{body}\n",
            name = name,
            log = self.log_path().display(),
            body = body,
        );
        fs::write(&path, script).expect("write fake tool");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod fake tool");
        path
    }

    /// Logged invocations, one per line
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.log_path())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}
