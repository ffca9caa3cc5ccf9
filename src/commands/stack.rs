//! Type-safe arguments for compose stack lifecycle commands.
//!
//! This module provides typed argument structs for the orchestration tool:
//! - `ComposeDownArgs` for `<compose> -f <file> down`
//! - `ComposeUpArgs` for `<compose> -f <file> up -d`
//!
//! The compose prefix is configurable so both the `docker compose` plugin and
//! the standalone `docker-compose` / `podman-compose` binaries work.

use std::path::{Path, PathBuf};

use crate::command_args::{CommandArgs, split_prefix};

/// Fallback program when the configured compose prefix is empty.
const DEFAULT_COMPOSE_PROGRAM: &str = "docker-compose";

/// Shared argv prefix: compose tool followed by `-f <file>`.
fn compose_args(compose: &[String], file: &Path) -> Vec<String> {
    let mut args = split_prefix(compose)
        .map(|(_, rest)| rest.to_vec())
        .unwrap_or_default();
    args.push("-f".to_string());
    args.push(file.display().to_string());
    args
}

fn compose_program(compose: &[String]) -> &str {
    split_prefix(compose)
        .map(|(program, _)| program)
        .unwrap_or(DEFAULT_COMPOSE_PROGRAM)
}

// ============================================================================
// Compose Down
// ============================================================================

/// Arguments for stopping a stack.
///
/// `down` exits 0 when nothing is running, which makes the stop step
/// idempotent.
#[derive(Debug, Clone)]
pub struct ComposeDownArgs {
    /// Compose command prefix, e.g. `["docker", "compose"]`.
    pub compose: Vec<String>,
    /// Stack descriptor file.
    pub file: PathBuf,
}

impl CommandArgs for ComposeDownArgs {
    fn program(&self) -> &str {
        compose_program(&self.compose)
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = compose_args(&self.compose, &self.file);
        args.push("down".to_string());
        args
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

// ============================================================================
// Compose Up
// ============================================================================

/// Arguments for starting a stack detached.
#[derive(Debug, Clone)]
pub struct ComposeUpArgs {
    /// Compose command prefix, e.g. `["docker", "compose"]`.
    pub compose: Vec<String>,
    /// Stack descriptor file.
    pub file: PathBuf,
}

impl CommandArgs for ComposeUpArgs {
    fn program(&self) -> &str {
        compose_program(&self.compose)
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = compose_args(&self.compose, &self.file);
        args.push("up".to_string());
        args.push("-d".to_string());
        args
    }

    fn is_destructive(&self) -> bool {
        true
    }
}
