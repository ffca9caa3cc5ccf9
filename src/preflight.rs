//! Pre-flight checks for collaborator availability
//!
//! Every external tool a refresh needs must be on `PATH` before the first
//! step runs. A missing tool is a precondition failure reported up front,
//! never a half-finished refresh.

use crate::config_file::RefreshConfig;
use crate::error::{RefreshError, Result};
use std::env;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Result of environment verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightReport {
    pub required: Vec<String>,
    pub missing: Vec<String>,
}

impl PreflightReport {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Tools a refresh with `config` will spawn
///
/// `escalate` is the prefix actually in use (empty when running as root).
pub fn required_tools(config: &RefreshConfig, escalate: &[String]) -> Vec<String> {
    let mut tools: Vec<String> = Vec::new();
    let candidates = [
        Some(config.runtime.as_str()),
        config.compose_command.first().map(String::as_str),
        escalate.first().map(String::as_str),
        Some("chown"),
    ];
    for tool in candidates.into_iter().flatten() {
        if !tools.iter().any(|t| t == tool) {
            tools.push(tool.to_string());
        }
    }
    tools
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Check if a binary is available, either as a path or on `PATH`
pub fn binary_exists(name: &str) -> bool {
    if name.contains('/') {
        return is_executable(Path::new(name));
    }
    find_in_path(name, env::var_os("PATH").as_deref()).is_some()
}

/// Search a `PATH`-style list for an executable named `name`
pub fn find_in_path(name: &str, path_var: Option<&std::ffi::OsStr>) -> Option<PathBuf> {
    env::split_paths(path_var?)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

/// Check every required tool
pub fn verify_environment(config: &RefreshConfig, escalate: &[String]) -> PreflightReport {
    let required = required_tools(config, escalate);
    let missing = required
        .iter()
        .filter(|tool| !binary_exists(tool))
        .cloned()
        .collect();

    PreflightReport { required, missing }
}

/// Verify the environment and fail with `CollaboratorUnavailable` if any
/// required tool is missing
pub fn ensure_ready(config: &RefreshConfig, escalate: &[String]) -> Result<PreflightReport> {
    tracing::debug!("running pre-flight checks");
    let report = verify_environment(config, escalate);

    if !report.is_ok() {
        return Err(RefreshError::CollaboratorUnavailable {
            tools: report.missing,
        });
    }

    tracing::info!(tools = ?report.required, "pre-flight checks passed");
    Ok(report)
}
