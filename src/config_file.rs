//! Configuration file handling for refresh runs.
//!
//! All parameters the refresh needs (image, data directory, owner, stack
//! descriptor, collaborator commands) live in one explicit `RefreshConfig`
//! instead of ambient working directory or privilege state. Values are
//! resolved as built-in defaults, then an optional JSON file, then CLI flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::OwnerSpec;

/// Image refreshed when nothing else is configured
pub const DEFAULT_IMAGE: &str = "nginx:latest";

/// Data directory used when nothing else is configured
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Stack descriptor used when nothing else is configured
pub const DEFAULT_COMPOSE_FILE: &str = "./docker-compose.yml";

/// Configuration for one refresh invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RefreshConfig {
    /// Image reference to pull
    pub image: String,
    /// Directory the stack mounts for its data
    pub data_dir: PathBuf,
    /// Owner applied recursively to `data_dir`
    pub owner: OwnerSpec,
    /// Compose stack descriptor
    pub compose_file: PathBuf,
    /// Container runtime binary
    pub runtime: String,
    /// Compose command prefix, e.g. `["docker", "compose"]`
    pub compose_command: Vec<String>,
    /// Privilege escalation prefix for chown; empty runs chown directly
    pub escalate: Vec<String>,
    /// Per-step timeout in seconds; absent means wait indefinitely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_timeout_secs: Option<u64>,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            owner: OwnerSpec::current(),
            compose_file: PathBuf::from(DEFAULT_COMPOSE_FILE),
            runtime: "docker".to_string(),
            compose_command: vec!["docker".to_string(), "compose".to_string()],
            escalate: vec!["sudo".to_string(), "-n".to_string()],
            step_timeout_secs: None,
        }
    }
}

/// Values given on the command line; each one overrides the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub image: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub owner: Option<OwnerSpec>,
    pub compose_file: Option<PathBuf>,
    pub step_timeout_secs: Option<u64>,
}

impl RefreshConfig {
    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    ///
    /// Missing fields take their defaults; unknown fields are rejected.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Resolve defaults, optional file and CLI overrides into one config
    pub fn resolve(file: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI overrides in place
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(image) = overrides.image {
            self.image = image;
        }
        if let Some(data_dir) = overrides.data_dir {
            self.data_dir = data_dir;
        }
        if let Some(owner) = overrides.owner {
            self.owner = owner;
        }
        if let Some(compose_file) = overrides.compose_file {
            self.compose_file = compose_file;
        }
        if overrides.step_timeout_secs.is_some() {
            self.step_timeout_secs = overrides.step_timeout_secs;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.image.trim().is_empty() {
            anyhow::bail!("Image reference must be specified");
        }
        if self.image.chars().any(char::is_whitespace) {
            anyhow::bail!("Image reference must not contain whitespace");
        }
        if self.data_dir.as_os_str().is_empty() {
            anyhow::bail!("Data directory must be specified");
        }
        if self.compose_file.as_os_str().is_empty() {
            anyhow::bail!("Compose file must be specified");
        }
        if self.runtime.trim().is_empty() {
            anyhow::bail!("Container runtime must be specified");
        }
        if self.compose_command.is_empty() || self.compose_command.iter().any(|p| p.is_empty()) {
            anyhow::bail!("Compose command must be a non-empty list of non-empty words");
        }
        if self.escalate.iter().any(|p| p.is_empty()) {
            anyhow::bail!("Escalation command must not contain empty words");
        }
        if self.step_timeout_secs == Some(0) {
            anyhow::bail!("Step timeout must be at least 1 second");
        }
        Ok(())
    }

    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_secs.map(Duration::from_secs)
    }
}
