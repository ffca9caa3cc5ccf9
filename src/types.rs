//! Core value types for refresh plans
//!
//! `StepKind` names each step of a refresh; `OwnerSpec` is a validated
//! `user[:group]` ownership argument for the chown step.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString};

/// The kind of a refresh step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepKind {
    /// Fetch the latest layers for an image reference
    PullImage,
    /// Create the data directory (and parents) if absent
    EnsureDir,
    /// Recursively set ownership of the data directory
    Chown,
    /// Tear down the running compose stack
    StopStack,
    /// Start the compose stack detached
    StartStack,
}

impl StepKind {
    /// Process exit code reported when a step of this kind fails
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::PullImage => 1,
            Self::EnsureDir | Self::Chown => 2,
            Self::StopStack => 3,
            Self::StartStack => 4,
        }
    }

    /// Returns true if this step changes local or container state
    pub const fn is_mutating(self) -> bool {
        !matches!(self, Self::PullImage)
    }
}

/// Error returned when an owner string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid owner '{input}': {reason}")]
pub struct OwnerSpecError {
    pub input: String,
    pub reason: &'static str,
}

/// Ownership argument in `user` or `user:group` form
///
/// Users and groups may be names or numeric ids; they are passed to `chown`
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerSpec {
    user: String,
    group: Option<String>,
}

impl OwnerSpec {
    /// Build an owner from explicit parts
    pub fn new(user: impl Into<String>, group: Option<String>) -> Result<Self, OwnerSpecError> {
        let user = user.into();
        let rendered = match &group {
            Some(g) => format!("{}:{}", user, g),
            None => user.clone(),
        };
        rendered.parse()
    }

    /// Owner matching the uid and gid of the current process
    pub fn current() -> Self {
        Self {
            user: nix::unistd::getuid().to_string(),
            group: Some(nix::unistd::getgid().to_string()),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }
}

impl FromStr for OwnerSpec {
    type Err = OwnerSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason| OwnerSpecError {
            input: s.to_string(),
            reason,
        };

        if s.is_empty() {
            return Err(fail("owner must not be empty"));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(fail("owner must not contain whitespace"));
        }

        let mut parts = s.split(':');
        let user = parts.next().unwrap_or_default();
        let group = parts.next();
        if parts.next().is_some() {
            return Err(fail("expected user or user:group"));
        }
        if user.is_empty() {
            return Err(fail("user part is empty"));
        }
        if group == Some("") {
            return Err(fail("group part is empty"));
        }

        Ok(Self {
            user: user.to_string(),
            group: group.map(str::to_string),
        })
    }
}

impl TryFrom<String> for OwnerSpec {
    type Error = OwnerSpecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OwnerSpec> for String {
    fn from(owner: OwnerSpec) -> Self {
        owner.to_string()
    }
}

impl fmt::Display for OwnerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}:{}", self.user, group),
            None => write!(f, "{}", self.user),
        }
    }
}
