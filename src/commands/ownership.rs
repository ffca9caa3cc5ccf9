//! Type-safe arguments for recursive ownership changes.
//!
//! `chown` usually needs elevated privilege, so the command can be wrapped by
//! an escalation prefix such as `sudo -n`. An empty prefix runs `chown`
//! directly (already root, or the data directory is owned by the caller).

use std::path::PathBuf;

use crate::command_args::{CommandArgs, split_prefix};
use crate::types::OwnerSpec;

/// Arguments for `[<escalate>...] chown -R <owner> <path>`.
#[derive(Debug, Clone)]
pub struct ChownArgs {
    /// Privilege escalation prefix, e.g. `["sudo", "-n"]`. May be empty.
    pub escalate: Vec<String>,
    /// Target owner.
    pub owner: OwnerSpec,
    /// Directory whose ownership is changed recursively.
    pub path: PathBuf,
}

impl ChownArgs {
    /// Whether the command runs through an escalation prefix.
    pub fn is_escalated(&self) -> bool {
        !self.escalate.is_empty()
    }
}

impl CommandArgs for ChownArgs {
    fn program(&self) -> &str {
        split_prefix(&self.escalate)
            .map(|(program, _)| program)
            .unwrap_or("chown")
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args: Vec<String> = match split_prefix(&self.escalate) {
            Some((_, rest)) => {
                let mut v = rest.to_vec();
                v.push("chown".to_string());
                v
            }
            None => Vec::new(),
        };
        args.push("-R".to_string());
        args.push(self.owner.to_string());
        args.push(self.path.display().to_string());
        args
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> OwnerSpec {
        "u:g".parse().unwrap()
    }

    #[test]
    fn test_chown_with_sudo() {
        let args = ChownArgs {
            escalate: vec!["sudo".to_string(), "-n".to_string()],
            owner: owner(),
            path: PathBuf::from("data/"),
        };
        assert_eq!(args.program(), "sudo");
        assert_eq!(args.to_cli_args(), vec!["-n", "chown", "-R", "u:g", "data/"]);
        assert!(args.is_escalated());
        assert!(args.is_destructive());
    }

    #[test]
    fn test_chown_without_escalation() {
        let args = ChownArgs {
            escalate: vec![],
            owner: owner(),
            path: PathBuf::from("/srv/app/data"),
        };
        assert_eq!(args.program(), "chown");
        assert_eq!(args.to_cli_args(), vec!["-R", "u:g", "/srv/app/data"]);
        assert_eq!(args.display_command(), "chown -R u:g /srv/app/data");
        assert!(!args.is_escalated());
    }

    #[test]
    fn test_chown_single_word_prefix() {
        let args = ChownArgs {
            escalate: vec!["doas".to_string()],
            owner: "1000".parse().unwrap(),
            path: PathBuf::from("data"),
        };
        assert_eq!(args.display_command(), "doas chown -R 1000 data");
    }
}
