//! Type-safe arguments for the container runtime's `pull` command.

use crate::command_args::CommandArgs;

/// Arguments for `<runtime> pull <image>`.
///
/// | Rust Field | Position |
/// |------------|----------|
/// | `runtime`  | program (`docker`, `podman`, ...) |
/// | `image`    | sole positional after `pull` |
#[derive(Debug, Clone)]
pub struct PullImageArgs {
    /// Container runtime binary.
    pub runtime: String,
    /// Image reference, e.g. `registry.example.com/app:latest`.
    pub image: String,
}

impl CommandArgs for PullImageArgs {
    fn program(&self) -> &str {
        &self.runtime
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["pull".to_string(), self.image.clone()]
    }

    /// Pulling only updates the local image cache.
    fn is_destructive(&self) -> bool {
        false
    }
}
