//! Type-safe command argument contracts.
//!
//! Each external collaborator invocation is described by a struct that
//! implements `CommandArgs`. The struct is the single source of truth for the
//! argv the tool receives, so a flag mismatch (e.g. `-f` vs `--file`) shows up
//! in one place and is covered by that struct's tests.

/// Trait for typed external command arguments.
///
/// # Contract
///
/// - `program()`: the executable to spawn (resolved through `PATH`).
/// - `to_cli_args()`: arguments exactly as the tool expects them.
/// - `is_destructive()`: whether the command mutates local or container state.
pub trait CommandArgs {
    /// Executable name or path.
    fn program(&self) -> &str;

    /// Convert struct fields to CLI arguments.
    fn to_cli_args(&self) -> Vec<String>;

    /// Whether running this command changes state.
    fn is_destructive(&self) -> bool;

    /// Full command line for logs and dry-run output.
    fn display_command(&self) -> String {
        std::iter::once(self.program().to_string())
            .chain(self.to_cli_args())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Split a configured command prefix into program and leading arguments.
///
/// `["docker", "compose"]` yields `("docker", ["compose"])`. Returns `None`
/// for an empty prefix.
pub fn split_prefix(prefix: &[String]) -> Option<(&str, &[String])> {
    prefix.split_first().map(|(program, rest)| (program.as_str(), rest))
}
