//! Type-safe collaborator execution
//!
//! This module provides the ONLY sanctioned way to spawn an external
//! collaborator. All spawning goes through `run_command_safe` so that every
//! child:
//!
//! - runs in its own process group with a parent-death signal
//! - is registered with `ChildRegistry` while it runs
//! - receives its argv from a `CommandArgs` struct, never from ad-hoc strings
//! - can be bounded by a timeout that kills the whole group

use crate::command_args::CommandArgs;
use crate::process_guard::{ChildRegistry, CommandProcessGroup, signal_group_or_pid};
use anyhow::{Context, Result};
use nix::sys::signal::Signal;
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::PoisonError;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Poll interval while waiting on a child with a deadline
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Execute a collaborator command with type-safe arguments.
///
/// Blocks until the child exits, or until `timeout` elapses, in which case
/// the child's process group is killed and the output is marked as timed out.
///
/// # Returns
///
/// - `Ok(output)` - the command ran; check `output.success`
/// - `Err` - the program could not be spawned or waited on
pub fn run_command_safe<T: CommandArgs + ?Sized>(
    args: &T,
    timeout: Option<Duration>,
) -> Result<CommandOutput> {
    let program = args.program();
    let cli_args = args.to_cli_args();

    info!(command = %args.display_command(), "running collaborator");

    let mut cmd = Command::new(program);
    cmd.args(&cli_args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .in_new_process_group();

    let mut child = cmd
        .spawn()
        .with_context(|| format!("Failed to spawn {}", program))?;
    let pid = child.id();
    with_registry(|r| r.register(pid));

    let stdout_reader = drain(child.stdout.take());
    let stderr_reader = drain(child.stderr.take());

    let waited = match timeout {
        None => child.wait().map(|status| (status, false)),
        Some(limit) => wait_with_deadline(&mut child, pid, limit),
    };

    with_registry(|r| r.unregister(pid));
    let (status, timed_out) = waited.with_context(|| format!("Failed waiting for {}", program))?;

    let stdout = join_output(stdout_reader);
    let stderr = join_output(stderr_reader);
    let exit_code = status.code();
    let success = status.success() && !timed_out;

    if success {
        info!(program, "collaborator succeeded");
    } else if timed_out {
        warn!(program, ?timeout, "collaborator timed out");
    } else {
        warn!(program, code = exit_code.unwrap_or(-1), "collaborator failed");
    }

    Ok(CommandOutput {
        stdout,
        stderr,
        exit_code,
        success,
        timed_out_after: if timed_out { timeout } else { None },
    })
}

fn with_registry(f: impl FnOnce(&mut ChildRegistry)) {
    let registry = ChildRegistry::global();
    let mut guard = registry.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard);
}

fn wait_with_deadline(
    child: &mut std::process::Child,
    pid: u32,
    limit: Duration,
) -> std::io::Result<(std::process::ExitStatus, bool)> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }
        if Instant::now() >= deadline {
            signal_group_or_pid(pid, Signal::SIGKILL);
            return child.wait().map(|status| (status, true));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Read a pipe to completion on a helper thread so a chatty child cannot
/// block on a full pipe while we wait on it.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            if let Err(e) = pipe.read_to_end(&mut buf) {
                debug!(error = %e, read = buf.len(), "collaborator output truncated");
            }
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join_output(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// Output from a collaborator execution.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Standard output from the command.
    pub stdout: String,
    /// Standard error from the command.
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    /// Whether the command exited with status 0 within its deadline.
    pub success: bool,
    /// Set when the command was killed for exceeding its timeout.
    pub timed_out_after: Option<Duration>,
}

impl CommandOutput {
    /// The collaborator's own explanation of a failure.
    ///
    /// Trimmed stderr, else trimmed stdout, else the exit status.
    pub fn diagnostic(&self) -> String {
        if let Some(limit) = self.timed_out_after {
            return format!("timed out after {}s", limit.as_secs());
        }
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}
