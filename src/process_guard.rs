//! Lifecycle management for collaborator processes
//!
//! A refresh spawns `docker`, `compose` and `chown` children. If the refresher
//! is interrupted (Ctrl+C, SIGTERM from a supervisor, crash) those children
//! must not keep running half a stack restart on their own.
//!
//! - Every child gets its own process group and a parent-death signal
//! - Live child PIDs are tracked in a global `ChildRegistry`
//! - On SIGINT/SIGTERM/SIGHUP or `ProcessGuard` drop, each group gets SIGTERM,
//!   then SIGKILL once the grace period runs out
//! - The first signal is recorded before any child is touched, so a step that
//!   dies from the cleanup is reported as an interruption, not a failure

use nix::libc;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

static CHILD_REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// First signal received, 0 while uninterrupted
static INTERRUPTED_BY: AtomicI32 = AtomicI32::new(0);

/// Grace period used when a signal interrupts the refresh
const SIGNAL_GRACE: Duration = Duration::from_secs(3);

/// Grace period used when the guard is dropped at normal exit
const DROP_GRACE: Duration = Duration::from_secs(5);

/// Registry of spawned collaborator processes
#[derive(Debug, Default)]
pub struct ChildRegistry {
    pids: HashSet<u32>,
    cleanup_initiated: bool,
}

impl ChildRegistry {
    /// Get or create the global child registry
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        CHILD_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    pub fn register(&mut self, pid: u32) {
        self.pids.insert(pid);
        tracing::debug!(pid, "registered child process");
    }

    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        tracing::debug!(pid, "unregistered child process");
    }

    pub fn count(&self) -> usize {
        self.pids.len()
    }

    /// Terminate every tracked process group
    ///
    /// Sends SIGTERM, waits up to `grace_period`, then SIGKILLs survivors.
    /// Only the first call does anything.
    pub fn terminate_all(&mut self, grace_period: Duration) {
        if self.cleanup_initiated {
            tracing::debug!("cleanup already initiated, skipping");
            return;
        }
        self.cleanup_initiated = true;

        if self.pids.is_empty() {
            return;
        }

        let pids: Vec<u32> = self.pids.drain().collect();
        tracing::info!(count = pids.len(), "terminating child processes");

        for &pid in &pids {
            signal_group_or_pid(pid, Signal::SIGTERM);
        }

        let start = Instant::now();
        while start.elapsed() < grace_period {
            if pids.iter().all(|&pid| !is_process_alive(pid)) {
                tracing::info!("all child processes exited");
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        for &pid in pids.iter().filter(|&&pid| is_process_alive(pid)) {
            tracing::warn!(pid, "child ignored SIGTERM, sending SIGKILL");
            signal_group_or_pid(pid, Signal::SIGKILL);
        }
    }
}

/// Signal a child's process group, falling back to the PID itself
pub fn signal_group_or_pid(pid: u32, sig: Signal) {
    if let Err(e) = send_signal_to_group(pid, sig) {
        tracing::debug!(pid, error = %e, "group signal failed, signalling pid");
        if let Err(e) = send_signal(pid, sig) {
            tracing::warn!(pid, signal = ?sig, error = %e, "failed to signal child");
        }
    }
}

fn send_signal(pid: u32, sig: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(pid as i32), sig)
}

/// Negative PID addresses the whole group, so grandchildren (the compose
/// plugin under `docker`, `chown` under `sudo`) are reached too.
fn send_signal_to_group(pgid: u32, sig: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(-(pgid as i32)), sig)
}

/// Zombies and dead processes count as not alive
fn is_process_alive(pid: u32) -> bool {
    if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }

    // Field 3 of /proc/<pid>/stat is the state letter
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat
            .split_whitespace()
            .nth(2)
            .is_none_or(|state| !matches!(state, "Z" | "X")),
        Err(_) => true,
    }
}

/// RAII guard that terminates all registered children on drop
pub struct ProcessGuard {
    registry: Arc<Mutex<ChildRegistry>>,
}

impl ProcessGuard {
    pub fn new() -> Self {
        Self {
            registry: ChildRegistry::global(),
        }
    }

    pub fn child_count(&self) -> usize {
        self.registry.lock().map(|r| r.count()).unwrap_or(0)
    }
}

impl Default for ProcessGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        if let Ok(mut registry) = self.registry.lock() {
            registry.terminate_all(DROP_GRACE);
        }
    }
}

/// Record `sig` as the reason the run is ending; only the first one sticks
pub fn record_interrupt(sig: i32) {
    let _ = INTERRUPTED_BY.compare_exchange(0, sig, Ordering::SeqCst, Ordering::SeqCst);
}

/// The signal that interrupted this process, if any
pub fn interrupted_by() -> Option<i32> {
    match INTERRUPTED_BY.load(Ordering::SeqCst) {
        0 => None,
        sig => Some(sig),
    }
}

/// Install SIGINT, SIGTERM and SIGHUP handling
///
/// On the first signal all children are terminated and the process exits
/// with `128 + signo`. The main thread may see a child die before that exit
/// happens; it should consult `interrupted_by` before reporting a failure.
/// Call once at startup.
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            let name = match sig {
                SIGINT => "SIGINT",
                SIGTERM => "SIGTERM",
                SIGHUP => "SIGHUP",
                _ => "UNKNOWN",
            };
            record_interrupt(sig);
            tracing::warn!(signal = name, "interrupted, stopping collaborators");

            if let Ok(mut registry) = ChildRegistry::global().lock() {
                registry.terminate_all(SIGNAL_GRACE);
            }

            std::process::exit(128 + sig);
        }
    });

    Ok(())
}

/// Extension trait for `std::process::Command` to isolate children
pub trait CommandProcessGroup {
    /// Run the command as leader of a new process group that receives
    /// SIGTERM when this process dies
    ///
    /// The kernel clears the parent-death signal when the child execs a
    /// set-uid binary, so an escalated `sudo chown` outlives a crashed
    /// refresher. Signal-driven and drop-driven cleanup still reach it
    /// through the process group.
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;

        // SAFETY: the hook only calls async-signal-safe setpgid and prctl.
        unsafe {
            self.pre_exec(|| {
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(std::io::Error::other)?;

                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }

                Ok(())
            });
        }
        self
    }
}
