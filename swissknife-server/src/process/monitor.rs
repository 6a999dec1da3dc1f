//! Per-process exit monitors.
//!
//! Each started child is owned by one tokio task that waits for it to exit
//! and publishes the return code. Signals are delivered through the same
//! task, so nothing else ever reaps the pid.

use tokio::process::Child;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, warn};

use super::registry::returncode;

/// Signal requests accepted by a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Terminate,
    Kill,
}

/// Spawn the monitor for `child`.
///
/// `exit` goes from `None` to `Some(code)` exactly once, when the child has
/// been reaped.
pub fn spawn_monitor(
    pid: u32,
    mut child: Child,
    mut signals: mpsc::UnboundedReceiver<Signal>,
    exit: watch::Sender<Option<i32>>,
) {
    tokio::spawn(async move {
        let code = loop {
            tokio::select! {
                result = child.wait() => {
                    match result {
                        Ok(status) => break returncode(status),
                        Err(e) => {
                            error!(pid, error = %e, "Failed to wait on child");
                            break -1;
                        }
                    }
                }
                Some(signal) = signals.recv() => deliver(pid, &mut child, signal),
            }
        };

        debug!(pid, returncode = code, "Process exited");
        let _ = exit.send(Some(code));
    });
}

fn deliver(pid: u32, child: &mut Child, signal: Signal) {
    match signal {
        Signal::Terminate => {
            if let Some(id) = child.id() {
                // SAFETY: only this task reaps the child, so the pid still
                // refers to it
                let rc = unsafe { libc::kill(id as libc::pid_t, libc::SIGTERM) };
                if rc == -1 {
                    warn!(pid, error = %std::io::Error::last_os_error(), "SIGTERM failed");
                }
            }
        }
        Signal::Kill => {
            if let Err(e) = child.start_kill() {
                warn!(pid, error = %e, "SIGKILL failed");
            }
        }
    }
}
