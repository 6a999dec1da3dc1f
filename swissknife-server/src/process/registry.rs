//! Process table keyed by OS pid

use std::collections::HashMap;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::process::Child;
use tokio::sync::{mpsc, watch};

use super::capture::OutputCapture;
use super::monitor::{spawn_monitor, Signal};
use super::{OutputStream, ProcessStatus};

/// One process started by this server
#[derive(Debug)]
pub struct ProcessEntry {
    pub pid: u32,
    pub cmd: String,
    pub cwd: Option<PathBuf>,
    pub start_time: f64,
    /// `None` when started without output capture
    pub capture: Option<OutputCapture>,
    signals: mpsc::UnboundedSender<Signal>,
    exit: watch::Receiver<Option<i32>>,
}

impl ProcessEntry {
    /// Hand `child` to a monitor task and keep the handles to it
    pub fn monitor(
        child: Child,
        cmd: String,
        cwd: Option<PathBuf>,
        start_time: f64,
        capture: Option<OutputCapture>,
    ) -> io::Result<Self> {
        let pid = child
            .id()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "child exited before registration"))?;

        let (signals, signal_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit) = watch::channel(None);
        spawn_monitor(pid, child, signal_rx, exit_tx);

        Ok(Self {
            pid,
            cmd,
            cwd,
            start_time,
            capture,
            signals,
            exit,
        })
    }

    /// Non-blocking exit check; `None` while still running
    pub fn poll(&self) -> Option<i32> {
        *self.exit.borrow()
    }

    /// Wait up to `timeout` for the child to exit
    pub async fn wait_exit(&self, timeout: Duration) -> Option<i32> {
        let mut exit = self.exit.clone();
        let code = tokio::time::timeout(timeout, exit.wait_for(Option::is_some))
            .await
            .ok()
            .and_then(|waited| waited.ok().and_then(|code| *code));
        code.or_else(|| self.poll())
    }

    /// Ask the monitor for SIGTERM. No-op once the child has been reaped.
    pub fn terminate(&self) {
        let _ = self.signals.send(Signal::Terminate);
    }

    /// Ask the monitor for SIGKILL. No-op once the child has been reaped.
    pub fn force_kill(&self) {
        let _ = self.signals.send(Signal::Kill);
    }

    /// Close capture handles if any
    pub fn close_capture(&self) {
        if let Some(capture) = &self.capture {
            capture.close();
        }
    }

    fn capture_path(&self, stream: OutputStream) -> Option<String> {
        self.capture
            .as_ref()
            .map(|c| c.path(stream).to_string_lossy().into_owned())
    }

    /// Snapshot for the wire. Closes capture handles once the child is gone.
    pub fn status(&self) -> ProcessStatus {
        let returncode = self.poll();
        let running = returncode.is_none();
        if !running {
            self.close_capture();
        }

        ProcessStatus {
            pid: self.pid,
            running,
            returncode,
            cmd: self.cmd.clone(),
            cwd: self.cwd.as_ref().map(|p| p.to_string_lossy().into_owned()),
            start_time: self.start_time,
            stdout_path: self.capture_path(OutputStream::Stdout),
            stderr_path: self.capture_path(OutputStream::Stderr),
        }
    }
}

/// Exit code, or the negated signal number for signal deaths
pub fn returncode(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|sig| -sig))
        .unwrap_or(-1)
}

/// Map from pid to entry.
///
/// The lock only guards map access; callers clone the `Arc` out and do any
/// waiting or file I/O after it is released.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    entries: Mutex<HashMap<u32, Arc<ProcessEntry>>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entry: ProcessEntry) -> Arc<ProcessEntry> {
        let entry = Arc::new(entry);
        self.entries.lock().insert(entry.pid, Arc::clone(&entry));
        entry
    }

    pub fn get(&self, pid: u32) -> Option<Arc<ProcessEntry>> {
        self.entries.lock().get(&pid).cloned()
    }

    /// Known pids in ascending order
    pub fn pids(&self) -> Vec<u32> {
        let mut pids: Vec<u32> = self.entries.lock().keys().copied().collect();
        pids.sort_unstable();
        pids
    }
}
