//! start / status / kill / read / list over the registry

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use chrono::Utc;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::capture::{decode_lossy, read_tail, OutputCapture};
use super::registry::{ProcessEntry, ProcessRegistry};
use super::{
    KillOutcome, KillResponse, OutputStream, ProcessError, ProcessList, ProcessStatus,
    ReadResponse, StartRequest, StartResponse, CAPTURE_SUBDIR,
};
use crate::guard::resolve_within;

const SHELL: &str = "/bin/sh";

/// Owns the process registry and applies the server's limits to it
#[derive(Debug)]
pub struct ProcessController {
    registry: ProcessRegistry,
    base: PathBuf,
    capture_dir: PathBuf,
    kill_timeout: Duration,
    max_read_bytes: usize,
}

impl ProcessController {
    pub fn new(base: PathBuf, kill_timeout: Duration, max_read_bytes: usize) -> Self {
        let capture_dir = base.join(CAPTURE_SUBDIR);
        Self {
            registry: ProcessRegistry::new(),
            base,
            capture_dir,
            kill_timeout,
            max_read_bytes,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn capture_dir(&self) -> &Path {
        &self.capture_dir
    }

    /// Spawn `cmd` through the shell and register it
    pub fn start(&self, req: StartRequest) -> Result<StartResponse, ProcessError> {
        if req.cmd.trim().is_empty() {
            return Err(ProcessError::EmptyCommand);
        }

        let cwd = match req.cwd.as_deref() {
            Some(cwd) => Some(resolve_within(&self.base, Path::new(cwd))?),
            None => None,
        };

        let capture = if req.capture_output {
            Some(OutputCapture::create(&self.capture_dir)?)
        } else {
            None
        };

        let mut command = Command::new(SHELL);
        command.arg("-c").arg(&req.cmd).stdin(Stdio::null());
        if let Some(dir) = &cwd {
            command.current_dir(dir);
        }
        if let Some(env) = &req.env {
            command.env_clear().envs(env);
        }
        match &capture {
            Some(capture) => {
                let (stdout, stderr) = capture.stdio()?;
                command.stdout(stdout).stderr(stderr);
            }
            None => {
                command.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                if let Some(capture) = &capture {
                    capture.close();
                }
                warn!(cmd = %req.cmd, error = %e, "Failed to spawn process");
                return Err(ProcessError::Spawn(e.to_string()));
            }
        };

        let start_time = Utc::now().timestamp_micros() as f64 / 1_000_000.0;
        let entry = ProcessEntry::monitor(child, req.cmd, cwd, start_time, capture)?;
        let entry = self.registry.insert(entry);

        info!(pid = entry.pid, cmd = %entry.cmd, "Process started");

        let status = entry.status();
        Ok(StartResponse {
            pid: status.pid,
            cwd: status.cwd,
            stdout_path: status.stdout_path,
            stderr_path: status.stderr_path,
        })
    }

    pub fn status(&self, pid: u32) -> Result<ProcessStatus, ProcessError> {
        let entry = self.registry.get(pid).ok_or(ProcessError::NotFound)?;
        Ok(entry.status())
    }

    /// Graceful termination with optional escalation.
    ///
    /// Waits up to `timeout` (or the configured default) after SIGTERM. On
    /// timeout, SIGKILL is sent only when `force` is set, followed by a second
    /// wait of the same length.
    pub async fn kill(
        &self,
        pid: u32,
        force: bool,
        timeout: Option<Duration>,
    ) -> Result<KillResponse, ProcessError> {
        let entry = self.registry.get(pid).ok_or(ProcessError::NotFound)?;
        let timeout = timeout.unwrap_or(self.kill_timeout);

        if let Some(code) = entry.poll() {
            entry.close_capture();
            return Ok(KillResponse {
                status: KillOutcome::Exited,
                returncode: Some(code),
            });
        }

        entry.terminate();
        debug!(pid, "Sent SIGTERM");

        let code = match entry.wait_exit(timeout).await {
            Some(code) => code,
            None if force => {
                entry.force_kill();
                debug!(pid, "Sent SIGKILL");
                entry.wait_exit(timeout).await.ok_or(ProcessError::Timeout)?
            }
            None => {
                warn!(pid, ?timeout, "Process did not exit after SIGTERM");
                return Err(ProcessError::Timeout);
            }
        };

        entry.close_capture();
        info!(pid, returncode = code, "Process terminated");

        Ok(KillResponse {
            status: KillOutcome::Terminated,
            returncode: Some(code),
        })
    }

    /// Read captured output. `max_bytes` is clamped to the configured limit.
    pub async fn read(
        &self,
        pid: u32,
        stream: &str,
        max_bytes: usize,
        tail: bool,
    ) -> Result<ReadResponse, ProcessError> {
        let entry = self.registry.get(pid).ok_or(ProcessError::NotFound)?;
        let capture = entry.capture.as_ref().ok_or(ProcessError::NoOutput)?;
        let stream: OutputStream = stream.parse()?;
        let max_bytes = max_bytes.min(self.max_read_bytes);

        let read = match read_tail(capture.path(stream), max_bytes, tail).await {
            Ok(read) => read,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProcessError::NotFound)
            }
            Err(e) => return Err(e.into()),
        };

        let truncated = if tail {
            read.size > max_bytes as u64
        } else {
            read.data.len() >= max_bytes
        };

        Ok(ReadResponse {
            pid,
            stream,
            size: read.size,
            content: decode_lossy(read.data),
            truncated,
        })
    }

    /// Status of every known process, ordered by pid
    pub fn list(&self) -> ProcessList {
        let processes = self
            .registry
            .pids()
            .into_iter()
            .filter_map(|pid| self.status(pid).ok())
            .collect();
        ProcessList { processes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::{tempdir, TempDir};
    use tokio::time::{sleep, Instant};

    fn controller() -> (TempDir, ProcessController) {
        let dir = tempdir().unwrap();
        let base = dir.path().canonicalize().unwrap();
        let controller = ProcessController::new(base, Duration::from_secs(5), 200_000);
        (dir, controller)
    }

    async fn wait_for_exit(controller: &ProcessController, pid: u32) -> ProcessStatus {
        for _ in 0..200 {
            let status = controller.status(pid).unwrap();
            if !status.running {
                return status;
            }
            sleep(Duration::from_millis(25)).await;
        }
        panic!("process {} did not exit", pid);
    }

    #[tokio::test]
    async fn test_empty_command_rejected() {
        let (_dir, controller) = controller();
        let err = controller.start(StartRequest::new("   ")).unwrap_err();
        assert_eq!(err.code(), "empty_cmd");
    }

    #[tokio::test]
    async fn test_cwd_outside_base_rejected() {
        let (_dir, controller) = controller();
        let mut req = StartRequest::new("true");
        req.cwd = Some("/".into());
        let err = controller.start(req).unwrap_err();
        assert_eq!(err.code(), "Path is outside allowed base directory");
    }

    #[tokio::test]
    async fn test_start_status_lifecycle() {
        let (_dir, controller) = controller();
        let started = controller.start(StartRequest::new("sleep 0.3; exit 4")).unwrap();

        let stdout_path = started.stdout_path.clone().unwrap();
        assert!(stdout_path.contains(".mcp/process/"));
        assert!(Path::new(&stdout_path).exists());

        let status = controller.status(started.pid).unwrap();
        assert!(status.running);
        assert!(status.returncode.is_none());
        assert_eq!(status.cmd, "sleep 0.3; exit 4");
        assert!(status.start_time > 0.0);

        let status = wait_for_exit(&controller, started.pid).await;
        assert_eq!(status.returncode, Some(4));
    }

    #[tokio::test]
    async fn test_status_closes_capture_after_exit() {
        let (_dir, controller) = controller();
        let started = controller.start(StartRequest::new("true")).unwrap();
        wait_for_exit(&controller, started.pid).await;

        let entry = controller.registry.get(started.pid).unwrap();
        assert!(!entry.capture.as_ref().unwrap().is_open());
    }

    #[tokio::test]
    async fn test_cwd_and_env_applied() {
        let (dir, controller) = controller();
        std::fs::create_dir(dir.path().join("work")).unwrap();

        let mut req = StartRequest::new("pwd; echo \"$GREETING\"; echo \"${HOME:-unset}\"");
        req.cwd = Some("work".into());
        req.env = Some(HashMap::from([("GREETING".to_string(), "hi".to_string())]));
        let started = controller.start(req).unwrap();
        assert!(started.cwd.as_deref().unwrap().ends_with("work"));

        wait_for_exit(&controller, started.pid).await;
        let read = controller.read(started.pid, "stdout", 1000, true).await.unwrap();
        let lines: Vec<&str> = read.content.lines().collect();
        assert!(lines[0].ends_with("work"));
        assert_eq!(lines[1], "hi");
        assert_eq!(lines[2], "unset");
    }

    #[tokio::test]
    async fn test_read_tail_and_head() {
        let (_dir, controller) = controller();
        let started = controller
            .start(StartRequest::new("printf 0123456789; printf oops >&2"))
            .unwrap();
        wait_for_exit(&controller, started.pid).await;

        let read = controller.read(started.pid, "stdout", 4, true).await.unwrap();
        assert_eq!(read.size, 10);
        assert_eq!(read.content, "6789");
        assert!(read.truncated);

        let read = controller.read(started.pid, "stdout", 4, false).await.unwrap();
        assert_eq!(read.content, "0123");
        assert!(read.truncated);

        let read = controller.read(started.pid, "stdout", 100, true).await.unwrap();
        assert_eq!(read.content, "0123456789");
        assert!(!read.truncated);

        let read = controller.read(started.pid, "stderr", 100, true).await.unwrap();
        assert_eq!(read.content, "oops");
        assert_eq!(read.stream, OutputStream::Stderr);
    }

    #[tokio::test]
    async fn test_read_clamped_to_configured_max() {
        let dir = tempdir().unwrap();
        let controller =
            ProcessController::new(dir.path().canonicalize().unwrap(), Duration::from_secs(5), 3);
        let started = controller.start(StartRequest::new("printf abcdef")).unwrap();
        wait_for_exit(&controller, started.pid).await;

        let read = controller.read(started.pid, "stdout", 1000, true).await.unwrap();
        assert_eq!(read.content, "def");
        assert!(read.truncated);
    }

    #[tokio::test]
    async fn test_read_errors() {
        let (_dir, controller) = controller();

        let mut req = StartRequest::new("true");
        req.capture_output = false;
        let uncaptured = controller.start(req).unwrap();
        assert!(uncaptured.stdout_path.is_none());
        let err = controller.read(uncaptured.pid, "stdout", 10, true).await.unwrap_err();
        assert_eq!(err.code(), "no_output");

        let captured = controller.start(StartRequest::new("true")).unwrap();
        let err = controller.read(captured.pid, "stdin", 10, true).await.unwrap_err();
        assert_eq!(err.code(), "invalid_stream");

        std::fs::remove_file(captured.stdout_path.unwrap()).unwrap();
        let err = controller.read(captured.pid, "stdout", 10, true).await.unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn test_unknown_pid_not_found() {
        let (_dir, controller) = controller();
        let pid = u32::MAX;

        assert_eq!(controller.status(pid).unwrap_err().code(), "not_found");
        assert_eq!(controller.kill(pid, false, None).await.unwrap_err().code(), "not_found");
        assert_eq!(
            controller.read(pid, "stdout", 10, true).await.unwrap_err().code(),
            "not_found"
        );
    }

    #[tokio::test]
    async fn test_kill_running_then_exited_twice() {
        let (_dir, controller) = controller();
        let started = controller.start(StartRequest::new("sleep 30")).unwrap();

        let killed = controller.kill(started.pid, false, None).await.unwrap();
        assert_eq!(killed.status, KillOutcome::Terminated);
        assert_eq!(killed.returncode, Some(-libc::SIGTERM));

        let first = controller.kill(started.pid, false, None).await.unwrap();
        let second = controller.kill(started.pid, false, None).await.unwrap();
        assert_eq!(first.status, KillOutcome::Exited);
        assert_eq!(second.status, KillOutcome::Exited);
        assert_eq!(first.returncode, second.returncode);
    }

    #[tokio::test]
    async fn test_kill_timeout_without_force() {
        let (_dir, controller) = controller();
        let started = controller
            .start(StartRequest::new("trap '' TERM; sleep 30"))
            .unwrap();
        // Let the shell install the trap
        sleep(Duration::from_millis(200)).await;

        let err = controller
            .kill(started.pid, false, Some(Duration::from_millis(200)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "timeout");
        assert!(controller.status(started.pid).unwrap().running);

        let killed = controller
            .kill(started.pid, true, Some(Duration::from_secs(2)))
            .await
            .unwrap();
        assert_eq!(killed.status, KillOutcome::Terminated);
        assert_eq!(killed.returncode, Some(-libc::SIGKILL));
    }

    #[tokio::test]
    async fn test_kill_with_unbounded_timeout() {
        let (_dir, controller) = controller();
        let started = controller.start(StartRequest::new("sleep 30")).unwrap();

        let killed = tokio::time::timeout(
            Duration::from_secs(5),
            controller.kill(started.pid, true, Some(Duration::from_secs(u64::MAX))),
        )
        .await
        .expect("kill should return once the process exits")
        .unwrap();
        assert_eq!(killed.status, KillOutcome::Terminated);
        assert_eq!(killed.returncode, Some(-libc::SIGTERM));
    }

    #[tokio::test]
    async fn test_pending_kill_does_not_block_other_pids() {
        let (_dir, controller) = controller();
        let stubborn = controller
            .start(StartRequest::new("trap '' TERM; sleep 30"))
            .unwrap();
        let other = controller.start(StartRequest::new("sleep 30")).unwrap();
        sleep(Duration::from_millis(200)).await;

        let (killed, (status, elapsed)) = tokio::join!(
            controller.kill(stubborn.pid, false, Some(Duration::from_secs(1))),
            async {
                sleep(Duration::from_millis(100)).await;
                let started = Instant::now();
                let status = controller.status(other.pid).unwrap();
                (status, started.elapsed())
            }
        );

        assert_eq!(killed.unwrap_err().code(), "timeout");
        assert!(status.running);
        assert!(elapsed < Duration::from_millis(100));
        assert_eq!(controller.list().processes.len(), 2);

        controller.kill(stubborn.pid, true, Some(Duration::from_secs(2))).await.unwrap();
        controller.kill(other.pid, true, Some(Duration::from_secs(2))).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_ordered_by_pid() {
        let (_dir, controller) = controller();
        let a = controller.start(StartRequest::new("true")).unwrap();
        let b = controller.start(StartRequest::new("true")).unwrap();

        let list = controller.list();
        let pids: Vec<u32> = list.processes.iter().map(|p| p.pid).collect();
        let mut expected = vec![a.pid, b.pid];
        expected.sort_unstable();
        assert_eq!(pids, expected);
    }

    #[tokio::test]
    async fn test_spawn_failure_reported() {
        let (_dir, controller) = controller();
        let mut req = StartRequest::new("true");
        req.cwd = Some("gone".into());

        let err = controller.start(req).unwrap_err();
        assert!(matches!(err, ProcessError::Spawn(_)));
        assert!(controller.list().processes.is_empty());
    }
}
