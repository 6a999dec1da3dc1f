//! One-shot shell command execution

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::guard::resolve_within;
use crate::process::returncode;

/// Maximum characters kept from each output stream
pub const MAX_OUTPUT_CHARS: usize = 20_000;

fn default_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecRequest {
    pub cmd: String,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub env: Option<HashMap<String, String>>,
    #[serde(default = "default_timeout")]
    pub timeout_s: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecResult {
    pub ok: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ExecResult {
    fn failed(exit_code: i32, stderr: String) -> Self {
        Self {
            ok: false,
            exit_code,
            stdout: String::new(),
            stderr,
            timestamp: None,
        }
    }
}

/// Run `req.cmd` to completion through `/bin/sh`.
///
/// A timeout yields exit code -1; any other failure yields -2.
pub async fn exec(base: &Path, req: ExecRequest) -> ExecResult {
    let cwd = match req.cwd.as_deref() {
        Some(cwd) => match resolve_within(base, Path::new(cwd)) {
            Ok(dir) => Some(dir),
            Err(e) => return ExecResult::failed(-2, format!("Error: {}", e)),
        },
        None => None,
    };

    let mut command = Command::new("/bin/sh");
    command
        .arg("-c")
        .arg(&req.cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &cwd {
        command.current_dir(dir);
    }
    if let Some(env) = &req.env {
        command.env_clear().envs(env);
    }

    let timeout = Duration::from_secs(req.timeout_s);
    debug!(cmd = %req.cmd, ?timeout, "Executing shell command");

    match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => {
            let exit_code = returncode(output.status);
            ExecResult {
                ok: exit_code == 0,
                exit_code,
                stdout: truncate(String::from_utf8_lossy(&output.stdout).into_owned()),
                stderr: truncate(String::from_utf8_lossy(&output.stderr).into_owned()),
                timestamp: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
            }
        }
        Ok(Err(e)) => {
            warn!(cmd = %req.cmd, error = %e, "Shell command failed to run");
            ExecResult::failed(-2, format!("Error: {}", e))
        }
        Err(_) => {
            warn!(cmd = %req.cmd, ?timeout, "Shell command timed out");
            ExecResult::failed(
                -1,
                format!("Timeout: command '{}' timed out after {} seconds", req.cmd, req.timeout_s),
            )
        }
    }
}

fn truncate(mut text: String) -> String {
    if let Some((idx, _)) = text.char_indices().nth(MAX_OUTPUT_CHARS) {
        text.truncate(idx);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn request(cmd: &str) -> ExecRequest {
        ExecRequest {
            cmd: cmd.into(),
            cwd: None,
            env: None,
            timeout_s: 10,
        }
    }

    #[tokio::test]
    async fn test_exec_success() {
        let dir = tempdir().unwrap();
        let result = exec(dir.path(), request("echo hello; echo warn >&2")).await;
        assert!(result.ok);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "hello\n");
        assert_eq!(result.stderr, "warn\n");
        assert!(result.timestamp.unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_exec_nonzero_exit() {
        let dir = tempdir().unwrap();
        let result = exec(dir.path(), request("exit 7")).await;
        assert!(!result.ok);
        assert_eq!(result.exit_code, 7);
    }

    #[tokio::test]
    async fn test_exec_timeout() {
        let dir = tempdir().unwrap();
        let mut req = request("sleep 5");
        req.timeout_s = 0;
        let result = exec(dir.path(), req).await;
        assert_eq!(result.exit_code, -1);
        assert!(result.stderr.starts_with("Timeout:"));
        assert!(result.timestamp.is_none());
    }

    #[tokio::test]
    async fn test_exec_cwd_outside_base() {
        let dir = tempdir().unwrap();
        let mut req = request("pwd");
        req.cwd = Some("/".into());
        let result = exec(dir.path(), req).await;
        assert_eq!(result.exit_code, -2);
        assert!(result.stderr.starts_with("Error:"));
    }

    #[test]
    fn test_truncate_counts_chars() {
        let long = "é".repeat(MAX_OUTPUT_CHARS + 5);
        assert_eq!(truncate(long).chars().count(), MAX_OUTPUT_CHARS);
        assert_eq!(truncate("short".into()), "short");
    }
}
