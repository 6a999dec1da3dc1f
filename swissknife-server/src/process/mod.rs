//! Process lifecycle management
//!
//! Spawns OS processes through the system shell on behalf of callers, keeps
//! them in a [`ProcessRegistry`], and lets callers poll, read captured output
//! from, and terminate them later. Every operation returns a uniform
//! `{ok, ...}` envelope; failures are data, never faults.

mod capture;
mod controller;
mod monitor;
mod registry;

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::guard::GuardError;

pub use controller::ProcessController;
pub use registry::returncode;

/// Subdirectory of the allowed base that holds capture files
pub const CAPTURE_SUBDIR: &str = ".mcp/process";

/// Default byte budget for `read`
pub const DEFAULT_READ_BYTES: usize = 20_000;

/// Errors from process operations
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("command is empty")]
    EmptyCommand,

    #[error("process not found")]
    NotFound,

    #[error("process has no captured output")]
    NoOutput,

    #[error("invalid stream: {0}")]
    InvalidStream(String),

    #[error("timed out waiting for process to exit")]
    Timeout,

    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error("{0}")]
    Spawn(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl ProcessError {
    /// Stable code reported in the `error` field of the envelope
    pub fn code(&self) -> String {
        match self {
            ProcessError::EmptyCommand => "empty_cmd".into(),
            ProcessError::NotFound => "not_found".into(),
            ProcessError::NoOutput => "no_output".into(),
            ProcessError::InvalidStream(_) => "invalid_stream".into(),
            ProcessError::Timeout => "timeout".into(),
            other => other.to_string(),
        }
    }
}

/// Which capture file to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl FromStr for OutputStream {
    type Err = ProcessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdout" => Ok(OutputStream::Stdout),
            "stderr" => Ok(OutputStream::Stderr),
            other => Err(ProcessError::InvalidStream(other.to_string())),
        }
    }
}

/// Wrap an operation result in the `{ok, ...}` envelope
pub fn envelope<T: Serialize>(result: Result<T, ProcessError>) -> Value {
    match result {
        Ok(body) => match serde_json::to_value(body) {
            Ok(Value::Object(mut map)) => {
                map.insert("ok".into(), Value::Bool(true));
                Value::Object(map)
            }
            Ok(other) => json!({ "ok": true, "result": other }),
            Err(e) => json!({ "ok": false, "error": e.to_string() }),
        },
        Err(e) => json!({ "ok": false, "error": e.code() }),
    }
}

// ==================== Requests ====================

fn default_true() -> bool {
    true
}

fn default_stream() -> String {
    "stdout".into()
}

fn default_read_bytes() -> usize {
    DEFAULT_READ_BYTES
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartRequest {
    pub cmd: String,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub env: Option<HashMap<String, String>>,
    #[serde(default = "default_true")]
    pub capture_output: bool,
}

impl StartRequest {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            cwd: None,
            env: None,
            capture_output: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PidRequest {
    pub pid: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KillRequest {
    pub pid: u32,
    #[serde(default)]
    pub force: bool,
    /// Falls back to the configured kill timeout
    #[serde(default)]
    pub timeout_s: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadRequest {
    pub pid: u32,
    #[serde(default = "default_stream")]
    pub stream: String,
    #[serde(default = "default_read_bytes")]
    pub max_bytes: usize,
    #[serde(default = "default_true")]
    pub tail: bool,
}

// ==================== Responses ====================

#[derive(Debug, Clone, Serialize)]
pub struct StartResponse {
    pub pid: u32,
    pub cwd: Option<String>,
    pub stdout_path: Option<String>,
    pub stderr_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessStatus {
    pub pid: u32,
    pub running: bool,
    pub returncode: Option<i32>,
    pub cmd: String,
    pub cwd: Option<String>,
    /// Seconds since the Unix epoch
    pub start_time: f64,
    pub stdout_path: Option<String>,
    pub stderr_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KillOutcome {
    /// Already gone before any signal was sent
    Exited,
    Terminated,
}

#[derive(Debug, Clone, Serialize)]
pub struct KillResponse {
    pub status: KillOutcome,
    pub returncode: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadResponse {
    pub pid: u32,
    pub stream: OutputStream,
    pub size: u64,
    pub content: String,
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessList {
    pub processes: Vec<ProcessStatus>,
}
