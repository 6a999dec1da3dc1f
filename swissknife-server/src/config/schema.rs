//! Configuration schema structs

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub process: ProcessConfig,
}

/// Listener and filesystem confinement settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (default: 127.0.0.1, localhost only)
    pub host: String,
    /// Bind port (default: 8080)
    pub port: u16,
    /// Root directory processes may run in; defaults to the current directory
    pub allowed_base: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            allowed_base: None,
        }
    }
}

impl ServerConfig {
    /// `host:port` string for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Process controller settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Default wait budget for each phase of `kill` (default: 5)
    pub kill_timeout_secs: u64,
    /// Upper bound on bytes returned by a single `read` (default: 200000)
    pub max_read_bytes: usize,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            kill_timeout_secs: 5,
            max_read_bytes: 200_000,
        }
    }
}

impl ProcessConfig {
    pub fn kill_timeout(&self) -> Duration {
        Duration::from_secs(self.kill_timeout_secs)
    }
}
