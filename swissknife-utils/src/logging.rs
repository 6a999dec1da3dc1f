//! Logging infrastructure for swissknife
//!
//! Provides unified logging setup using the tracing ecosystem.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::{paths, KnifeError, Result};

/// Log output destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Log to stderr
    Stderr,
    /// Log to file under the state log directory
    File,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output destination
    pub output: LogOutput,
    /// Log level filter (e.g., "info", "swissknife_server=debug,hyper=warn")
    pub filter: String,
    /// Include span events (enter/exit)
    pub span_events: bool,
    /// Include file/line in logs
    pub file_line: bool,
    /// Optional custom log file name (defaults to "swissknife.log")
    pub file_name: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: "info".into(),
            span_events: false,
            file_line: false,
            file_name: None,
        }
    }
}

impl LogConfig {
    /// Create config for the backend control server (stderr logging)
    pub fn server() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: std::env::var("SWISSKNIFE_LOG").unwrap_or_else(|_| "info".into()),
            span_events: false,
            file_line: true,
            file_name: None,
        }
    }

    /// Create config for the MCP bridge.
    ///
    /// stdout carries the framed protocol, so the bridge logs to its own file.
    pub fn bridge() -> Self {
        Self {
            output: LogOutput::File,
            filter: std::env::var("SWISSKNIFE_BRIDGE_LOG")
                .or_else(|_| std::env::var("SWISSKNIFE_LOG"))
                .unwrap_or_else(|_| "info".into()),
            span_events: false,
            file_line: true,
            file_name: Some("bridge.log".into()),
        }
    }
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| KnifeError::config(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false);

    let fmt_layer = if config.span_events {
        fmt_layer.with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    } else {
        fmt_layer
    };

    let fmt_layer = if config.file_line {
        fmt_layer.with_file(true).with_line_number(true)
    } else {
        fmt_layer.with_file(false).with_line_number(false)
    };

    match config.output {
        LogOutput::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| KnifeError::internal(format!("Failed to init logging: {}", e)))?;
        }
        LogOutput::File => {
            let log_dir = paths::log_dir();
            paths::ensure_dir(&log_dir).map_err(|e| KnifeError::FileWrite {
                path: log_dir.clone(),
                source: e,
            })?;

            let file_name = config.file_name.as_deref().unwrap_or("swissknife.log");
            let log_path = log_dir.join(file_name);
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .map_err(|e| KnifeError::FileWrite {
                    path: log_path,
                    source: e,
                })?;

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(file).with_ansi(false))
                .try_init()
                .map_err(|e| KnifeError::internal(format!("Failed to init logging: {}", e)))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.output, LogOutput::Stderr);
        assert_eq!(config.filter, "info");
        assert!(!config.span_events);
        assert!(!config.file_line);
    }

    #[test]
    fn test_log_config_server_is_stderr() {
        let config = LogConfig::server();
        assert_eq!(config.output, LogOutput::Stderr);
        assert!(config.file_line);
    }

    #[test]
    fn test_log_config_bridge_never_uses_stdout() {
        let config = LogConfig::bridge();
        assert_eq!(config.output, LogOutput::File);
        assert_eq!(config.file_name, Some("bridge.log".into()));
    }

    #[test]
    fn test_log_config_bridge_with_env() {
        let original = env::var("SWISSKNIFE_BRIDGE_LOG").ok();
        env::set_var("SWISSKNIFE_BRIDGE_LOG", "trace");

        let config = LogConfig::bridge();
        assert_eq!(config.filter, "trace");

        match original {
            Some(val) => env::set_var("SWISSKNIFE_BRIDGE_LOG", val),
            None => env::remove_var("SWISSKNIFE_BRIDGE_LOG"),
        }
    }

    #[test]
    fn test_invalid_filter_is_config_error() {
        let config = LogConfig {
            filter: "swissknife=notalevel".into(),
            ..LogConfig::default()
        };
        let result = init_logging_with_config(config);
        assert!(matches!(result, Err(KnifeError::Config(_))));
    }
}
