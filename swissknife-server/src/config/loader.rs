//! Configuration loader

use std::path::Path;

use swissknife_utils::{config_file, KnifeError, Result};

use super::AppConfig;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the given path, or the default location.
    ///
    /// A missing default file yields defaults; a missing explicit file is an
    /// error.
    pub fn load(explicit: Option<&Path>) -> Result<AppConfig> {
        match explicit {
            Some(path) => Self::load_from_path(path),
            None => {
                let path = config_file();
                if path.exists() {
                    Self::load_from_path(&path)
                } else {
                    Ok(AppConfig::default())
                }
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<AppConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| KnifeError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration from string
    pub fn parse(content: &str, path: &Path) -> Result<AppConfig> {
        toml::from_str(content).map_err(|e| KnifeError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply `MCP_*` overrides from the process environment
    pub fn apply_env(config: &mut AppConfig) -> Result<()> {
        Self::apply_overrides(config, |key| std::env::var(key).ok())
    }

    /// Apply `MCP_*` overrides from an arbitrary lookup
    pub fn apply_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("MCP_HOST") {
            config.server.host = host;
        }
        if let Some(port) = lookup("MCP_PORT") {
            config.server.port = parse_number("MCP_PORT", &port)?;
        }
        if let Some(base) = lookup("MCP_ALLOWED_BASE") {
            config.server.allowed_base = Some(base.into());
        }
        if let Some(bytes) = lookup("MCP_MAX_READ_BYTES") {
            config.process.max_read_bytes = parse_number("MCP_MAX_READ_BYTES", &bytes)?;
        }
        if let Some(secs) = lookup("MCP_PROCESS_KILL_TIMEOUT_S") {
            config.process.kill_timeout_secs = parse_number("MCP_PROCESS_KILL_TIMEOUT_S", &secs)?;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(config: &AppConfig) -> Result<()> {
        if config.server.port == 0 {
            return Err(KnifeError::config("port must be non-zero"));
        }

        if config.process.kill_timeout_secs == 0 {
            return Err(KnifeError::config("kill_timeout_secs must be at least 1"));
        }

        if config.process.max_read_bytes == 0 {
            return Err(KnifeError::config("max_read_bytes must be at least 1"));
        }

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| KnifeError::config(format!("{} must be a non-negative integer, got '{}'", key, raw)))
}
