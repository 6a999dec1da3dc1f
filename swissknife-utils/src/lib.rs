//! swissknife-utils: Common utilities shared across swissknife crates
//!
//! This crate provides:
//! - Unified error types ([`KnifeError`], [`Result`])
//! - Logging infrastructure ([`init_logging_with_config`], [`LogConfig`])
//! - XDG-compliant path utilities ([`paths`] module)

pub mod error;
pub mod logging;
pub mod paths;

pub use error::{KnifeError, Result};
pub use logging::{init_logging_with_config, LogConfig, LogOutput};
pub use paths::{config_dir, config_file, ensure_dir, log_dir, state_dir};
