//! Error types for swissknife
//!
//! Provides the error type shared by the server and bridge binaries for
//! startup concerns (configuration, logging, filesystem). Per-operation
//! failures of the process controller and the bridge are reported in-band
//! and have their own error enums.

use std::path::PathBuf;

/// Main error type for swissknife startup and infrastructure
#[derive(Debug, thiserror::Error)]
pub enum KnifeError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    #[error("{0}")]
    InvalidBaseUrl(String),

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KnifeError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using KnifeError
pub type Result<T> = std::result::Result<T, KnifeError>;
