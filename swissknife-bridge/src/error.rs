//! Bridge error types

use std::io;

use serde_json::{json, Value};
use swissknife_protocol::CodecError;

/// Faults of the stdio transport itself. Tool failures never use this type.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// IO error (stdin/stdout)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Framing error
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

/// A failed backend call, reported to the agent as data
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// DNS, connect, or protocol failure
    #[error("{0}")]
    Transport(#[source] reqwest::Error),

    /// The request exceeded the configured timeout
    #[error("timeout")]
    Timeout,

    /// The descriptor names an HTTP method we cannot send
    #[error("invalid method: {0}")]
    InvalidMethod(String),

    /// Non-2xx status
    #[error("backend returned HTTP {status}")]
    HttpStatus { status: u16, response: Value },

    /// 2xx whose body is not a JSON object
    #[error("invalid backend response")]
    InvalidBackendResponse { raw: String },
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProxyError::Timeout
        } else {
            ProxyError::Transport(err)
        }
    }
}

impl ProxyError {
    /// The `{ok: false, ...}` payload forwarded to the agent
    pub fn to_payload(&self) -> Value {
        match self {
            ProxyError::Transport(err) => json!({"ok": false, "error": err.to_string()}),
            ProxyError::Timeout => json!({"ok": false, "error": "timeout"}),
            ProxyError::InvalidMethod(_) => json!({"ok": false, "error": "invalid_method"}),
            ProxyError::HttpStatus { status, response } => json!({
                "ok": false,
                "error": "http_error",
                "status": status,
                "response": response,
            }),
            ProxyError::InvalidBackendResponse { raw } => json!({
                "ok": false,
                "error": "invalid_backend_response",
                "raw": raw,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shapes() {
        assert_eq!(
            ProxyError::Timeout.to_payload(),
            json!({"ok": false, "error": "timeout"})
        );
        assert_eq!(
            ProxyError::InvalidMethod("BREW".into()).to_payload(),
            json!({"ok": false, "error": "invalid_method"})
        );
        assert_eq!(
            ProxyError::HttpStatus {
                status: 500,
                response: json!({"detail": "boom"}),
            }
            .to_payload(),
            json!({"ok": false, "error": "http_error", "status": 500, "response": {"detail": "boom"}})
        );
        assert_eq!(
            ProxyError::InvalidBackendResponse { raw: "[1]".into() }.to_payload(),
            json!({"ok": false, "error": "invalid_backend_response", "raw": "[1]"})
        );
    }
}
