//! Bridge settings

use std::time::Duration;

use swissknife_utils::{KnifeError, Result};
use url::{ParseError, Position, Url};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_TOOLS_TTL_SECS: u64 = 60;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Validated bridge configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Normalised backend base URL, no trailing slash
    pub base_url: String,
    pub tools_ttl: Duration,
    pub http_timeout: Duration,
}

impl BridgeConfig {
    pub fn new(raw_base_url: &str, tools_ttl_secs: u64, http_timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            base_url: validate_base_url(raw_base_url)?,
            tools_ttl: Duration::from_secs(tools_ttl_secs),
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }

    pub fn health_url(&self) -> String {
        format!("{}{}", self.base_url, swissknife_protocol::HEALTH_PATH)
    }

    pub fn tools_url(&self) -> String {
        format!("{}{}", self.base_url, swissknife_protocol::TOOLS_LIST_PATH)
    }
}

/// Accept only `http(s)://host[:port][/path]`.
///
/// Query and fragment are dropped and trailing slashes trimmed from the path.
pub fn validate_base_url(raw: &str) -> Result<String> {
    let scheme_error = || {
        KnifeError::InvalidBaseUrl("MCP_BASE_URL must start with http:// or https://".into())
    };
    let host_error = || {
        KnifeError::InvalidBaseUrl("MCP_BASE_URL must include a host (and optional port)".into())
    };

    let url = match Url::parse(raw.trim()) {
        Ok(url) => url,
        Err(ParseError::RelativeUrlWithoutBase) => return Err(scheme_error()),
        Err(ParseError::EmptyHost) => return Err(host_error()),
        Err(e) => {
            return Err(KnifeError::InvalidBaseUrl(format!(
                "MCP_BASE_URL is not a valid URL: {}",
                e
            )))
        }
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Err(scheme_error());
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(host_error());
    }

    let origin = &url[..Position::AfterPort];
    let path = url.path().trim_end_matches('/');
    Ok(format!("{}{}", origin, path))
}
