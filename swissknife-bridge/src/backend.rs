//! The seam between the dispatcher and the HTTP backend

use async_trait::async_trait;
use serde_json::Value;
use swissknife_protocol::ToolDescriptor;

use crate::error::ProxyError;

/// Something that can list and invoke backend tools
#[async_trait]
pub trait ToolBackend: Send + Sync {
    /// Fetch the backend's tool catalog
    async fn fetch_tools(&self) -> Result<Vec<ToolDescriptor>, ProxyError>;

    /// Invoke `method path`. `payload` is `None` for GET.
    async fn call(&self, method: &str, path: &str, payload: Option<&Value>)
        -> Result<Value, ProxyError>;
}
