//! HTTP client for the backend control server

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use swissknife_protocol::{ToolDescriptor, ToolsListResponse, TOOLS_LIST_PATH};
use tracing::{debug, warn};

use crate::backend::ToolBackend;
use crate::error::ProxyError;

/// Issues tool calls against the backend with a bounded timeout
#[derive(Debug, Clone)]
pub struct HttpProxy {
    client: Client,
    base_url: String,
}

impl HttpProxy {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProxyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one request and classify the outcome.
    ///
    /// Only a 2xx response carrying a JSON object is a success.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<Value, ProxyError> {
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| ProxyError::InvalidMethod(method.to_string()))?;
        let url = format!("{}{}", self.base_url, path);

        debug!(%method, %url, "Calling backend");

        let mut request = self.client.request(method, &url);
        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "Backend returned error status");
            let response = serde_json::from_str(&text).unwrap_or(Value::String(text));
            return Err(ProxyError::HttpStatus {
                status: status.as_u16(),
                response,
            });
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(value @ Value::Object(_)) => Ok(value),
            _ => Err(ProxyError::InvalidBackendResponse { raw: text }),
        }
    }
}

#[async_trait]
impl ToolBackend for HttpProxy {
    async fn fetch_tools(&self) -> Result<Vec<ToolDescriptor>, ProxyError> {
        let value = self.request("GET", TOOLS_LIST_PATH, None).await?;
        let listed: ToolsListResponse = serde_json::from_value(value.clone())
            .map_err(|_| ProxyError::InvalidBackendResponse { raw: value.to_string() })?;

        if !listed.ok {
            warn!("Backend tool listing reported ok=false");
            return Ok(Vec::new());
        }
        Ok(listed.tools)
    }

    async fn call(
        &self,
        method: &str,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<Value, ProxyError> {
        self.request(method, path, payload).await
    }
}
