//! MCP Bridge - serves framed JSON-RPC on a byte stream
//!
//! Reads one `Content-Length` framed request at a time, answers it (calling
//! the backend if needed), writes the response, and only then reads the next
//! message. Every tool failure is returned as data inside `result`.

mod dispatch;


use std::sync::atomic::{AtomicU64, Ordering};

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use swissknife_protocol::{
    ContentLengthCodec, Frame, InitializeResult, JsonRpcRequest, JsonRpcResponse, ToolResult,
    ToolsListResult,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, warn};

use crate::backend::ToolBackend;
use crate::catalog::ToolCatalog;
use crate::error::McpError;

pub use dispatch::McpMethod;

/// Per-process counter for correlating log lines of one message
static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(1);

/// MCP Bridge
///
/// Owns the tool catalog and the backend it forwards calls to.
pub struct McpBridge<B> {
    backend: B,
    catalog: ToolCatalog,
}

impl<B: ToolBackend> McpBridge<B> {
    pub fn new(backend: B, catalog: ToolCatalog) -> Self {
        Self { backend, catalog }
    }

    /// Serve until end of input or until `shutdown` has been answered
    pub async fn run<R, W>(&mut self, reader: R, writer: W) -> Result<(), McpError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut frames = FramedRead::new(reader, ContentLengthCodec::new());
        let mut sink = FramedWrite::new(writer, ContentLengthCodec::new());

        info!("MCP bridge starting");

        while let Some(frame) = frames.next().await {
            let body = match frame {
                Ok(Frame::Message(body)) => body,
                Ok(Frame::End) => {
                    debug!("Peer sent a zero-length frame");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Transport framing failed");
                    return Err(e.into());
                }
            };

            let log_req_id = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
            debug!(
                req_id = log_req_id,
                raw = %String::from_utf8_lossy(&body),
                "Received raw JSON-RPC request"
            );

            let request: JsonRpcRequest = match serde_json::from_slice(&body) {
                Ok(req) => req,
                Err(e) => {
                    warn!(req_id = log_req_id, error = %e, "Skipping malformed JSON-RPC message");
                    continue;
                }
            };

            if request.jsonrpc != "2.0" {
                warn!(req_id = log_req_id, got_version = %request.jsonrpc, "Unexpected JSON-RPC version");
            }

            info!(
                req_id = log_req_id,
                method = %request.method,
                jsonrpc_id = ?request.id,
                "Incoming JSON-RPC request"
            );

            let notification = request.is_notification();
            let start = std::time::Instant::now();
            let method = McpMethod::parse(&request);
            let shutdown = method.is_shutdown();
            let result = self.dispatch(method).await;
            let elapsed_ms = start.elapsed().as_millis();

            match result {
                Some(result) if !notification => {
                    let id = request.id.unwrap_or_default();
                    let response = JsonRpcResponse::success(id, result);
                    debug!(req_id = log_req_id, "Sending JSON-RPC response");
                    sink.send(&response).await?;
                    info!(
                        req_id = log_req_id,
                        method = %request.method,
                        elapsed_ms = %elapsed_ms,
                        "JSON-RPC request completed"
                    );
                }
                _ => {
                    info!(
                        req_id = log_req_id,
                        method = %request.method,
                        elapsed_ms = %elapsed_ms,
                        "Handled without response"
                    );
                }
            }

            if shutdown {
                info!("Shutdown requested");
                break;
            }
        }

        info!("MCP bridge shutting down");
        Ok(())
    }

    /// Produce the `result` for one method; `None` means stay silent
    pub async fn dispatch(&mut self, method: McpMethod) -> Option<Value> {
        match method {
            McpMethod::Initialize => Some(to_value(InitializeResult::default())),
            McpMethod::ToolsList => Some(self.handle_tools_list().await),
            McpMethod::ToolsCall { name, arguments } => {
                Some(self.handle_tools_call(name.as_deref(), &arguments).await)
            }
            McpMethod::Ping | McpMethod::Shutdown => Some(json!({})),
            McpMethod::Unrecognized(method) => {
                debug!(%method, "Ignoring unrecognized method");
                None
            }
        }
    }

    async fn handle_tools_list(&mut self) -> Value {
        self.catalog.ensure_fresh(&self.backend).await;
        let tools = self.catalog.visible().map(|tool| tool.to_mcp_tool()).collect();
        to_value(ToolsListResult { tools })
    }

    async fn handle_tools_call(&mut self, name: Option<&str>, arguments: &Value) -> Value {
        self.catalog.ensure_fresh(&self.backend).await;

        let Some(tool) = name.and_then(|name| self.catalog.get(name)) else {
            warn!(tool = ?name, "Tool not found in catalog");
            return to_value(ToolResult::json(&json!({"ok": false, "error": "tool_not_found"})));
        };

        info!(tool = %tool.name, method = %tool.method, path = %tool.path, "Dispatching tool call");

        let payload = (!tool.is_get()).then_some(arguments);
        let outcome = match self.backend.call(&tool.method, &tool.path, payload).await {
            Ok(value) => value,
            Err(e) => {
                warn!(tool = %tool.name, error = %e, "Tool call failed");
                e.to_payload()
            }
        };

        to_value(ToolResult::json(&outcome))
    }
}

fn to_value<T: serde::Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| json!({"ok": false, "error": e.to_string()}))
}
