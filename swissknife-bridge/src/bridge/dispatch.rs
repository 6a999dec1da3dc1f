//! Typed view of the recognised MCP methods

use serde_json::{json, Value};
use swissknife_protocol::JsonRpcRequest;

/// One recognised method with its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum McpMethod {
    Initialize,
    ToolsList,
    ToolsCall {
        /// `None` when `params.name` is missing or not a string
        name: Option<String>,
        arguments: Value,
    },
    Ping,
    Shutdown,
    /// Anything else; answered with silence
    Unrecognized(String),
}

impl McpMethod {
    pub fn parse(request: &JsonRpcRequest) -> Self {
        match request.method.as_str() {
            "initialize" => McpMethod::Initialize,
            "tools/list" => McpMethod::ToolsList,
            "tools/call" => {
                let params = &request.params;
                let arguments = match params.get("arguments") {
                    None | Some(Value::Null) => json!({}),
                    Some(arguments) => arguments.clone(),
                };
                McpMethod::ToolsCall {
                    name: params.get("name").and_then(Value::as_str).map(str::to_string),
                    arguments,
                }
            }
            "ping" => McpMethod::Ping,
            "shutdown" => McpMethod::Shutdown,
            other => McpMethod::Unrecognized(other.to_string()),
        }
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(self, McpMethod::Shutdown)
    }
}
