//! JSON-RPC and MCP protocol types
//!
//! Implements the JSON-RPC 2.0 message types spoken by the MCP bridge.

use serde::{Deserialize, Serialize};

/// MCP protocol revision announced by `initialize`
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name announced by `initialize`
pub const SERVER_NAME: &str = "ai-agents-swiss-knife";

/// JSON-RPC 2.0 request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (expected "2.0")
    #[serde(default)]
    pub jsonrpc: String,
    /// Request ID, echoed verbatim in the response. Absent for notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    /// Method name
    pub method: String,
    /// Method parameters (optional)
    #[serde(default)]
    pub params: serde_json::Value,
}

impl JsonRpcRequest {
    /// A request without an id expects no response
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC 2.0 response
///
/// The bridge reports every failure as data inside `result`, so there is no
/// `error` member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    /// Request ID that this response is for
    pub id: serde_json::Value,
    /// Result payload
    pub result: serde_json::Value,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result,
        }
    }
}

/// MCP Tool definition as presented to the agent host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name (e.g., "process.start")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema for input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// MCP Tool call result
#[derive(Debug, Serialize, Deserialize)]
pub struct ToolResult {
    /// Content blocks returned by the tool
    pub content: Vec<ToolContent>,
}

impl ToolResult {
    /// Create a text result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
        }
    }

    /// Wrap a JSON payload as a single text item
    pub fn json(payload: &serde_json::Value) -> Self {
        Self::text(payload.to_string())
    }
}

/// MCP Tool content types
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    /// Text content
    #[serde(rename = "text")]
    Text {
        /// The text content
        text: String,
    },
}

/// MCP Server capabilities
#[derive(Debug, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Tool capabilities
    pub tools: ToolsCapability,
}

/// Tool capability marker (always an empty object)
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ToolsCapability {}

/// MCP Server information
#[derive(Debug, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name
    pub name: String,
    /// Server version
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

/// Initialize response
#[derive(Debug, Serialize, Deserialize)]
pub struct InitializeResult {
    /// Protocol version
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Server capabilities
    pub capabilities: ServerCapabilities,
    /// Server info
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

impl Default for InitializeResult {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability::default(),
            },
            server_info: ServerInfo::default(),
        }
    }
}

/// Tools list response
#[derive(Debug, Serialize, Deserialize)]
pub struct ToolsListResult {
    /// Available tools
    pub tools: Vec<Tool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_rpc_request_deserialize() {
        let json = r#"{
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {}
        }"#;

        let request: JsonRpcRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.jsonrpc, "2.0");
        assert_eq!(request.id, Some(json!(1)));
        assert_eq!(request.method, "initialize");
        assert!(!request.is_notification());
    }

    #[test]
    fn test_json_rpc_request_without_params() {
        let json = r#"{"jsonrpc": "2.0", "id": "abc", "method": "tools/list"}"#;

        let request: JsonRpcRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.method, "tools/list");
        assert!(request.params.is_null());
    }

    #[test]
    fn test_json_rpc_request_without_id_is_notification() {
        let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;

        let request: JsonRpcRequest = serde_json::from_str(json).unwrap();
        assert!(request.is_notification());
    }

    #[test]
    fn test_json_rpc_request_missing_method_fails() {
        let json = r#"{"jsonrpc": "2.0", "id": 3}"#;
        assert!(serde_json::from_str::<JsonRpcRequest>(json).is_err());
    }

    #[test]
    fn test_json_rpc_response_echoes_id() {
        let response = JsonRpcResponse::success(json!("req-7"), json!({}));
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value, json!({"jsonrpc": "2.0", "id": "req-7", "result": {}}));
    }

    #[test]
    fn test_tool_result_json_wraps_single_text_item() {
        let result = ToolResult::json(&json!({"ok": false, "error": "tool_not_found"}));
        let value = serde_json::to_value(&result).unwrap();

        let content = value["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["type"], "text");
        let inner: serde_json::Value =
            serde_json::from_str(content[0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(inner, json!({"ok": false, "error": "tool_not_found"}));
    }

    #[test]
    fn test_initialize_result_serialization() {
        let value = serde_json::to_value(InitializeResult::default()).unwrap();

        assert_eq!(value["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(value["capabilities"], json!({"tools": {}}));
        assert_eq!(value["serverInfo"]["name"], SERVER_NAME);
        assert!(value["serverInfo"]["version"].is_string());
    }

    #[test]
    fn test_tool_definition() {
        let tool = Tool {
            name: "process.status".into(),
            description: "Process status".into(),
            input_schema: json!({"type": "object"}),
        };

        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("process.status"));
        assert!(json.contains("inputSchema"));
    }
}
