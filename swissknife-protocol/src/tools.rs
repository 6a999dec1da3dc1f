//! Backend tool catalog types
//!
//! The backend advertises its invocable operations at `GET /tools/list`.
//! Both the server (producer) and the bridge (consumer) share these types.

use serde::{Deserialize, Serialize};

use crate::jsonrpc::Tool;

/// Paths that are part of the backend plumbing and never exposed as tools
pub const RESERVED_PATHS: &[&str] = &["/health", "/tools/list", "/openapi.json"];

/// Catalog listing path on the backend
pub const TOOLS_LIST_PATH: &str = "/tools/list";

/// Health check path on the backend
pub const HEALTH_PATH: &str = "/health";

fn default_method() -> String {
    "POST".into()
}

/// Metadata record describing one backend-invocable operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Catalog key, unique within one listing
    pub name: String,
    /// HTTP method (defaults to POST)
    #[serde(default = "default_method")]
    pub method: String,
    /// Request path on the backend
    #[serde(default)]
    pub path: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema of the request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_schema: Option<serde_json::Value>,
}

impl ToolDescriptor {
    /// Create a descriptor without schema or description
    pub fn new(name: impl Into<String>, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: method.into(),
            path: path.into(),
            description: None,
            request_schema: None,
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach a request schema
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.request_schema = Some(schema);
        self
    }

    /// Whether the path belongs to backend plumbing
    pub fn is_reserved(&self) -> bool {
        RESERVED_PATHS.contains(&self.path.as_str())
    }

    /// Whether the call carries no request body
    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Shape this descriptor for an MCP `tools/list` response
    pub fn to_mcp_tool(&self) -> Tool {
        Tool {
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            input_schema: self
                .request_schema
                .clone()
                .unwrap_or_else(|| serde_json::json!({"type": "object"})),
        }
    }
}

/// Body of `GET /tools/list`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsListResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_defaults_to_post() {
        let desc: ToolDescriptor =
            serde_json::from_value(json!({"name": "process.list", "path": "/process/list"}))
                .unwrap();
        assert_eq!(desc.method, "POST");
        assert!(!desc.is_get());
        assert!(desc.description.is_none());
    }

    #[test]
    fn test_reserved_paths() {
        assert!(ToolDescriptor::new("health", "GET", "/health").is_reserved());
        assert!(ToolDescriptor::new("list", "GET", "/tools/list").is_reserved());
        assert!(ToolDescriptor::new("schema", "GET", "/openapi.json").is_reserved());
        assert!(!ToolDescriptor::new("process.start", "POST", "/process/start").is_reserved());
    }

    #[test]
    fn test_to_mcp_tool_default_schema() {
        let tool = ToolDescriptor::new("process.list", "POST", "/process/list").to_mcp_tool();
        assert_eq!(tool.description, "");
        assert_eq!(tool.input_schema, json!({"type": "object"}));
    }

    #[test]
    fn test_to_mcp_tool_keeps_schema() {
        let schema = json!({"type": "object", "required": ["pid"]});
        let tool = ToolDescriptor::new("process.status", "POST", "/process/status")
            .with_description("Process status")
            .with_schema(schema.clone())
            .to_mcp_tool();
        assert_eq!(tool.description, "Process status");
        assert_eq!(tool.input_schema, schema);
    }

    #[test]
    fn test_is_get_case_insensitive() {
        assert!(ToolDescriptor::new("health", "get", "/health").is_get());
    }

    #[test]
    fn test_tools_list_response_skips_absent_optionals() {
        let response = ToolsListResponse {
            ok: true,
            tools: vec![ToolDescriptor::new("health", "GET", "/health")],
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({"ok": true, "tools": [{"name": "health", "method": "GET", "path": "/health"}]})
        );
    }
}
