//! swissknife-protocol: wire definitions shared by the server and the bridge
//!
//! - [`jsonrpc`]: JSON-RPC 2.0 / MCP request and response shapes
//! - [`codec`]: `Content-Length` framing for the stdio transport
//! - [`tools`]: backend tool catalog descriptors

pub mod codec;
pub mod jsonrpc;
pub mod tools;

pub use codec::{CodecError, ContentLengthCodec, Frame};
pub use jsonrpc::{
    InitializeResult, JsonRpcRequest, JsonRpcResponse, ServerCapabilities, ServerInfo, Tool,
    ToolContent, ToolResult, ToolsCapability, ToolsListResult, PROTOCOL_VERSION, SERVER_NAME,
};
pub use tools::{ToolDescriptor, ToolsListResponse, HEALTH_PATH, RESERVED_PATHS, TOOLS_LIST_PATH};
