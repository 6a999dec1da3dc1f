//! Configuration for the backend control server
//!
//! Values come from an optional TOML file, then `MCP_*` environment
//! variables, then command-line flags, in increasing precedence.

mod loader;
mod schema;

pub use loader::ConfigLoader;
pub use schema::*;
