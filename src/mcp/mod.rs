//! Minimal MCP client: JSON-RPC 2.0 over streamable HTTP.

pub mod client;
pub mod schema;

pub use client::{McpClient, McpConnectionState, McpError, McpToolCallResult};
pub use schema::McpToolSchema;
