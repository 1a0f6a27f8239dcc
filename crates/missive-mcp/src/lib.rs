//! Model Context Protocol server for the Missive adapters.
//!
//! This crate speaks MCP (JSON-RPC 2.0) over newline-delimited stdio and
//! exposes every tool of the registered adapters.  It includes:
//!
//! - Wire types for JSON-RPC requests, responses and MCP tool results.
//! - [`McpServer`], which dispatches `initialize`, `ping`, `tools/list` and
//!   `tools/call` to the adapters.
//! - A stdio transport loop that reads until EOF.

pub mod error;
pub mod protocol;
pub mod server;
pub mod stdio;

pub use error::{McpError, Result};
pub use protocol::{JsonRpcRequest, JsonRpcResponse, McpToolDefinition, McpToolResult, Reply};
pub use server::McpServer;
pub use stdio::{serve, serve_stdio};
