//! Transport error types.

/// Errors that stop the MCP transport loop.
///
/// Protocol-level problems (bad JSON, unknown methods, failing tools) are
/// answered on the wire and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// Reading stdin or writing stdout failed.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A reply could not be encoded.
    #[error("failed to encode reply: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Convenience alias for MCP transport results.
pub type Result<T> = std::result::Result<T, McpError>;
