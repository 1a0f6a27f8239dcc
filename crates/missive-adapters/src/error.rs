//! Adapter error types.
//!
//! Every failure a tool can hit, from a missing parameter to a non-2xx
//! Missive response, surfaces as an [`AdapterError`].  The MCP layer renders
//! these uniformly, so variants carry the context a user needs to fix the
//! call rather than raw transport details.

/// Unified error type for the Missive adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The requested tool does not exist on this adapter.
    #[error("tool not found: `{tool_name}` on adapter `{adapter_id}`")]
    ToolNotFound {
        adapter_id: String,
        tool_name: String,
    },

    /// The parameters supplied to a tool are invalid.
    #[error("invalid parameters for tool `{tool_name}`: {reason}")]
    InvalidParams { tool_name: String, reason: String },

    /// A tool invocation failed before or while talking to the API.
    #[error("execution failed for tool `{tool_name}`: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    /// No API token is configured.
    #[error("authentication required for adapter `{adapter_id}`: set MISSIVE_API_TOKEN")]
    AuthRequired { adapter_id: String },

    /// Missive rejected the configured token (HTTP 401).
    #[error("invalid Missive API token (HTTP 401), check MISSIVE_API_TOKEN")]
    Unauthorized,

    /// The object a tool addressed does not exist (HTTP 404).
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// Missive rejected the request payload (HTTP 400/422).
    #[error("invalid request for tool `{tool_name}`: {detail}")]
    BadRequest { tool_name: String, detail: String },

    /// Missive throttled the request (HTTP 429).
    #[error("Missive API rate limit exceeded while running `{tool_name}`")]
    RateLimited { tool_name: String },

    /// Any other non-2xx response.
    #[error("Missive API returned HTTP {status} for `{tool_name}`: {detail}")]
    Api {
        tool_name: String,
        status: u16,
        detail: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A request exceeded the configured timeout.
    #[error("timeout after {seconds}s: {reason}")]
    Timeout { seconds: u64, reason: String },

    /// Configuration is missing or malformed.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl AdapterError {
    /// Turn a raw HTTP 404 into [`AdapterError::NotFound`] naming `resource`.
    ///
    /// Every other error passes through untouched.
    pub fn or_not_found(self, resource: impl Into<String>) -> Self {
        match self {
            Self::Api { status: 404, .. } => Self::NotFound {
                resource: resource.into(),
            },
            other => other,
        }
    }

    /// HTTP status behind this error, when it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::NotFound { .. } => Some(404),
            Self::RateLimited { .. } => Some(429),
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn or_not_found_converts_404_only() {
        let err = AdapterError::Api {
            tool_name: "get_contact".into(),
            status: 404,
            detail: "missing".into(),
        }
        .or_not_found("contact c-1");
        assert_eq!(err.to_string(), "contact c-1 not found");

        let err = AdapterError::Api {
            tool_name: "get_contact".into(),
            status: 500,
            detail: "boom".into(),
        }
        .or_not_found("contact c-1");
        assert_eq!(err.status(), Some(500));

        let err = AdapterError::Unauthorized.or_not_found("contact c-1");
        assert!(matches!(err, AdapterError::Unauthorized));
    }

    #[test]
    fn status_is_none_for_local_failures() {
        let err = AdapterError::InvalidParams {
            tool_name: "t".into(),
            reason: "r".into(),
        };
        assert_eq!(err.status(), None);
        assert_eq!(AdapterError::Unauthorized.status(), Some(401));
    }
}
