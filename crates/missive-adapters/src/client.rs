//! Thin HTTP client for the Missive REST API.
//!
//! Handles bearer authentication, URL construction and the mapping of
//! non-2xx responses onto [`AdapterError`].  Tool handlers only build paths,
//! query pairs and JSON bodies.

use reqwest::StatusCode;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::ApiSettings;
use crate::error::{AdapterError, Result};
use crate::traits::HealthStatus;

/// Query string pairs for a GET request.
pub type Query = Vec<(&'static str, String)>;

/// Maximum number of body characters kept in an error detail.
const MAX_DETAIL_CHARS: usize = 300;

/// Shared Missive API client.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct MissiveClient {
    /// Bearer token, if configured.
    token: Option<String>,
    /// Base URL without a trailing slash.
    base_url: String,
    /// Timeout applied to every request, in seconds.
    timeout_secs: u64,
    /// HTTP client for making requests.
    http: reqwest::Client,
}

impl std::fmt::Debug for MissiveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MissiveClient")
            .field("base_url", &self.base_url)
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

impl MissiveClient {
    /// Build a client from the `[missive]` settings.
    pub fn new(settings: &ApiSettings) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("missive-mcp/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout())
            .build()
            .unwrap_or_default();

        Self {
            token: settings.api_token.clone().filter(|t| !t.is_empty()),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout_secs: settings.timeout_secs,
            http,
        }
    }

    /// Whether a token is configured.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full API URL from a path segment.
    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| AdapterError::AuthRequired {
                adapter_id: "missive".into(),
            })
    }

    // -----------------------------------------------------------------------
    // Verbs
    // -----------------------------------------------------------------------

    /// `GET path?query`.
    pub async fn get(
        &self,
        tool_name: &str,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<Value> {
        let token = self.token()?;
        let url = self.api_url(path);
        debug!(tool = tool_name, url = %url, "GET");
        let request = self.http.get(&url).bearer_auth(token).query(query);
        self.send(request, tool_name).await
    }

    /// `POST path` with a JSON body.
    pub async fn post(&self, tool_name: &str, path: &str, body: &Value) -> Result<Value> {
        let token = self.token()?;
        let url = self.api_url(path);
        debug!(tool = tool_name, url = %url, "POST");
        let request = self.http.post(&url).bearer_auth(token).json(body);
        self.send(request, tool_name).await
    }

    /// `PATCH path` with a JSON body.
    pub async fn patch(&self, tool_name: &str, path: &str, body: &Value) -> Result<Value> {
        let token = self.token()?;
        let url = self.api_url(path);
        debug!(tool = tool_name, url = %url, "PATCH");
        let request = self.http.patch(&url).bearer_auth(token).json(body);
        self.send(request, tool_name).await
    }

    /// `DELETE path`.
    pub async fn delete(&self, tool_name: &str, path: &str) -> Result<Value> {
        let token = self.token()?;
        let url = self.api_url(path);
        debug!(tool = tool_name, url = %url, "DELETE");
        let request = self.http.delete(&url).bearer_auth(token);
        self.send(request, tool_name).await
    }

    /// Probe `GET /organizations` to classify the token's health.
    pub async fn probe_health(&self) -> HealthStatus {
        if !self.has_token() {
            return HealthStatus::Degraded;
        }
        match self.get("health_check", "/organizations", &[]).await {
            Ok(_) => HealthStatus::Healthy,
            Err(AdapterError::Unauthorized) => {
                warn!("Missive rejected the configured API token");
                HealthStatus::Unhealthy
            }
            Err(e) => {
                warn!(error = %e, "Missive health probe failed");
                HealthStatus::Degraded
            }
        }
    }

    // -----------------------------------------------------------------------
    // Response handling
    // -----------------------------------------------------------------------

    /// Send a request and parse the JSON response.
    async fn send(&self, request: reqwest::RequestBuilder, tool_name: &str) -> Result<Value> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AdapterError::Timeout {
                    seconds: self.timeout_secs,
                    reason: format!("Missive API request timed out: {e}"),
                }
            } else {
                AdapterError::ExecutionFailed {
                    tool_name: tool_name.to_string(),
                    reason: format!("Missive API request failed: {e}"),
                }
            }
        })?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| AdapterError::ExecutionFailed {
                tool_name: tool_name.to_string(),
                reason: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            return Err(map_status(status, &body_text, tool_name));
        }

        if body_text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body_text).map_err(|e| AdapterError::ExecutionFailed {
            tool_name: tool_name.to_string(),
            reason: format!("failed to parse Missive API response as JSON: {e}"),
        })
    }
}

/// Map a non-2xx status and its body onto the uniform error shape.
pub(crate) fn map_status(status: StatusCode, body_text: &str, tool_name: &str) -> AdapterError {
    let detail = error_detail(body_text);
    match status {
        StatusCode::UNAUTHORIZED => AdapterError::Unauthorized,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => AdapterError::BadRequest {
            tool_name: tool_name.to_string(),
            detail,
        },
        StatusCode::TOO_MANY_REQUESTS => {
            warn!(tool = tool_name, "Missive API rate limit hit");
            AdapterError::RateLimited {
                tool_name: tool_name.to_string(),
            }
        }
        other => AdapterError::Api {
            tool_name: tool_name.to_string(),
            status: other.as_u16(),
            detail,
        },
    }
}

/// Pull a human-readable message out of an error body.
fn error_detail(body_text: &str) -> String {
    let parsed: Value =
        serde_json::from_str(body_text).unwrap_or_else(|_| json!({ "message": body_text }));

    let message = ["error", "message", "errors"]
        .iter()
        .find_map(|key| match parsed.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Null) | None => None,
            Some(Value::String(_)) => None,
            Some(other) => Some(other.to_string()),
        })
        .unwrap_or_else(|| "no details".to_string());

    if message.chars().count() > MAX_DETAIL_CHARS {
        let cut: String = message.chars().take(MAX_DETAIL_CHARS).collect();
        format!("{cut}...")
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(token: Option<&str>, base_url: &str) -> ApiSettings {
        ApiSettings {
            api_token: token.map(str::to_string),
            base_url: base_url.to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn new_trims_trailing_slash() {
        let client = MissiveClient::new(&settings(Some("t"), "http://localhost:1/v1/"));
        assert_eq!(client.base_url(), "http://localhost:1/v1");
        assert_eq!(client.api_url("/conversations"), "http://localhost:1/v1/conversations");
    }

    #[test]
    fn empty_token_counts_as_missing() {
        let client = MissiveClient::new(&settings(Some(""), "http://localhost:1"));
        assert!(!client.has_token());
        assert!(matches!(client.token(), Err(AdapterError::AuthRequired { .. })));
    }

    #[tokio::test]
    async fn requests_fail_fast_without_token() {
        // Port 9 is never contacted because the token check happens first.
        let client = MissiveClient::new(&settings(None, "http://127.0.0.1:9"));
        let err = client.get("get_conversations", "/conversations", &[]).await.unwrap_err();
        assert!(matches!(err, AdapterError::AuthRequired { .. }));
    }

    #[test]
    fn map_status_covers_uniform_shapes() {
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, "", "t"),
            AdapterError::Unauthorized
        ));
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, "", "t"),
            AdapterError::RateLimited { .. }
        ));

        match map_status(StatusCode::BAD_REQUEST, r#"{"error":"title is too long"}"#, "create_task") {
            AdapterError::BadRequest { tool_name, detail } => {
                assert_eq!(tool_name, "create_task");
                assert_eq!(detail, "title is too long");
            }
            other => panic!("unexpected {other:?}"),
        }

        match map_status(StatusCode::NOT_FOUND, "gone", "get_contact") {
            AdapterError::Api { status, detail, .. } => {
                assert_eq!(status, 404);
                assert_eq!(detail, "gone");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn error_detail_handles_structured_and_long_bodies() {
        assert_eq!(
            error_detail(r#"{"errors":{"title":["is required"]}}"#),
            r#"{"title":["is required"]}"#
        );
        assert_eq!(error_detail(""), "no details");
        let long = "x".repeat(500);
        let detail = error_detail(&long);
        assert!(detail.ends_with("..."));
        assert_eq!(detail.chars().count(), MAX_DETAIL_CHARS + 3);
    }
}
