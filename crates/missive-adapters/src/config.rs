//! Gateway configuration.
//!
//! Settings come from an optional TOML file (`config/default.toml` by
//! default) and are then overridden by `MISSIVE_*` environment variables.
//! The result is read once at startup and shared read-only by every adapter.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{AdapterError, Result};

/// Default Missive REST API base URL.
pub const DEFAULT_BASE_URL: &str = "https://public.missiveapp.com/v1";

/// Largest page the conversations endpoint accepts.
pub const MAX_CONVERSATION_PAGE: u32 = 50;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MissiveConfig {
    /// `[missive]` section: API access.
    pub missive: ApiSettings,
    /// `[metrics]` section: team metrics tuning.
    pub metrics: MetricsSettings,
}

/// API access settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Bearer token.  Usually supplied through `MISSIVE_API_TOKEN`.
    pub api_token: Option<String>,
    /// Base URL every endpoint path is appended to.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSettings")
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ApiSettings {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Team metrics settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// Sender domains that belong to the team (outbound mail).
    ///
    /// Empty means "use the authenticated user's domain".
    pub internal_domains: Vec<String>,
    /// Sender domains whose messages are not counted at all.
    pub ignored_domains: Vec<String>,
    /// Pause between consecutive API requests, in milliseconds.
    pub request_delay_ms: u64,
    /// Conversations requested per page.
    pub page_size: u32,
    /// Default cap on conversations analysed per run.
    pub max_conversations: u32,
    /// Cap on message pages fetched per conversation.
    pub max_message_pages: u32,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            internal_domains: Vec::new(),
            ignored_domains: Vec::new(),
            request_delay_ms: 250,
            page_size: MAX_CONVERSATION_PAGE,
            max_conversations: 100,
            max_message_pages: 5,
        }
    }
}

impl MetricsSettings {
    /// Inter-request delay as a [`Duration`].
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl MissiveConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AdapterError::ConfigError(format!("invalid TOML: {e}")))
    }

    /// Load the TOML file at `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            AdapterError::ConfigError(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load `path`, apply process environment overrides and validate.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `MISSIVE_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` as the variable source.
    ///
    /// Unparsable numeric values are ignored with a debug log.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("MISSIVE_API_TOKEN") {
            self.missive.api_token = Some(token.trim().to_string());
        }
        if let Some(url) = get("MISSIVE_API_BASE_URL") {
            self.missive.base_url = url.trim().to_string();
        }
        if let Some(raw) = get("MISSIVE_TIMEOUT_SECS") {
            match raw.trim().parse() {
                Ok(secs) => self.missive.timeout_secs = secs,
                Err(_) => debug!(value = %raw, "ignoring invalid MISSIVE_TIMEOUT_SECS"),
            }
        }
        if let Some(raw) = get("MISSIVE_INTERNAL_DOMAINS") {
            self.metrics.internal_domains = split_list(&raw);
        }
        if let Some(raw) = get("MISSIVE_IGNORED_DOMAINS") {
            self.metrics.ignored_domains = split_list(&raw);
        }
        if let Some(raw) = get("MISSIVE_REQUEST_DELAY_MS") {
            match raw.trim().parse() {
                Ok(ms) => self.metrics.request_delay_ms = ms,
                Err(_) => debug!(value = %raw, "ignoring invalid MISSIVE_REQUEST_DELAY_MS"),
            }
        }
    }

    /// Check invariants and normalise domain lists.
    pub fn validate(&mut self) -> Result<()> {
        self.missive.base_url = self.missive.base_url.trim_end_matches('/').to_string();
        let parsed = url::Url::parse(&self.missive.base_url).map_err(|e| {
            AdapterError::ConfigError(format!("invalid base_url `{}`: {e}", self.missive.base_url))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AdapterError::ConfigError(format!(
                "base_url must use http or https, got `{}`",
                parsed.scheme()
            )));
        }
        if self.missive.timeout_secs == 0 {
            return Err(AdapterError::ConfigError(
                "timeout_secs must be greater than zero".into(),
            ));
        }
        if !(1..=MAX_CONVERSATION_PAGE).contains(&self.metrics.page_size) {
            return Err(AdapterError::ConfigError(format!(
                "metrics.page_size must be between 1 and {MAX_CONVERSATION_PAGE}"
            )));
        }
        if self.metrics.max_message_pages == 0 {
            return Err(AdapterError::ConfigError(
                "metrics.max_message_pages must be at least 1".into(),
            ));
        }

        self.metrics.internal_domains = normalize_domains(&self.metrics.internal_domains);
        self.metrics.ignored_domains = normalize_domains(&self.metrics.ignored_domains);
        Ok(())
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lowercase, strip a leading `@` and drop empties and duplicates.
pub fn normalize_domains(domains: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(domains.len());
    for domain in domains {
        let d = domain.trim().trim_start_matches('@').to_ascii_lowercase();
        if !d.is_empty() && !out.contains(&d) {
            out.push(d);
        }
    }
    out
}
