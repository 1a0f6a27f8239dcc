//! Missive analytics adapter.
//!
//! Two families of tools: server-side analytics reports (request, then poll)
//! and client-side team metrics computed from recent conversations.

mod aggregate;
mod reports;
mod team_metrics;

pub use aggregate::{
    ChannelStats, DomainRules, Direction, Sample, TeamMetrics, Window, average, median,
    percentile,
};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::client::MissiveClient;
use crate::config::MetricsSettings;
use crate::error::{AdapterError, Result};
use crate::traits::{Adapter, AdapterType, AuthRequirement, HealthStatus, ToolDefinition};

/// Adapter for analytics reports and team metrics.
pub struct AnalyticsAdapter {
    /// Unique identifier for this adapter instance.
    id: String,
    /// Whether the adapter has been connected.
    connected: bool,
    /// Shared API client.
    client: MissiveClient,
    /// Team metrics tuning.
    settings: MetricsSettings,
}

impl AnalyticsAdapter {
    pub fn new(id: &str, client: MissiveClient, settings: MetricsSettings) -> Self {
        Self {
            id: id.to_string(),
            connected: false,
            client,
            settings,
        }
    }
}

fn build_tool_definitions() -> Vec<ToolDefinition> {
    let mut tools = reports::definitions();
    tools.push(team_metrics::definition());
    tools
}

#[async_trait]
impl Adapter for AnalyticsAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Analytics
    }

    async fn connect(&mut self) -> Result<()> {
        info!(
            id = %self.id,
            internal_domains = ?self.settings.internal_domains,
            request_delay_ms = self.settings.request_delay_ms,
            "analytics adapter connected"
        );
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        info!(id = %self.id, "analytics adapter disconnected");
        self.connected = false;
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        if !self.connected {
            return Ok(HealthStatus::Unhealthy);
        }
        Ok(self.client.probe_health().await)
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        build_tool_definitions()
    }

    async fn execute_tool(&self, name: &str, params: Value) -> Result<Value> {
        if !self.connected {
            return Err(AdapterError::ExecutionFailed {
                tool_name: name.to_string(),
                reason: format!("adapter `{}` is not connected", self.id),
            });
        }

        debug!(tool = name, "executing analytics tool");
        match name {
            "create_analytics_report" => {
                reports::create_analytics_report(&self.client, &params).await
            }
            "get_analytics_report" => reports::get_analytics_report(&self.client, &params).await,
            "get_team_metrics" => {
                team_metrics::get_team_metrics(&self.client, &self.settings, &params).await
            }
            _ => Err(AdapterError::ToolNotFound {
                adapter_id: self.id.clone(),
                tool_name: name.to_string(),
            }),
        }
    }

    fn required_auth(&self) -> Option<AuthRequirement> {
        Some(AuthRequirement {
            provider: "missive".into(),
            scopes: vec!["api_token".into()],
        })
    }
}
