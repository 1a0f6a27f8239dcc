//! Shared adapter initialization.
//!
//! Every subcommand needs the same adapters built from the same
//! configuration; this module is the single place that does it.

use std::sync::Arc;

use anyhow::{Context, Result};
use missive_adapters::{Adapter, AnalyticsAdapter, InboxAdapter, MissiveClient, MissiveConfig};
use tracing::{info, warn};

/// Build and connect the inbox and analytics adapters.
pub async fn init_adapters(config: &MissiveConfig) -> Result<Vec<Arc<dyn Adapter>>> {
    let client = MissiveClient::new(&config.missive);
    if !client.has_token() {
        warn!("MISSIVE_API_TOKEN is not set; every tool call will fail until it is");
    }

    let mut inbox = InboxAdapter::new("inbox", client.clone());
    inbox
        .connect()
        .await
        .context("failed to connect inbox adapter")?;

    let mut analytics = AnalyticsAdapter::new("analytics", client, config.metrics.clone());
    analytics
        .connect()
        .await
        .context("failed to connect analytics adapter")?;

    let adapters: Vec<Arc<dyn Adapter>> = vec![Arc::new(inbox), Arc::new(analytics)];
    info!(
        base_url = %config.missive.base_url,
        adapters = adapters.len(),
        "adapters initialized"
    );
    Ok(adapters)
}
