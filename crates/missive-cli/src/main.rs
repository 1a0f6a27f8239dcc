//! CLI entry point for the Missive MCP server.
//!
//! This binary provides the `missive-mcp` command: `serve` (the default)
//! speaks MCP over stdio, `tools` lists the exposed tools and `check` probes
//! the Missive API with the configured credentials.

mod adapters;
mod cli;
mod helpers;

use anyhow::{Context, Result};
use clap::Parser;
use missive_adapters::{HealthStatus, MissiveConfig};
use missive_mcp::McpServer;
use serde_json::json;
use tracing::info;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    helpers::load_dotenv();
    let cli = Cli::parse();
    helpers::init_tracing(&cli.log_level);

    let config = MissiveConfig::load_with_env(&cli.config).with_context(|| {
        format!("failed to load configuration from {}", cli.config.display())
    })?;

    match cli.command() {
        Commands::Serve => cmd_serve(&config).await,
        Commands::Tools { json } => cmd_tools(&config, json).await,
        Commands::Check => {
            if !cmd_check(&config).await? {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Subcommand: serve
// ---------------------------------------------------------------------------

async fn cmd_serve(config: &MissiveConfig) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "starting Missive MCP server");

    let adapters = adapters::init_adapters(config).await?;
    let server = McpServer::new(adapters);
    info!(tools = server.tool_definitions().len(), "serving MCP on stdio");

    missive_mcp::serve_stdio(&server)
        .await
        .context("MCP transport failed")?;

    info!("shutting down");
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: tools
// ---------------------------------------------------------------------------

async fn cmd_tools(config: &MissiveConfig, as_json: bool) -> Result<()> {
    let server = McpServer::new(adapters::init_adapters(config).await?);
    let tools = server.tool_definitions();

    if as_json {
        let payload = serde_json::to_value(tools)
            .and_then(|tools| serde_json::to_string_pretty(&json!({ "tools": tools })))
            .context("failed to encode tool list")?;
        println!("{payload}");
        return Ok(());
    }

    let width = tools.iter().map(|t| t.name.len()).max().unwrap_or(0);
    println!();
    println!("  Missive MCP tools ({})", tools.len());
    println!();
    for tool in tools {
        println!("  {:<width$}  {}", tool.name, tool.description);
    }
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: check
// ---------------------------------------------------------------------------

/// Print each adapter's health; `false` when any adapter is unhealthy.
async fn cmd_check(config: &MissiveConfig) -> Result<bool> {
    let adapters = adapters::init_adapters(config).await?;

    println!();
    println!("  Missive MCP Status");
    println!("  ==================");
    println!();
    println!("  API base URL:     {}", config.missive.base_url);
    match config.missive.api_token {
        Some(_) => println!("  API token:        CONFIGURED"),
        None => println!("  API token:        NOT SET (export MISSIVE_API_TOKEN=...)"),
    }

    let mut all_ok = true;
    for adapter in &adapters {
        let status = adapter
            .health_check()
            .await
            .with_context(|| format!("health check of `{}` failed", adapter.id()))?;
        all_ok &= status != HealthStatus::Unhealthy;
        println!(
            "  {:<17} {status}",
            format!("{} ({}):", adapter.id(), adapter.adapter_type())
        );
    }
    println!();

    Ok(all_ok)
}
