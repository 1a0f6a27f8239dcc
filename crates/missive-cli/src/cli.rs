//! CLI argument definitions for the Missive MCP server.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Missive MCP server -- the Missive inbox API as assistant tools.
#[derive(Parser, Debug)]
#[command(
    name = "missive-mcp",
    version,
    about = "Missive MCP server -- Missive inbox tools over the Model Context Protocol",
    long_about = "Exposes the Missive REST API (conversations, tasks, drafts, contacts, \
                  analytics) as MCP tools over stdio. Set MISSIVE_API_TOKEN before use."
)]
pub struct Cli {
    /// Path to the TOML configuration file (a missing file is allowed).
    #[arg(long, global = true, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Log filter used when RUST_LOG is not set. Logs go to stderr.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Serve MCP over stdin/stdout until the host closes the stream (default).
    Serve,

    /// List the exposed tools.
    Tools {
        /// Print the `tools/list` payload as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check connectivity and credentials against the Missive API.
    Check,
}

impl Cli {
    /// The subcommand to run, `serve` when none was given.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::try_parse_from(["missive-mcp"]).unwrap();
        assert_eq!(cli.command(), Commands::Serve);
        assert_eq!(cli.config, PathBuf::from("config/default.toml"));
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "missive-mcp",
            "tools",
            "--json",
            "--config",
            "/tmp/m.toml",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.command(), Commands::Tools { json: true });
        assert_eq!(cli.config, PathBuf::from("/tmp/m.toml"));
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["missive-mcp", "bogus"]).is_err());
    }

    #[test]
    fn check_parses() {
        let cli = Cli::try_parse_from(["missive-mcp", "check"]).unwrap();
        assert_eq!(cli.command(), Commands::Check);
    }
}
