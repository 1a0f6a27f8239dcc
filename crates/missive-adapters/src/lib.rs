//! Missive REST API adapters.
//!
//! Each adapter implements the [`Adapter`] trait defined in [`traits`],
//! providing a uniform interface for tool discovery and execution.  The
//! [`InboxAdapter`] covers conversations, messages, tasks, drafts, posts,
//! contacts and the organization directory; the [`AnalyticsAdapter`] covers
//! analytics reports and client-side team metrics.

pub mod analytics;
pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod inbox;
pub mod params;
pub mod traits;

pub use analytics::AnalyticsAdapter;
pub use client::MissiveClient;
pub use config::{ApiSettings, MetricsSettings, MissiveConfig};
pub use error::{AdapterError, Result};
pub use inbox::InboxAdapter;
pub use traits::{Adapter, AdapterType, AuthRequirement, HealthStatus, ToolDefinition};
