//! Missive inbox adapter.
//!
//! Exposes conversations, messages, tasks, drafts, posts, contacts and the
//! organization directory as tools.  Every tool issues one request through
//! the shared [`MissiveClient`] and renders the response as text.

mod contacts;
mod conversations;
mod directory;
mod drafts;
mod messages;
mod posts;
mod tasks;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::client::MissiveClient;
use crate::error::{AdapterError, Result};
use crate::traits::{Adapter, AdapterType, AuthRequirement, HealthStatus, ToolDefinition};

/// Adapter for the conversation-centric part of the Missive API.
pub struct InboxAdapter {
    /// Unique identifier for this adapter instance.
    id: String,
    /// Whether the adapter has been connected.
    connected: bool,
    /// Shared API client.
    client: MissiveClient,
}

impl InboxAdapter {
    pub fn new(id: &str, client: MissiveClient) -> Self {
        Self {
            id: id.to_string(),
            connected: false,
            client,
        }
    }
}

/// Build the list of tool definitions for the inbox adapter.
fn build_tool_definitions() -> Vec<ToolDefinition> {
    let mut tools = conversations::definitions();
    tools.extend(tasks::definitions());
    tools.extend(messages::definitions());
    tools.extend(drafts::definitions());
    tools.extend(posts::definitions());
    tools.extend(contacts::definitions());
    tools.extend(directory::definitions());
    tools
}

#[async_trait]
impl Adapter for InboxAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Messaging
    }

    async fn connect(&mut self) -> Result<()> {
        if self.client.has_token() {
            info!(id = %self.id, base_url = %self.client.base_url(), "inbox adapter connected");
        } else {
            info!(id = %self.id, "inbox adapter connected (no API token configured)");
        }
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        info!(id = %self.id, "inbox adapter disconnected");
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

        debug!(tool = name, "executing inbox tool");
        let client = &self.client;
        match name {
            "get_conversations" => conversations::get_conversations(client, &params).await,
            "get_conversations_filtered" => {
                conversations::get_conversations_filtered(client, &params).await
            }
            "get_conversation_details" => {
                conversations::get_conversation_details(client, &params).await
            }
            "get_conversation_messages" => {
                conversations::get_conversation_messages(client, &params).await
            }
            "get_conversation_comments" => {
                conversations::get_conversation_comments(client, &params).await
            }
            "create_task" => tasks::create_task(client, &params).await,
            "update_task" => tasks::update_task(client, &params).await,
            "get_message_details" => messages::get_message_details(client, &params).await,
            "search_messages_by_email_id" => {
                messages::search_messages_by_email_id(client, &params).await
            }
            "create_custom_message" => messages::create_custom_message(client, &params).await,
            "create_draft" => drafts::create_draft(client, &params).await,
            "get_conversation_drafts" => drafts::get_conversation_drafts(client, &params).await,
            "delete_draft" => drafts::delete_draft(client, &params).await,
            "create_post" => posts::create_post(client, &params).await,
            "get_conversation_posts" => posts::get_conversation_posts(client, &params).await,
            "list_contacts" => contacts::list_contacts(client, &params).await,
            "get_contact" => contacts::get_contact(client, &params).await,
            "create_contact" => contacts::create_contact(client, &params).await,
            "update_contact" => contacts::update_contact(client, &params).await,
            "delete_contact" => contacts::delete_contact(client, &params).await,
            "list_contact_books" => contacts::list_contact_books(client, &params).await,
            "list_contact_groups" => contacts::list_contact_groups(client, &params).await,
            "get_users" => directory::get_users(client, &params).await,
            "list_organizations" => directory::list_organizations(client, &params).await,
            "list_teams" => directory::list_teams(client, &params).await,
            "list_shared_labels" => directory::list_shared_labels(client, &params).await,
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

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::*;
    use crate::config::ApiSettings;

    fn adapter(token: Option<&str>) -> InboxAdapter {
        let settings = ApiSettings {
            api_token: token.map(str::to_string),
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 5,
        };
        InboxAdapter::new("inbox", MissiveClient::new(&settings))
    }

    #[test]
    fn exposes_the_full_inbox_catalogue() {
        let tools = adapter(None).tools();
        assert_eq!(tools.len(), 26);
        let names: HashSet<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names.len(), tools.len(), "tool names must be unique");
        for expected in [
            "get_conversations",
            "create_task",
            "get_message_details",
            "create_draft",
            "create_post",
            "list_contacts",
            "list_contact_groups",
            "get_users",
            "list_shared_labels",
        ] {
            assert!(names.contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn every_schema_is_an_object_with_required_list() {
        for tool in adapter(None).tools() {
            assert_eq!(tool.parameters["type"], "object", "{}", tool.name);
            assert!(tool.parameters["required"].is_array(), "{}", tool.name);
        }
    }

    #[test]
    fn metadata() {
        let a = adapter(None);
        assert_eq!(a.id(), "inbox");
        assert_eq!(a.adapter_type(), AdapterType::Messaging);
        let auth = a.required_auth().unwrap();
        assert_eq!(auth.provider, "missive");
        assert_eq!(auth.scopes, vec!["api_token"]);
    }

    #[tokio::test]
    async fn health_reflects_connection_and_token() {
        let mut a = adapter(None);
        assert_eq!(a.health_check().await.unwrap(), HealthStatus::Unhealthy);
        a.connect().await.unwrap();
        assert_eq!(a.health_check().await.unwrap(), HealthStatus::Degraded);
        a.disconnect().await.unwrap();
        assert_eq!(a.health_check().await.unwrap(), HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn execute_tool_rejects_when_not_connected() {
        let a = adapter(Some("t"));
        let err = a.execute_tool("get_conversations", json!({})).await.unwrap_err();
        assert!(err.to_string().contains("not connected"));
    }

    #[tokio::test]
    async fn execute_tool_rejects_unknown_tool() {
        let mut a = adapter(Some("t"));
        a.connect().await.unwrap();
        let err = a.execute_tool("no_such_tool", json!({})).await.unwrap_err();
        assert!(matches!(err, AdapterError::ToolNotFound { .. }));
    }

    #[tokio::test]
    async fn missing_token_fails_before_network() {
        let mut a = adapter(None);
        a.connect().await.unwrap();
        let err = a.execute_tool("list_organizations", json!({})).await.unwrap_err();
        assert!(matches!(err, AdapterError::AuthRequired { .. }));
    }

    #[tokio::test]
    async fn validation_runs_before_network() {
        let mut a = adapter(Some("t"));
        a.connect().await.unwrap();
        let err = a
            .execute_tool("get_conversations_filtered", json!({"mailbox": "spam"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::InvalidParams { .. }));
        assert!(err.to_string().contains("inbox, all, assigned"));
    }
}
