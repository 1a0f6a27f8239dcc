//! Posts: integration-authored entries that can also manage a conversation.

use serde_json::{Map, Value, json};

use crate::client::MissiveClient;
use crate::error::Result;
use crate::format::{format_timestamp, id_of, items, non_empty, object, preview, str_or, timestamp_field};
use crate::params::Params;
use crate::traits::ToolDefinition;

/// Optional string fields copied verbatim into the post payload.
const TEXT_FIELDS: [(&str, &str); 6] = [
    ("conversation_id", "conversation"),
    ("organization_id", "organization"),
    ("username", "username"),
    ("username_icon", "username_icon"),
    ("text", "text"),
    ("markdown", "markdown"),
];

/// List fields and the verb used when reporting them.
const LIST_ACTIONS: [(&str, &str); 4] = [
    ("add_shared_labels", "added {} label(s)"),
    ("remove_shared_labels", "removed {} label(s)"),
    ("add_assignees", "assigned {} user(s)"),
    ("remove_assignees", "unassigned {} user(s)"),
];

/// Flags and how they are reported.
const FLAG_ACTIONS: [(&str, &str); 3] = [
    ("close", "closed conversation"),
    ("reopen", "reopened conversation"),
    ("add_to_inbox", "moved to inbox"),
];

fn id_list_schema(description: &str) -> Value {
    json!({
        "type": "array",
        "items": { "type": "string" },
        "description": description
    })
}

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "create_post".into(),
            description: "Create a post in a conversation, optionally labelling, assigning, closing or reopening it".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "conversation_id": {
                        "type": "string",
                        "description": "Existing conversation; a new one is created when omitted"
                    },
                    "organization_id": {
                        "type": "string",
                        "description": "Organization ID (required when creating a conversation)"
                    },
                    "notification_title": { "type": "string", "description": "Push notification title" },
                    "notification_body": { "type": "string", "description": "Push notification body" },
                    "username": { "type": "string", "description": "Display name of the post author" },
                    "username_icon": { "type": "string", "description": "URL of the author icon" },
                    "text": { "type": "string", "description": "Plain text content" },
                    "markdown": { "type": "string", "description": "Markdown content" },
                    "team_id": { "type": "string", "description": "Link the conversation to a team" },
                    "add_shared_labels": id_list_schema("Shared label IDs to add"),
                    "remove_shared_labels": id_list_schema("Shared label IDs to remove"),
                    "add_assignees": id_list_schema("User IDs to assign"),
                    "remove_assignees": id_list_schema("User IDs to unassign"),
                    "close": { "type": "boolean", "description": "Close the conversation" },
                    "reopen": { "type": "boolean", "description": "Reopen a closed conversation" },
                    "add_to_inbox": { "type": "boolean", "description": "Move the conversation to the inbox" }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "get_conversation_posts".into(),
            description: "Get posts from a specific conversation".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "conversation_id": {
                        "type": "string",
                        "description": "The ID of the conversation"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Number of posts to return (default: 10, max: 25)"
                    }
                },
                "required": ["conversation_id"]
            }),
        },
    ]
}

/// Build the `posts` payload and the list of actions it requests.
fn post_request(p: Params<'_>) -> Result<(Value, Vec<String>)> {
    let mut post = Map::new();
    let mut actions = Vec::new();

    for (field, key) in TEXT_FIELDS {
        if let Some(value) = p.str(field) {
            post.insert(key.into(), json!(value));
        }
    }

    let mut notification = Map::new();
    if let Some(title) = p.str("notification_title") {
        notification.insert("title".into(), json!(title));
    }
    if let Some(body) = p.str("notification_body") {
        notification.insert("body".into(), json!(body));
    }
    if !notification.is_empty() {
        post.insert("notification".into(), Value::Object(notification));
    }

    if let Some(team) = p.str("team_id") {
        post.insert("team".into(), json!(team));
    }

    for (field, report) in FLAG_ACTIONS {
        if p.flag(field)? {
            post.insert(field.into(), json!(true));
            actions.push(report.to_string());
        }
    }
    for (field, template) in LIST_ACTIONS {
        if let Some(ids) = p.string_list(field)? {
            actions.push(template.replace("{}", &ids.len().to_string()));
            post.insert(field.into(), json!(ids));
        }
    }

    Ok((json!({ "posts": post }), actions))
}

pub(super) async fn create_post(client: &MissiveClient, params: &Value) -> Result<Value> {
    let (payload, actions) = post_request(Params::new("create_post", params))?;
    let data = client.post("create_post", "/posts", &payload).await?;
    let post = data.get("posts").unwrap_or(&Value::Null);
    let sent = &payload["posts"];

    let mut out = String::from("Post Created Successfully!\n\n");
    out.push_str(&format!("Post ID: {}\n", id_of(post)));
    if let Some(author) = sent.get("username").and_then(Value::as_str) {
        out.push_str(&format!("Author: {author}\n"));
    }
    if let Some(text) = sent.get("text").and_then(Value::as_str) {
        out.push_str(&format!("Text: {}\n", preview(text, 100)));
    } else if let Some(markdown) = sent.get("markdown").and_then(Value::as_str) {
        out.push_str(&format!("Markdown: {}\n", preview(markdown, 100)));
    }
    if !actions.is_empty() {
        out.push_str(&format!("Actions: {}\n", actions.join(", ")));
    }
    if let Some(conversation) = object(post, "conversation") {
        out.push_str(&format!("Conversation ID: {}\n", id_of(conversation)));
    }
    Ok(Value::String(out))
}

pub(super) async fn get_conversation_posts(
    client: &MissiveClient,
    params: &Value,
) -> Result<Value> {
    let p = Params::new("get_conversation_posts", params);
    let id = p.required_str("conversation_id")?;
    let limit = p.limit("limit", 10, 25)?;

    let data = client
        .get(
            "get_conversation_posts",
            &format!("/conversations/{id}/posts"),
            &[("limit", limit.to_string())],
        )
        .await
        .map_err(|e| e.or_not_found(format!("conversation {id}")))?;

    let posts = items(&data, "posts");
    if posts.is_empty() {
        return Ok(Value::String(format!("No posts found in conversation {id}")));
    }

    let mut out = format!("Posts in Conversation ({} found):\n\n", posts.len());
    for (i, post) in posts.iter().enumerate() {
        out.push_str(&format!("{}. By: {}\n", i + 1, str_or(post, "username", "Unknown")));
        match (non_empty(post, "text"), non_empty(post, "markdown")) {
            (Some(text), _) => out.push_str(&format!("   Text: {}\n", preview(text, 150))),
            (None, Some(markdown)) => {
                out.push_str(&format!("   Content: {}\n", preview(markdown, 150)))
            }
            (None, None) => {}
        }
        if let Some(ts) = timestamp_field(post, "created_at") {
            out.push_str(&format!("   Created: {}\n", format_timestamp(ts)));
        }
        out.push_str(&format!("   Post ID: {}\n\n", id_of(post)));
    }
    Ok(Value::String(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_fields_nest() {
        let params = json!({
            "conversation_id": "c1",
            "notification_title": "Heads up",
            "notification_body": "Order shipped",
            "text": "Shipped via UPS"
        });
        let (payload, actions) = post_request(Params::new("create_post", &params)).unwrap();
        assert_eq!(
            payload["posts"]["notification"],
            json!({"title": "Heads up", "body": "Order shipped"})
        );
        assert_eq!(payload["posts"]["conversation"], "c1");
        assert!(actions.is_empty());
    }

    #[test]
    fn actions_are_reported_in_order() {
        let params = json!({
            "conversation_id": "c1",
            "close": true,
            "add_shared_labels": ["l1", "l2"],
            "remove_assignees": ["u1"]
        });
        let (payload, actions) = post_request(Params::new("create_post", &params)).unwrap();
        assert_eq!(
            actions,
            vec!["closed conversation", "added 2 label(s)", "unassigned 1 user(s)"]
        );
        assert_eq!(payload["posts"]["close"], true);
        assert!(payload["posts"].get("reopen").is_none());
        assert!(payload["posts"].get("notification").is_none());
    }
}
