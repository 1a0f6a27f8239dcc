//! Conversation listing and inspection tools.

use serde_json::{Value, json};

use crate::client::{MissiveClient, Query};
use crate::error::{AdapterError, Result};
use crate::format::{
    address, addresses, count, format_timestamp, id_of, items, join_field, non_empty, object, preview,
    str_or, timestamp_field, title_case,
};
use crate::params::Params;
use crate::traits::ToolDefinition;

/// Mailboxes accepted by `get_conversations_filtered`.
const MAILBOXES: [&str; 8] = [
    "inbox", "all", "assigned", "closed", "flagged", "trashed", "junked", "snoozed",
];

/// Status flags reported for the first user entry of a conversation.
const USER_FLAGS: [&str; 7] = [
    "assigned", "closed", "archived", "flagged", "snoozed", "trashed", "junked",
];

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_conversations".into(),
            description: "Get recent conversations from the Missive inbox".into(),
            parameters: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        ToolDefinition {
            name: "get_conversations_filtered".into(),
            description: "Get conversations from a mailbox, optionally scoped to a team".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "mailbox": {
                        "type": "string",
                        "enum": MAILBOXES,
                        "description": "Mailbox to list (default: inbox)"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Number of conversations to return (default: 10, max: 50)"
                    },
                    "team_id": {
                        "type": "string",
                        "description": "Team ID; scopes the inbox, closed and all mailboxes to the team"
                    }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "get_conversation_details".into(),
            description: "Get detailed information about a specific conversation".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "conversation_id": {
                        "type": "string",
                        "description": "The ID of the conversation to retrieve"
                    }
                },
                "required": ["conversation_id"]
            }),
        },
        ToolDefinition {
            name: "get_conversation_messages".into(),
            description: "Get messages from a specific conversation".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "conversation_id": {
                        "type": "string",
                        "description": "The ID of the conversation"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Number of messages to return (default: 5, max: 10)"
                    }
                },
                "required": ["conversation_id"]
            }),
        },
        ToolDefinition {
            name: "get_conversation_comments".into(),
            description: "Get comments, including task comments, from a specific conversation".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "conversation_id": {
                        "type": "string",
                        "description": "The ID of the conversation"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Number of comments to return (default: 5, max: 10)"
                    }
                },
                "required": ["conversation_id"]
            }),
        },
    ]
}

/// Build the `GET /conversations` query for a mailbox and optional team.
fn mailbox_query(mailbox: &str, team_id: Option<&str>, limit: i64) -> Query {
    let scoped = team_id.and_then(|team| {
        let key = match mailbox {
            "inbox" => "team_inbox",
            "closed" => "team_closed",
            "all" => "team_all",
            _ => return None,
        };
        Some((key, team.to_string()))
    });

    let mailbox_pair = match scoped {
        Some(pair) => pair,
        None => match MAILBOXES.iter().find(|m| **m == mailbox) {
            Some(m) => (*m, "true".to_string()),
            None => ("inbox", "true".to_string()),
        },
    };

    vec![mailbox_pair, ("limit", limit.to_string())]
}

fn authors(conversation: &Value) -> String {
    join_field(items(conversation, "authors"), "name", "Unknown")
}

pub(super) async fn get_conversations(client: &MissiveClient, _params: &Value) -> Result<Value> {
    let query: Query = vec![("inbox", "true".into()), ("limit", "10".into())];
    let data = client
        .get("get_conversations", "/conversations", &query)
        .await?;

    let conversations = items(&data, "conversations");
    if conversations.is_empty() {
        return Ok(Value::String(
            "No conversations found in your Missive inbox".into(),
        ));
    }

    let mut out = String::from("Recent Missive Conversations:\n\n");
    for conversation in conversations.iter().take(5) {
        out.push_str(&format!(
            "- {}\n  From: {}\n\n",
            str_or(conversation, "latest_message_subject", "No subject"),
            authors(conversation)
        ));
    }
    Ok(Value::String(out))
}

pub(super) async fn get_conversations_filtered(
    client: &MissiveClient,
    params: &Value,
) -> Result<Value> {
    let p = Params::new("get_conversations_filtered", params);
    let mailbox = p.str("mailbox").unwrap_or("inbox");
    if !MAILBOXES.contains(&mailbox) {
        return Err(p.invalid(format!(
            "invalid mailbox '{mailbox}'. Valid options: {}",
            MAILBOXES.join(", ")
        )));
    }
    let limit = p.limit("limit", 10, 50)?;
    let query = mailbox_query(mailbox, p.str("team_id"), limit);

    let data = client
        .get("get_conversations_filtered", "/conversations", &query)
        .await?;

    let conversations = items(&data, "conversations");
    if conversations.is_empty() {
        return Ok(Value::String(format!(
            "No conversations found in {mailbox} mailbox"
        )));
    }

    let mut out = format!(
        "Conversations from {} ({} found):\n\n",
        title_case(mailbox),
        conversations.len()
    );
    for conversation in conversations {
        out.push_str(&format!(
            "- {}\n  From: {}\n",
            str_or(conversation, "latest_message_subject", "No subject"),
            authors(conversation)
        ));
        if let Some(assignees) = non_empty(conversation, "assignee_names") {
            out.push_str(&format!("  Assigned: {assignees}\n"));
        }
        let tasks = count(conversation, "tasks_count");
        if tasks > 0 {
            out.push_str(&format!("  Tasks: {tasks}\n"));
        }
        out.push_str(&format!("  ID: {}\n\n", id_of(conversation)));
    }
    Ok(Value::String(out))
}

pub(super) async fn get_conversation_details(
    client: &MissiveClient,
    params: &Value,
) -> Result<Value> {
    let p = Params::new("get_conversation_details", params);
    let id = p.required_str("conversation_id")?;
    let resource = format!("conversation {id}");

    let data = client
        .get(
            "get_conversation_details",
            &format!("/conversations/{id}"),
            &[],
        )
        .await
        .map_err(|e| e.or_not_found(resource.as_str()))?;

    let Some(conv) = items(&data, "conversations").first() else {
        return Err(AdapterError::NotFound { resource });
    };

    let mut out = String::from("Conversation Details:\n\n");
    out.push_str(&format!(
        "Subject: {}\nID: {}\n",
        str_or(conv, "latest_message_subject", "No subject"),
        id_of(conv)
    ));

    if !items(conv, "authors").is_empty() {
        out.push_str(&format!("Authors: {}\n", authors(conv)));
    }
    if let Some(assignees) = non_empty(conv, "assignee_names") {
        out.push_str(&format!("Assigned to: {assignees}\n"));
    }
    if let Some(team) = object(conv, "team") {
        out.push_str(&format!("Team: {}\n", str_or(team, "name", "Unknown")));
    }
    if let Some(org) = object(conv, "organization") {
        out.push_str(&format!("Organization: {}\n", str_or(org, "name", "Unknown")));
    }

    out.push_str(&format!(
        "Messages: {}\nTasks: {} ({} completed)\nAttachments: {}\nDrafts: {}\n",
        count(conv, "messages_count"),
        count(conv, "tasks_count"),
        count(conv, "completed_tasks_count"),
        count(conv, "attachments_count"),
        count(conv, "drafts_count"),
    ));

    if let Some(user) = items(conv, "users").first() {
        let status: Vec<&str> = USER_FLAGS
            .iter()
            .copied()
            .filter(|flag| user.get(*flag).and_then(Value::as_bool).unwrap_or(false))
            .collect();
        if !status.is_empty() {
            out.push_str(&format!("Status: {}\n", status.join(", ")));
        }
    }

    if let Some(labels) = non_empty(conv, "shared_label_names") {
        out.push_str(&format!("Labels: {labels}\n"));
    }
    if let Some(ts) = timestamp_field(conv, "last_activity_at") {
        out.push_str(&format!("Last activity: {}\n", format_timestamp(ts)));
    }
    out.push_str(&format!("\nWeb URL: {}\n", str_or(conv, "web_url", "N/A")));

    Ok(Value::String(out))
}

pub(super) async fn get_conversation_messages(
    client: &MissiveClient,
    params: &Value,
) -> Result<Value> {
    let p = Params::new("get_conversation_messages", params);
    let id = p.required_str("conversation_id")?;
    let limit = p.limit("limit", 5, 10)?;

    let data = client
        .get(
            "get_conversation_messages",
            &format!("/conversations/{id}/messages"),
            &[("limit", limit.to_string())],
        )
        .await
        .map_err(|e| e.or_not_found(format!("conversation {id}")))?;

    let messages = items(&data, "messages");
    if messages.is_empty() {
        return Ok(Value::String(format!(
            "No messages found in conversation {id}"
        )));
    }

    let mut out = format!("Messages in Conversation ({} found):\n\n", messages.len());
    for (i, msg) in messages.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, str_or(msg, "subject", "No subject")));
        if let Some(from) = object(msg, "from_field") {
            out.push_str(&format!("   From: {}\n", address(from)));
        }
        let to = items(msg, "to_fields");
        if !to.is_empty() {
            out.push_str(&format!("   To: {}\n", addresses(to)));
        }
        if let Some(text) = non_empty(msg, "preview") {
            out.push_str(&format!("   Preview: {}\n", preview(text, 100)));
        }
        if let Some(ts) = timestamp_field(msg, "delivered_at") {
            out.push_str(&format!("   Delivered: {}\n", format_timestamp(ts)));
        }
        let attachments = items(msg, "attachments");
        if !attachments.is_empty() {
            out.push_str(&format!("   Attachments: {} file(s)\n", attachments.len()));
        }
        out.push_str(&format!("   Message ID: {}\n\n", id_of(msg)));
    }
    Ok(Value::String(out))
}

pub(super) async fn get_conversation_comments(
    client: &MissiveClient,
    params: &Value,
) -> Result<Value> {
    let p = Params::new("get_conversation_comments", params);
    let id = p.required_str("conversation_id")?;
    let limit = p.limit("limit", 5, 10)?;

    let data = client
        .get(
            "get_conversation_comments",
            &format!("/conversations/{id}/comments"),
            &[("limit", limit.to_string())],
        )
        .await
        .map_err(|e| e.or_not_found(format!("conversation {id}")))?;

    let comments = items(&data, "comments");
    if comments.is_empty() {
        return Ok(Value::String(format!(
            "No comments found in conversation {id}"
        )));
    }

    let mut out = format!("Comments in Conversation ({} found):\n\n", comments.len());
    for (i, comment) in comments.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, str_or(comment, "body", "No content")));
        if let Some(author) = object(comment, "author") {
            out.push_str(&format!(
                "   By: {} <{}>\n",
                str_or(author, "name", "Unknown"),
                str_or(author, "email", "unknown")
            ));
        }
        if let Some(ts) = timestamp_field(comment, "created_at") {
            out.push_str(&format!("   Created: {}\n", format_timestamp(ts)));
        }
        if let Some(task) = object(comment, "task") {
            out.push_str(&format!(
                "   Task: {}\n   Task State: {}\n",
                str_or(task, "description", "No description"),
                str_or(task, "state", "unknown")
            ));
            if let Some(due) = timestamp_field(task, "due_at") {
                out.push_str(&format!("   Due: {}\n", format_timestamp(due)));
            }
            let assignees = items(task, "assignees");
            if !assignees.is_empty() {
                out.push_str(&format!(
                    "   Assigned to: {}\n",
                    join_field(assignees, "name", "Unknown")
                ));
            }
        }
        if let Some(attachment) = object(comment, "attachment") {
            out.push_str(&format!(
                "   Attachment: {}\n",
                str_or(attachment, "filename", "Unknown file")
            ));
        }
        out.push_str(&format!("   Comment ID: {}\n\n", id_of(comment)));
    }
    Ok(Value::String(out))
}
