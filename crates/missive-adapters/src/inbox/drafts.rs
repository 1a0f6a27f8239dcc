//! Drafts: create (or send immediately), list and delete.

use serde_json::{Map, Value, json};

use crate::client::MissiveClient;
use crate::error::Result;
use crate::format::{format_timestamp, id_of, items, str_or, timestamp_field};
use crate::params::Params;
use crate::traits::ToolDefinition;

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "create_draft".into(),
            description: "Create a draft, schedule it, or send an email/SMS immediately".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "account_id": {
                        "type": "string",
                        "description": "Account ID to send from"
                    },
                    "to_fields_data": {
                        "type": "string",
                        "description": "JSON recipients, e.g. [{\"address\": \"email@example.com\", \"name\": \"John\"}]"
                    },
                    "subject": { "type": "string", "description": "Subject (required for email)" },
                    "body": { "type": "string", "description": "HTML or text body" },
                    "send": {
                        "type": "boolean",
                        "description": "Send immediately instead of saving a draft (default: false)"
                    },
                    "send_at": {
                        "type": "integer",
                        "description": "Unix timestamp to schedule sending (ignored when send is true)"
                    },
                    "conversation_id": {
                        "type": "string",
                        "description": "Add the draft to an existing conversation"
                    },
                    "team_id": { "type": "string", "description": "Link the conversation to a team" },
                    "add_shared_labels": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Shared label IDs to add"
                    },
                    "add_assignees": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "User IDs to assign"
                    },
                    "close": {
                        "type": "boolean",
                        "description": "Close the conversation after sending (default: false)"
                    }
                },
                "required": ["account_id", "to_fields_data"]
            }),
        },
        ToolDefinition {
            name: "get_conversation_drafts".into(),
            description: "Get drafts from a specific conversation".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "conversation_id": {
                        "type": "string",
                        "description": "The ID of the conversation"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Number of drafts to return (default: 10, max: 25)"
                    }
                },
                "required": ["conversation_id"]
            }),
        },
        ToolDefinition {
            name: "delete_draft".into(),
            description: "Delete a draft or cancel a scheduled message".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "draft_id": {
                        "type": "string",
                        "description": "The ID of the draft to delete"
                    }
                },
                "required": ["draft_id"]
            }),
        },
    ]
}

/// Outcome of building a draft request, kept for rendering the reply.
struct DraftRequest {
    payload: Value,
    send: bool,
    send_at: Option<i64>,
}

fn draft_request(p: Params<'_>) -> Result<DraftRequest> {
    let mut draft = Map::new();
    draft.insert("account".into(), json!(p.required_str("account_id")?));
    draft.insert("to_fields".into(), p.required_json("to_fields_data")?);

    if let Some(subject) = p.str("subject") {
        draft.insert("subject".into(), json!(subject));
    }
    if let Some(body) = p.str("body") {
        draft.insert("body".into(), json!(body));
    }

    let send = p.flag("send")?;
    let send_at = if send {
        None
    } else {
        p.i64("send_at")?.filter(|ts| *ts > 0)
    };
    if send {
        draft.insert("send".into(), json!(true));
    }
    if let Some(ts) = send_at {
        draft.insert("send_at".into(), json!(ts));
    }

    if let Some(conversation) = p.str("conversation_id") {
        draft.insert("conversation".into(), json!(conversation));
    }
    if let Some(team) = p.str("team_id") {
        draft.insert("team".into(), json!(team));
    }
    if let Some(labels) = p.string_list("add_shared_labels")? {
        draft.insert("add_shared_labels".into(), json!(labels));
    }
    if let Some(assignees) = p.string_list("add_assignees")? {
        draft.insert("add_assignees".into(), json!(assignees));
    }
    if p.flag("close")? {
        draft.insert("close".into(), json!(true));
    }

    Ok(DraftRequest {
        payload: json!({ "drafts": draft }),
        send,
        send_at,
    })
}

/// `Name <address>` with empty defaults, trimmed.
fn recipient(field: &Value) -> String {
    format!(
        "{} <{}>",
        str_or(field, "name", ""),
        str_or(field, "address", "")
    )
    .trim()
    .to_string()
}

fn recipients(fields: &[Value]) -> String {
    fields.iter().map(recipient).collect::<Vec<_>>().join(", ")
}

pub(super) async fn create_draft(client: &MissiveClient, params: &Value) -> Result<Value> {
    let request = draft_request(Params::new("create_draft", params))?;
    let data = client
        .post("create_draft", "/drafts", &request.payload)
        .await?;
    let draft = data.get("drafts").unwrap_or(&Value::Null);
    let sent = &request.payload["drafts"];

    let mut out = String::from(if request.send {
        "Message Sent Successfully!\n\n"
    } else {
        "Draft Created Successfully!\n\n"
    });
    out.push_str(&format!("ID: {}\n", id_of(draft)));
    if let Some(subject) = sent.get("subject").and_then(Value::as_str) {
        out.push_str(&format!("Subject: {subject}\n"));
    }
    match sent.get("to_fields") {
        Some(Value::Array(to)) => out.push_str(&format!("To: {}\n", recipients(to))),
        Some(other) => out.push_str(&format!("To: {other}\n")),
        None => {}
    }
    if let Some(ts) = request.send_at {
        out.push_str(&format!("Scheduled for: {}\n", format_timestamp(ts)));
    }
    if let Some(conversation) = sent.get("conversation").and_then(Value::as_str) {
        out.push_str(&format!("Conversation: {conversation}\n"));
    }
    if let Some(team) = sent.get("team").and_then(Value::as_str) {
        out.push_str(&format!("Team: {team}\n"));
    }
    Ok(Value::String(out))
}

pub(super) async fn get_conversation_drafts(
    client: &MissiveClient,
    params: &Value,
) -> Result<Value> {
    let p = Params::new("get_conversation_drafts", params);
    let id = p.required_str("conversation_id")?;
    let limit = p.limit("limit", 10, 25)?;

    let data = client
        .get(
            "get_conversation_drafts",
            &format!("/conversations/{id}/drafts"),
            &[("limit", limit.to_string())],
        )
        .await
        .map_err(|e| e.or_not_found(format!("conversation {id}")))?;

    let drafts = items(&data, "drafts");
    if drafts.is_empty() {
        return Ok(Value::String(format!("No drafts found in conversation {id}")));
    }

    let mut out = format!("Drafts in Conversation ({} found):\n\n", drafts.len());
    for (i, draft) in drafts.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, str_or(draft, "subject", "No subject")));
        let to = items(draft, "to_fields");
        if !to.is_empty() {
            out.push_str(&format!("   To: {}\n", recipients(to)));
        }
        if let Some(ts) = timestamp_field(draft, "send_at") {
            out.push_str(&format!("   Scheduled: {}\n", format_timestamp(ts)));
        }
        if let Some(ts) = timestamp_field(draft, "created_at") {
            out.push_str(&format!("   Created: {}\n", format_timestamp(ts)));
        }
        out.push_str(&format!("   Draft ID: {}\n\n", id_of(draft)));
    }
    Ok(Value::String(out))
}

pub(super) async fn delete_draft(client: &MissiveClient, params: &Value) -> Result<Value> {
    let p = Params::new("delete_draft", params);
    let id = p.required_str("draft_id")?;
    client
        .delete("delete_draft", &format!("/drafts/{id}"))
        .await
        .map_err(|e| e.or_not_found(format!("draft {id}")))?;
    Ok(Value::String(format!("Draft {id} deleted successfully.")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_drops_send_at() {
        let params = json!({
            "account_id": "acc",
            "to_fields_data": "[{\"address\": \"a@b.io\"}]",
            "send": true,
            "send_at": 1_700_000_000
        });
        let request = draft_request(Params::new("create_draft", &params)).unwrap();
        assert!(request.send);
        assert_eq!(request.send_at, None);
        assert_eq!(request.payload["drafts"]["send"], true);
        assert!(request.payload["drafts"].get("send_at").is_none());
    }

    #[test]
    fn scheduled_draft_keeps_send_at() {
        let params = json!({
            "account_id": "acc",
            "to_fields_data": [{"address": "a@b.io"}],
            "send_at": 1_700_000_000,
            "add_assignees": ["u1"],
            "close": true
        });
        let request = draft_request(Params::new("create_draft", &params)).unwrap();
        assert!(!request.send);
        assert_eq!(request.payload["drafts"]["send_at"], 1_700_000_000);
        assert_eq!(request.payload["drafts"]["add_assignees"], json!(["u1"]));
        assert_eq!(request.payload["drafts"]["close"], true);
        assert!(request.payload["drafts"].get("send").is_none());
    }

    #[test]
    fn bad_recipient_json_is_invalid_params() {
        let params = json!({"account_id": "acc", "to_fields_data": "not json"});
        let err = draft_request(Params::new("create_draft", &params)).err().unwrap();
        assert!(err.to_string().contains("to_fields_data"));
    }

    #[test]
    fn recipients_trim_missing_names() {
        let to = json!([{"address": "a@b.io"}, {"name": "Jo", "address": "jo@b.io"}]);
        assert_eq!(recipients(to.as_array().unwrap()), "<a@b.io>, Jo <jo@b.io>");
    }
}
