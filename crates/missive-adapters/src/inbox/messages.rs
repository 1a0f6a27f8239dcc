//! Message lookup and custom-channel message creation.

use serde_json::{Map, Value, json};

use crate::client::MissiveClient;
use crate::error::{AdapterError, Result};
use crate::format::{
    address, addresses, count, format_timestamp, id_of, items, non_empty, object, preview,
    single, str_or, strip_html, timestamp_field,
};
use crate::params::Params;
use crate::traits::ToolDefinition;

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_message_details".into(),
            description: "Get full details of a message including body and attachments".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "message_id": {
                        "type": "string",
                        "description": "The ID of the message to retrieve"
                    }
                },
                "required": ["message_id"]
            }),
        },
        ToolDefinition {
            name: "search_messages_by_email_id".into(),
            description: "Find messages by their email Message-ID header".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "email_message_id": {
                        "type": "string",
                        "description": "The Message-ID found in an email's headers"
                    }
                },
                "required": ["email_message_id"]
            }),
        },
        ToolDefinition {
            name: "create_custom_message".into(),
            description: "Create a message in a custom channel".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "account_id": {
                        "type": "string",
                        "description": "Account ID from the custom channel settings"
                    },
                    "body": {
                        "type": "string",
                        "description": "HTML or text message body"
                    },
                    "from_field_data": {
                        "type": "string",
                        "description": "JSON sender, e.g. {\"name\": \"John\", \"address\": \"john@example.com\"}"
                    },
                    "to_fields_data": {
                        "type": "string",
                        "description": "JSON recipients, e.g. [{\"name\": \"Jane\", \"address\": \"jane@example.com\"}]"
                    },
                    "subject": {
                        "type": "string",
                        "description": "Subject (email-like channels only)"
                    },
                    "conversation_id": {
                        "type": "string",
                        "description": "Append to an existing conversation"
                    }
                },
                "required": ["account_id", "body", "from_field_data", "to_fields_data"]
            }),
        },
    ]
}

fn render_attachment(attachment: &Value) -> String {
    let mut out = format!(
        "  - {} ({} bytes)\n    Type: {}/{}\n",
        str_or(attachment, "filename", "Unknown"),
        count(attachment, "size"),
        str_or(attachment, "media_type", "unknown"),
        str_or(attachment, "sub_type", "unknown"),
    );
    let (width, height) = (count(attachment, "width"), count(attachment, "height"));
    if width > 0 && height > 0 {
        out.push_str(&format!("    Dimensions: {width}x{height}\n"));
    }
    out
}

fn render_details(message: &Value) -> String {
    let mut out = String::from("Message Details:\n\n");
    out.push_str(&format!(
        "Subject: {}\nType: {}\nMessage ID: {}\n",
        str_or(message, "subject", "No subject"),
        str_or(message, "type", "unknown"),
        id_of(message)
    ));

    if let Some(from) = object(message, "from_field") {
        out.push_str(&format!("From: {}\n", address(from)));
    }
    let to = items(message, "to_fields");
    if !to.is_empty() {
        out.push_str(&format!("To: {}\n", addresses(to)));
    }
    let cc = items(message, "cc_fields");
    if !cc.is_empty() {
        out.push_str(&format!("CC: {}\n", addresses(cc)));
    }
    if let Some(ts) = timestamp_field(message, "delivered_at") {
        out.push_str(&format!("Delivered: {}\n", format_timestamp(ts)));
    }
    if let Some(ts) = timestamp_field(message, "created_at") {
        out.push_str(&format!("Created: {}\n", format_timestamp(ts)));
    }
    if let Some(text) = non_empty(message, "preview") {
        out.push_str(&format!("Preview: {text}\n"));
    }
    if let Some(body) = non_empty(message, "body") {
        out.push_str(&format!("Body: {}\n", preview(&strip_html(body), 500)));
    }

    let attachments = items(message, "attachments");
    if !attachments.is_empty() {
        out.push_str(&format!("\nAttachments ({}):\n", attachments.len()));
        for attachment in attachments {
            out.push_str(&render_attachment(attachment));
        }
    }

    if let Some(conversation) = object(message, "conversation") {
        out.push_str(&format!(
            "\nConversation: {}\nConversation ID: {}\n",
            str_or(conversation, "latest_message_subject", "No subject"),
            id_of(conversation)
        ));
        if let Some(team) = object(conversation, "team") {
            out.push_str(&format!("Team: {}\n", str_or(team, "name", "Unknown")));
        }
        if let Some(org) = object(conversation, "organization") {
            out.push_str(&format!("Organization: {}\n", str_or(org, "name", "Unknown")));
        }
    }
    out
}

pub(super) async fn get_message_details(client: &MissiveClient, params: &Value) -> Result<Value> {
    let p = Params::new("get_message_details", params);
    let id = p.required_str("message_id")?;
    let resource = format!("message {id}");

    let data = client
        .get("get_message_details", &format!("/messages/{id}"), &[])
        .await
        .map_err(|e| e.or_not_found(resource.as_str()))?;

    let Some(message) = single(&data, "messages") else {
        return Err(AdapterError::NotFound { resource });
    };
    Ok(Value::String(render_details(message)))
}

pub(super) async fn search_messages_by_email_id(
    client: &MissiveClient,
    params: &Value,
) -> Result<Value> {
    let p = Params::new("search_messages_by_email_id", params);
    let email_id = p.required_str("email_message_id")?;

    let data = client
        .get(
            "search_messages_by_email_id",
            "/messages",
            &[("email_message_id", email_id.to_string())],
        )
        .await
        .map_err(|e| e.or_not_found(format!("messages with Message-ID {email_id}")))?;

    let messages = items(&data, "messages");
    if messages.is_empty() {
        return Ok(Value::String(format!(
            "No messages found with email Message-ID: {email_id}"
        )));
    }

    let mut out = format!(
        "Messages found for Message-ID '{email_id}' ({} found):\n\n",
        messages.len()
    );
    for (i, message) in messages.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, str_or(message, "subject", "No subject")));
        if let Some(from) = object(message, "from_field") {
            out.push_str(&format!("   From: {}\n", address(from)));
        }
        let to = items(message, "to_fields");
        if !to.is_empty() {
            out.push_str(&format!("   To: {}\n", addresses(to)));
        }
        if let Some(text) = non_empty(message, "preview") {
            out.push_str(&format!("   Preview: {}\n", preview(text, 100)));
        }
        if let Some(ts) = timestamp_field(message, "delivered_at") {
            out.push_str(&format!("   Delivered: {}\n", format_timestamp(ts)));
        }
        out.push_str(&format!(
            "   Type: {}\n   Message ID: {}\n\n",
            str_or(message, "type", "unknown"),
            id_of(message)
        ));
    }
    Ok(Value::String(out))
}

fn custom_message_payload(p: Params<'_>) -> Result<Value> {
    let mut message = Map::new();
    message.insert("account".into(), json!(p.required_str("account_id")?));
    message.insert("body".into(), json!(p.required_str("body")?));
    message.insert("from_field".into(), p.required_json("from_field_data")?);
    message.insert("to_fields".into(), p.required_json("to_fields_data")?);
    if let Some(subject) = p.str("subject") {
        message.insert("subject".into(), json!(subject));
    }
    if let Some(conversation) = p.str("conversation_id") {
        message.insert("conversation".into(), json!(conversation));
    }
    Ok(json!({ "messages": message }))
}

pub(super) async fn create_custom_message(
    client: &MissiveClient,
    params: &Value,
) -> Result<Value> {
    let payload = custom_message_payload(Params::new("create_custom_message", params))?;
    let data = client
        .post("create_custom_message", "/messages", &payload)
        .await?;
    let message = data.get("messages").unwrap_or(&Value::Null);

    let mut out = String::from("Message Created Successfully!\n\n");
    out.push_str(&format!(
        "Subject: {}\nType: {}\nMessage ID: {}\n",
        str_or(message, "subject", "No subject"),
        str_or(message, "type", "unknown"),
        id_of(message)
    ));
    if let Some(from) = object(message, "from_field") {
        out.push_str(&format!("From: {}\n", address(from)));
    }
    let to = items(message, "to_fields");
    if !to.is_empty() {
        out.push_str(&format!("To: {}\n", addresses(to)));
    }
    if let Some(ts) = timestamp_field(message, "delivered_at") {
        out.push_str(&format!("Delivered: {}\n", format_timestamp(ts)));
    }
    Ok(Value::String(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_strip_html_and_clip_body() {
        let body = format!("<div>{}</div>", "a".repeat(600));
        let message = json!({
            "id": "m1",
            "subject": "Invoice",
            "type": "email",
            "from_field": {"name": "Ann", "address": "ann@client.io"},
            "cc_fields": [{"name": "Bob", "address": "bob@client.io"}],
            "body": body,
            "attachments": [
                {"filename": "a.png", "size": 1024, "media_type": "image", "sub_type": "png", "width": 10, "height": 20},
                {"filename": "b.pdf", "size": 5}
            ],
            "conversation": {"id": "c1", "latest_message_subject": "Invoice", "team": {"name": "Support"}}
        });
        let out = render_details(&message);
        assert!(out.contains("From: Ann <ann@client.io>"));
        assert!(out.contains("CC: Bob <bob@client.io>"));
        assert!(out.contains(&format!("Body: {}...", "a".repeat(500))));
        assert!(!out.contains("<div>"));
        assert!(out.contains("Attachments (2):"));
        assert!(out.contains("Dimensions: 10x20"));
        assert!(out.contains("Type: unknown/unknown"));
        assert!(out.contains("Conversation ID: c1"));
        assert!(out.contains("Team: Support"));
    }

    #[test]
    fn custom_message_parses_json_fields() {
        let params = json!({
            "account_id": "acc",
            "body": "Hello",
            "from_field_data": "{\"name\": \"Bot\", \"address\": \"bot@x.io\"}",
            "to_fields_data": [{"address": "jane@y.io"}],
            "conversation_id": "c9"
        });
        let payload = custom_message_payload(Params::new("create_custom_message", &params)).unwrap();
        assert_eq!(payload["messages"]["from_field"]["name"], "Bot");
        assert_eq!(payload["messages"]["to_fields"][0]["address"], "jane@y.io");
        assert_eq!(payload["messages"]["conversation"], "c9");
        assert!(payload["messages"].get("subject").is_none());
    }

    #[test]
    fn custom_message_rejects_bad_json() {
        let params = json!({
            "account_id": "acc",
            "body": "Hello",
            "from_field_data": "{oops",
            "to_fields_data": "[]"
        });
        let err = custom_message_payload(Params::new("create_custom_message", &params)).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidParams { .. }));
    }
}
