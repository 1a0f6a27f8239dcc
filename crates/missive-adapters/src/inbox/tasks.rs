//! Task creation and updates.

use serde_json::{Map, Value, json};

use crate::client::MissiveClient;
use crate::error::Result;
use crate::format::{format_timestamp, id_of, join_strings, items, name_or_id, str_or, timestamp_field};
use crate::params::{Params, clip};
use crate::traits::ToolDefinition;

const MAX_TITLE_CHARS: usize = 1000;
const MAX_DESCRIPTION_CHARS: usize = 10_000;
const TASK_STATES: [&str; 3] = ["todo", "in_progress", "closed"];

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "create_task".into(),
            description: "Create a standalone task or a conversation subtask".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "Task title (max 1000 characters)"
                    },
                    "description": {
                        "type": "string",
                        "description": "Task description (max 10000 characters)"
                    },
                    "organization_id": {
                        "type": "string",
                        "description": "Organization ID (needed with team_id or assignee_ids)"
                    },
                    "team_id": {
                        "type": "string",
                        "description": "Team ID; standalone tasks need team_id or assignee_ids"
                    },
                    "assignee_ids": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "User IDs to assign"
                    },
                    "due_date_timestamp": {
                        "type": "integer",
                        "description": "Unix timestamp for the due date"
                    },
                    "conversation_id": {
                        "type": "string",
                        "description": "Parent conversation (required when is_subtask is true)"
                    },
                    "is_subtask": {
                        "type": "boolean",
                        "description": "Create the task as a subtask of conversation_id (default: false)"
                    }
                },
                "required": ["title"]
            }),
        },
        ToolDefinition {
            name: "update_task".into(),
            description: "Update the title, description, state, assignees, team or due date of a task".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "task_id": {
                        "type": "string",
                        "description": "ID of the task to update"
                    },
                    "title": { "type": "string", "description": "New title (max 1000 characters)" },
                    "description": { "type": "string", "description": "New description (max 10000 characters)" },
                    "state": {
                        "type": "string",
                        "enum": TASK_STATES,
                        "description": "New state"
                    },
                    "assignee_ids": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "New list of assigned user IDs"
                    },
                    "team_id": { "type": "string", "description": "New team ID" },
                    "due_date_timestamp": {
                        "type": "integer",
                        "description": "New due date as a Unix timestamp"
                    }
                },
                "required": ["task_id"]
            }),
        },
    ]
}

/// Build the `tasks` object for `POST /tasks`.
fn create_payload(p: Params<'_>) -> Result<Value> {
    let title = p.required_str("title")?;
    let description = p.str("description").unwrap_or("");

    let mut task = Map::new();
    task.insert("title".into(), json!(clip(title, MAX_TITLE_CHARS)));
    task.insert(
        "description".into(),
        json!(clip(description, MAX_DESCRIPTION_CHARS)),
    );

    let team_id = p.str("team_id");
    let assignees = p.string_list("assignee_ids")?;

    if let Some(org) = p.str("organization_id") {
        task.insert("organization".into(), json!(org));
    }
    if let Some(team) = team_id {
        task.insert("team".into(), json!(team));
    }
    if let Some(ref ids) = assignees {
        task.insert("assignees".into(), json!(ids));
    }
    if let Some(due) = p.i64("due_date_timestamp")?.filter(|ts| *ts > 0) {
        task.insert("due_at".into(), json!(due));
    }

    if p.flag("is_subtask")? {
        let conversation = p
            .str("conversation_id")
            .ok_or_else(|| p.invalid("conversation_id is required when creating a subtask"))?;
        task.insert("conversation".into(), json!(conversation));
        task.insert("subtask".into(), json!(true));
    } else if team_id.is_none() && assignees.is_none() {
        return Err(p.invalid("either team_id or assignee_ids is required for standalone tasks"));
    }

    Ok(json!({ "tasks": task }))
}

/// Build the `tasks` object for `PATCH /tasks/{id}` from the supplied fields.
fn update_payload(p: Params<'_>) -> Result<Value> {
    let mut task = Map::new();

    if let Some(title) = p.str("title") {
        task.insert("title".into(), json!(clip(title, MAX_TITLE_CHARS)));
    }
    if let Some(description) = p.str("description") {
        task.insert(
            "description".into(),
            json!(clip(description, MAX_DESCRIPTION_CHARS)),
        );
    }
    if let Some(state) = p.str("state") {
        if !TASK_STATES.contains(&state) {
            return Err(p.invalid(format!(
                "state must be one of: {}",
                TASK_STATES.join(", ")
            )));
        }
        task.insert("state".into(), json!(state));
    }
    if let Some(ids) = p.string_list("assignee_ids")? {
        task.insert("assignees".into(), json!(ids));
    }
    if let Some(team) = p.str("team_id") {
        task.insert("team".into(), json!(team));
    }
    if let Some(due) = p.i64("due_date_timestamp")? {
        task.insert("due_at".into(), json!(due));
    }

    if task.is_empty() {
        return Err(p.invalid("at least one field must be provided to update"));
    }
    Ok(json!({ "tasks": task }))
}

fn render_task(header: &str, task: &Value) -> String {
    let mut out = format!("{header}\n\n");
    out.push_str(&format!(
        "Title: {}\nDescription: {}\nState: {}\nTask ID: {}\n",
        str_or(task, "title", "Unknown"),
        str_or(task, "description", "No description"),
        str_or(task, "state", "unknown"),
        id_of(task)
    ));
    if let Some(due) = timestamp_field(task, "due_at") {
        out.push_str(&format!("Due: {}\n", format_timestamp(due)));
    }
    let assignees = items(task, "assignees");
    if !assignees.is_empty() {
        out.push_str(&format!("Assignees: {}\n", join_strings(assignees)));
    }
    if let Some(team) = task.get("team").filter(|t| !t.is_null()) {
        out.push_str(&format!("Team: {}\n", name_or_id(team)));
    }
    if let Some(conversation) = task.get("conversation").filter(|c| !c.is_null()) {
        out.push_str(&format!("Conversation: {}\n", name_or_id(conversation)));
    }
    out
}

pub(super) async fn create_task(client: &MissiveClient, params: &Value) -> Result<Value> {
    let payload = create_payload(Params::new("create_task", params))?;
    let data = client.post("create_task", "/tasks", &payload).await?;
    let task = data.get("tasks").unwrap_or(&Value::Null);
    Ok(Value::String(render_task("Task Created Successfully!", task)))
}

pub(super) async fn update_task(client: &MissiveClient, params: &Value) -> Result<Value> {
    let p = Params::new("update_task", params);
    let id = p.required_str("task_id")?;
    let payload = update_payload(p)?;
    let data = client
        .patch("update_task", &format!("/tasks/{id}"), &payload)
        .await
        .map_err(|e| e.or_not_found(format!("task {id}")))?;
    let task = data.get("tasks").unwrap_or(&Value::Null);
    Ok(Value::String(render_task("Task Updated Successfully!", task)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standalone_task_needs_team_or_assignees() {
        let params = json!({"title": "Follow up"});
        let err = create_payload(Params::new("create_task", &params)).unwrap_err();
        assert!(err.to_string().contains("team_id or assignee_ids"));

        let params = json!({"title": "Follow up", "assignee_ids": ["u1", "u2"]});
        let payload = create_payload(Params::new("create_task", &params)).unwrap();
        assert_eq!(payload["tasks"]["assignees"], json!(["u1", "u2"]));
        assert_eq!(payload["tasks"]["description"], "");
    }

    #[test]
    fn subtask_needs_conversation() {
        let params = json!({"title": "Reply", "is_subtask": true});
        let err = create_payload(Params::new("create_task", &params)).unwrap_err();
        assert!(err.to_string().contains("conversation_id"));

        let params = json!({"title": "Reply", "is_subtask": true, "conversation_id": "c1"});
        let payload = create_payload(Params::new("create_task", &params)).unwrap();
        assert_eq!(payload["tasks"]["conversation"], "c1");
        assert_eq!(payload["tasks"]["subtask"], true);
    }

    #[test]
    fn title_and_description_are_clipped() {
        let params = json!({
            "title": "t".repeat(1500),
            "description": "d".repeat(12_000),
            "team_id": "team-1",
            "due_date_timestamp": 1_700_000_000
        });
        let payload = create_payload(Params::new("create_task", &params)).unwrap();
        assert_eq!(payload["tasks"]["title"].as_str().unwrap().len(), 1000);
        assert_eq!(payload["tasks"]["description"].as_str().unwrap().len(), 10_000);
        assert_eq!(payload["tasks"]["due_at"], 1_700_000_000);
    }

    #[test]
    fn update_requires_a_field_and_valid_state() {
        let params = json!({"task_id": "t1"});
        let err = update_payload(Params::new("update_task", &params)).unwrap_err();
        assert!(err.to_string().contains("at least one field"));

        let params = json!({"task_id": "t1", "state": "done"});
        let err = update_payload(Params::new("update_task", &params)).unwrap_err();
        assert!(err.to_string().contains("todo, in_progress, closed"));

        let params = json!({"task_id": "t1", "state": "in_progress"});
        let payload = update_payload(Params::new("update_task", &params)).unwrap();
        assert_eq!(payload, json!({"tasks": {"state": "in_progress"}}));
    }

    #[test]
    fn render_task_includes_optional_fields() {
        let task = json!({
            "id": "t1",
            "title": "Call back",
            "state": "todo",
            "assignees": ["u1"],
            "team": "team-1",
            "conversation": "c1"
        });
        let out = render_task("Task Created Successfully!", &task);
        assert!(out.contains("Title: Call back"));
        assert!(out.contains("Description: No description"));
        assert!(out.contains("Assignees: u1"));
        assert!(out.contains("Team: team-1"));
        assert!(out.contains("Conversation: c1"));
        assert!(!out.contains("Due:"));
    }
}
