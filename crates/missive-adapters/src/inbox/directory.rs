//! Users, organizations, teams and shared labels.

use serde_json::{Value, json};

use crate::client::{MissiveClient, Query};
use crate::error::Result;
use crate::format::{id_of, items, name_or_id, non_empty, str_or};
use crate::params::Params;
use crate::traits::ToolDefinition;

fn organization_filter_schema(subject: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "organization_id": {
                "type": "string",
                "description": format!("Only list {subject} of this organization")
            }
        },
        "required": []
    })
}

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_users".into(),
            description: "List users in the organizations the authenticated user belongs to".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "organization_id": { "type": "string", "description": "Organization ID filter" },
                    "limit": {
                        "type": "integer",
                        "description": "Number of users to return (default: 50, max: 200)"
                    },
                    "offset": { "type": "integer", "description": "Offset for pagination (default: 0)" }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "list_organizations".into(),
            description: "List organizations the authenticated user is part of".into(),
            parameters: json!({ "type": "object", "properties": {}, "required": [] }),
        },
        ToolDefinition {
            name: "list_teams".into(),
            description: "List teams".into(),
            parameters: organization_filter_schema("teams"),
        },
        ToolDefinition {
            name: "list_shared_labels".into(),
            description: "List shared labels".into(),
            parameters: organization_filter_schema("shared labels"),
        },
    ]
}

fn organization_query(p: Params<'_>) -> Query {
    p.str("organization_id")
        .map(|org| vec![("organization", org.to_string())])
        .unwrap_or_default()
}

fn in_organization(org: Option<&str>) -> String {
    org.map(|o| format!(" in organization {o}")).unwrap_or_default()
}

fn render_user(out: &mut String, label: &str, user: &Value) {
    out.push_str(&format!(
        "{label}\n   Email: {}\n   ID: {}\n",
        str_or(user, "email", "No email"),
        id_of(user)
    ));
    if let Some(avatar) = non_empty(user, "avatar_url") {
        out.push_str(&format!("   Avatar: {avatar}\n"));
    }
    out.push('\n');
}

fn is_me(user: &Value) -> bool {
    user.get("me").and_then(Value::as_bool).unwrap_or(false)
}

fn render_users(users: &[Value], org: Option<&str>, limit: i64, offset: i64) -> String {
    let mut out = format!("Users ({} found{}):\n\n", users.len(), in_organization(org));

    if let Some(me) = users.iter().find(|u| is_me(u)) {
        render_user(&mut out, &format!("* {} (You)", str_or(me, "name", "Unknown")), me);
    }
    for (i, user) in users.iter().filter(|u| !is_me(u)).enumerate() {
        render_user(
            &mut out,
            &format!("{}. {}", i + 1, str_or(user, "name", "Unknown")),
            user,
        );
    }

    if users.len() as i64 == limit {
        out.push_str(&format!(
            "Showing {} users (offset: {offset})\nUse offset={} to see more users.\n",
            users.len(),
            offset + limit
        ));
    }
    out
}

pub(super) async fn get_users(client: &MissiveClient, params: &Value) -> Result<Value> {
    let p = Params::new("get_users", params);
    let limit = p.limit("limit", 50, 200)?;
    let offset = p.offset("offset")?;
    let org = p.str("organization_id");

    let mut query: Query = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
    query.extend(organization_query(p));

    let data = client
        .get("get_users", "/users", &query)
        .await
        .map_err(|e| match org {
            Some(org) => e.or_not_found(format!("organization {org}")),
            None => e,
        })?;

    let users = items(&data, "users");
    if users.is_empty() {
        return Ok(Value::String(format!("No users found{}", in_organization(org))));
    }
    Ok(Value::String(render_users(users, org, limit, offset)))
}

pub(super) async fn list_organizations(client: &MissiveClient, _params: &Value) -> Result<Value> {
    let data = client
        .get("list_organizations", "/organizations", &[])
        .await?;
    let orgs = items(&data, "organizations");
    if orgs.is_empty() {
        return Ok(Value::String("No organizations found".into()));
    }

    let mut out = format!("Organizations ({} found):\n\n", orgs.len());
    for (i, org) in orgs.iter().enumerate() {
        out.push_str(&format!(
            "{}. {}\n   ID: {}\n",
            i + 1,
            str_or(org, "name", "Unnamed"),
            id_of(org)
        ));
        if let Some(plan) = non_empty(org, "plan") {
            out.push_str(&format!("   Plan: {plan}\n"));
        }
        out.push('\n');
    }
    Ok(Value::String(out))
}

/// Append `   <label>: <name or id>` when `key` holds a reference.
fn push_reference(out: &mut String, entry: &Value, key: &str, label: &str) {
    if let Some(reference) = entry.get(key).filter(|v| !v.is_null()) {
        out.push_str(&format!("   {label}: {}\n", name_or_id(reference)));
    }
}

pub(super) async fn list_teams(client: &MissiveClient, params: &Value) -> Result<Value> {
    let p = Params::new("list_teams", params);
    let org = p.str("organization_id");
    let data = client
        .get("list_teams", "/teams", &organization_query(p))
        .await?;

    let teams = items(&data, "teams");
    if teams.is_empty() {
        return Ok(Value::String(format!("No teams found{}", in_organization(org))));
    }

    let mut out = format!("Teams ({} found):\n\n", teams.len());
    for (i, team) in teams.iter().enumerate() {
        out.push_str(&format!(
            "{}. {}\n   ID: {}\n",
            i + 1,
            str_or(team, "name", "Unnamed"),
            id_of(team)
        ));
        push_reference(&mut out, team, "organization", "Organization");
        out.push('\n');
    }
    Ok(Value::String(out))
}

pub(super) async fn list_shared_labels(client: &MissiveClient, params: &Value) -> Result<Value> {
    let p = Params::new("list_shared_labels", params);
    let org = p.str("organization_id");
    let data = client
        .get("list_shared_labels", "/shared_labels", &organization_query(p))
        .await?;

    let labels = items(&data, "shared_labels");
    if labels.is_empty() {
        return Ok(Value::String(format!(
            "No shared labels found{}",
            in_organization(org)
        )));
    }

    let mut out = format!("Shared Labels ({} found):\n\n", labels.len());
    for (i, label) in labels.iter().enumerate() {
        out.push_str(&format!(
            "{}. {}\n   ID: {}\n",
            i + 1,
            str_or(label, "name", "Unnamed"),
            id_of(label)
        ));
        if let Some(color) = non_empty(label, "color") {
            out.push_str(&format!("   Color: {color}\n"));
        }
        push_reference(&mut out, label, "parent", "Parent");
        push_reference(&mut out, label, "organization", "Organization");
        out.push('\n');
    }
    Ok(Value::String(out))
}
