//! Contacts, contact books and contact groups.

use serde_json::{Map, Value, json};

use crate::client::{MissiveClient, Query};
use crate::error::{AdapterError, Result};
use crate::format::{id_of, items, name_or_id, non_empty, single, str_or, title_case};
use crate::params::Params;
use crate::traits::ToolDefinition;

const GROUP_KINDS: [&str; 2] = ["group", "organization"];

fn contact_fields_schema(id_field: &str, id_description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            id_field: { "type": "string", "description": id_description },
            "first_name": { "type": "string", "description": "First name" },
            "last_name": { "type": "string", "description": "Last name" },
            "email": { "type": "string", "description": "Email address" },
            "phone": { "type": "string", "description": "Phone number" },
            "notes": { "type": "string", "description": "Free-form notes" },
            "memberships_data": {
                "type": "string",
                "description": "JSON memberships, e.g. [{\"group\": {\"kind\": \"group\", \"name\": \"VIPs\"}}]"
            }
        },
        "required": [id_field]
    })
}

fn id_only_schema(field: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            field: { "type": "string", "description": description }
        },
        "required": [field]
    })
}

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_contacts".into(),
            description: "List contacts, optionally filtered by contact book or search term".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "contact_book_id": { "type": "string", "description": "Contact book ID" },
                    "search": { "type": "string", "description": "Search term" },
                    "limit": {
                        "type": "integer",
                        "description": "Number of contacts to return (default: 50, max: 200)"
                    },
                    "offset": { "type": "integer", "description": "Offset for pagination (default: 0)" }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "get_contact".into(),
            description: "Get details of a specific contact".into(),
            parameters: id_only_schema("contact_id", "The ID of the contact to retrieve"),
        },
        ToolDefinition {
            name: "create_contact".into(),
            description: "Create a contact in a contact book".into(),
            parameters: contact_fields_schema("contact_book_id", "Contact book to create the contact in"),
        },
        ToolDefinition {
            name: "update_contact".into(),
            description: "Update a contact; email and phone replace existing infos, memberships replace all memberships".into(),
            parameters: contact_fields_schema("contact_id", "The ID of the contact to update"),
        },
        ToolDefinition {
            name: "delete_contact".into(),
            description: "Delete a contact".into(),
            parameters: id_only_schema("contact_id", "The ID of the contact to delete"),
        },
        ToolDefinition {
            name: "list_contact_books".into(),
            description: "List contact books the authenticated user can access".into(),
            parameters: json!({ "type": "object", "properties": {}, "required": [] }),
        },
        ToolDefinition {
            name: "list_contact_groups".into(),
            description: "List groups or organizations of a contact book".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "contact_book_id": { "type": "string", "description": "The contact book ID" },
                    "kind": {
                        "type": "string",
                        "enum": GROUP_KINDS,
                        "description": "Kind of groups to list (default: group)"
                    }
                },
                "required": ["contact_book_id"]
            }),
        },
    ]
}

/// `first last`, or `fallback` when both are empty.
fn full_name(contact: &Value, fallback: &str) -> String {
    let name = format!(
        "{} {}",
        str_or(contact, "first_name", ""),
        str_or(contact, "last_name", "")
    )
    .trim()
    .to_string();
    if name.is_empty() { fallback.to_string() } else { name }
}

/// Info values (emails, phones) of the given kind.
fn infos_of<'a>(contact: &'a Value, kind: &str) -> Vec<&'a str> {
    items(contact, "infos")
        .iter()
        .filter(|info| info.get("kind").and_then(Value::as_str) == Some(kind))
        .filter_map(|info| info.get("value").and_then(Value::as_str))
        .collect()
}

/// Group names of memberships whose group has `kind` (any kind when `None`).
fn groups_of<'a>(contact: &'a Value, kind: Option<&str>) -> Vec<&'a str> {
    items(contact, "memberships")
        .iter()
        .filter_map(|m| m.get("group"))
        .filter(|g| kind.is_none() || g.get("kind").and_then(Value::as_str) == kind)
        .map(|g| str_or(g, "name", "Unknown"))
        .collect()
}

fn joined(values: &[&str], max: usize) -> String {
    values.iter().take(max).copied().collect::<Vec<_>>().join(", ")
}

/// Contact fields shared by create and update.  `replace_infos` makes an
/// empty email/phone clear the existing infos (update semantics).
fn contact_fields(p: Params<'_>, contact: &mut Map<String, Value>, replace_infos: bool) -> Result<()> {
    for field in ["first_name", "last_name", "notes"] {
        if let Some(value) = p.str(field) {
            contact.insert(field.into(), json!(value));
        }
    }

    let email = p.str("email");
    let phone = p.str("phone");
    let mut infos = Vec::new();
    if let Some(email) = email {
        infos.push(json!({"kind": "email", "value": email}));
    }
    if let Some(phone) = phone {
        infos.push(json!({"kind": "phone", "value": phone}));
    }
    let touched = replace_infos && (supplied(p, "email") || supplied(p, "phone"));
    if !infos.is_empty() || touched {
        contact.insert("infos".into(), Value::Array(infos));
    }

    if let Some(memberships) = p.json("memberships_data")? {
        contact.insert("memberships".into(), memberships);
    }
    Ok(())
}

/// Whether `field` was supplied at all, even as an empty string.
fn supplied(p: Params<'_>, field: &str) -> bool {
    p.raw(field).is_some_and(|v| !v.is_null())
}

fn create_payload(p: Params<'_>) -> Result<Value> {
    let mut contact = Map::new();
    contact.insert("contact_book".into(), json!(p.required_str("contact_book_id")?));
    contact_fields(p, &mut contact, false)?;
    Ok(json!({ "contacts": contact }))
}

fn update_payload(p: Params<'_>) -> Result<Value> {
    let mut contact = Map::new();
    contact_fields(p, &mut contact, true)?;
    if contact.is_empty() {
        return Err(p.invalid("at least one field must be provided to update"));
    }
    Ok(json!({ "contacts": contact }))
}

fn render_contact_summary(header: &str, contact: &Value, fallback: &str) -> String {
    let mut out = format!("{header}\n\n");
    out.push_str(&format!(
        "Name: {}\nID: {}\n",
        full_name(contact, fallback),
        id_of(contact)
    ));
    let emails = infos_of(contact, "email");
    if !emails.is_empty() {
        out.push_str(&format!("Email: {}\n", emails.join(", ")));
    }
    let phones = infos_of(contact, "phone");
    if !phones.is_empty() {
        out.push_str(&format!("Phone: {}\n", phones.join(", ")));
    }
    let groups = groups_of(contact, None);
    if !groups.is_empty() {
        out.push_str(&format!("Groups: {}\n", groups.join(", ")));
    }
    out
}

fn render_contact_details(contact: &Value) -> String {
    let mut out = String::from("Contact Details:\n\n");
    out.push_str(&format!(
        "Name: {}\nID: {}\n",
        full_name(contact, "Unknown"),
        id_of(contact)
    ));
    if let Some(book) = contact.get("contact_book").filter(|b| !b.is_null()) {
        out.push_str(&format!("Contact Book: {}\n", name_or_id(book)));
    }

    let infos = items(contact, "infos");
    if !infos.is_empty() {
        out.push_str("\nContact Info:\n");
        for info in infos {
            let kind = title_case(str_or(info, "kind", "unknown"));
            let value = str_or(info, "value", "");
            match non_empty(info, "label") {
                Some(label) => out.push_str(&format!("  {kind} ({label}): {value}\n")),
                None => out.push_str(&format!("  {kind}: {value}\n")),
            }
        }
    }

    let memberships = items(contact, "memberships");
    if !memberships.is_empty() {
        out.push_str("\nMemberships:\n");
        for membership in memberships {
            let group = membership.get("group").unwrap_or(&Value::Null);
            let name = str_or(group, "name", "Unknown");
            if group.get("kind").and_then(Value::as_str) == Some("organization") {
                out.push_str(&format!("  Organization: {name}"));
                if let Some(title) = non_empty(membership, "title") {
                    out.push_str(&format!(" - {title}"));
                }
                if let Some(location) = non_empty(membership, "location") {
                    out.push_str(&format!(" ({location})"));
                }
                out.push('\n');
            } else {
                out.push_str(&format!("  Group: {name}\n"));
            }
        }
    }

    if let Some(notes) = non_empty(contact, "notes") {
        out.push_str(&format!("\nNotes: {notes}\n"));
    }
    out
}

pub(super) async fn list_contacts(client: &MissiveClient, params: &Value) -> Result<Value> {
    let p = Params::new("list_contacts", params);
    let limit = p.limit("limit", 50, 200)?;
    let offset = p.offset("offset")?;

    let mut query: Query = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
    if let Some(book) = p.str("contact_book_id") {
        query.push(("contact_book", book.to_string()));
    }
    if let Some(search) = p.str("search") {
        query.push(("search", search.to_string()));
    }

    let data = client.get("list_contacts", "/contacts", &query).await?;
    let contacts = items(&data, "contacts");
    if contacts.is_empty() {
        return Ok(Value::String("No contacts found".into()));
    }

    let mut out = format!("Contacts ({} found):\n\n", contacts.len());
    for (i, contact) in contacts.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, full_name(contact, "Unknown")));
        let emails = infos_of(contact, "email");
        if !emails.is_empty() {
            out.push_str(&format!("   Email: {}\n", joined(&emails, 2)));
        }
        let phones = infos_of(contact, "phone");
        if !phones.is_empty() {
            out.push_str(&format!("   Phone: {}\n", joined(&phones, 2)));
        }
        let orgs = groups_of(contact, Some("organization"));
        if !orgs.is_empty() {
            out.push_str(&format!("   Organization: {}\n", joined(&orgs, 2)));
        }
        let groups = groups_of(contact, Some("group"));
        if !groups.is_empty() {
            out.push_str(&format!("   Groups: {}\n", joined(&groups, 3)));
        }
        out.push_str(&format!("   ID: {}\n\n", id_of(contact)));
    }
    if contacts.len() as i64 == limit {
        out.push_str(&format!(
            "Use offset={} to see more contacts.\n",
            offset + limit
        ));
    }
    Ok(Value::String(out))
}

pub(super) async fn get_contact(client: &MissiveClient, params: &Value) -> Result<Value> {
    let p = Params::new("get_contact", params);
    let id = p.required_str("contact_id")?;
    let resource = format!("contact {id}");

    let data = client
        .get("get_contact", &format!("/contacts/{id}"), &[])
        .await
        .map_err(|e| e.or_not_found(resource.as_str()))?;

    let Some(contact) = single(&data, "contacts") else {
        return Err(AdapterError::NotFound { resource });
    };
    Ok(Value::String(render_contact_details(contact)))
}

pub(super) async fn create_contact(client: &MissiveClient, params: &Value) -> Result<Value> {
    let payload = create_payload(Params::new("create_contact", params))?;
    let data = client.post("create_contact", "/contacts", &payload).await?;
    let contact = single(&data, "contacts").unwrap_or(&payload["contacts"]);
    Ok(Value::String(render_contact_summary(
        "Contact Created Successfully!",
        contact,
        "New Contact",
    )))
}

pub(super) async fn update_contact(client: &MissiveClient, params: &Value) -> Result<Value> {
    let p = Params::new("update_contact", params);
    let id = p.required_str("contact_id")?;
    let payload = update_payload(p)?;
    let data = client
        .patch("update_contact", &format!("/contacts/{id}"), &payload)
        .await
        .map_err(|e| e.or_not_found(format!("contact {id}")))?;
    let contact = single(&data, "contacts").unwrap_or(&Value::Null);
    Ok(Value::String(render_contact_summary(
        "Contact Updated Successfully!",
        contact,
        "Contact",
    )))
}

pub(super) async fn delete_contact(client: &MissiveClient, params: &Value) -> Result<Value> {
    let p = Params::new("delete_contact", params);
    let id = p.required_str("contact_id")?;
    client
        .delete("delete_contact", &format!("/contacts/{id}"))
        .await
        .map_err(|e| e.or_not_found(format!("contact {id}")))?;
    Ok(Value::String(format!("Contact {id} deleted successfully.")))
}

pub(super) async fn list_contact_books(client: &MissiveClient, _params: &Value) -> Result<Value> {
    let data = client
        .get("list_contact_books", "/contact_books", &[])
        .await?;
    let books = items(&data, "contact_books");
    if books.is_empty() {
        return Ok(Value::String("No contact books found".into()));
    }

    let mut out = format!("Contact Books ({} found):\n\n", books.len());
    for (i, book) in books.iter().enumerate() {
        out.push_str(&format!(
            "{}. {}\n   ID: {}\n",
            i + 1,
            str_or(book, "name", "Unnamed"),
            id_of(book)
        ));
        if book.get("shared").and_then(Value::as_bool).unwrap_or(false) {
            out.push_str("   Shared: Yes\n");
        }
        out.push('\n');
    }
    Ok(Value::String(out))
}

pub(super) async fn list_contact_groups(client: &MissiveClient, params: &Value) -> Result<Value> {
    let p = Params::new("list_contact_groups", params);
    let book = p.required_str("contact_book_id")?;
    let kind = p.str("kind").unwrap_or("group");
    if !GROUP_KINDS.contains(&kind) {
        return Err(p.invalid("kind must be 'group' or 'organization'"));
    }

    let data = client
        .get(
            "list_contact_groups",
            &format!("/contact_books/{book}/groups"),
            &[("kind", kind.to_string())],
        )
        .await
        .map_err(|e| e.or_not_found(format!("contact book {book}")))?;

    let groups = items(&data, "groups");
    if groups.is_empty() {
        return Ok(Value::String(format!(
            "No {kind}s found in contact book {book}"
        )));
    }

    let mut out = format!("{}s ({} found):\n\n", title_case(kind), groups.len());
    for (i, group) in groups.iter().enumerate() {
        out.push_str(&format!(
            "{}. {}\n   ID: {}\n   Kind: {}\n\n",
            i + 1,
            str_or(group, "name", "Unnamed"),
            id_of(group),
            str_or(group, "kind", kind)
        ));
    }
    Ok(Value::String(out))
}
