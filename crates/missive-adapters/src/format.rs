//! Rendering helpers shared by the tool handlers.
//!
//! Missive payloads are navigated as raw [`Value`]s; these helpers supply the
//! defaults ("Unknown", "No subject", ...) used when a field is absent or
//! `null`.

use std::sync::OnceLock;

use chrono::{Local, TimeZone};
use regex::Regex;
use serde_json::Value;

static HTML_TAG: OnceLock<Option<Regex>> = OnceLock::new();

/// Read a Unix timestamp (seconds) from a number or numeric string.
pub fn timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|ts| *ts > 0)
}

/// Timestamp stored under `key`, if any.
pub fn timestamp_field(value: &Value, key: &str) -> Option<i64> {
    value.get(key).and_then(timestamp)
}

/// Render a Unix timestamp as local `YYYY-MM-DD HH:MM`.
pub fn format_timestamp(ts: i64) -> String {
    match Local.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => "Not set".to_string(),
    }
}

/// Render a duration in seconds as `Xh Ym`, `Ym`, or `Zs` below a minute.
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{secs}s")
    }
}

/// Clip `text` to `max` characters, appending `...` when clipped.
pub fn preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

/// Remove HTML tags from a message body.
pub fn strip_html(body: &str) -> String {
    match HTML_TAG.get_or_init(|| Regex::new("<[^<]+?>").ok()) {
        Some(re) => re.replace_all(body, "").into_owned(),
        None => body.to_string(),
    }
}

/// String field `key`, or `default` when absent, `null` or not a string.
pub fn str_or<'a>(value: &'a Value, key: &str, default: &'a str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or(default)
}

/// Non-empty string field `key`.
pub fn non_empty<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Render an identifier field that may be a string or a number.
pub fn id_of(value: &Value) -> String {
    match value.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "unknown".to_string(),
    }
}

/// Integer field `key`, `0` when absent.
pub fn count(value: &Value, key: &str) -> i64 {
    value
        .get(key)
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .unwrap_or(0)
}

/// Array field `key`, empty when absent.
pub fn items<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Object field `key` when present and non-empty.
pub fn object<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value
        .get(key)
        .filter(|v| v.as_object().is_some_and(|o| !o.is_empty()))
}

/// The single record under `key`: an object, or the first element of a list.
pub fn single<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value.get(key)? {
        Value::Array(list) => list.first(),
        other => Some(other).filter(|v| v.as_object().is_some_and(|o| !o.is_empty())),
    }
}

/// `Name <address>` for a from/to field.
pub fn address(field: &Value) -> String {
    format!(
        "{} <{}>",
        str_or(field, "name", "Unknown"),
        str_or(field, "address", "unknown")
    )
}

/// Comma separated `Name <address>` list.
pub fn addresses(fields: &[Value]) -> String {
    fields.iter().map(address).collect::<Vec<_>>().join(", ")
}

/// Comma separated `key` values of `list`, `default` for missing entries.
pub fn join_field(list: &[Value], key: &str, default: &str) -> String {
    list.iter()
        .map(|v| str_or(v, key, default))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a reference that may be an embedded object or a bare id.
pub fn name_or_id(value: &Value) -> String {
    match value {
        Value::Object(_) => value
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| match value.get("id") {
                Some(Value::String(id)) => id.clone(),
                Some(Value::Number(id)) => id.to_string(),
                _ => "Unknown".to_string(),
            }),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => "Unknown".to_string(),
    }
}

/// Render a list of plain strings.
pub fn join_strings(list: &[Value]) -> String {
    list.iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => name_or_id(other),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Capitalise the first character (`email` -> `Email`).
pub fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
