//! Server-side analytics reports: request one, then poll for its results.

use chrono::NaiveDate;
use serde_json::{Map, Value, json};

use crate::client::MissiveClient;
use crate::error::{AdapterError, Result};
use crate::format::{
    count, format_duration, format_timestamp, id_of, items, name_or_id, object, single, str_or,
    timestamp_field,
};
use crate::params::Params;
use crate::traits::ToolDefinition;

/// Optional list filters: parameter, payload key, label.
const FILTERS: [(&str, &str, &str); 4] = [
    ("team_ids", "teams", "Teams"),
    ("user_ids", "users", "Users"),
    ("mailbox_ids", "mailboxes", "Mailboxes"),
    ("label_ids", "labels", "Labels"),
];

/// Report fields that are metadata rather than metrics.
const META_FIELDS: [&str; 6] = [
    "id",
    "status",
    "start_date",
    "end_date",
    "organization",
    "created_at",
];

const TOP_N: usize = 10;

pub(super) fn definitions() -> Vec<ToolDefinition> {
    let filter = |description: &str| {
        json!({
            "type": "array",
            "items": { "type": "string" },
            "description": description
        })
    };
    vec![
        ToolDefinition {
            name: "create_analytics_report".into(),
            description: "Request an analytics report; fetch it later with get_analytics_report".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "organization_id": { "type": "string", "description": "Organization to report on" },
                    "start_date": { "type": "string", "description": "Start date (YYYY-MM-DD)" },
                    "end_date": { "type": "string", "description": "End date (YYYY-MM-DD)" },
                    "team_ids": filter("Team IDs to filter by"),
                    "user_ids": filter("User IDs to filter by"),
                    "mailbox_ids": filter("Mailbox IDs to filter by"),
                    "label_ids": filter("Label IDs to filter by")
                },
                "required": ["organization_id", "start_date", "end_date"]
            }),
        },
        ToolDefinition {
            name: "get_analytics_report".into(),
            description: "Get the results of an analytics report".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "report_id": {
                        "type": "string",
                        "description": "ID returned by create_analytics_report"
                    }
                },
                "required": ["report_id"]
            }),
        },
    ]
}

/// Validated report request plus the filters, kept for rendering.
struct ReportRequest {
    payload: Value,
    filters: Vec<(&'static str, Vec<String>)>,
}

fn report_request(p: Params<'_>) -> Result<ReportRequest> {
    let organization = p.required_str("organization_id")?;
    let start = p.required_str("start_date")?;
    let end = p.required_str("end_date")?;

    let parse = |raw: &str| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| p.invalid("dates must be in YYYY-MM-DD format"))
    };
    if parse(start)? > parse(end)? {
        return Err(p.invalid("start_date must not be after end_date"));
    }

    let mut report = Map::new();
    report.insert("organization".into(), json!(organization));
    report.insert("start_date".into(), json!(start));
    report.insert("end_date".into(), json!(end));

    let mut filters = Vec::new();
    for (field, key, label) in FILTERS {
        if let Some(ids) = p.string_list(field)? {
            report.insert(key.into(), json!(ids));
            filters.push((label, ids));
        }
    }

    Ok(ReportRequest {
        payload: json!({ "analytics_reports": report }),
        filters,
    })
}

pub(super) async fn create_analytics_report(
    client: &MissiveClient,
    params: &Value,
) -> Result<Value> {
    let p = Params::new("create_analytics_report", params);
    let request = report_request(p)?;
    let organization = request.payload["analytics_reports"]["organization"].clone();

    let data = client
        .post("create_analytics_report", "/analytics/reports", &request.payload)
        .await
        .map_err(|e| e.or_not_found(format!("organization {}", name_or_id(&organization))))?;
    let report = single(&data, "analytics_reports").unwrap_or(&Value::Null);
    let sent = &request.payload["analytics_reports"];
    let id = id_of(report);

    let mut out = String::from("Analytics Report Created!\n\n");
    out.push_str(&format!(
        "Report ID: {id}\nStatus: {}\nOrganization: {}\nDate Range: {} to {}\n",
        str_or(report, "status", "pending"),
        name_or_id(report.get("organization").unwrap_or(&organization)),
        str_or(sent, "start_date", ""),
        str_or(sent, "end_date", ""),
    ));
    for (label, ids) in &request.filters {
        out.push_str(&format!("{label}: {}\n", ids.join(", ")));
    }
    if let Some(ts) = timestamp_field(report, "created_at") {
        out.push_str(&format!("Created: {}\n", format_timestamp(ts)));
    }
    out.push_str(&format!(
        "\nUse get_analytics_report with report ID '{id}' to fetch results."
    ));
    Ok(Value::String(out))
}

/// `  <label>: <duration>` for a non-zero seconds field.
fn push_duration(out: &mut String, section: &Value, key: &str, label: &str) {
    let secs = count(section, key);
    if secs > 0 {
        out.push_str(&format!("  {label}: {}\n", format_duration(secs)));
    }
}

fn render_report(report: &Value) -> String {
    let status = str_or(report, "status", "unknown");
    let mut out = String::from("Analytics Report Results:\n\n");
    out.push_str(&format!("Report ID: {}\nStatus: {status}\n", id_of(report)));

    if matches!(status, "pending" | "processing") {
        out.push_str("\nReport is still being processed. Please try again in a moment.\n");
        return out;
    }

    if let (Some(start), Some(end)) = (
        report.get("start_date").and_then(Value::as_str),
        report.get("end_date").and_then(Value::as_str),
    ) {
        out.push_str(&format!("Date Range: {start} to {end}\n"));
    }
    if let Some(org) = report.get("organization").filter(|o| !o.is_null()) {
        out.push_str(&format!("Organization: {}\n", name_or_id(org)));
    }
    out.push('\n');

    let conversations = object(report, "conversations");
    if let Some(c) = conversations {
        out.push_str(&format!(
            "Conversations:\n  Total: {}\n  New: {}\n  Closed: {}\n  Reopened: {}\n\n",
            count(c, "total"),
            count(c, "new"),
            count(c, "closed"),
            count(c, "reopened")
        ));
    }

    let messages = object(report, "messages");
    if let Some(m) = messages {
        out.push_str(&format!(
            "Messages:\n  Total: {}\n  Inbound: {}\n  Outbound: {}\n\n",
            count(m, "total"),
            count(m, "inbound"),
            count(m, "outbound")
        ));
    }

    let response_time = object(report, "response_time");
    if let Some(rt) = response_time {
        out.push_str("Response Time:\n");
        push_duration(&mut out, rt, "average_seconds", "Average");
        push_duration(&mut out, rt, "median_seconds", "Median");
        out.push('\n');
    }

    let resolution_time = object(report, "resolution_time");
    if let Some(rt) = resolution_time {
        out.push_str("Resolution Time:\n");
        push_duration(&mut out, rt, "average_seconds", "Average");
        out.push('\n');
    }

    let teams = items(report, "teams");
    if !teams.is_empty() {
        out.push_str("Team Breakdown:\n");
        for team in teams {
            out.push_str(&format!(
                "  {}:\n    Conversations: {}\n    Messages: {}\n",
                team.get("name").and_then(Value::as_str).unwrap_or_else(|| str_or(team, "id", "Unknown")),
                count(team, "conversations"),
                count(team, "messages")
            ));
        }
        out.push('\n');
    }

    let users = items(report, "users");
    if !users.is_empty() {
        out.push_str("User Breakdown:\n");
        for user in users.iter().take(TOP_N) {
            out.push_str(&format!(
                "  {}:\n    Conversations: {}\n    Messages sent: {}\n",
                user.get("name").and_then(Value::as_str).unwrap_or_else(|| str_or(user, "email", "Unknown")),
                count(user, "conversations"),
                count(user, "messages_sent")
            ));
        }
        if users.len() > TOP_N {
            out.push_str(&format!("  ... and {} more users\n", users.len() - TOP_N));
        }
        out.push('\n');
    }

    let labels = items(report, "labels");
    if !labels.is_empty() {
        out.push_str("Labels Breakdown:\n");
        for label in labels.iter().take(TOP_N) {
            out.push_str(&format!(
                "  {}: {} conversations\n",
                str_or(label, "name", "Unknown"),
                count(label, "count")
            ));
        }
        if labels.len() > TOP_N {
            out.push_str(&format!("  ... and {} more labels\n", labels.len() - TOP_N));
        }
        out.push('\n');
    }

    let has_sections = conversations.is_some()
        || messages.is_some()
        || response_time.is_some()
        || resolution_time.is_some()
        || !teams.is_empty()
        || !users.is_empty();
    if !has_sections {
        out.push_str("Raw data available in report:\n");
        if let Some(fields) = report.as_object() {
            for (key, value) in fields {
                if META_FIELDS.contains(&key.as_str()) {
                    continue;
                }
                match value {
                    Value::Number(n) => out.push_str(&format!("  {key}: {n}\n")),
                    Value::Array(list) => out.push_str(&format!("  {key}: {} items\n", list.len())),
                    Value::Object(map) => out.push_str(&format!("  {key}: {} fields\n", map.len())),
                    _ => {}
                }
            }
        }
    }
    out
}

pub(super) async fn get_analytics_report(client: &MissiveClient, params: &Value) -> Result<Value> {
    let p = Params::new("get_analytics_report", params);
    let id = p.required_str("report_id")?;
    let resource = format!("analytics report {id}");

    let data = client
        .get(
            "get_analytics_report",
            &format!("/analytics/reports/{id}"),
            &[],
        )
        .await
        .map_err(|e| e.or_not_found(resource.as_str()))?;

    let Some(report) = single(&data, "analytics_reports") else {
        return Err(AdapterError::NotFound { resource });
    };
    Ok(Value::String(render_report(report)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_are_validated() {
        let bad = json!({"organization_id": "o1", "start_date": "2024/01/01", "end_date": "2024-01-31"});
        let err = report_request(Params::new("create_analytics_report", &bad)).err().unwrap();
        assert!(err.to_string().contains("YYYY-MM-DD"));

        let reversed = json!({"organization_id": "o1", "start_date": "2024-02-01", "end_date": "2024-01-31"});
        let err = report_request(Params::new("create_analytics_report", &reversed)).err().unwrap();
        assert!(err.to_string().contains("after end_date"));
    }

    #[test]
    fn filters_map_to_payload_keys() {
        let params = json!({
            "organization_id": "o1",
            "start_date": "2024-01-01",
            "end_date": "2024-01-31",
            "team_ids": ["t1"],
            "label_ids": "l1,l2"
        });
        let request = report_request(Params::new("create_analytics_report", &params)).unwrap_or_else(|e| panic!("{e}"));
        let report = &request.payload["analytics_reports"];
        assert_eq!(report["teams"], json!(["t1"]));
        assert_eq!(report["labels"], json!(["l1", "l2"]));
        assert!(report.get("users").is_none());
        assert_eq!(request.filters.len(), 2);
    }

    #[test]
    fn pending_report_stops_early() {
        let out = render_report(&json!({"id": "r1", "status": "processing", "messages": {"total": 3}}));
        assert!(out.contains("still being processed"));
        assert!(!out.contains("Messages:"));
    }

    #[test]
    fn completed_report_sections() {
        let users: Vec<Value> = (0..12)
            .map(|i| json!({"name": format!("user{i}"), "conversations": i, "messages_sent": i}))
            .collect();
        let report = json!({
            "id": "r1",
            "status": "completed",
            "start_date": "2024-01-01",
            "end_date": "2024-01-31",
            "organization": {"id": "o1", "name": "Acme"},
            "conversations": {"total": 40, "new": 10, "closed": 30, "reopened": 2},
            "response_time": {"average_seconds": 5400, "median_seconds": 1200},
            "users": users,
            "labels": [{"name": "Billing", "count": 4}]
        });
        let out = render_report(&report);
        assert!(out.contains("Organization: Acme"));
        assert!(out.contains("Total: 40"));
        assert!(out.contains("Average: 1h 30m"));
        assert!(out.contains("Median: 20m"));
        assert!(out.contains("user9:"));
        assert!(!out.contains("user10:"));
        assert!(out.contains("... and 2 more users"));
        assert!(out.contains("Billing: 4 conversations"));
        assert!(!out.contains("Raw data"));
    }

    #[test]
    fn unknown_shape_falls_back_to_raw_summary() {
        let out = render_report(&json!({
            "id": "r1",
            "status": "completed",
            "created_at": 1,
            "score": 7,
            "series": [1, 2, 3],
            "extra": {"a": 1},
            "note": "ignored"
        }));
        assert!(out.contains("Raw data available in report:"));
        assert!(out.contains("  score: 7"));
        assert!(out.contains("  series: 3 items"));
        assert!(out.contains("  extra: 1 fields"));
        assert!(!out.contains("note"));
        assert!(!out.contains("created_at"));
    }
}
