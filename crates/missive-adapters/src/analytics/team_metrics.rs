//! `get_team_metrics`: fetch recent conversations and their messages, then
//! hand them to [`aggregate`](super::aggregate).
//!
//! Requests are issued sequentially with a fixed pause between them.  There
//! are no retries; the first failed request aborts the run.

use std::collections::HashSet;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, info};

use super::aggregate::{DomainRules, Sample, TeamMetrics, Window};
use crate::client::{MissiveClient, Query};
use crate::config::{MAX_CONVERSATION_PAGE, MetricsSettings, normalize_domains};
use crate::error::{AdapterError, Result};
use crate::format::{id_of, items, timestamp_field};
use crate::params::Params;
use crate::traits::ToolDefinition;

const TOOL: &str = "get_team_metrics";
const MESSAGE_PAGE: usize = 10;
const MAX_DAYS: i64 = 90;
const MAX_CONVERSATIONS: i64 = 500;

pub(super) fn definition() -> ToolDefinition {
    ToolDefinition {
        name: TOOL.into(),
        description: "Compute message volume and first-reply times per channel over recent days".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "days": {
                    "type": "integer",
                    "description": "Size of the window in days (default: 7, max: 90)"
                },
                "team_id": {
                    "type": "string",
                    "description": "Only analyse conversations of this team"
                },
                "max_conversations": {
                    "type": "integer",
                    "description": "Cap on conversations analysed (default from config, max: 500)"
                }
            },
            "required": []
        }),
    }
}

/// Conversations selected for analysis.
#[derive(Default)]
struct ConversationScan {
    kept: Vec<Value>,
    /// The cap stopped the scan while in-window conversations remained.
    truncated: bool,
}

/// The item's `id` as a string, `None` when it has none.
fn raw_id(item: &Value) -> Option<String> {
    match item.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn in_window(conversation: &Value, window: &Window) -> bool {
    timestamp_field(conversation, "last_activity_at").is_some_and(|ts| ts >= window.since)
}

fn oldest_timestamp(page: &[Value], key: &str) -> Option<i64> {
    page.iter().filter_map(|item| timestamp_field(item, key)).min()
}

/// Sequential, paced access to the API for one metrics run.
struct Fetcher<'a> {
    client: &'a MissiveClient,
    delay: Duration,
    requests: u32,
}

impl<'a> Fetcher<'a> {
    fn new(client: &'a MissiveClient, delay: Duration) -> Self {
        Self {
            client,
            delay,
            requests: 0,
        }
    }

    async fn get(&mut self, path: &str, query: &[(&'static str, String)]) -> Result<Value> {
        if self.requests > 0 && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.requests += 1;
        self.client.get(TOOL, path, query).await
    }

    /// The authenticated user's email domain, from `GET /users`.
    async fn own_domain(&mut self) -> Result<Option<String>> {
        let data = self.get("/users", &[("limit", "200".to_string())]).await?;
        let domain = items(&data, "users")
            .iter()
            .find(|u| u.get("me").and_then(Value::as_bool).unwrap_or(false))
            .and_then(|me| me.get("email").and_then(Value::as_str))
            .and_then(|email| email.rsplit_once('@'))
            .map(|(_, domain)| domain.to_string());
        Ok(domain)
    }

    /// Conversations with activity inside the window, newest first.
    ///
    /// Conversations without an id are skipped since their messages cannot
    /// be fetched.
    async fn conversations(
        &mut self,
        window: &Window,
        team_id: Option<&str>,
        page_size: usize,
        max: usize,
    ) -> Result<ConversationScan> {
        let scope = match team_id {
            Some(team) => ("team_all", team.to_string()),
            None => ("all", "true".to_string()),
        };
        let mut scan = ConversationScan::default();
        let mut seen = HashSet::new();
        let mut until: Option<i64> = None;

        'pages: loop {
            let mut query: Query = vec![scope.clone(), ("limit", page_size.to_string())];
            if let Some(until) = until {
                query.push(("until", until.to_string()));
            }
            let data = self.get("/conversations", &query).await?;
            let page = items(&data, "conversations");
            debug!(count = page.len(), ?until, "fetched conversation page");
            if page.is_empty() {
                break;
            }

            let oldest = oldest_timestamp(page, "last_activity_at");
            let more_pages = page.len() >= page_size && oldest.is_some_and(|o| o >= window.since);

            for (i, conversation) in page.iter().enumerate() {
                if !in_window(conversation, window) {
                    continue;
                }
                let Some(id) = raw_id(conversation) else {
                    continue;
                };
                if !seen.insert(id) {
                    continue;
                }
                scan.kept.push(conversation.clone());
                if scan.kept.len() >= max {
                    scan.truncated = more_pages
                        || page[i + 1..].iter().any(|c| {
                            in_window(c, window) && raw_id(c).is_some_and(|id| !seen.contains(&id))
                        });
                    break 'pages;
                }
            }

            if !more_pages {
                break;
            }
            match oldest {
                Some(o) if until.is_none_or(|u| o < u) => until = Some(o),
                _ => break,
            }
        }
        Ok(scan)
    }

    /// Messages of one conversation, paging back until the window start.
    async fn messages(
        &mut self,
        conversation_id: &str,
        window: &Window,
        max_pages: u32,
    ) -> Result<Vec<Value>> {
        let path = format!("/conversations/{conversation_id}/messages");
        let mut all = Vec::new();
        let mut seen = HashSet::new();
        let mut until: Option<i64> = None;

        for _ in 0..max_pages {
            let mut query: Query = vec![("limit", MESSAGE_PAGE.to_string())];
            if let Some(until) = until {
                query.push(("until", until.to_string()));
            }
            let data = self.get(&path, &query).await?;
            let page = items(&data, "messages");
            if page.is_empty() {
                break;
            }

            for message in page {
                if raw_id(message).is_none_or(|id| seen.insert(id)) {
                    all.push(message.clone());
                }
            }
            let oldest = oldest_timestamp(page, "delivered_at");

            if page.len() < MESSAGE_PAGE {
                break;
            }
            match oldest {
                Some(o) if o >= window.since && until.is_none_or(|u| o < u) => until = Some(o),
                _ => break,
            }
        }
        Ok(all)
    }
}

pub(super) async fn get_team_metrics(
    client: &MissiveClient,
    settings: &MetricsSettings,
    params: &Value,
) -> Result<Value> {
    let p = Params::new(TOOL, params);
    let days = p.limit("days", 7, MAX_DAYS)?;
    let max_conversations =
        p.limit("max_conversations", i64::from(settings.max_conversations), MAX_CONVERSATIONS)? as usize;
    let team_id = p.str("team_id");
    let page_size = settings.page_size.clamp(1, MAX_CONVERSATION_PAGE) as usize;

    let window = Window::ending_at(chrono::Utc::now().timestamp(), days);
    let mut fetcher = Fetcher::new(client, settings.request_delay());

    let mut internal = settings.internal_domains.clone();
    if internal.is_empty() {
        internal.extend(fetcher.own_domain().await?);
    }
    let internal = normalize_domains(&internal);
    if internal.is_empty() {
        return Err(AdapterError::ConfigError(
            "no internal domains configured and the authenticated user's email domain is unknown; \
             set MISSIVE_INTERNAL_DOMAINS"
                .into(),
        ));
    }
    let rules = DomainRules::new(&internal, &settings.ignored_domains);

    let scan = fetcher
        .conversations(&window, team_id, page_size, max_conversations)
        .await?;

    let mut metrics = TeamMetrics::default();
    for conversation in &scan.kept {
        let id = id_of(conversation);
        let messages = fetcher
            .messages(&id, &window, settings.max_message_pages.max(1))
            .await?;
        let samples = messages
            .iter()
            .filter_map(|m| Sample::from_message(m, &rules, &window))
            .collect();
        metrics.record_conversation(samples);
    }

    info!(
        days,
        conversations = metrics.conversations,
        requests = fetcher.requests,
        "team metrics computed"
    );

    let capped = scan.truncated.then_some(max_conversations);
    Ok(Value::String(metrics.render(&window, capped)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiSettings;

    #[test]
    fn raw_id_ignores_missing_and_empty_ids() {
        assert_eq!(raw_id(&json!({"id": "c1"})).as_deref(), Some("c1"));
        assert_eq!(raw_id(&json!({"id": 42})).as_deref(), Some("42"));
        assert_eq!(raw_id(&json!({"id": ""})), None);
        assert_eq!(raw_id(&json!({"subject": "no id"})), None);
    }

    #[test]
    fn oldest_timestamp_skips_undated_items() {
        let page = [
            json!({"delivered_at": 300}),
            json!({"id": "x"}),
            json!({"delivered_at": 100}),
        ];
        assert_eq!(oldest_timestamp(&page, "delivered_at"), Some(100));
        assert_eq!(oldest_timestamp(&[], "delivered_at"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn requests_after_the_first_are_paced() {
        // No token: every request fails before touching the network.
        let client = MissiveClient::new(&ApiSettings {
            api_token: None,
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 5,
        });
        let mut fetcher = Fetcher::new(&client, Duration::from_millis(250));

        let start = tokio::time::Instant::now();
        assert!(fetcher.get("/organizations", &[]).await.is_err());
        assert_eq!(start.elapsed(), Duration::ZERO);

        for _ in 0..2 {
            assert!(fetcher.get("/organizations", &[]).await.is_err());
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(500), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(510), "{elapsed:?}");
        assert_eq!(fetcher.requests, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_never_sleeps() {
        let client = MissiveClient::new(&ApiSettings {
            api_token: None,
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 5,
        });
        let mut fetcher = Fetcher::new(&client, Duration::ZERO);
        let start = tokio::time::Instant::now();
        for _ in 0..3 {
            assert!(fetcher.get("/organizations", &[]).await.is_err());
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
