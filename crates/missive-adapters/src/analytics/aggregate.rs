//! Team metrics aggregation.
//!
//! Pure functions over already-fetched messages: classify each sender as
//! internal or external, count messages per channel, and measure the first
//! reply latency of every conversation.  Nothing here performs I/O.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::config::normalize_domains;
use crate::format::{format_duration, format_timestamp, timestamp_field};

/// Direction of a message relative to the team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sent by a customer (external domain).
    Inbound,
    /// Sent by the team (internal domain).
    Outbound,
}

/// Sender-domain classification rules.
#[derive(Debug, Clone)]
pub struct DomainRules {
    internal: Vec<String>,
    ignored: Vec<String>,
}

impl DomainRules {
    pub fn new(internal: &[String], ignored: &[String]) -> Self {
        Self {
            internal: normalize_domains(internal),
            ignored: normalize_domains(ignored),
        }
    }

    /// Classify a sender address; `None` means the message is not counted.
    pub fn classify(&self, address: Option<&str>) -> Option<Direction> {
        let domain = sender_domain(address?)?;
        if matches_any(&domain, &self.ignored) {
            None
        } else if matches_any(&domain, &self.internal) {
            Some(Direction::Outbound)
        } else {
            Some(Direction::Inbound)
        }
    }
}

/// Lowercased part after the last `@`.
fn sender_domain(address: &str) -> Option<String> {
    let (local, domain) = address.trim().rsplit_once('@')?;
    let domain = domain.trim().trim_end_matches('>').to_ascii_lowercase();
    (!local.is_empty() && !domain.is_empty()).then_some(domain)
}

/// Exact match or subdomain of any entry.
fn matches_any(domain: &str, list: &[String]) -> bool {
    list.iter().any(|entry| {
        domain == entry
            || domain
                .strip_suffix(entry.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// The metrics window, in Unix seconds.
#[derive(Debug, Clone, Copy)]
pub struct Window {
    pub days: i64,
    pub since: i64,
    pub until: i64,
}

impl Window {
    pub fn ending_at(until: i64, days: i64) -> Self {
        Self {
            days,
            since: until - days * 86_400,
            until,
        }
    }

    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.since && ts <= self.until
    }
}

/// One counted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub delivered_at: i64,
    pub channel: String,
    pub direction: Direction,
}

impl Sample {
    /// Extract a sample from a Missive message, if it counts toward metrics.
    pub fn from_message(message: &Value, rules: &DomainRules, window: &Window) -> Option<Self> {
        let delivered_at = timestamp_field(message, "delivered_at")?;
        if !window.contains(delivered_at) {
            return None;
        }
        let address = message
            .get("from_field")
            .and_then(|f| f.get("address"))
            .and_then(Value::as_str);
        let direction = rules.classify(address)?;
        let channel = message
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .unwrap_or("unknown")
            .to_string();
        Some(Self {
            delivered_at,
            channel,
            direction,
        })
    }
}

/// Per-channel counters.
#[derive(Debug, Default, Clone)]
pub struct ChannelStats {
    pub received: u64,
    pub sent: u64,
    /// First-reply latencies, in seconds.
    pub reply_times: Vec<i64>,
}

/// Counters for one metrics computation.
#[derive(Debug, Default)]
pub struct TeamMetrics {
    pub conversations: u64,
    pub awaiting_reply: u64,
    pub channels: BTreeMap<String, ChannelStats>,
}

impl TeamMetrics {
    /// Fold one conversation's samples into the counters.
    pub fn record_conversation(&mut self, mut samples: Vec<Sample>) {
        self.conversations += 1;
        samples.sort_by_key(|s| s.delivered_at);

        for sample in &samples {
            let stats = self.channels.entry(sample.channel.clone()).or_default();
            match sample.direction {
                Direction::Inbound => stats.received += 1,
                Direction::Outbound => stats.sent += 1,
            }
        }

        let Some(inbound) = samples.iter().find(|s| s.direction == Direction::Inbound) else {
            return;
        };
        // Same-second replies may be listed ahead of the inbound message.
        let reply = samples
            .iter()
            .find(|s| s.direction == Direction::Outbound && s.delivered_at >= inbound.delivered_at);

        match reply {
            Some(reply) => self
                .channels
                .entry(inbound.channel.clone())
                .or_default()
                .reply_times
                .push(reply.delivered_at - inbound.delivered_at),
            None => self.awaiting_reply += 1,
        }
    }

    pub fn received(&self) -> u64 {
        self.channels.values().map(|c| c.received).sum()
    }

    pub fn sent(&self) -> u64 {
        self.channels.values().map(|c| c.sent).sum()
    }

    /// All first-reply latencies, sorted ascending.
    pub fn reply_times(&self) -> Vec<i64> {
        let mut all: Vec<i64> = self
            .channels
            .values()
            .flat_map(|c| c.reply_times.iter().copied())
            .collect();
        all.sort_unstable();
        all
    }

    /// Render the report.  `capped_at` is set when the conversation cap was hit.
    pub fn render(&self, window: &Window, capped_at: Option<usize>) -> String {
        let mut out = format!("Team Metrics (last {} days)\n\n", window.days);
        out.push_str(&format!(
            "Window: {} to {}\n",
            format_timestamp(window.since),
            format_timestamp(window.until)
        ));
        out.push_str(&format!("Conversations analysed: {}\n", self.conversations));
        if let Some(cap) = capped_at {
            out.push_str(&format!(
                "Conversation cap of {cap} reached; older activity is not included.\n"
            ));
        }
        out.push_str(&format!(
            "Messages received: {}\nMessages sent: {}\n",
            self.received(),
            self.sent()
        ));

        if !self.channels.is_empty() {
            out.push_str("\nBy channel:\n");
            for (channel, stats) in &self.channels {
                out.push_str(&format!(
                    "  {channel}: {} received, {} sent, {} replies",
                    stats.received,
                    stats.sent,
                    stats.reply_times.len()
                ));
                if let Some(avg) = average(&stats.reply_times) {
                    out.push_str(&format!(", avg first reply {}", format_duration(avg)));
                }
                out.push('\n');
            }
        }

        let times = self.reply_times();
        out.push_str("\nFirst replies:\n");
        out.push_str(&format!(
            "  Replied: {}\n  Awaiting reply: {}\n",
            times.len(),
            self.awaiting_reply
        ));
        match (average(&times), median(&times), percentile(&times, 90)) {
            (Some(avg), Some(med), Some(p90)) => {
                out.push_str(&format!(
                    "  Average: {}\n  Median: {}\n  90th percentile: {}\n  Fastest: {}\n  Slowest: {}\n",
                    format_duration(avg),
                    format_duration(med),
                    format_duration(p90),
                    format_duration(times[0]),
                    format_duration(times[times.len() - 1]),
                ));
            }
            _ => out.push_str("  No first replies in this window.\n"),
        }
        out
    }
}

pub fn average(values: &[i64]) -> Option<i64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<i64>() / values.len() as i64)
}

/// Median of sorted values; the mean of the middle pair for even lengths.
pub fn median(sorted: &[i64]) -> Option<i64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2),
    }
}

/// Nearest-rank percentile of sorted values.
pub fn percentile(sorted: &[i64], pct: usize) -> Option<i64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (pct * sorted.len()).div_ceil(100).max(1);
    sorted.get(rank - 1).copied()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn rules() -> DomainRules {
        DomainRules::new(
            &["Acme.com".to_string()],
            &["@mailer.acme.com".to_string(), "noreply.io".to_string()],
        )
    }

    fn sample(ts: i64, channel: &str, direction: Direction) -> Sample {
        Sample {
            delivered_at: ts,
            channel: channel.into(),
            direction,
        }
    }

    #[test]
    fn classify_by_domain() {
        let r = rules();
        assert_eq!(r.classify(Some("ann@acme.com")), Some(Direction::Outbound));
        assert_eq!(r.classify(Some("ann@eu.ACME.com")), Some(Direction::Outbound));
        assert_eq!(r.classify(Some("bob@client.io")), Some(Direction::Inbound));
        assert_eq!(r.classify(Some("bot@mailer.acme.com")), None);
        assert_eq!(r.classify(Some("x@noreply.io")), None);
        assert_eq!(r.classify(Some("not-an-address")), None);
        assert_eq!(r.classify(None), None);
    }

    #[test]
    fn lookalike_domains_are_external() {
        let r = rules();
        assert_eq!(r.classify(Some("eve@notacme.com")), Some(Direction::Inbound));
    }

    #[test]
    fn sample_from_message_respects_window_and_type() {
        let window = Window::ending_at(10_000, 1);
        let r = rules();
        let msg = json!({"delivered_at": 9_000, "type": "sms", "from_field": {"address": "c@x.io"}});
        let s = Sample::from_message(&msg, &r, &window).unwrap();
        assert_eq!(s.channel, "sms");
        assert_eq!(s.direction, Direction::Inbound);

        let untyped = json!({"delivered_at": 9_000, "from_field": {"address": "t@acme.com"}});
        assert_eq!(Sample::from_message(&untyped, &r, &window).unwrap().channel, "unknown");

        let old = json!({"delivered_at": 10_000 - 86_401, "from_field": {"address": "c@x.io"}});
        assert!(Sample::from_message(&old, &r, &window).is_none());

        let no_sender = json!({"delivered_at": 9_000, "type": "email"});
        assert!(Sample::from_message(&no_sender, &r, &window).is_none());
    }

    #[test]
    fn first_reply_is_measured_from_first_inbound() {
        let mut m = TeamMetrics::default();
        m.record_conversation(vec![
            sample(500, "email", Direction::Outbound),
            sample(100, "email", Direction::Inbound),
            sample(400, "email", Direction::Inbound),
            sample(700, "email", Direction::Outbound),
        ]);
        let email = &m.channels["email"];
        assert_eq!(email.received, 2);
        assert_eq!(email.sent, 2);
        assert_eq!(email.reply_times, vec![400]);
        assert_eq!(m.awaiting_reply, 0);
    }

    #[test]
    fn outbound_before_inbound_is_not_a_reply() {
        let mut m = TeamMetrics::default();
        m.record_conversation(vec![
            sample(100, "email", Direction::Outbound),
            sample(200, "email", Direction::Inbound),
        ]);
        assert_eq!(m.awaiting_reply, 1);
        assert!(m.reply_times().is_empty());
    }

    #[test]
    fn same_second_outbound_counts_as_reply() {
        let mut m = TeamMetrics::default();
        m.record_conversation(vec![
            sample(100, "email", Direction::Outbound),
            sample(100, "email", Direction::Inbound),
        ]);
        assert_eq!(m.awaiting_reply, 0);
        assert_eq!(m.reply_times(), vec![0]);
    }

    #[test]
    fn latency_attributed_to_inbound_channel() {
        let mut m = TeamMetrics::default();
        m.record_conversation(vec![
            sample(100, "whatsapp", Direction::Inbound),
            sample(160, "email", Direction::Outbound),
        ]);
        assert_eq!(m.channels["whatsapp"].reply_times, vec![60]);
        assert!(m.channels["email"].reply_times.is_empty());
        assert_eq!(m.channels["email"].sent, 1);
    }

    #[test]
    fn conversations_without_inbound_are_counted_only() {
        let mut m = TeamMetrics::default();
        m.record_conversation(vec![sample(100, "email", Direction::Outbound)]);
        m.record_conversation(Vec::new());
        assert_eq!(m.conversations, 2);
        assert_eq!(m.awaiting_reply, 0);
        assert_eq!(m.sent(), 1);
    }

    #[test]
    fn statistics() {
        let sorted: Vec<i64> = (1..=10).map(|i| i * 60).collect();
        assert_eq!(average(&sorted), Some(330));
        assert_eq!(median(&sorted), Some(330));
        assert_eq!(median(&[60, 120, 600]), Some(120));
        assert_eq!(percentile(&sorted, 90), Some(540));
        assert_eq!(percentile(&[42], 90), Some(42));
        assert_eq!(percentile(&[], 90), None);
        assert_eq!(average(&[]), None);
    }

    #[test]
    fn render_lists_channels_sorted() {
        let mut m = TeamMetrics::default();
        m.record_conversation(vec![
            sample(100, "sms", Direction::Inbound),
            sample(100 + 3_600, "sms", Direction::Outbound),
        ]);
        m.record_conversation(vec![
            sample(200, "email", Direction::Inbound),
            sample(200 + 1_800, "email", Direction::Outbound),
        ]);
        m.record_conversation(vec![sample(300, "email", Direction::Inbound)]);

        let out = m.render(&Window::ending_at(100_000, 7), Some(3));
        assert!(out.starts_with("Team Metrics (last 7 days)"));
        assert!(out.contains("Conversations analysed: 3"));
        assert!(out.contains("Conversation cap of 3 reached"));
        assert!(out.contains("Messages received: 3\nMessages sent: 2"));
        let email = out.find("  email:").unwrap();
        let sms = out.find("  sms:").unwrap();
        assert!(email < sms);
        assert!(out.contains("email: 2 received, 1 sent, 1 replies, avg first reply 30m"));
        assert!(out.contains("Replied: 2\n  Awaiting reply: 1"));
        assert!(out.contains("Fastest: 30m"));
        assert!(out.contains("Slowest: 1h 0m"));
    }

    #[test]
    fn render_without_replies() {
        let out = TeamMetrics::default().render(&Window::ending_at(100_000, 1), None);
        assert!(out.contains("No first replies in this window."));
        assert!(!out.contains("By channel"));
    }
}
