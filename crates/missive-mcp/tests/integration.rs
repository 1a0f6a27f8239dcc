//! Integration tests for the missive-mcp crate.
//!
//! These drive the stdio transport end to end with the real adapters
//! talking to a wiremock stand-in for the Missive API.

use std::sync::Arc;

use missive_adapters::{
    Adapter, AnalyticsAdapter, ApiSettings, InboxAdapter, MetricsSettings, MissiveClient,
};
use missive_mcp::{McpServer, serve};
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mcp_server(api: &MockServer, token: Option<&str>) -> McpServer {
    let client = MissiveClient::new(&ApiSettings {
        api_token: token.map(str::to_string),
        base_url: api.uri(),
        timeout_secs: 5,
    });
    let mut inbox = InboxAdapter::new("inbox", client.clone());
    let mut analytics = AnalyticsAdapter::new("analytics", client, MetricsSettings::default());
    inbox.connect().await.unwrap();
    analytics.connect().await.unwrap();
    let adapters: Vec<Arc<dyn Adapter>> = vec![Arc::new(inbox), Arc::new(analytics)];
    McpServer::new(adapters)
}

async fn exchange(server: &McpServer, lines: &[Value]) -> Vec<Value> {
    let input: String = lines.iter().map(|l| format!("{l}\n")).collect();
    let mut output = Vec::new();
    serve(server, input.as_bytes(), &mut output).await.unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[tokio::test]
async fn full_session() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/conversations/c1"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversations": [{
                "id": "c1",
                "latest_message_subject": "Invoice question",
                "authors": [{"name": "Ann"}],
                "web_url": "https://mail.missiveapp.com/#inbox/conversations/c1"
            }]
        })))
        .expect(1)
        .mount(&api)
        .await;

    let server = mcp_server(&api, Some("secret")).await;
    let replies = exchange(
        &server,
        &[
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
                   "params": {"protocolVersion": "2025-03-26", "capabilities": {},
                              "clientInfo": {"name": "test", "version": "0"}}}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
                   "params": {"name": "get_conversation_details",
                              "arguments": {"conversation_id": "c1"}}}),
        ],
    )
    .await;

    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0]["result"]["protocolVersion"], "2025-03-26");

    let tools = replies[1]["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 29);
    assert!(tools.iter().any(|t| t["name"] == "get_team_metrics"));

    let text = replies[2]["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("Invoice question"));
    assert!(text.contains("Authors: Ann"));
    assert!(replies[2]["result"].get("isError").is_none());
}

#[tokio::test]
async fn api_errors_surface_as_tool_errors() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/messages/m404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&api)
        .await;

    let server = mcp_server(&api, Some("secret")).await;
    let replies = exchange(
        &server,
        &[json!({"jsonrpc": "2.0", "id": 9, "method": "tools/call",
                 "params": {"name": "get_message_details",
                            "arguments": {"message_id": "m404"}}})],
    )
    .await;

    let result = &replies[0]["result"];
    assert_eq!(result["isError"], true);
    assert_eq!(
        result["content"][0]["text"],
        "tool execution failed: message m404 not found"
    );
}

#[tokio::test]
async fn missing_token_fails_without_network() {
    let api = MockServer::start().await;
    let server = mcp_server(&api, None).await;
    let replies = exchange(
        &server,
        &[json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call",
                 "params": {"name": "get_conversations"}})],
    )
    .await;

    let text = replies[0]["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("MISSIVE_API_TOKEN"));
    assert!(api.received_requests().await.unwrap().is_empty());
}
