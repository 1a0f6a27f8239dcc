//! MCP request dispatch.
//!
//! [`McpServer`] owns the connected adapters and answers `initialize`,
//! `ping`, `tools/list` and `tools/call`.  Tool names are indexed once at
//! construction so `tools/call` is a map lookup rather than a scan.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use missive_adapters::Adapter;

use crate::protocol::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JsonRpcRequest, JsonRpcResponse,
    METHOD_NOT_FOUND, McpToolDefinition, McpToolResult, Reply, negotiate_version,
};

/// The server name reported during initialization.
pub const SERVER_NAME: &str = "Missive MCP";

/// The server version reported during initialization.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP protocol server that exposes adapters as tools.
pub struct McpServer {
    adapters: Vec<Arc<dyn Adapter>>,
    /// Tool name to index into `adapters`.
    index: HashMap<String, usize>,
    /// Definitions in registration order, duplicates removed.
    tools: Vec<McpToolDefinition>,
}

impl McpServer {
    /// Create a server backed by the given adapters.
    ///
    /// When two adapters declare the same tool name, the first one wins.
    pub fn new(adapters: Vec<Arc<dyn Adapter>>) -> Self {
        let mut index = HashMap::new();
        let mut tools = Vec::new();
        for (slot, adapter) in adapters.iter().enumerate() {
            for tool in adapter.tools() {
                if let Some(&owner) = index.get(&tool.name) {
                    let owner: &Arc<dyn Adapter> = &adapters[owner];
                    warn!(
                        tool = %tool.name,
                        kept = owner.id(),
                        ignored = adapter.id(),
                        "duplicate tool name"
                    );
                    continue;
                }
                index.insert(tool.name.clone(), slot);
                tools.push(McpToolDefinition::from(tool));
            }
        }
        debug!(adapters = adapters.len(), tools = tools.len(), "tool index built");
        Self {
            adapters,
            index,
            tools,
        }
    }

    /// Every exposed tool, in registration order.
    pub fn tool_definitions(&self) -> &[McpToolDefinition] {
        &self.tools
    }

    /// Handle one decoded JSON message: a request, a notification or a batch.
    ///
    /// Returns `None` when nothing should be written back.
    pub async fn handle_message(&self, message: Value) -> Option<Reply> {
        match message {
            Value::Array(batch) => {
                if batch.is_empty() {
                    return Some(Reply::Single(JsonRpcResponse::error(
                        None,
                        INVALID_REQUEST,
                        "empty batch request",
                    )));
                }
                let mut responses = Vec::with_capacity(batch.len());
                for item in batch {
                    if let Some(response) = self.handle_value(item).await {
                        responses.push(response);
                    }
                }
                (!responses.is_empty()).then_some(Reply::Batch(responses))
            }
            single => self.handle_value(single).await.map(Reply::Single),
        }
    }

    async fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        let id = value.get("id").cloned().filter(|id| !id.is_null());
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => Some(JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                format!("invalid request: {e}"),
            )),
        }
    }

    /// Handle a single JSON-RPC request; notifications yield `None`.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            self.handle_notification(&request);
            return None;
        }
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                INVALID_REQUEST,
                format!("unsupported jsonrpc version `{}`", request.jsonrpc),
            ));
        }

        debug!(method = %request.method, "MCP request received");
        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id, &request.params),
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            other => {
                warn!(method = %other, "unknown MCP method");
                JsonRpcResponse::error(
                    request.id,
                    METHOD_NOT_FOUND,
                    format!("method not found: {other}"),
                )
            }
        };
        Some(response)
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => info!("client initialized"),
            "notifications/cancelled" => debug!(params = %request.params, "request cancelled"),
            other => debug!(method = %other, "ignoring notification"),
        }
    }

    /// Handle the `initialize` handshake.
    fn handle_initialize(&self, id: Option<Value>, params: &Value) -> JsonRpcResponse {
        let requested = params.get("protocolVersion").and_then(Value::as_str);
        let version = negotiate_version(requested);
        let client_name = params
            .get("clientInfo")
            .and_then(|c| c.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(
            requested = requested.unwrap_or("none"),
            negotiated = version,
            client = client_name,
            "MCP session initialized"
        );

        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": version,
                "capabilities": {
                    "tools": { "listChanged": false }
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": SERVER_VERSION
                }
            }),
        )
    }

    /// Handle `tools/list`.
    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        match serde_json::to_value(&self.tools) {
            Ok(tools) => JsonRpcResponse::success(id, json!({ "tools": tools })),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize tool list");
                JsonRpcResponse::error(id, INTERNAL_ERROR, "failed to serialize tool list")
            }
        }
    }

    /// Handle `tools/call` by dispatching to the owning adapter.
    async fn handle_tools_call(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                "missing required field `name` in params",
            );
        };

        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => json!({}),
            Some(args @ Value::Object(_)) => args.clone(),
            Some(_) => {
                return JsonRpcResponse::error(
                    id,
                    INVALID_PARAMS,
                    "`arguments` must be an object",
                );
            }
        };

        let result = self.call_tool(name, arguments).await;
        match serde_json::to_value(&result) {
            Ok(v) => JsonRpcResponse::success(id, v),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize tool result");
                JsonRpcResponse::error(id, INTERNAL_ERROR, "failed to serialize tool result")
            }
        }
    }

    /// Execute a tool; failures become an `isError` result, never a
    /// JSON-RPC error.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> McpToolResult {
        let Some(adapter) = self.index.get(name).map(|&slot| &self.adapters[slot]) else {
            warn!(tool = name, "unknown tool requested");
            return McpToolResult::error(format!("unknown tool: {name}"));
        };

        let started = std::time::Instant::now();
        match adapter.execute_tool(name, arguments).await {
            Ok(value) => {
                debug!(
                    tool = name,
                    adapter = adapter.id(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "tool call succeeded"
                );
                let text = match value {
                    Value::String(s) => s,
                    other => {
                        serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string())
                    }
                };
                McpToolResult::success(text)
            }
            Err(e) => {
                warn!(tool = name, adapter = adapter.id(), error = %e, "tool call failed");
                McpToolResult::error(format!("tool execution failed: {e}"))
            }
        }
    }
}
