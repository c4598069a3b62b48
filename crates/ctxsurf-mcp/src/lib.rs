//! Stdio MCP server exposing ctxsurf checkpoint tools to agent hosts.
//!
//! The host spawns `ctxsurf-mcp` and speaks newline-delimited JSON-RPC 2.0
//! over stdin/stdout. [`McpServer::handle_line`] turns one request line into
//! at most one response; the binary is a thin read/write loop around it.
//!
//! Three tools are exposed:
//!
//! | Tool | Does |
//! |------|------|
//! | `save_checkpoint` | Saves a checkpoint through the [`MemoryClient`] |
//! | `get_checkpoint` | Returns the stored checkpoint as JSON and Markdown |
//! | `check_context_zone` | Classifies a usage sample, or estimates one from tool calls |

use std::path::PathBuf;

use ctxsurf::config::SurfConfig;
use ctxsurf::context::{ToolUsageTracker, classify};
use ctxsurf::memory::{MemoryClient, SaveCheckpointParams};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

// ── Protocol constants ─────────────────────────────────────────────

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Name reported in `serverInfo`. Hosts key their config on it.
pub const SERVER_NAME: &str = "claudesurf-memory";

pub const PARSE_ERROR: i64 = -32700;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

// ── JSON-RPC envelopes ─────────────────────────────────────────────

#[derive(Deserialize, Debug)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

// ── Tool arguments ─────────────────────────────────────────────────

/// Arguments for `save_checkpoint`.
#[derive(Deserialize, JsonSchema, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct SaveCheckpointArgs {
    /// Brief summary of current session state.
    pub summary: String,
    /// List of incomplete tasks.
    #[serde(default)]
    pub pending_work: Option<Vec<String>>,
    /// List of completed items.
    #[serde(default)]
    pub accomplishments: Option<Vec<String>>,
    /// List of modified file paths.
    #[serde(default)]
    pub files_modified: Option<Vec<String>>,
}

/// Arguments for `get_checkpoint` (none).
#[derive(Deserialize, JsonSchema, Debug, Default)]
pub struct GetCheckpointArgs {}

/// Arguments for `check_context_zone`.
#[derive(Deserialize, JsonSchema, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CheckContextZoneArgs {
    /// Tokens currently in the context window. Omit to estimate from tool calls.
    #[serde(default)]
    pub tokens_used: Option<u64>,
    /// Context window size. Defaults to the configured maximum.
    #[serde(default)]
    pub tokens_max: Option<u64>,
}

/// JSON Schema for `T`, without the `$schema`/`title` noise hosts don't need.
pub fn json_schema_for<T: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    let mut value = serde_json::to_value(schema)
        .unwrap_or_else(|_| json!({"type": "object", "properties": {}}));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.entry("properties").or_insert_with(|| json!({}));
    }
    value
}

fn tool_definitions() -> Value {
    json!([
        {
            "name": "save_checkpoint",
            "description": "Save current session context to persistent memory. Use before compaction or session end.",
            "inputSchema": json_schema_for::<SaveCheckpointArgs>(),
        },
        {
            "name": "get_checkpoint",
            "description": "Retrieve the last saved checkpoint for this agent",
            "inputSchema": json_schema_for::<GetCheckpointArgs>(),
        },
        {
            "name": "check_context_zone",
            "description": "Check current context zone (Hot/Warm/Cold/Critical) from a token count, or estimate it from the tool call count",
            "inputSchema": json_schema_for::<CheckContextZoneArgs>(),
        },
    ])
}

/// Parse tool arguments, treating a missing/null object as `{}`.
fn parse_args<T: serde::de::DeserializeOwned>(args: &Value) -> Result<T, String> {
    let args = if args.is_null() { json!({}) } else { args.clone() };
    serde_json::from_value(args).map_err(|e| format!("invalid tool arguments: {e}"))
}

fn tool_text(payload: &Value, is_error: bool) -> Value {
    let mut result = json!({
        "content": [{"type": "text", "text": payload.to_string()}]
    });
    if is_error {
        result["isError"] = Value::Bool(true);
    }
    result
}

// ── Server ─────────────────────────────────────────────────────────

/// Request handler bound to one agent's config and store.
pub struct McpServer {
    config: SurfConfig,
    client: MemoryClient,
    tracker_path: PathBuf,
}

impl McpServer {
    pub fn new(config: SurfConfig) -> Result<Self, String> {
        let client = MemoryClient::from_config(&config)?;
        let tracker_path = ToolUsageTracker::default_path(&config.agent_id);
        Ok(Self {
            config,
            client,
            tracker_path,
        })
    }

    /// Read the tool-call count from `path` instead of the per-agent default.
    pub fn with_tracker_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tracker_path = path.into();
        self
    }

    /// Handle one line of input. `None` means nothing should be written
    /// (blank line or notification).
    pub async fn handle_line(&self, line: &str) -> Option<RpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str::<RpcRequest>(line) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                debug!("Unparsable request: {e}");
                Some(RpcResponse::err(Value::Null, PARSE_ERROR, "Parse error"))
            }
        }
    }

    pub async fn handle(&self, request: RpcRequest) -> Option<RpcResponse> {
        let Some(id) = request.id else {
            debug!("Notification: {}", request.method);
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => RpcResponse::ok(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {"tools": {}},
                    "serverInfo": {"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")},
                }),
            ),
            "ping" => RpcResponse::ok(id, json!({})),
            "tools/list" => RpcResponse::ok(id, json!({"tools": tool_definitions()})),
            "tools/call" => {
                let Some(name) = request.params.get("name").and_then(Value::as_str) else {
                    return Some(RpcResponse::err(id, INVALID_PARAMS, "missing tool name"));
                };
                let args = request.params.get("arguments").cloned().unwrap_or(Value::Null);
                let result = match self.call_tool(name, &args).await {
                    Ok(payload) => tool_text(&payload, false),
                    Err(e) => {
                        warn!("Tool {name} failed: {e}");
                        tool_text(&json!({"error": e}), true)
                    }
                };
                RpcResponse::ok(id, result)
            }
            other => RpcResponse::err(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
        };
        Some(response)
    }

    async fn call_tool(&self, name: &str, args: &Value) -> Result<Value, String> {
        match name {
            "save_checkpoint" => {
                let args: SaveCheckpointArgs = parse_args(args)?;
                Ok(self.save_checkpoint(args).await)
            }
            "get_checkpoint" => {
                let _: GetCheckpointArgs = parse_args(args)?;
                Ok(self.get_checkpoint().await)
            }
            "check_context_zone" => {
                let args: CheckContextZoneArgs = parse_args(args)?;
                self.check_context_zone(args)
            }
            other => Err(format!("Unknown tool: {other}")),
        }
    }

    async fn save_checkpoint(&self, args: SaveCheckpointArgs) -> Value {
        let mut params = SaveCheckpointParams::new(args.summary);
        params.pending_work = args.pending_work;
        params.accomplishments = args.accomplishments;
        params.files_edited = args.files_modified;
        let saved = self.client.save_checkpoint(&params).await;
        json!({"saved": saved})
    }

    async fn get_checkpoint(&self) -> Value {
        match self.client.get_checkpoint().await {
            Some(cp) => json!({
                "found": true,
                "markdown": cp.to_markdown(),
                "checkpoint": cp,
            }),
            None => json!({"found": false}),
        }
    }

    fn check_context_zone(&self, args: CheckContextZoneArgs) -> Result<Value, String> {
        if let Some(tokens_used) = args.tokens_used {
            let max = args
                .tokens_max
                .filter(|m| *m > 0)
                .unwrap_or(self.config.max_context_tokens);
            let info = classify(tokens_used, max, &self.config.zones).map_err(|e| e.to_string())?;
            let mut value = serde_json::to_value(&info).map_err(|e| e.to_string())?;
            value["recommendation"] = info.recommendation().into();
            return Ok(value);
        }

        match ToolUsageTracker::load(&self.tracker_path) {
            Some(tracker) => {
                let info = tracker.estimate_zone(&self.config.zones);
                Ok(json!({
                    "zone": info.zone,
                    "estimatedPercentage": info.percentage,
                    "toolCount": tracker.tool_count(),
                    "recommendation": info.recommendation(),
                }))
            }
            None => Ok(json!({
                "zone": "unknown",
                "toolCount": 0,
                "recommendation": "No state file found",
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(dir: &std::path::Path) -> McpServer {
        let config = SurfConfig::defaults_from(|_| None)
            .with_agent_id("mcp-agent")
            .with_api_url("http://127.0.0.1:9")
            .with_max_context_tokens(1000);
        McpServer::new(config)
            .unwrap()
            .with_tracker_path(dir.join("state.json"))
    }

    fn text_payload(resp: &RpcResponse) -> Value {
        let text = resp.result.as_ref().unwrap()["content"][0]["text"]
            .as_str()
            .unwrap();
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let dir = tempfile::tempdir().unwrap();
        let resp = server(dir.path())
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .await
            .unwrap();
        let result = resp.result.unwrap();
        assert_eq!(resp.id, json!(1));
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "claudesurf-memory");
        assert_eq!(result["serverInfo"]["version"], "0.2.0");
    }

    #[tokio::test]
    async fn notifications_get_no_reply() {
        let dir = tempfile::tempdir().unwrap();
        let s = server(dir.path());
        assert!(
            s.handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .await
                .is_none()
        );
        assert!(s.handle_line("   ").await.is_none());
    }

    #[tokio::test]
    async fn parse_error_has_null_id() {
        let dir = tempfile::tempdir().unwrap();
        let resp = server(dir.path()).handle_line("{not json").await.unwrap();
        assert_eq!(resp.id, Value::Null);
        assert_eq!(resp.error.unwrap().code, PARSE_ERROR);
    }

    #[tokio::test]
    async fn unknown_method_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let resp = server(dir.path())
            .handle_line(r#"{"jsonrpc":"2.0","id":"x","method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(resp.id, json!("x"));
        let err = resp.error.unwrap();
        assert_eq!(err.code, METHOD_NOT_FOUND);
        assert!(err.message.contains("resources/list"));
    }

    #[tokio::test]
    async fn tools_list_has_generated_schemas() {
        let dir = tempfile::tempdir().unwrap();
        let resp = server(dir.path())
            .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .await
            .unwrap();
        let tools = resp.result.unwrap()["tools"].clone();
        let names: Vec<&str> = tools
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["save_checkpoint", "get_checkpoint", "check_context_zone"]);

        let save = &tools[0]["inputSchema"];
        assert_eq!(save["type"], "object");
        assert_eq!(save["required"], json!(["summary"]));
        assert!(save["properties"]["filesModified"].is_object());
        assert!(save.get("$schema").is_none());
        assert!(tools[1]["inputSchema"]["properties"].is_object());
    }

    #[tokio::test]
    async fn zone_from_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let resp = server(dir.path())
            .handle_line(
                r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"check_context_zone","arguments":{"tokensUsed":800}}}"#,
            )
            .await
            .unwrap();
        let payload = text_payload(&resp);
        assert_eq!(payload["zone"], "cold");
        assert_eq!(payload["action"], "checkpoint");
        assert_eq!(payload["tokensMax"], 1000);
        assert_eq!(payload["recommendation"], "Proactively save checkpoint");
    }

    #[tokio::test]
    async fn zone_from_tool_count() {
        let dir = tempfile::tempdir().unwrap();
        let s = server(dir.path());
        let call = r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"check_context_zone"}}"#;

        let payload = text_payload(&s.handle_line(call).await.unwrap());
        assert_eq!(payload["zone"], "unknown");
        assert_eq!(payload["toolCount"], 0);

        std::fs::write(dir.path().join("state.json"), r#"{"toolCount":30}"#).unwrap();
        let payload = text_payload(&s.handle_line(call).await.unwrap());
        assert_eq!(payload["zone"], "warm");
        assert_eq!(payload["estimatedPercentage"], 60.0);
        assert_eq!(payload["toolCount"], 30);
    }

    #[tokio::test]
    async fn tool_failures_set_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let s = server(dir.path());

        let resp = s
            .handle_line(r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"rm_rf"}}"#)
            .await
            .unwrap();
        let result = resp.result.clone().unwrap();
        assert_eq!(result["isError"], true);
        assert!(text_payload(&resp)["error"].as_str().unwrap().contains("rm_rf"));

        let resp = s
            .handle_line(r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"save_checkpoint","arguments":{}}}"#)
            .await
            .unwrap();
        assert_eq!(resp.result.unwrap()["isError"], true);
    }
}
