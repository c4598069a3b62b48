//! Integration tests for the MCP server against a mock checkpoint store.
//!
//! The store runs as a real axum server on a random port; the MCP server
//! is driven line by line the way the stdio loop drives it.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use ctxsurf::config::SurfConfig;
use ctxsurf_mcp::McpServer;
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct Store {
    saved: Arc<Mutex<Option<Value>>>,
}

async fn mcp(State(store): State<Store>, Json(body): Json<Value>) -> Json<Value> {
    let args = body["params"]["arguments"].clone();
    let payload = match args["action"].as_str() {
        Some("save-checkpoint") => {
            *store.saved.lock().unwrap() = Some(args);
            json!({"saved": true})
        }
        Some("get-checkpoint") => match store.saved.lock().unwrap().clone() {
            Some(record) => json!({"found": true, "checkpoint": record}),
            None => json!({"found": false}),
        },
        _ => json!({}),
    };
    Json(json!({
        "jsonrpc": "2.0",
        "id": body["id"],
        "result": {"content": [{"type": "text", "text": payload.to_string()}]}
    }))
}

async fn spawn_server() -> (Store, McpServer) {
    let store = Store::default();
    let router = Router::new()
        .route("/api/mcp", post(mcp))
        .with_state(store.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let config = SurfConfig::defaults_from(|_| None)
        .with_agent_id("mcp-it")
        .with_team_id("mcp-team")
        .with_api_url(format!("http://{addr}"));
    (store, McpServer::new(config).unwrap())
}

async fn call_tool(server: &McpServer, name: &str, arguments: Value) -> Value {
    let line = json!({
        "jsonrpc": "2.0",
        "id": 10,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
    .to_string();
    let resp = server.handle_line(&line).await.unwrap();
    let result = resp.result.unwrap();
    assert!(result.get("isError").is_none(), "tool failed: {result}");
    serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn save_then_get_checkpoint() {
    let (store, server) = spawn_server().await;

    let saved = call_tool(
        &server,
        "save_checkpoint",
        json!({
            "summary": "wired the MCP server",
            "pendingWork": ["docs"],
            "filesModified": ["src/lib.rs"]
        }),
    )
    .await;
    assert_eq!(saved, json!({"saved": true}));

    let record = store.saved.lock().unwrap().clone().unwrap();
    assert_eq!(record["agentId"], "mcp-it");
    assert_eq!(record["teamId"], "mcp-team");
    assert_eq!(record["conversationSummary"], "wired the MCP server");
    assert_eq!(record["filesEdited"], json!(["src/lib.rs"]));
    assert!(record.get("accomplishments").is_none());

    let got = call_tool(&server, "get_checkpoint", json!({})).await;
    assert_eq!(got["found"], true);
    assert_eq!(got["checkpoint"]["conversationSummary"], "wired the MCP server");
    let markdown = got["markdown"].as_str().unwrap();
    assert!(markdown.contains("### Pending Work\n- docs"));
    assert!(markdown.contains("### Files Modified\n- src/lib.rs"));
}

#[tokio::test]
async fn get_checkpoint_when_empty() {
    let (_store, server) = spawn_server().await;
    let got = call_tool(&server, "get_checkpoint", Value::Null).await;
    assert_eq!(got, json!({"found": false}));
}

#[tokio::test]
async fn unreachable_store_reports_not_saved() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = SurfConfig::defaults_from(|_| None).with_api_url(format!("http://{addr}"));
    let server = McpServer::new(config).unwrap();
    let saved = call_tool(&server, "save_checkpoint", json!({"summary": "x"})).await;
    assert_eq!(saved, json!({"saved": false}));
}
