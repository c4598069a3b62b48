//! JSON-RPC-over-HTTP transport to the checkpoint store.
//!
//! The transport reports every failure as a tagged [`TransportError`]
//! instead of swallowing it, so callers can log or test on the cause. The
//! [`MemoryClient`](super::MemoryClient) is the only place that flattens
//! outcomes into booleans.

use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

/// Sub-path of the store's tool endpoint, appended to the configured base URL.
pub const MCP_PATH: &str = "/api/mcp";

/// Why a store call produced no payload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// The request never completed (DNS, connect, reset, ...).
    #[error("request failed: {0}")]
    Request(String),
    /// The store answered with a non-2xx status.
    #[error("store HTTP {0}")]
    Status(u16),
    /// The body or its embedded payload was not the expected JSON.
    #[error("malformed response: {0}")]
    Decode(String),
}

/// `Ok(Some(payload))` on a decoded payload, `Ok(None)` when the store
/// answered successfully but carried no payload text.
pub type TransportOutcome = Result<Option<Value>, TransportError>;

/// Boxed future returned by [`StoreTransport::call`], keeping the trait
/// dyn-compatible.
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = TransportOutcome> + Send + 'a>>;

/// One request/response exchange with the checkpoint store.
pub trait StoreTransport: Send + Sync {
    /// Send a complete JSON-RPC envelope and return the decoded payload.
    fn call(&self, envelope: &Value) -> TransportFuture<'_>;
}

/// [`StoreTransport`] backed by a `reqwest` client.
///
/// No timeout or retry is configured: each call is a single attempt bounded
/// only by the client's defaults.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// Create a transport posting to `{api_url}/api/mcp`.
    pub fn new(api_url: &str) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ctxsurf/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self::with_client(client, api_url))
    }

    /// Reuse an existing client (shares its connection pool).
    pub fn with_client(client: reqwest::Client, api_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}{MCP_PATH}", api_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, envelope: &Value) -> TransportOutcome {
        let start = Instant::now();
        let resp = self
            .client
            .post(&self.endpoint)
            .json(envelope)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Request(format!("failed to read response: {e}")))?;

        debug!(
            "Store response: HTTP {} in {:.0}ms ({} bytes)",
            status,
            start.elapsed().as_secs_f64() * 1000.0,
            body.len()
        );

        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        extract_payload(&body)
    }
}

impl StoreTransport for HttpTransport {
    fn call(&self, envelope: &Value) -> TransportFuture<'_> {
        let envelope = envelope.clone();
        Box::pin(async move { self.post(&envelope).await })
    }
}

/// Pull the JSON payload out of `{result: {content: [{text: "<json>"}]}}`.
pub fn extract_payload(body: &str) -> TransportOutcome {
    let parsed: Value =
        serde_json::from_str(body).map_err(|e| TransportError::Decode(e.to_string()))?;

    if let Some(err) = parsed.get("error").filter(|e| !e.is_null()) {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(TransportError::Decode(format!("store error: {message}")));
    }

    let text = parsed
        .pointer("/result/content/0/text")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty());

    match text {
        Some(text) => {
            trace!("Store payload: {text}");
            serde_json::from_str(text)
                .map(Some)
                .map_err(|e| TransportError::Decode(format!("payload is not JSON: {e}")))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_appends_mcp_path() {
        let t = HttpTransport::new("http://localhost:3000/").unwrap();
        assert_eq!(t.endpoint(), "http://localhost:3000/api/mcp");
    }

    #[test]
    fn extracts_embedded_payload() {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"content": [{"type": "text", "text": "{\"saved\":true}"}]}
        })
        .to_string();
        assert_eq!(extract_payload(&body), Ok(Some(json!({"saved": true}))));
    }

    #[test]
    fn missing_text_is_empty_not_error() {
        let body = json!({"result": {"content": []}}).to_string();
        assert_eq!(extract_payload(&body), Ok(None));
    }

    #[test]
    fn unparsable_body_is_decode_error() {
        assert!(matches!(
            extract_payload("<html>oops</html>"),
            Err(TransportError::Decode(_))
        ));
    }

    #[test]
    fn unparsable_payload_is_decode_error() {
        let body = json!({"result": {"content": [{"text": "not json"}]}}).to_string();
        assert!(matches!(
            extract_payload(&body),
            Err(TransportError::Decode(_))
        ));
    }

    #[test]
    fn rpc_error_is_decode_error() {
        let body = json!({"error": {"code": -32601, "message": "nope"}}).to_string();
        let err = extract_payload(&body).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
