//! Checkpoint save/get/clear against the remote store.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use super::checkpoint::{Checkpoint, SaveCheckpointParams};
use super::transport::{HttpTransport, StoreTransport, TransportOutcome};
use crate::config::SurfConfig;

/// Tool name the store exposes for checkpoint actions.
const STORE_TOOL: &str = "agent-status";

/// Best-effort adapter over a [`StoreTransport`].
///
/// Every operation is a single attempt. Failures are logged and reported
/// as `false` / `None`; nothing here returns an error or panics. A `None`
/// from [`get_checkpoint`](Self::get_checkpoint) means either "no
/// checkpoint" or "store unreachable" and the two cannot be told apart.
pub struct MemoryClient {
    transport: Arc<dyn StoreTransport>,
    agent_id: String,
    team_id: String,
    /// JSON-RPC id for the next request. Scoped to this client.
    next_id: AtomicU64,
}

impl MemoryClient {
    pub fn new(
        transport: Arc<dyn StoreTransport>,
        agent_id: impl Into<String>,
        team_id: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            agent_id: agent_id.into(),
            team_id: team_id.into(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Build a client with an [`HttpTransport`] pointed at `config.api_url`.
    pub fn from_config(config: &SurfConfig) -> Result<Self, String> {
        let transport = HttpTransport::new(&config.api_url)?;
        Ok(Self::new(
            Arc::new(transport),
            &config.agent_id,
            &config.team_id,
        ))
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    /// Persist a checkpoint. `true` only when the store confirms `saved: true`.
    pub async fn save_checkpoint(&self, params: &SaveCheckpointParams) -> bool {
        let args = match serde_json::to_value(params) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let outcome = self.call("save-checkpoint", args).await;
        confirmed(outcome, "save-checkpoint", "saved")
    }

    /// Fetch the latest checkpoint for this agent/team, if any.
    pub async fn get_checkpoint(&self) -> Option<Checkpoint> {
        let payload = match self.call("get-checkpoint", Map::new()).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!("get-checkpoint: empty payload");
                return None;
            }
            Err(e) => {
                warn!("get-checkpoint failed: {e}");
                return None;
            }
        };

        let record = unwrap_found(&payload)?;
        Some(Checkpoint::from_payload(
            record,
            &self.agent_id,
            &self.team_id,
            chrono::Utc::now().timestamp_millis(),
        ))
    }

    /// Delete the stored checkpoint. `true` only when the store confirms `cleared: true`.
    pub async fn clear_checkpoint(&self) -> bool {
        let outcome = self.call("clear-checkpoint", Map::new()).await;
        confirmed(outcome, "clear-checkpoint", "cleared")
    }

    /// Build the JSON-RPC envelope for `action` and send it.
    pub(crate) fn envelope(&self, action: &str, args: Map<String, Value>) -> Value {
        let mut arguments = Map::new();
        arguments.insert("action".into(), action.into());
        arguments.insert("agentId".into(), self.agent_id.clone().into());
        arguments.insert("teamId".into(), self.team_id.clone().into());
        arguments.extend(args);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        json!({
            "jsonrpc": "2.0",
            "method": "tools/call",
            "params": {
                "name": STORE_TOOL,
                "arguments": Value::Object(arguments),
            },
            "id": id,
        })
    }

    async fn call(&self, action: &str, args: Map<String, Value>) -> TransportOutcome {
        let envelope = self.envelope(action, args);
        debug!("Store call: {action} (agent={}, team={})", self.agent_id, self.team_id);
        self.transport.call(&envelope).await
    }
}

/// Collapse an outcome into "the store explicitly set `marker` to true".
fn confirmed(outcome: TransportOutcome, action: &str, marker: &str) -> bool {
    match outcome {
        Ok(Some(payload)) => {
            let ok = payload.get(marker).and_then(Value::as_bool) == Some(true);
            if !ok {
                warn!("{action}: store did not confirm `{marker}`: {payload}");
            }
            ok
        }
        Ok(None) => {
            warn!("{action}: store returned no payload");
            false
        }
        Err(e) => {
            warn!("{action} failed: {e}");
            false
        }
    }
}

/// Accept both a bare checkpoint payload and the `{found, checkpoint}`
/// envelope some store versions reply with.
fn unwrap_found(payload: &Value) -> Option<&Value> {
    if !payload.is_object() {
        return None;
    }
    match payload.get("found").and_then(Value::as_bool) {
        Some(false) => None,
        Some(true) => Some(payload.get("checkpoint").unwrap_or(payload)),
        None => Some(payload),
    }
}
