//! Checkpoint records exchanged with the remote store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Snapshot of an agent's working state, as stored remotely.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub agent_id: String,
    pub team_id: String,
    /// Unix epoch milliseconds.
    pub checkpoint_at: i64,
    pub conversation_summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_edited: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_work: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accomplishments: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_context: Option<String>,
}

impl Checkpoint {
    /// Rebuild a checkpoint from a store payload.
    ///
    /// Fields of the wrong type are treated as absent. `checkpointAt`
    /// defaults to `now_ms` and `conversationSummary` to an empty string.
    pub fn from_payload(
        payload: &Value,
        agent_id: &str,
        team_id: &str,
        now_ms: i64,
    ) -> Self {
        let text = |key: &str| payload.get(key).and_then(Value::as_str).map(String::from);
        let list = |key: &str| {
            payload.get(key).and_then(Value::as_array).map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
        };
        let checkpoint_at = payload
            .get("checkpointAt")
            .and_then(Value::as_f64)
            .filter(|ms| *ms > 0.0)
            .map(|ms| ms as i64)
            .unwrap_or(now_ms);

        Self {
            agent_id: agent_id.to_string(),
            team_id: team_id.to_string(),
            checkpoint_at,
            conversation_summary: text("conversationSummary").unwrap_or_default(),
            working_on: text("workingOn"),
            files_edited: list("filesEdited"),
            pending_work: list("pendingWork"),
            accomplishments: list("accomplishments"),
            recent_context: text("recentContext"),
        }
    }

    /// ISO-8601 rendering of `checkpoint_at`, for logs.
    pub fn checkpoint_time(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.checkpoint_at)
            .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
            .unwrap_or_else(|| format!("epoch-ms:{}", self.checkpoint_at))
    }

    /// Render as a Markdown block suitable for re-injecting into a
    /// compacted conversation.
    pub fn to_markdown(&self) -> String {
        fn bullets(items: &Option<Vec<String>>) -> String {
            match items.as_deref() {
                Some(items) if !items.is_empty() => items
                    .iter()
                    .map(|i| format!("- {i}"))
                    .collect::<Vec<_>>()
                    .join("\n"),
                _ => "None".to_string(),
            }
        }

        let summary = if self.conversation_summary.is_empty() {
            "No summary available"
        } else {
            self.conversation_summary.as_str()
        };

        format!(
            "## Previous Session Context\n\n\
             ### Last Working On\n{}\n\n\
             ### Conversation Summary\n{summary}\n\n\
             ### Pending Work\n{}\n\n\
             ### Accomplishments\n{}\n\n\
             ### Files Modified\n{}\n",
            self.working_on.as_deref().unwrap_or("Not specified"),
            bullets(&self.pending_work),
            bullets(&self.accomplishments),
            bullets(&self.files_edited),
        )
    }
}

/// Arguments for a save. Only `conversation_summary` is required; absent
/// fields are left out of the request entirely.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaveCheckpointParams {
    pub conversation_summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_edited: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_work: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accomplishments: Option<Vec<String>>,
}

impl SaveCheckpointParams {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            conversation_summary: summary.into(),
            ..Default::default()
        }
    }

    pub fn with_working_on(mut self, working_on: impl Into<String>) -> Self {
        self.working_on = Some(working_on.into());
        self
    }

    pub fn with_files_edited(mut self, files: Vec<String>) -> Self {
        self.files_edited = Some(files);
        self
    }

    pub fn with_pending_work(mut self, pending: Vec<String>) -> Self {
        self.pending_work = Some(pending);
        self
    }

    pub fn with_accomplishments(mut self, done: Vec<String>) -> Self {
        self.accomplishments = Some(done);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_payload_fills_defaults() {
        let cp = Checkpoint::from_payload(&json!({}), "a1", "t1", 42);
        assert_eq!(cp.agent_id, "a1");
        assert_eq!(cp.team_id, "t1");
        assert_eq!(cp.checkpoint_at, 42);
        assert_eq!(cp.conversation_summary, "");
        assert!(cp.working_on.is_none());
        assert!(cp.files_edited.is_none());
    }

    #[test]
    fn from_payload_reads_fields() {
        let payload = json!({
            "checkpointAt": 1_700_000_000_000i64,
            "conversationSummary": "refactoring parser",
            "workingOn": "lexer",
            "filesEdited": ["src/lexer.rs", 7, "src/parser.rs"],
            "pendingWork": ["tests"],
            "recentContext": "token spans"
        });
        let cp = Checkpoint::from_payload(&payload, "a", "t", 0);
        assert_eq!(cp.checkpoint_at, 1_700_000_000_000);
        assert_eq!(cp.working_on.as_deref(), Some("lexer"));
        assert_eq!(
            cp.files_edited,
            Some(vec!["src/lexer.rs".to_string(), "src/parser.rs".to_string()])
        );
        assert_eq!(cp.pending_work, Some(vec!["tests".to_string()]));
        assert_eq!(cp.recent_context.as_deref(), Some("token spans"));
    }

    #[test]
    fn zero_timestamp_defaults_to_now() {
        let cp = Checkpoint::from_payload(&json!({"checkpointAt": 0}), "a", "t", 99);
        assert_eq!(cp.checkpoint_at, 99);
    }

    #[test]
    fn params_omit_absent_fields() {
        let params = SaveCheckpointParams::new("summary").with_working_on("task");
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(
            json,
            json!({"conversationSummary": "summary", "workingOn": "task"})
        );
    }

    #[test]
    fn markdown_uses_placeholders() {
        let cp = Checkpoint::from_payload(&json!({}), "a", "t", 0);
        let md = cp.to_markdown();
        assert!(md.contains("### Last Working On\nNot specified"));
        assert!(md.contains("### Conversation Summary\nNo summary available"));
        assert!(md.contains("### Pending Work\nNone"));
    }

    #[test]
    fn markdown_lists_items() {
        let cp = Checkpoint::from_payload(
            &json!({"pendingWork": ["write docs", "ship"], "accomplishments": ["parser"]}),
            "a",
            "t",
            0,
        );
        let md = cp.to_markdown();
        assert!(md.contains("- write docs\n- ship"));
        assert!(md.contains("### Accomplishments\n- parser"));
    }

    #[test]
    fn checkpoint_time_is_iso() {
        let cp = Checkpoint::from_payload(&json!({"checkpointAt": 0}), "a", "t", 1_000);
        assert_eq!(cp.checkpoint_time(), "1970-01-01T00:00:01.000Z");
    }
}
