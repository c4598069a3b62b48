//! Tool-call counting as a stand-in for token usage.
//!
//! Some hosts never report token counts. For those, each tool call is
//! assumed to consume about 2% of the window, so 50 calls reads as full.
//! The count lives in a small per-agent state file so that separate hook
//! processes can share it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::zones::{ZoneInfo, ZoneThresholds, classify_percentage};

/// Percentage of the window charged per tool call.
pub const PERCENT_PER_TOOL_CALL: u64 = 2;

/// Tool calls that correspond to a full window.
pub const TOOL_CALLS_AT_FULL: u64 = 100 / PERCENT_PER_TOOL_CALL;

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
struct UsageFile {
    #[serde(default)]
    tool_count: u64,
}

/// Per-agent tool-call counter backed by a JSON state file.
#[derive(Debug, Clone)]
pub struct ToolUsageTracker {
    path: PathBuf,
    tool_count: u64,
}

impl ToolUsageTracker {
    /// Default state file for `agent_id` in the system temp directory.
    pub fn default_path(agent_id: &str) -> PathBuf {
        std::env::temp_dir().join(format!("claudesurf-{agent_id}-state.json"))
    }

    /// Load an existing state file. `None` if it's missing or unreadable.
    pub fn load(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<UsageFile>(&content) {
            Ok(file) => Some(Self {
                path,
                tool_count: file.tool_count,
            }),
            Err(e) => {
                warn!("Ignoring malformed usage state at {}: {e}", path.display());
                None
            }
        }
    }

    /// Load the state file, or start a fresh count if there is none.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::load(&path).unwrap_or(Self {
            path,
            tool_count: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tool_count(&self) -> u64 {
        self.tool_count
    }

    /// Count one tool call and persist. Returns the new count.
    pub fn record(&mut self) -> Result<u64, String> {
        self.tool_count += 1;
        self.save()?;
        Ok(self.tool_count)
    }

    /// Reset the count to zero and persist (e.g. after a compaction).
    pub fn reset(&mut self) -> Result<(), String> {
        self.tool_count = 0;
        self.save()
    }

    /// Estimated share of the window consumed, capped at 100.
    pub fn estimated_percentage(&self) -> f64 {
        (self.tool_count.saturating_mul(PERCENT_PER_TOOL_CALL)).min(100) as f64
    }

    /// Classify the estimate with the regular zone table. `tokens_used` and
    /// `tokens_max` are reported in tool calls.
    pub fn estimate_zone(&self, thresholds: &ZoneThresholds) -> ZoneInfo {
        classify_percentage(
            self.estimated_percentage(),
            self.tool_count,
            TOOL_CALLS_AT_FULL,
            thresholds,
        )
    }

    /// Atomic write: serialize to a temp file, then rename into place.
    fn save(&self) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create state dir: {e}"))?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let json = serde_json::to_string(&UsageFile {
            tool_count: self.tool_count,
        })
        .map_err(|e| format!("Failed to serialize usage state: {e}"))?;
        std::fs::write(&tmp, json).map_err(|e| format!("Failed to write usage state: {e}"))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| format!("Failed to rename usage state: {e}"))?;
        Ok(())
    }
}
