//! Hook runner behind `ctxsurf hook <event>`.
//!
//! Hooks are invoked by the host once per event, each in a fresh process,
//! so anything that must survive between invocations (the throttle stamp,
//! the latest usage sample) lives in small per-agent files under the temp
//! directory. Hooks never fail the host: every problem is logged and the
//! runner still reports success.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::agent::{CompactionType, SessionManager};
use crate::hooks::HookEvent;
use crate::memory::Checkpoint;

/// Per-agent state files shared between hook invocations.
#[derive(Debug, Clone)]
pub struct HookFiles {
    /// Seconds since epoch of the last context check that ran.
    pub stamp: PathBuf,
    /// Latest token-usage sample written by the host.
    pub usage: PathBuf,
}

impl HookFiles {
    /// `/tmp/claudesurf-check-<agent>` and `/tmp/claudesurf-context-<agent>`.
    pub fn for_agent(agent_id: &str) -> Self {
        Self::in_dir(std::env::temp_dir(), agent_id)
    }

    pub fn in_dir(dir: impl AsRef<Path>, agent_id: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            stamp: dir.join(format!("claudesurf-check-{agent_id}")),
            usage: dir.join(format!("claudesurf-context-{agent_id}")),
        }
    }
}

#[derive(Deserialize, Default)]
struct HookInput {
    #[serde(default)]
    matcher: Option<String>,
}

/// Compaction type from the host's hook JSON. Anything unreadable is `auto`.
pub fn compaction_type(input: &str) -> CompactionType {
    serde_json::from_str::<HookInput>(input)
        .ok()
        .and_then(|i| i.matcher)
        .and_then(|m| m.parse().ok())
        .unwrap_or_default()
}

/// Last check time in epoch ms, from a stamp file holding epoch seconds.
pub fn read_stamp(path: &Path) -> Option<i64> {
    let raw = std::fs::read_to_string(path).ok()?;
    raw.trim().parse::<i64>().ok().map(|secs| secs * 1000)
}

pub fn write_stamp(path: &Path, now_ms: i64) -> Result<(), String> {
    std::fs::write(path, format!("{}\n", now_ms / 1000))
        .map_err(|e| format!("Failed to write stamp {}: {e}", path.display()))
}

/// Token usage sample. Missing, unparsable and zero all read as `None`.
pub fn read_usage(path: &Path) -> Option<u64> {
    std::fs::read_to_string(path)
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
}

/// Block printed on session start so the host injects it into the new
/// conversation.
pub fn restored_block(checkpoint: &Checkpoint) -> Option<String> {
    let summary = Some(checkpoint.conversation_summary.as_str()).filter(|s| !s.is_empty());
    let working_on = checkpoint.working_on.as_deref().filter(|s| !s.is_empty());
    if summary.is_none() && working_on.is_none() {
        return None;
    }

    let mut out = String::from("\n### 🔄 Restored Checkpoint\n");
    if let Some(summary) = summary {
        out.push_str(&format!("**Context:** {summary}\n"));
    }
    if let Some(working_on) = working_on {
        out.push_str(&format!("**Was working on:** {working_on}\n"));
    }
    if let Some(pending) = checkpoint.pending_work.as_deref()
        && !pending.is_empty()
    {
        out.push_str(&format!("**Pending:** {}\n", pending.join(", ")));
    }
    out.push_str("---\n");
    Some(out)
}

/// Run one hook event. Returns text for stdout, if the event produces any.
pub async fn run_hook(
    session: &mut SessionManager,
    event: HookEvent,
    input: &str,
    files: &HookFiles,
) -> Option<String> {
    match event {
        HookEvent::PreCompact => {
            let compaction = compaction_type(input);
            eprintln!("🧠 PreCompact triggered ({compaction}) - Saving memory...");
            if session.on_pre_compact(compaction).await {
                eprintln!("✅ Memory saved before compaction");
            }
            None
        }
        HookEvent::SessionStart => session
            .start()
            .await
            .and_then(|cp| restored_block(&cp)),
        HookEvent::ContextCheck => {
            session.resume_throttle(read_stamp(&files.stamp));
            let Some(tokens_used) = read_usage(&files.usage) else {
                debug!("No usage sample at {}", files.usage.display());
                return None;
            };
            match session.check_context_throttled(tokens_used, None).await {
                Ok(Some(info)) => {
                    if let Some(at) = session.last_check_at()
                        && let Err(e) = write_stamp(&files.stamp, at)
                    {
                        warn!("{e}");
                    }
                    if info.action != crate::context::ZoneAction::None {
                        eprintln!("{}", info.message);
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Context check skipped: {e}"),
            }
            None
        }
        HookEvent::SessionEnd => {
            session.on_session_end().await;
            None
        }
    }
}
