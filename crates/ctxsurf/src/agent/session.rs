//! Session-level orchestration of zone checks and checkpoints.
//!
//! A [`SessionManager`] owns one [`SessionState`] for the lifetime of a
//! process. Each usage sample is classified; cold and critical zones
//! trigger a save through the [`MemoryClient`]. Lifecycle hooks
//! ([`on_pre_compact`](SessionManager::on_pre_compact),
//! [`on_session_end`](SessionManager::on_session_end)) always save.
//!
//! Nothing here fails because the store is unreachable: saves report
//! `false`, restores report `None`, and the host loop carries on.
//!
//! Mutating methods take `&mut self`, so calls on one session are
//! serialized by construction. Sessions never share state.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::clock::{Clock, SystemClock, Throttle};
use super::notify::{HttpNotifier, NoopNotifier, Notifier};
use super::task::{FileTaskSource, TaskSource};
use crate::config::SurfConfig;
use crate::context::zones::{
    ZoneError, ZoneInfo, classify, should_trigger_checkpoint, should_trigger_emergency,
};
use crate::memory::{Checkpoint, HttpTransport, MemoryClient, SaveCheckpointParams};

/// Message posted to the group chat after a pre-compaction save.
pub const COMPACTION_NOTICE: &str = "🧠 Context compaction triggered. Memory saved.";

/// Session bookkeeping. Cloned out by [`SessionManager::state`]; the
/// manager's copy is never handed out by reference.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// `session-<epoch ms>-<6 base36 chars>`, fixed for the session.
    pub session_id: String,
    /// Epoch milliseconds.
    pub started_at: i64,
    /// Epoch milliseconds of the last confirmed save; 0 before the first.
    pub last_checkpoint_at: i64,
    /// Confirmed saves only.
    pub checkpoint_count: u32,
    /// Most recent classification, if any sample has been taken.
    pub current_zone: Option<ZoneInfo>,
}

/// What triggered a compaction.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompactionType {
    #[default]
    Auto,
    Manual,
}

impl CompactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for CompactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            other => Err(format!("unknown compaction type '{other}'")),
        }
    }
}

/// Orchestrates zone classification and checkpoint persistence for one session.
pub struct SessionManager {
    config: SurfConfig,
    memory: MemoryClient,
    clock: Arc<dyn Clock>,
    tasks: Box<dyn TaskSource>,
    notifier: Box<dyn Notifier>,
    throttle: Throttle,
    state: SessionState,
}

impl SessionManager {
    /// Wire a session against the store in `config.api_url`, using the
    /// system clock and the file-based task side-channel.
    pub fn new(config: SurfConfig) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ctxsurf/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        let transport = HttpTransport::with_client(client.clone(), &config.api_url);
        let memory = MemoryClient::new(Arc::new(transport), &config.agent_id, &config.team_id);
        let tasks = FileTaskSource::new(&config.agent_id);
        let notifier = HttpNotifier::new(client, &config);

        Ok(Self::from_parts(config, memory, Arc::new(SystemClock))
            .with_task_source(tasks)
            .with_notifier(notifier))
    }

    /// Assemble a session from explicit collaborators. Task source defaults
    /// to the file side-channel and notifications are dropped until
    /// [`with_notifier`](Self::with_notifier) is called.
    pub fn from_parts(config: SurfConfig, memory: MemoryClient, clock: Arc<dyn Clock>) -> Self {
        let started_at = clock.now_ms();
        let tasks = FileTaskSource::new(&config.agent_id);
        let throttle = Throttle::new(config.check_interval());
        Self {
            state: SessionState {
                session_id: generate_session_id(started_at),
                started_at,
                last_checkpoint_at: 0,
                checkpoint_count: 0,
                current_zone: None,
            },
            config,
            memory,
            clock,
            tasks: Box::new(tasks),
            notifier: Box::new(NoopNotifier),
            throttle,
        }
    }

    pub fn with_task_source(mut self, tasks: impl TaskSource + 'static) -> Self {
        self.tasks = Box::new(tasks);
        self
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    /// Continue throttling from a check recorded outside this process.
    pub fn resume_throttle(&mut self, last_check_ms: Option<i64>) {
        self.throttle = Throttle::new(self.config.check_interval()).resume(last_check_ms);
    }

    pub fn config(&self) -> &SurfConfig {
        &self.config
    }

    pub fn memory(&self) -> &MemoryClient {
        &self.memory
    }

    /// Snapshot of the session bookkeeping.
    pub fn state(&self) -> SessionState {
        self.state.clone()
    }

    /// Epoch ms of the last throttled check that actually ran.
    pub fn last_check_at(&self) -> Option<i64> {
        self.throttle.last_ms()
    }

    /// Announce the session and surface the previous checkpoint, if any.
    ///
    /// A missing checkpoint or unreachable store is not an error.
    pub async fn start(&self) -> Option<Checkpoint> {
        info!("Session {} started", self.state.session_id);

        let checkpoint = self.memory.get_checkpoint().await;
        match &checkpoint {
            Some(cp) => {
                info!("Restored checkpoint from {}", cp.checkpoint_time());
                info!(
                    "Was working on: {}",
                    cp.working_on.as_deref().unwrap_or("unknown")
                );
            }
            None => debug!("No checkpoint to restore"),
        }
        checkpoint
    }

    /// Classify a usage sample and checkpoint if the zone calls for it.
    ///
    /// `tokens_max` falls back to `max_context_tokens` when `None` or zero.
    /// The returned [`ZoneInfo`] does not depend on whether a save
    /// succeeded.
    pub async fn check_context(
        &mut self,
        tokens_used: u64,
        tokens_max: Option<u64>,
    ) -> Result<ZoneInfo, ZoneError> {
        let max = tokens_max
            .filter(|m| *m > 0)
            .unwrap_or(self.config.max_context_tokens);
        let info = classify(tokens_used, max, &self.config.zones)?;

        self.state.current_zone = Some(info.clone());

        if should_trigger_emergency(&info) {
            error!("{}", info.message);
            let params = SaveCheckpointParams::new(format!(
                "Emergency checkpoint at {:.1}% context",
                info.percentage
            ))
            .with_working_on("Emergency save before compaction");
            self.save_checkpoint(params).await;
        } else if should_trigger_checkpoint(&info) {
            warn!("{}", info.message);
            let params = SaveCheckpointParams::new(format!(
                "Proactive checkpoint at {:.1}% context",
                info.percentage
            ));
            self.save_checkpoint(params).await;
        } else {
            info!("{}", info.message);
        }

        Ok(info)
    }

    /// [`check_context`](Self::check_context), but at most once per
    /// `check_interval` on the session clock. `Ok(None)` means skipped.
    pub async fn check_context_throttled(
        &mut self,
        tokens_used: u64,
        tokens_max: Option<u64>,
    ) -> Result<Option<ZoneInfo>, ZoneError> {
        if !self.throttle.try_acquire(self.clock.now_ms()) {
            debug!("Context check throttled");
            return Ok(None);
        }
        self.check_context(tokens_used, tokens_max).await.map(Some)
    }

    /// Sample usage every `check_interval` until `usage` returns `None`.
    ///
    /// Returns the number of samples classified. Stops early if a sample
    /// cannot be classified, since retrying the same config would fail the
    /// same way.
    pub async fn monitor<F>(&mut self, mut usage: F) -> usize
    where
        F: FnMut() -> Option<u64>,
    {
        let interval = self.config.check_interval();
        let clock = Arc::clone(&self.clock);
        let mut samples = 0;
        loop {
            clock.sleep(interval).await;
            let Some(tokens_used) = usage() else {
                break;
            };
            match self.check_context(tokens_used, None).await {
                Ok(_) => samples += 1,
                Err(e) => {
                    error!("Stopping context monitor: {e}");
                    break;
                }
            }
        }
        samples
    }

    /// Persist a checkpoint and update bookkeeping on confirmed success.
    pub async fn save_checkpoint(&mut self, params: SaveCheckpointParams) -> bool {
        let saved = self.memory.save_checkpoint(&params).await;

        if saved {
            self.state.last_checkpoint_at = self.clock.now_ms();
            self.state.checkpoint_count += 1;
            info!(
                "Checkpoint saved (total: {})",
                self.state.checkpoint_count
            );
        } else {
            error!("Failed to save checkpoint");
        }

        saved
    }

    /// Save before the host compacts the context, then optionally tell the team.
    ///
    /// Notification failures are logged and never change the result.
    pub async fn on_pre_compact(&mut self, compaction: CompactionType) -> bool {
        info!("PreCompact triggered ({compaction})");

        let mut params = SaveCheckpointParams::new(format!(
            "Pre-compaction memory save ({compaction})"
        ))
        .with_working_on(self.tasks.current_task());
        let files = self.tasks.files_edited();
        if !files.is_empty() {
            params = params.with_files_edited(files);
        }
        let saved = self.save_checkpoint(params).await;

        if self.config.enable_group_chat_notifications
            && let Err(e) = self.notifier.notify(COMPACTION_NOTICE).await
        {
            debug!("Ignoring notification failure: {e}");
        }

        saved
    }

    /// Final checkpoint when the session ends.
    pub async fn on_session_end(&mut self) -> bool {
        info!("Session ending, saving final checkpoint");
        let params =
            SaveCheckpointParams::new("Session ended").with_working_on(self.tasks.current_task());
        self.save_checkpoint(params).await
    }
}

/// `session-<ms>-<6 base36 chars>`. Randomness comes from the std hasher's
/// per-instance random keys.
fn generate_session_id(now_ms: i64) -> String {
    const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_i64(now_ms);
    let mut bits = hasher.finish();
    let suffix: String = (0..6)
        .map(|_| {
            let c = ALPHABET[(bits % 36) as usize] as char;
            bits /= 36;
            c
        })
        .collect();
    format!("session-{now_ms}-{suffix}")
}
