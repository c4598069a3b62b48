//! Convenience re-exports for common `ctxsurf` types.
//!
//! ```ignore
//! use ctxsurf::prelude::*;
//! ```
//!
//! Covers the session manager, config, zone model and memory client.
//! Hook runner helpers and transport internals are left out; import those
//! from their modules directly.

// ── Session runtime ─────────────────────────────────────────────────
pub use crate::agent::{
    Clock, CompactionType, FileTaskSource, FixedTask, ManualClock, Notifier, SessionManager,
    SessionState, SystemClock, TaskSource,
};
pub use crate::config::SurfConfig;

// ── Zones ───────────────────────────────────────────────────────────
pub use crate::context::{
    ContextZone, ToolUsageTracker, ZoneAction, ZoneError, ZoneInfo, ZoneThresholds, classify,
    should_trigger_checkpoint, should_trigger_emergency,
};

// ── Memory ──────────────────────────────────────────────────────────
pub use crate::memory::{
    Checkpoint, HttpTransport, MemoryClient, SaveCheckpointParams, StoreTransport,
    TransportError, TransportOutcome,
};

// ── Hooks ───────────────────────────────────────────────────────────
pub use crate::hooks::{HookEvent, InstallOptions, InstallReport, install_hooks, uninstall_hooks};
