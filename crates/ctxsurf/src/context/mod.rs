//! Context-window classification.
//!
//! 1. **[`zones`]**: [`classify`] maps a token measurement onto the
//!    hot/warm/cold/critical model and recommends an action.
//! 2. **[`usage`]**: [`ToolUsageTracker`] estimates a zone from tool-call
//!    counts when the host can't report real token usage.

pub mod usage;
pub mod zones;

pub use usage::ToolUsageTracker;
pub use zones::{
    ContextZone, ZoneAction, ZoneError, ZoneInfo, ZoneThresholds, classify,
    should_trigger_checkpoint, should_trigger_emergency,
};
