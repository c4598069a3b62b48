//! Hot/warm/cold/critical zone model for context usage.
//!
//! Converts a raw token measurement into a [`ZoneInfo`] describing how much
//! of the context window is consumed and what the caller should do about
//! it. Classification is pure: same inputs, same output, no I/O.
//!
//! The zone *labels* sit one tier below the threshold that produces them:
//! crossing `warm` yields the `cold` zone, and crossing `cold` yields
//! `critical`. This mapping is part of the user-visible message contract
//! and must not be "straightened out".

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Zone boundaries as percentages of the context window.
///
/// Must satisfy `0 < hot < warm < cold < 100`. Normally validated by
/// [`SurfConfig::validate`](crate::config::SurfConfig::validate) before a
/// session is built; [`classify`] re-checks and rejects bad values.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ZoneThresholds {
    pub hot: f64,
    pub warm: f64,
    pub cold: f64,
}

impl Default for ZoneThresholds {
    fn default() -> Self {
        Self {
            hot: 50.0,
            warm: 75.0,
            cold: 90.0,
        }
    }
}

impl ZoneThresholds {
    pub fn new(hot: f64, warm: f64, cold: f64) -> Self {
        Self { hot, warm, cold }
    }

    /// Check ordering and range. Returns a description of the first problem.
    pub fn validate(&self) -> Result<(), ZoneError> {
        let all = [self.hot, self.warm, self.cold];
        if all.iter().any(|t| !t.is_finite() || *t <= 0.0 || *t >= 100.0) {
            return Err(ZoneError::InvalidThreshold(format!(
                "zone thresholds must lie in (0, 100), got hot={} warm={} cold={}",
                self.hot, self.warm, self.cold
            )));
        }
        if self.hot >= self.warm {
            return Err(ZoneError::InvalidThreshold(
                "zones.hot must be less than zones.warm".into(),
            ));
        }
        if self.warm >= self.cold {
            return Err(ZoneError::InvalidThreshold(
                "zones.warm must be less than zones.cold".into(),
            ));
        }
        Ok(())
    }
}

/// Errors raised by zone classification.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ZoneError {
    /// Thresholds or the context maximum are outside the classifier's domain.
    #[error("invalid threshold: {0}")]
    InvalidThreshold(String),
}

/// Discrete classification of context consumption.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContextZone {
    Hot,
    Warm,
    Cold,
    Critical,
}

impl ContextZone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Warm => "warm",
            Self::Cold => "cold",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for ContextZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommended reaction to a classified zone.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ZoneAction {
    None,
    Monitor,
    Checkpoint,
    Emergency,
}

/// Result of classifying one usage sample.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ZoneInfo {
    pub zone: ContextZone,
    /// `100 * tokens_used / tokens_max`. Not clamped: values above 100
    /// signal an overrun.
    pub percentage: f64,
    pub tokens_used: u64,
    pub tokens_max: u64,
    pub action: ZoneAction,
    /// Human-readable status line.
    pub message: String,
}

impl ZoneInfo {
    /// Short advice for an agent reading the zone.
    pub fn recommendation(&self) -> &'static str {
        match self.zone {
            ContextZone::Hot => "Normal operation",
            ContextZone::Warm => "Consider saving important context",
            ContextZone::Cold => "Proactively save checkpoint",
            ContextZone::Critical => "Save immediately, compaction imminent",
        }
    }
}

/// Classify a usage sample against `thresholds`.
///
/// Thresholds are evaluated highest first. Fails with
/// [`ZoneError::InvalidThreshold`] when `tokens_max` is zero or the
/// thresholds are malformed.
pub fn classify(
    tokens_used: u64,
    tokens_max: u64,
    thresholds: &ZoneThresholds,
) -> Result<ZoneInfo, ZoneError> {
    if tokens_max == 0 {
        return Err(ZoneError::InvalidThreshold(
            "tokens_max must be positive".into(),
        ));
    }
    thresholds.validate()?;

    let percentage = tokens_used as f64 * 100.0 / tokens_max as f64;
    Ok(classify_percentage(percentage, tokens_used, tokens_max, thresholds))
}

/// Zone table shared by [`classify`] and heuristic estimators that already
/// have a percentage.
pub(crate) fn classify_percentage(
    percentage: f64,
    tokens_used: u64,
    tokens_max: u64,
    thresholds: &ZoneThresholds,
) -> ZoneInfo {
    let (zone, action, message) = if percentage >= thresholds.cold {
        (
            ContextZone::Critical,
            ZoneAction::Emergency,
            format!("🚨 CRITICAL: {percentage:.1}% - Emergency save required"),
        )
    } else if percentage >= thresholds.warm {
        (
            ContextZone::Cold,
            ZoneAction::Checkpoint,
            format!("⚠️ Cold zone: {percentage:.1}% - Saving checkpoint"),
        )
    } else if percentage >= thresholds.hot {
        (
            ContextZone::Warm,
            ZoneAction::Monitor,
            format!("📊 Warm zone: {percentage:.1}% - Monitoring"),
        )
    } else {
        (
            ContextZone::Hot,
            ZoneAction::None,
            format!("✅ Hot zone: {percentage:.1}% - Full fidelity"),
        )
    };

    ZoneInfo {
        zone,
        percentage,
        tokens_used,
        tokens_max,
        action,
        message,
    }
}

/// Whether the zone calls for persisting a checkpoint (proactive or emergency).
pub fn should_trigger_checkpoint(info: &ZoneInfo) -> bool {
    matches!(info.action, ZoneAction::Checkpoint | ZoneAction::Emergency)
}

/// Whether the zone calls for an emergency save.
pub fn should_trigger_emergency(info: &ZoneInfo) -> bool {
    info.action == ZoneAction::Emergency
}
