//! Session configuration with environment-aware defaults.
//!
//! [`SurfConfig`] is read from `ctxsurf.config.json` in the project
//! directory. Every field is optional in the file; missing fields fall back
//! to defaults, which in turn honor `AGENT_ID`, `TEAM_ID`,
//! `CLAUDESURF_API_URL` and `GLUE_API_URL`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::zones::ZoneThresholds;

/// Config file name looked up in the project directory.
pub const CONFIG_FILE_NAME: &str = "ctxsurf.config.json";

/// Older file name, still honored when the new one is absent.
pub const LEGACY_CONFIG_FILE_NAME: &str = "claudesurf.config.json";

pub const DEFAULT_API_URL: &str = "https://glue.elide.work";

/// Configuration consumed (never produced) by the session core.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SurfConfig {
    /// Identity of the agent whose checkpoints are stored.
    pub agent_id: String,
    /// Team the agent belongs to; checkpoints are keyed by (agent, team).
    pub team_id: String,
    /// Base URL of the checkpoint store.
    pub api_url: String,
    pub zones: ZoneThresholds,
    /// Minimum spacing between throttled context checks.
    pub check_interval_ms: u64,
    /// Context window used when a sample doesn't carry its own maximum.
    pub max_context_tokens: u64,
    pub summarization_model: String,
    /// Post a group-chat message when compaction fires.
    pub enable_group_chat_notifications: bool,
    pub enable_subagent_handoff: bool,
    /// Where hook scripts are installed, relative to the project directory.
    pub hooks_dir: String,
}

impl Default for SurfConfig {
    fn default() -> Self {
        Self::defaults_from(|key| std::env::var(key).ok())
    }
}

impl SurfConfig {
    /// Build defaults using `lookup` in place of the process environment.
    pub fn defaults_from(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            agent_id: non_empty("AGENT_ID").unwrap_or_else(|| "claudesurf-agent".into()),
            team_id: non_empty("TEAM_ID").unwrap_or_else(|| "default".into()),
            api_url: non_empty("CLAUDESURF_API_URL")
                .or_else(|| non_empty("GLUE_API_URL"))
                .unwrap_or_else(|| DEFAULT_API_URL.into()),
            zones: ZoneThresholds::default(),
            check_interval_ms: 120_000,
            max_context_tokens: 200_000,
            summarization_model: "haiku".into(),
            enable_group_chat_notifications: true,
            enable_subagent_handoff: true,
            hooks_dir: ".claude/hooks".into(),
        }
    }

    /// Load the config for `project_dir`, overlaying file values on defaults.
    ///
    /// A missing file yields defaults. A malformed file is logged and also
    /// yields defaults, so a broken config never stops the host agent.
    pub fn load(project_dir: impl AsRef<Path>) -> Self {
        let dir = project_dir.as_ref();
        let path = [CONFIG_FILE_NAME, LEGACY_CONFIG_FILE_NAME]
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.exists());

        let Some(path) = path else {
            debug!("No config file in {}, using defaults", dir.display());
            return Self::default();
        };

        match Self::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{e}, using defaults");
                Self::default()
            }
        }
    }

    /// Parse a config file strictly. Errors name the offending path.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config at {}: {e}", path.display()))?;
        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config at {}: {e}", path.display()))
    }

    /// List every problem with this config. Empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.agent_id.is_empty() {
            errors.push("agentId is required".to_string());
        }
        if self.team_id.is_empty() {
            errors.push("teamId is required".to_string());
        }
        if self.api_url.is_empty() {
            errors.push("apiUrl is required".to_string());
        }
        for (name, value) in [
            ("hot", self.zones.hot),
            ("warm", self.zones.warm),
            ("cold", self.zones.cold),
        ] {
            if !value.is_finite() || value <= 0.0 || value >= 100.0 {
                errors.push(format!("zones.{name} must lie in (0, 100), got {value}"));
            }
        }
        if self.zones.hot >= self.zones.warm {
            errors.push("zones.hot must be less than zones.warm".to_string());
        }
        if self.zones.warm >= self.zones.cold {
            errors.push("zones.warm must be less than zones.cold".to_string());
        }
        if self.max_context_tokens == 0 {
            errors.push("maxContextTokens must be positive".to_string());
        }
        errors
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = agent_id.into();
        self
    }

    pub fn with_team_id(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = team_id.into();
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_zones(mut self, zones: ZoneThresholds) -> Self {
        self.zones = zones;
        self
    }

    pub fn with_max_context_tokens(mut self, tokens: u64) -> Self {
        self.max_context_tokens = tokens;
        self
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_group_chat_notifications(mut self, enabled: bool) -> Self {
        self.enable_group_chat_notifications = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_without_env() {
        let config = SurfConfig::defaults_from(no_env);
        assert_eq!(config.agent_id, "claudesurf-agent");
        assert_eq!(config.team_id, "default");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.zones, ZoneThresholds::new(50.0, 75.0, 90.0));
        assert_eq!(config.check_interval(), Duration::from_secs(120));
        assert_eq!(config.max_context_tokens, 200_000);
        assert!(config.enable_group_chat_notifications);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn env_overrides_defaults() {
        let config = SurfConfig::defaults_from(|key| match key {
            "AGENT_ID" => Some("builder-7".into()),
            "TEAM_ID" => Some("team-x".into()),
            "GLUE_API_URL" => Some("http://glue.local".into()),
            _ => None,
        });
        assert_eq!(config.agent_id, "builder-7");
        assert_eq!(config.team_id, "team-x");
        assert_eq!(config.api_url, "http://glue.local");
    }

    #[test]
    fn claudesurf_url_wins_over_glue_url() {
        let config = SurfConfig::defaults_from(|key| match key {
            "CLAUDESURF_API_URL" => Some("http://surf.local".into()),
            "GLUE_API_URL" => Some("http://glue.local".into()),
            _ => None,
        });
        assert_eq!(config.api_url, "http://surf.local");
    }

    #[test]
    fn load_overlays_file_on_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{"agentId": "from-file", "zones": {"hot": 40, "warm": 60, "cold": 80}, "maxContextTokens": 1000}"#,
        )
        .unwrap();

        let config = SurfConfig::load(dir.path());
        assert_eq!(config.agent_id, "from-file");
        assert_eq!(config.zones, ZoneThresholds::new(40.0, 60.0, 80.0));
        assert_eq!(config.max_context_tokens, 1000);
        assert_eq!(config.hooks_dir, ".claude/hooks");
    }

    #[test]
    fn load_reads_legacy_file_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(LEGACY_CONFIG_FILE_NAME),
            r#"{"teamId": "legacy-team"}"#,
        )
        .unwrap();
        assert_eq!(SurfConfig::load(dir.path()).team_id, "legacy-team");
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();

        assert!(SurfConfig::from_file(&path).is_err());
        let config = SurfConfig::load(dir.path());
        assert_eq!(config.max_context_tokens, 200_000);
    }

    #[test]
    fn validate_reports_every_problem() {
        let config = SurfConfig::defaults_from(no_env)
            .with_agent_id("")
            .with_team_id("")
            .with_api_url("")
            .with_zones(ZoneThresholds::new(80.0, 70.0, 60.0));
        let errors = config.validate();
        assert_eq!(
            errors,
            vec![
                "agentId is required",
                "teamId is required",
                "apiUrl is required",
                "zones.hot must be less than zones.warm",
                "zones.warm must be less than zones.cold",
            ]
        );
    }

    #[test]
    fn validate_rejects_thresholds_the_classifier_rejects() {
        let config = SurfConfig::defaults_from(no_env)
            .with_zones(ZoneThresholds::new(50.0, 75.0, 100.0));
        assert_eq!(
            config.validate(),
            vec!["zones.cold must lie in (0, 100), got 100"]
        );
        assert!(config.zones.validate().is_err());

        let config = SurfConfig::defaults_from(no_env)
            .with_zones(ZoneThresholds::new(f64::NAN, 75.0, 90.0));
        assert!(
            config
                .validate()
                .iter()
                .any(|e| e.starts_with("zones.hot must lie in (0, 100)"))
        );
    }

    #[test]
    fn camel_case_roundtrip_fields() {
        let json = serde_json::to_value(SurfConfig::defaults_from(no_env)).unwrap();
        assert_eq!(json["checkIntervalMs"], 120_000);
        assert_eq!(json["enableGroupChatNotifications"], true);
        assert_eq!(json["hooksDir"], ".claude/hooks");
    }
}
