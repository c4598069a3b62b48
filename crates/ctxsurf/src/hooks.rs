//! Shell hook installation.
//!
//! Each hook is a thin bash wrapper: it pins `AGENT_ID`, `TEAM_ID` and
//! `CLAUDESURF_API_URL` defaults from the config at install time, then hands
//! the host's hook JSON (on stdin) to `ctxsurf hook <event>`. All logic lives
//! in the binary; the scripts only exist because hosts expect executables in
//! a hooks directory.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::SurfConfig;

/// Lifecycle events the hook runner understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    PreCompact,
    SessionStart,
    ContextCheck,
    SessionEnd,
}

impl HookEvent {
    pub const ALL: [HookEvent; 4] = [
        HookEvent::PreCompact,
        HookEvent::SessionStart,
        HookEvent::ContextCheck,
        HookEvent::SessionEnd,
    ];

    /// Subcommand name passed to `ctxsurf hook`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreCompact => "pre-compact",
            Self::SessionStart => "session-start",
            Self::ContextCheck => "context-check",
            Self::SessionEnd => "session-end",
        }
    }

    /// Script file name inside the hooks directory.
    pub fn script_name(&self) -> &'static str {
        match self {
            Self::PreCompact => "pre-compact-save.sh",
            Self::SessionStart => "session-restore.sh",
            Self::ContextCheck => "rolling-compaction-check.sh",
            Self::SessionEnd => "session-checkpoint.sh",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::PreCompact => "Saves memory before the host compacts the context",
            Self::SessionStart => "Restores the last checkpoint on session start",
            Self::ContextCheck => "Monitors context zones and saves proactively",
            Self::SessionEnd => "Saves a final checkpoint when the session ends",
        }
    }
}

/// Options for [`install_hooks`] / [`uninstall_hooks`].
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Overwrite scripts that already exist.
    pub force: bool,
    /// Install here instead of `<project>/<hooksDir>`.
    pub target_dir: Option<PathBuf>,
}

/// What an install pass did, by script file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub target_dir: PathBuf,
    pub installed: Vec<String>,
    pub skipped: Vec<String>,
}

/// Resolve the directory hooks are installed into.
pub fn hooks_dir(config: &SurfConfig, project_dir: &Path, options: &InstallOptions) -> PathBuf {
    options
        .target_dir
        .clone()
        .unwrap_or_else(|| project_dir.join(&config.hooks_dir))
}

/// Write all hook scripts, creating the directory if needed.
///
/// Existing scripts are left alone unless `options.force` is set.
pub fn install_hooks(
    config: &SurfConfig,
    project_dir: &Path,
    options: &InstallOptions,
) -> Result<InstallReport, String> {
    let dir = hooks_dir(config, project_dir, options);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)
            .map_err(|e| format!("Failed to create hooks dir {}: {e}", dir.display()))?;
        info!("Created hooks directory: {}", dir.display());
    }

    let mut report = InstallReport {
        target_dir: dir.clone(),
        ..Default::default()
    };

    for event in HookEvent::ALL {
        let name = event.script_name();
        let path = dir.join(name);
        if path.exists() && !options.force {
            debug!("Skipping {name} (exists)");
            report.skipped.push(name.to_string());
            continue;
        }

        std::fs::write(&path, render_script(event, config))
            .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
        make_executable(&path)?;
        info!("Installed {name}");
        report.installed.push(name.to_string());
    }

    Ok(report)
}

/// Remove every hook script this module installs. Returns the names removed.
pub fn uninstall_hooks(
    config: &SurfConfig,
    project_dir: &Path,
    options: &InstallOptions,
) -> Result<Vec<String>, String> {
    let dir = hooks_dir(config, project_dir, options);
    let mut removed = Vec::new();
    for event in HookEvent::ALL {
        let path = dir.join(event.script_name());
        if !path.exists() {
            continue;
        }
        std::fs::remove_file(&path)
            .map_err(|e| format!("Failed to remove {}: {e}", path.display()))?;
        info!("Removed {}", event.script_name());
        removed.push(event.script_name().to_string());
    }
    Ok(removed)
}

/// Bash wrapper for one event. Never fails the host: the runner's exit
/// status is discarded.
pub fn render_script(event: HookEvent, config: &SurfConfig) -> String {
    format!(
        r#"#!/bin/bash
# {script} - ctxsurf {event} hook
# {description}

export AGENT_ID="${{AGENT_ID:-{agent}}}"
export TEAM_ID="${{TEAM_ID:-{team}}}"
export CLAUDESURF_API_URL="${{CLAUDESURF_API_URL:-{api}}}"

"${{CTXSURF_BIN:-ctxsurf}}" --project "${{CLAUDE_PROJECT_DIR:-$PWD}}" hook {event} || true
exit 0
"#,
        script = event.script_name(),
        event = event.as_str(),
        description = event.description(),
        agent = shell_escape(&config.agent_id),
        team = shell_escape(&config.team_id),
        api = shell_escape(&config.api_url),
    )
}

/// Escape a value for use inside a double-quoted `${VAR:-default}`.
fn shell_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`' | '}') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), String> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|e| format!("Failed to chmod {}: {e}", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), String> {
    Ok(())
}
