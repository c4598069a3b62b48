//! "Current task" side-channel.
//!
//! Task trackers running beside the agent write what it is working on to
//! `/tmp/glue-current-task-<agentId>` and append edited paths to
//! `/tmp/glue-files-edited-<agentId>`. The session core only reads them.

use std::path::PathBuf;

/// Reported when no task has been recorded.
pub const UNKNOWN_TASK: &str = "unknown task";

/// How many of the most recent edited files go into a checkpoint.
pub const MAX_RECENT_FILES: usize = 20;

/// Read-only view of what the agent is currently doing.
pub trait TaskSource: Send + Sync {
    /// Current task description, or [`UNKNOWN_TASK`].
    fn current_task(&self) -> String;

    /// Recently edited files, oldest first. Empty when unknown.
    fn files_edited(&self) -> Vec<String> {
        Vec::new()
    }
}

/// [`TaskSource`] over the per-agent files in a state directory.
#[derive(Debug, Clone)]
pub struct FileTaskSource {
    dir: PathBuf,
    agent_id: String,
}

impl FileTaskSource {
    /// Use `/tmp` (the system temp dir) like the task trackers do.
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self::in_dir(std::env::temp_dir(), agent_id)
    }

    pub fn in_dir(dir: impl Into<PathBuf>, agent_id: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            agent_id: agent_id.into(),
        }
    }

    pub fn task_path(&self) -> PathBuf {
        self.dir.join(format!("glue-current-task-{}", self.agent_id))
    }

    pub fn files_path(&self) -> PathBuf {
        self.dir.join(format!("glue-files-edited-{}", self.agent_id))
    }
}

impl TaskSource for FileTaskSource {
    fn current_task(&self) -> String {
        std::fs::read_to_string(self.task_path())
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_TASK.to_string())
    }

    fn files_edited(&self) -> Vec<String> {
        let Ok(content) = std::fs::read_to_string(self.files_path()) else {
            return Vec::new();
        };
        let lines: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        let skip = lines.len().saturating_sub(MAX_RECENT_FILES);
        lines.into_iter().skip(skip).collect()
    }
}

/// Fixed task description, for hosts that track the task in-process.
#[derive(Debug, Clone)]
pub struct FixedTask {
    pub task: String,
    pub files: Vec<String>,
}

impl FixedTask {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            files: Vec::new(),
        }
    }
}

impl TaskSource for FixedTask {
    fn current_task(&self) -> String {
        self.task.clone()
    }

    fn files_edited(&self) -> Vec<String> {
        self.files.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_task_file_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileTaskSource::in_dir(dir.path(), "a1");
        assert_eq!(source.current_task(), UNKNOWN_TASK);
        assert!(source.files_edited().is_empty());
    }

    #[test]
    fn task_file_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileTaskSource::in_dir(dir.path(), "a1");
        std::fs::write(source.task_path(), "  wiring the cache layer\n").unwrap();
        assert_eq!(source.current_task(), "wiring the cache layer");
    }

    #[test]
    fn blank_task_file_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileTaskSource::in_dir(dir.path(), "a1");
        std::fs::write(source.task_path(), "\n  \n").unwrap();
        assert_eq!(source.current_task(), UNKNOWN_TASK);
    }

    #[test]
    fn files_edited_keeps_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileTaskSource::in_dir(dir.path(), "a1");
        let content: String = (0..30).map(|i| format!("src/f{i}.rs\n\n")).collect();
        std::fs::write(source.files_path(), content).unwrap();

        let files = source.files_edited();
        assert_eq!(files.len(), MAX_RECENT_FILES);
        assert_eq!(files.first().map(String::as_str), Some("src/f10.rs"));
        assert_eq!(files.last().map(String::as_str), Some("src/f29.rs"));
    }

    #[test]
    fn agents_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let a = FileTaskSource::in_dir(dir.path(), "a");
        let b = FileTaskSource::in_dir(dir.path(), "b");
        std::fs::write(a.task_path(), "task a").unwrap();
        assert_eq!(a.current_task(), "task a");
        assert_eq!(b.current_task(), UNKNOWN_TASK);
    }
}
