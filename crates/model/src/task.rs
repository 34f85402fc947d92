//! Conversion task state.
//!
//! A task is created at submission in `PROCESSING` and ends in exactly one
//! of `COMPLETED` or `FAILED`. Once terminal it no longer changes.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Opaque task identifier (UUID v4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Allocate a fresh identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Processing)
    }
}

/// One document-to-video conversion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub status: TaskStatus,
    /// Progress in `[0, 100]`.
    pub percent: u8,
    /// Human-readable progress log, oldest first.
    pub logs: Vec<String>,
    /// Finished video. Set only when completed.
    pub result_path: Option<PathBuf>,
    /// Failure message. Set only when failed.
    pub error: Option<String>,
    /// File name of the submitted document.
    pub source_name: String,
    /// Submission time (RFC 3339).
    pub created_at: String,
}

impl Task {
    pub fn new(task_id: TaskId, source_name: impl Into<String>) -> Self {
        Self {
            task_id,
            status: TaskStatus::Processing,
            percent: 0,
            logs: Vec::new(),
            result_path: None,
            error: None,
            source_name: source_name.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Record a progress milestone. Ignored once the task is terminal.
    pub fn record_progress(&mut self, percent: u8, message: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.percent = percent.min(100);
        self.logs.push(message.into());
    }

    /// Transition to `COMPLETED`. Returns false if already terminal.
    pub fn complete(&mut self, result_path: PathBuf) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Completed;
        self.percent = 100;
        self.result_path = Some(result_path);
        true
    }

    /// Transition to `FAILED`. Returns false if already terminal.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        let error = error.into();
        self.logs.push(format!("error: {error}"));
        self.status = TaskStatus::Failed;
        self.error = Some(error);
        true
    }
}
