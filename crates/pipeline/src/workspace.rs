//! Per-task scratch directory.

use std::path::{Path, PathBuf};

use slidecast_common::error::SlidecastResult;
use slidecast_model::TaskId;

/// Scratch directory owned by one task, removed with everything in it on drop.
#[derive(Debug)]
pub struct TaskWorkspace {
    root: PathBuf,
}

impl TaskWorkspace {
    /// Create `work_dir/<task_id>` with its `pdf`, `images` and `audio` subdirectories.
    pub fn create(work_dir: &Path, task_id: &TaskId) -> SlidecastResult<Self> {
        let workspace = Self {
            root: work_dir.join(task_id.as_str()),
        };
        for dir in [workspace.pdf_dir(), workspace.image_dir(), workspace.audio_dir()] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.root.join("pdf")
    }

    pub fn image_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root.join("audio")
    }
}

impl Drop for TaskWorkspace {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => tracing::debug!(path = %self.root.display(), "Workspace removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.root.display(), error = %e, "Failed to remove workspace")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let id = TaskId::from("task-1");
        let root = {
            let workspace = TaskWorkspace::create(dir.path(), &id).unwrap();
            std::fs::write(workspace.audio_dir().join("audio_1.wav"), b"x").unwrap();
            assert!(workspace.image_dir().is_dir());
            workspace.root().to_path_buf()
        };
        assert!(!root.exists());
        assert!(dir.path().exists());
    }
}
