//! Concurrent task registry.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use slidecast_model::{Task, TaskId};

/// Shared map of task id to task state.
///
/// Entries are inserted whole and mutated under the write lock; readers
/// receive clones, so a reader never observes a half-updated task.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    inner: Arc<RwLock<HashMap<TaskId, Task>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, task: Task) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task.task_id.clone(), task);
    }

    /// Snapshot of a task.
    pub fn get(&self, task_id: &TaskId) -> Option<Task> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(task_id)
            .cloned()
    }

    /// Apply `f` to a task under the write lock. Returns `None` if unknown.
    pub fn update<R>(&self, task_id: &TaskId, f: impl FnOnce(&mut Task) -> R) -> Option<R> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(task_id)
            .map(f)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
