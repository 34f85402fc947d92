//! Progress reporting.

use slidecast_model::TaskId;

use crate::registry::TaskRegistry;

/// Receives stage milestones. Must return promptly.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u8, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(u8, &str) + Send + Sync,
{
    fn report(&self, percent: u8, message: &str) {
        self(percent, message)
    }
}

/// Records progress on a registry entry and mirrors it to the log.
pub struct RegistryProgress {
    registry: TaskRegistry,
    task_id: TaskId,
}

impl RegistryProgress {
    pub fn new(registry: TaskRegistry, task_id: TaskId) -> Self {
        Self { registry, task_id }
    }
}

impl ProgressSink for RegistryProgress {
    fn report(&self, percent: u8, message: &str) {
        tracing::info!(task_id = %self.task_id, percent, "{message}");
        self.registry
            .update(&self.task_id, |task| task.record_progress(percent, message));
    }
}
