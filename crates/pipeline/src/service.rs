//! Task submission and polling.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_common::AppConfig;
use slidecast_model::{Task, TaskId, TaskStatus};
use slidecast_narration::NarrationSynthesizer;
use slidecast_render_engine::{Composer, EncodingSettings};

use crate::document::OfficeRenderer;
use crate::pipeline::ConversionPipeline;
use crate::pool::UnitWorkerPool;
use crate::progress::RegistryProgress;
use crate::registry::TaskRegistry;

/// Why a result could not be returned.
#[derive(Debug, thiserror::Error)]
pub enum ResultError {
    #[error("task not found")]
    NotFound,

    #[error("task is still processing")]
    NotReady,

    #[error("task failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ResultError> for SlidecastError {
    fn from(err: ResultError) -> Self {
        match err {
            ResultError::Io(e) => SlidecastError::Io(e),
            other => SlidecastError::pipeline(other.to_string()),
        }
    }
}

/// Accepts conversion requests and runs them in the background.
#[derive(Clone)]
pub struct SlidecastService {
    registry: TaskRegistry,
    pipeline: Arc<ConversionPipeline>,
}

impl SlidecastService {
    pub fn new(pipeline: ConversionPipeline) -> Self {
        Self {
            registry: TaskRegistry::new(),
            pipeline: Arc::new(pipeline),
        }
    }

    /// Production service: LibreOffice/poppler rendering, HTTP narration,
    /// ffmpeg encoding.
    pub fn from_config(config: &AppConfig) -> SlidecastResult<Self> {
        let synthesizer = NarrationSynthesizer::from_config(&config.narration)?;
        let pipeline = ConversionPipeline::new(
            Arc::new(OfficeRenderer::new()),
            Arc::new(synthesizer),
            Composer::new(EncodingSettings::from(&config.video)),
            UnitWorkerPool::new(config.pipeline.worker_concurrency),
            config,
        );
        Ok(Self::new(pipeline))
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Register a task for `source` and start converting it.
    ///
    /// Must be called from within a tokio runtime. The task is visible as
    /// `PROCESSING` at 0% before this returns.
    pub fn submit(&self, source: PathBuf) -> TaskId {
        let task_id = TaskId::generate();
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.registry.insert(Task::new(task_id.clone(), name));
        tracing::info!(task_id = %task_id, source = %source.display(), "Task submitted");

        let registry = self.registry.clone();
        let pipeline = self.pipeline.clone();
        let id = task_id.clone();
        tokio::spawn(async move {
            let progress = Arc::new(RegistryProgress::new(registry.clone(), id.clone()));
            match pipeline.run(&id, &source, progress).await {
                Ok(output) => {
                    registry.update(&id, |task| task.complete(output.video_path));
                    tracing::info!(task_id = %id, "Task completed");
                }
                Err(e) => {
                    tracing::error!(task_id = %id, error = %e, "Task failed");
                    registry.update(&id, |task| task.fail(e.to_string()));
                }
            }
        });

        task_id
    }

    /// Current state of a task.
    pub fn get_status(&self, task_id: &TaskId) -> Option<Task> {
        self.registry.get(task_id)
    }

    /// Bytes of the finished video.
    pub async fn get_result(&self, task_id: &TaskId) -> Result<Vec<u8>, ResultError> {
        let task = self.registry.get(task_id).ok_or(ResultError::NotFound)?;
        match task.status {
            TaskStatus::Processing => Err(ResultError::NotReady),
            TaskStatus::Failed => Err(ResultError::Failed(task.error.unwrap_or_default())),
            TaskStatus::Completed => {
                let path = task.result_path.ok_or(ResultError::NotFound)?;
                Ok(tokio::fs::read(path).await?)
            }
        }
    }

    /// Poll until the task is terminal. Returns `None` for unknown tasks.
    pub async fn wait_for(&self, task_id: &TaskId, interval: Duration) -> Option<Task> {
        loop {
            let task = self.registry.get(task_id)?;
            if task.is_terminal() {
                return Some(task);
            }
            tokio::time::sleep(interval).await;
        }
    }
}
