//! The document-to-video conversion pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_common::{AppConfig, TaskClock, TimelineConfig};
use slidecast_model::TaskId;
use slidecast_narration::NarrationSynthesizer;
use slidecast_processing_core::SlideTimelineBuilder;
use slidecast_render_engine::{ComposeReport, Composer};

use crate::document::DocumentRenderer;
use crate::pool::{UnitWorkerPool, NARRATION_END_PERCENT, NARRATION_START_PERCENT};
use crate::progress::ProgressSink;
use crate::workspace::TaskWorkspace;

/// Where a finished conversion landed.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOutput {
    pub video_path: PathBuf,
    pub report: ComposeReport,
}

/// Runs one conversion from source document to MP4.
///
/// Stateless between runs; one instance serves every task.
pub struct ConversionPipeline {
    renderer: Arc<dyn DocumentRenderer>,
    synthesizer: Arc<NarrationSynthesizer>,
    composer: Arc<Composer>,
    pool: UnitWorkerPool,
    timeline: TimelineConfig,
    work_dir: PathBuf,
    output_dir: PathBuf,
}

impl ConversionPipeline {
    pub fn new(
        renderer: Arc<dyn DocumentRenderer>,
        synthesizer: Arc<NarrationSynthesizer>,
        composer: Composer,
        pool: UnitWorkerPool,
        config: &AppConfig,
    ) -> Self {
        Self {
            renderer,
            synthesizer,
            composer: Arc::new(composer),
            pool,
            timeline: config.timeline.clone(),
            work_dir: config.work_dir.clone(),
            output_dir: config.output_dir.clone(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Convert `source` into `output_dir/video_<task_id>.mp4`.
    ///
    /// Scratch files live in `work_dir/<task_id>` and are removed on return.
    pub async fn run(
        &self,
        task_id: &TaskId,
        source: &Path,
        progress: Arc<dyn ProgressSink>,
    ) -> SlidecastResult<ConversionOutput> {
        let clock = TaskClock::start();
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        progress.report(0, &format!("received {name}"));

        let workspace = TaskWorkspace::create(&self.work_dir, task_id)?;

        progress.report(10, "converting document to PDF");
        let pdf = self.renderer.render_to_pdf(source, &workspace.pdf_dir()).await?;
        progress.report(30, "PDF ready");

        progress.report(35, "extracting slide text");
        let texts = self.renderer.extract_text(source, &pdf).await?;
        progress.report(40, &format!("extracted text for {} pages", texts.len()));

        progress.report(45, "rendering pages to images");
        let slides = self
            .renderer
            .render_pdf_to_images(&pdf, &workspace.image_dir(), &texts)
            .await?;
        if slides.is_empty() {
            return Err(SlidecastError::document("document produced no pages"));
        }
        progress.report(60, &format!("rendered {} pages", slides.len()));

        progress.report(NARRATION_START_PERCENT, "synthesizing narration");
        let builder = Arc::new(SlideTimelineBuilder::new(
            self.synthesizer.clone(),
            self.timeline.clone(),
            workspace.audio_dir(),
        ));
        let units = self.pool.build_all(builder, slides, progress.clone()).await;
        progress.report(
            NARRATION_END_PERCENT,
            &format!("{} display units scheduled", units.len()),
        );

        progress.report(90, "composing video");
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let video_path = self.output_dir.join(format!("video_{task_id}.mp4"));
        let composer = self.composer.clone();
        let target = video_path.clone();
        let report = tokio::task::spawn_blocking(move || composer.compose(units, &target))
            .await
            .map_err(|e| SlidecastError::pipeline(format!("composition aborted: {e}")))??;

        drop(workspace);
        progress.report(
            100,
            &format!(
                "done in {:.1}s: {} units composed, {} skipped, {:.1}s of video",
                clock.elapsed_secs(),
                report.units_composed,
                report.units_skipped,
                report.duration_secs
            ),
        );

        Ok(ConversionOutput { video_path, report })
    }
}
