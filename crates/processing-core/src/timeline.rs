//! Slide timeline construction.
//!
//! Turns one [`Slide`] into the [`DisplayUnit`]s that show it. Narration
//! failures degrade the affected unit to a silent default duration and
//! never fail the slide.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use slidecast_common::TimelineConfig;
use slidecast_model::{DisplayUnit, Slide, TextSegment};
use slidecast_narration::{probe_duration, NarrationSynthesizer, SynthesisOutcome};

use crate::segment::segment_text;

/// Builds display units for slides, synthesizing narration as it goes.
///
/// Holds no per-slide state, so one builder can serve many slides concurrently.
pub struct SlideTimelineBuilder {
    synthesizer: Arc<NarrationSynthesizer>,
    policy: TimelineConfig,
    audio_dir: PathBuf,
}

impl SlideTimelineBuilder {
    pub fn new(
        synthesizer: Arc<NarrationSynthesizer>,
        policy: TimelineConfig,
        audio_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            synthesizer,
            policy,
            audio_dir: audio_dir.into(),
        }
    }

    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    /// Build the units for one slide, in segment order.
    pub async fn build(&self, slide: &Slide) -> Vec<DisplayUnit> {
        let image: Arc<Path> = Arc::from(slide.image_path.as_path());

        if !slide.has_text() {
            return vec![DisplayUnit::silent(
                slide.page_index,
                0,
                image,
                self.policy.default_duration_secs,
            )];
        }

        let split = slide.text_chars() > self.policy.max_segment_chars;
        let segments = if split {
            TextSegment::from_chunks(
                slide.page_index,
                segment_text(&slide.text, self.policy.max_segment_chars),
            )
        } else {
            vec![TextSegment {
                page_index: slide.page_index,
                segment_index: 0,
                text: slide.text.clone(),
            }]
        };

        let last = segments.len().saturating_sub(1);
        let mut units = Vec::with_capacity(segments.len());
        for (i, segment) in segments.iter().enumerate() {
            let file_name = if split {
                format!("audio_{}_part_{}.wav", slide.page_index, i + 1)
            } else {
                format!("audio_{}.wav", slide.page_index)
            };
            let audio_path = self.audio_dir.join(file_name);
            units.push(
                self.build_unit(segment, image.clone(), audio_path, i == last)
                    .await,
            );
        }

        tracing::debug!(
            page = slide.page_index,
            units = units.len(),
            narrated = units.iter().filter(|u| u.has_audio()).count(),
            "Slide timeline built"
        );
        units
    }

    async fn build_unit(
        &self,
        segment: &TextSegment,
        image: Arc<Path>,
        audio_path: PathBuf,
        is_last: bool,
    ) -> DisplayUnit {
        let default = self.policy.default_duration_secs;
        let path = match self
            .synthesizer
            .synthesize(&segment.text, None, &audio_path)
            .await
        {
            SynthesisOutcome::Audio(path) => path,
            SynthesisOutcome::NoAudio { reason } => {
                tracing::warn!(
                    page = segment.page_index,
                    segment = segment.segment_index,
                    %reason,
                    "No narration, using default duration"
                );
                return DisplayUnit::silent(segment.page_index, segment.segment_index, image, default);
            }
        };

        let measured = measure(&path).await;
        if measured <= 0.0 {
            tracing::warn!(
                page = segment.page_index,
                segment = segment.segment_index,
                path = %path.display(),
                "Narration duration unknown, dropping audio"
            );
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::debug!(path = %path.display(), error = %e, "Failed to remove unusable audio");
            }
            return DisplayUnit::silent(segment.page_index, segment.segment_index, image, default);
        }

        let duration = if is_last {
            measured + self.policy.trailing_buffer_secs
        } else {
            measured
        };
        DisplayUnit::narrated(
            segment.page_index,
            segment.segment_index,
            image,
            path,
            duration,
        )
    }
}

async fn measure(path: &Path) -> f64 {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || probe_duration(&owned))
        .await
        .unwrap_or(0.0)
}
