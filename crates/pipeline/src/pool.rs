//! Bounded worker pool for building display units.

use std::sync::Arc;

use slidecast_model::{sort_units, DisplayUnit, Slide};
use slidecast_processing_core::SlideTimelineBuilder;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::progress::ProgressSink;

/// Percent reported when narration starts.
pub const NARRATION_START_PERCENT: u8 = 65;

/// Percent reported when every slide is built.
pub const NARRATION_END_PERCENT: u8 = 85;

/// Process-wide limit on concurrent slide builds, shared by all tasks.
#[derive(Debug, Clone)]
pub struct UnitWorkerPool {
    permits: Arc<Semaphore>,
    width: usize,
}

impl UnitWorkerPool {
    pub fn new(width: usize) -> Self {
        let width = width.max(1);
        Self {
            permits: Arc::new(Semaphore::new(width)),
            width,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Build units for every slide, at most `width` at a time across the process.
    ///
    /// Slides finish in any order; the result is sorted by
    /// `(page_index, segment_index)`.
    pub async fn build_all(
        &self,
        builder: Arc<SlideTimelineBuilder>,
        slides: Vec<Slide>,
        progress: Arc<dyn ProgressSink>,
    ) -> Vec<DisplayUnit> {
        let total = slides.len();
        let mut workers = JoinSet::new();
        for slide in slides {
            let permits = self.permits.clone();
            let builder = builder.clone();
            workers.spawn(async move {
                // The semaphore is never closed, so acquisition only fails on shutdown.
                let _permit = permits.acquire_owned().await.ok();
                let units = builder.build(&slide).await;
                (slide.page_index, units)
            });
        }

        let mut units = Vec::with_capacity(total);
        let mut done = 0usize;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((page, slide_units)) => {
                    done += 1;
                    let span = usize::from(NARRATION_END_PERCENT - NARRATION_START_PERCENT);
                    let percent = NARRATION_START_PERCENT as usize + span * done / total.max(1);
                    progress.report(
                        percent as u8,
                        &format!("slide {page} narrated ({done}/{total})"),
                    );
                    units.extend(slide_units);
                }
                Err(e) => tracing::error!(error = %e, "Slide worker failed"),
            }
        }

        sort_units(&mut units);
        units
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidecast_common::TimelineConfig;
    use slidecast_narration::{NarrationSynthesizer, SpeechBackend, SpeechError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Tracks the peak number of concurrent requests.
    struct GaugeBackend {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl SpeechBackend for GaugeBackend {
        async fn synthesize(&self, _text: &str, _voice: &str) -> Result<Vec<u8>, SpeechError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Err(SpeechError::Failed("no audio in this test".to_string()))
        }

        fn name(&self) -> &str {
            "gauge"
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_bounds_concurrency_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(GaugeBackend {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let synthesizer = NarrationSynthesizer::new(backend.clone(), "tongtong");
        let builder = Arc::new(SlideTimelineBuilder::new(
            Arc::new(synthesizer),
            TimelineConfig::default(),
            dir.path(),
        ));
        let slides: Vec<Slide> = (1..=12)
            .rev()
            .map(|page| Slide::new(page, dir.path().join(format!("{page}.png")), "text"))
            .collect();
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();
        let progress: Arc<dyn ProgressSink> = Arc::new(move |percent: u8, _message: &str| {
            sink.lock().unwrap().push(percent);
        });

        let units = UnitWorkerPool::new(3).build_all(builder, slides, progress).await;

        assert!(backend.peak.load(Ordering::SeqCst) <= 3);
        let pages: Vec<u32> = units.iter().map(|u| u.page_index).collect();
        assert_eq!(pages, (1..=12).collect::<Vec<_>>());
        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 12);
        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*reports.last().unwrap(), NARRATION_END_PERCENT);
    }
}
