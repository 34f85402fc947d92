//! Slide-show composition.
//!
//! Lays display units end to end on a single monotonic timeline:
//!
//! ```text
//! unit 0            unit 1                     unit 2
//! |f f f f f f f f |f f f f f f f f f f f f f |f f f f |
//! |aaaaaaa         |aaaaaaaaaaaaaaaaaa        |        |
//! 0                n0/fps                     (n0+n1)/fps
//! ```
//!
//! Frame `k` of the output is stamped `k / fps` from its global index, and
//! each unit's narration is offset by the timestamp of the unit's first frame.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use slidecast_common::error::SlidecastError;
use slidecast_common::MediaClock;
use slidecast_model::DisplayUnit;

use crate::audio::{decode_audio, AudioPacket, AUDIO_PACKET_FRAMES};
use crate::compositor::{load_frame, CanvasSize};
use crate::encoder::{ffmpeg_sink_factory, EncodingSettings, MediaSink, SinkFactory, SinkSpec};

/// Fatal composition failures. Per-unit read failures are not errors.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("no display units to compose")]
    Empty,

    #[error("no slide image could be read")]
    NoReadableImage,

    #[error("no display units could be composed")]
    NothingComposed,

    #[error("encoder failed to start: {0}")]
    EncoderInit(String),

    #[error("encoding failed: {0}")]
    Encode(String),
}

impl From<ComposeError> for SlidecastError {
    fn from(err: ComposeError) -> Self {
        SlidecastError::render(err.to_string())
    }
}

/// Summary of a finished composition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComposeReport {
    pub units_composed: usize,
    pub units_skipped: usize,
    pub total_frames: u64,
    pub duration_secs: f64,
}

/// Composition progress after each unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeProgress {
    pub units_done: usize,
    pub units_total: usize,
    pub frames_emitted: u64,
}

/// Progress callback for composition.
pub type ProgressCallback = Box<dyn Fn(ComposeProgress) + Send + Sync>;

/// Encodes an ordered list of display units into one video.
pub struct Composer {
    settings: EncodingSettings,
    sink_factory: SinkFactory,
    progress: Option<ProgressCallback>,
}

impl Composer {
    /// A composer writing through `ffmpeg`.
    pub fn new(settings: EncodingSettings) -> Self {
        Self {
            settings,
            sink_factory: ffmpeg_sink_factory(),
            progress: None,
        }
    }

    /// Replace the output sink.
    pub fn with_sink_factory(mut self, factory: SinkFactory) -> Self {
        self.sink_factory = factory;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn settings(&self) -> &EncodingSettings {
        &self.settings
    }

    /// Compose `units`, in the given order, into `output_path`.
    ///
    /// The image and audio files referenced by `units` are deleted before
    /// this returns, whatever the outcome.
    pub fn compose(
        &self,
        units: Vec<DisplayUnit>,
        output_path: &Path,
    ) -> Result<ComposeReport, ComposeError> {
        let _cleanup = UnitFileGuard::new(&units);

        if units.is_empty() {
            return Err(ComposeError::Empty);
        }

        let canvas = units
            .iter()
            .find_map(|unit| match CanvasSize::probe(&unit.image_path) {
                Ok(canvas) => Some(canvas),
                Err(e) => {
                    tracing::warn!(page = unit.page_index, error = %e, "Unreadable slide image");
                    None
                }
            })
            .ok_or(ComposeError::NoReadableImage)?;

        let spec = SinkSpec {
            output_path: output_path.to_path_buf(),
            canvas,
            settings: self.settings.clone(),
        };
        let mut sink =
            (self.sink_factory)(&spec).map_err(|e| ComposeError::EncoderInit(e.to_string()))?;

        tracing::info!(
            units = units.len(),
            width = canvas.width,
            height = canvas.height,
            output = %output_path.display(),
            "Composing video"
        );

        let mut clock = MediaClock::new(self.settings.fps);
        let mut composed = 0usize;
        let mut skipped = 0usize;

        for (index, unit) in units.iter().enumerate() {
            match self.compose_unit(sink.as_mut(), &mut clock, unit, canvas)? {
                true => composed += 1,
                false => skipped += 1,
            }
            if let Some(cb) = &self.progress {
                cb(ComposeProgress {
                    units_done: index + 1,
                    units_total: units.len(),
                    frames_emitted: clock.frames_emitted(),
                });
            }
        }

        if composed == 0 {
            return Err(ComposeError::NothingComposed);
        }

        sink.finish()
            .map_err(|e| ComposeError::Encode(e.to_string()))?;

        let report = ComposeReport {
            units_composed: composed,
            units_skipped: skipped,
            total_frames: clock.frames_emitted(),
            duration_secs: clock.now_secs(),
        };
        tracing::info!(
            units_composed = report.units_composed,
            units_skipped = report.units_skipped,
            frames = report.total_frames,
            duration_secs = report.duration_secs,
            "Composition finished"
        );
        Ok(report)
    }

    /// Emit one unit. Returns `Ok(false)` when the unit was skipped.
    fn compose_unit(
        &self,
        sink: &mut dyn MediaSink,
        clock: &mut MediaClock,
        unit: &DisplayUnit,
        canvas: CanvasSize,
    ) -> Result<bool, ComposeError> {
        let frame = match load_frame(&unit.image_path, canvas) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(
                    page = unit.page_index,
                    segment = unit.segment_index,
                    error = %e,
                    "Skipping unit: image unreadable"
                );
                return Ok(false);
            }
        };

        let frame_count = clock.frames_for(unit.duration_secs);
        let first_frame = clock.frames_emitted();
        let unit_start_us = clock.now_us();
        let unit_len_us = clock.frame_pts_us(first_frame + frame_count) - unit_start_us;

        let packets = match &unit.audio_path {
            Some(path) => match decode_audio(path, self.settings.sample_rate, self.settings.channels) {
                Ok(mut audio) => {
                    audio.truncate_to_us(unit_len_us);
                    audio.packets(AUDIO_PACKET_FRAMES)
                }
                Err(e) => {
                    tracing::warn!(
                        page = unit.page_index,
                        segment = unit.segment_index,
                        error = %e,
                        "Skipping unit: narration unreadable"
                    );
                    return Ok(false);
                }
            },
            None => Vec::new(),
        };

        let window = u64::from(self.settings.audio_window_frames.max(1));
        let mut pending = packets.into_iter().peekable();

        for k in 0..frame_count {
            let global = first_frame + k;
            sink.write_video(clock.frame_pts_us(global), &frame)
                .map_err(|e| ComposeError::Encode(e.to_string()))?;

            let last = k + 1 == frame_count;
            if (k + 1) % window == 0 || last {
                let horizon_us = clock.frame_pts_us(global + 1) - unit_start_us;
                while let Some(packet) = pending.next_if(|p: &AudioPacket| last || p.pts_us < horizon_us) {
                    sink.write_audio(unit_start_us + packet.pts_us, &packet.samples)
                        .map_err(|e| ComposeError::Encode(e.to_string()))?;
                }
            }
        }

        clock.advance(frame_count);
        tracing::debug!(
            page = unit.page_index,
            segment = unit.segment_index,
            frames = frame_count,
            start_us = unit_start_us,
            narrated = unit.has_audio(),
            "Unit composed"
        );
        Ok(true)
    }
}

/// Deletes every image and audio file referenced by a batch of units on drop.
struct UnitFileGuard {
    paths: Vec<PathBuf>,
}

impl UnitFileGuard {
    fn new(units: &[DisplayUnit]) -> Self {
        let mut seen = HashSet::new();
        let mut paths = Vec::new();
        for unit in units {
            let image = unit.image_path.to_path_buf();
            if seen.insert(image.clone()) {
                paths.push(image);
            }
            if let Some(audio) = &unit.audio_path {
                if seen.insert(audio.clone()) {
                    paths.push(audio.clone());
                }
            }
        }
        Self { paths }
    }
}

impl Drop for UnitFileGuard {
    fn drop(&mut self) {
        for path in &self.paths {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!(path = %path.display(), error = %e, "Failed to remove unit file");
                }
            }
        }
    }
}
