//! Composition timeline tests against an in-memory sink.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::{Rgb, RgbImage};
use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_common::wav::pcm16_spec;
use slidecast_model::DisplayUnit;
use slidecast_render_engine::{
    CanvasSize, ComposeError, Composer, EncodingSettings, MediaSink, SinkFactory, SinkSpec,
};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Video(u64),
    Audio { pts_us: u64, samples: usize },
}

#[derive(Debug, Default)]
struct Recording {
    canvas: Option<CanvasSize>,
    events: Vec<Event>,
    frame_dims: Vec<(u32, u32)>,
    finished: bool,
}

impl Recording {
    fn video_pts(&self) -> Vec<u64> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Video(pts) => Some(*pts),
                Event::Audio { .. } => None,
            })
            .collect()
    }

    fn audio(&self) -> Vec<(u64, usize)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Audio { pts_us, samples } => Some((*pts_us, *samples)),
                Event::Video(_) => None,
            })
            .collect()
    }
}

struct RecordingSink(Arc<Mutex<Recording>>);

impl MediaSink for RecordingSink {
    fn write_video(&mut self, pts_us: u64, frame: &RgbImage) -> SlidecastResult<()> {
        let mut rec = self.0.lock().unwrap();
        rec.events.push(Event::Video(pts_us));
        rec.frame_dims.push(frame.dimensions());
        Ok(())
    }

    fn write_audio(&mut self, pts_us: u64, samples: &[i16]) -> SlidecastResult<()> {
        self.0.lock().unwrap().events.push(Event::Audio {
            pts_us,
            samples: samples.len(),
        });
        Ok(())
    }

    fn finish(self: Box<Self>) -> SlidecastResult<()> {
        self.0.lock().unwrap().finished = true;
        Ok(())
    }
}

fn recording_composer() -> (Composer, Arc<Mutex<Recording>>) {
    let recording = Arc::new(Mutex::new(Recording::default()));
    let shared = recording.clone();
    let factory: SinkFactory = Box::new(move |spec: &SinkSpec| -> SlidecastResult<Box<dyn MediaSink>> {
        shared.lock().unwrap().canvas = Some(spec.canvas);
        Ok(Box::new(RecordingSink(shared.clone())))
    });
    let composer = Composer::new(EncodingSettings::default()).with_sink_factory(factory);
    (composer, recording)
}

fn write_image(dir: &Path, name: &str, w: u32, h: u32) -> Arc<Path> {
    let path = dir.join(name);
    RgbImage::from_pixel(w, h, Rgb([40, 80, 120])).save(&path).unwrap();
    Arc::from(path.as_path())
}

fn write_wav(dir: &Path, name: &str, secs: f64) -> PathBuf {
    let path = dir.join(name);
    let frames = (secs * 44_100.0).round() as usize;
    let mut writer = hound::WavWriter::create(&path, pcm16_spec(44_100, 1)).unwrap();
    for _ in 0..frames {
        writer.write_sample(100i16).unwrap();
    }
    writer.finalize().unwrap();
    path
}

#[test]
fn test_video_timestamps_follow_global_frame_index() {
    let dir = tempfile::tempdir().unwrap();
    let img = write_image(dir.path(), "1.png", 64, 48);
    let units = vec![
        DisplayUnit::silent(1, 0, img.clone(), 1.0),
        DisplayUnit::silent(2, 0, img.clone(), 0.5),
        DisplayUnit::silent(3, 0, img, 2.0),
    ];
    let (composer, recording) = recording_composer();

    let report = composer.compose(units, &dir.path().join("out.mp4")).unwrap();

    assert_eq!(report.total_frames, 30 + 15 + 60);
    assert_eq!(report.units_composed, 3);
    assert!((report.duration_secs - 3.5).abs() < 1e-9);

    let rec = recording.lock().unwrap();
    assert!(rec.finished);
    let pts = rec.video_pts();
    assert_eq!(pts.len(), 105);
    for (k, pts_us) in pts.iter().enumerate() {
        assert_eq!(*pts_us, k as u64 * 1_000_000 / 30);
    }
    assert!(pts.windows(2).all(|w| w[0] < w[1]));
    // Each unit starts at the cumulative frame count of its predecessors.
    assert_eq!(pts[30], 1_000_000);
    assert_eq!(pts[45], 1_500_000);
}

#[test]
fn test_audio_is_offset_by_unit_start_and_interleaved() {
    let dir = tempfile::tempdir().unwrap();
    let img = write_image(dir.path(), "1.png", 64, 48);
    let audio = write_wav(dir.path(), "audio_2.wav", 0.5);
    let units = vec![
        DisplayUnit::silent(1, 0, img.clone(), 1.0),
        DisplayUnit::narrated(2, 0, img.clone(), audio, 1.0),
        DisplayUnit::silent(3, 0, img, 1.0),
    ];
    let (composer, recording) = recording_composer();

    composer.compose(units, &dir.path().join("out.mp4")).unwrap();

    let rec = recording.lock().unwrap();
    let audio = rec.audio();
    assert_eq!(audio[0].0, 1_000_000);
    assert_eq!(audio.iter().map(|(_, n)| n).sum::<usize>(), 22_050);
    assert!(audio.iter().all(|(pts, _)| (1_000_000..2_000_000).contains(pts)));
    assert!(audio.windows(2).all(|w| w[0].0 < w[1].0));

    // Audio of unit 2 is emitted after its first frame and before unit 3 begins.
    let first_audio = rec
        .events
        .iter()
        .position(|e| matches!(e, Event::Audio { .. }))
        .unwrap();
    let last_audio = rec
        .events
        .iter()
        .rposition(|e| matches!(e, Event::Audio { .. }))
        .unwrap();
    let unit2_first = rec.events.iter().position(|e| *e == Event::Video(1_000_000)).unwrap();
    let unit3_first = rec.events.iter().position(|e| *e == Event::Video(2_000_000)).unwrap();
    assert!(first_audio > unit2_first);
    assert!(last_audio < unit3_first);
    // Flushed in windows rather than all at once at the end of the unit.
    let unit2_last = unit3_first - 1;
    assert!(first_audio < unit2_last);
}

#[test]
fn test_audio_longer_than_slot_is_truncated() {
    let dir = tempfile::tempdir().unwrap();
    let img = write_image(dir.path(), "1.png", 64, 48);
    let audio = write_wav(dir.path(), "audio_1.wav", 2.0);
    let units = vec![DisplayUnit::narrated(1, 0, img, audio, 1.0)];
    let (composer, recording) = recording_composer();

    composer.compose(units, &dir.path().join("out.mp4")).unwrap();

    let rec = recording.lock().unwrap();
    assert_eq!(rec.audio().iter().map(|(_, n)| n).sum::<usize>(), 44_100);
}

#[test]
fn test_unreadable_units_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let img = write_image(dir.path(), "1.png", 64, 48);
    let missing: Arc<Path> = Arc::from(dir.path().join("2.png").as_path());
    let units = vec![
        DisplayUnit::silent(1, 0, img.clone(), 1.0),
        DisplayUnit::silent(2, 0, missing, 1.0),
        DisplayUnit::narrated(3, 0, img.clone(), dir.path().join("gone.wav"), 1.0),
        DisplayUnit::silent(4, 0, img, 1.0),
    ];
    let (composer, recording) = recording_composer();

    let report = composer.compose(units, &dir.path().join("out.mp4")).unwrap();

    assert_eq!(report.units_composed, 2);
    assert_eq!(report.units_skipped, 2);
    assert_eq!(report.total_frames, 60);
    let pts = recording.lock().unwrap().video_pts();
    assert_eq!(pts[30], 1_000_000);
}

#[test]
fn test_odd_source_dimensions_give_even_canvas() {
    let dir = tempfile::tempdir().unwrap();
    let img = write_image(dir.path(), "1.png", 101, 57);
    let units = vec![DisplayUnit::silent(1, 0, img, 0.1)];
    let (composer, recording) = recording_composer();

    composer.compose(units, &dir.path().join("out.mp4")).unwrap();

    let rec = recording.lock().unwrap();
    assert_eq!(rec.canvas, Some(CanvasSize { width: 102, height: 58 }));
    assert!(rec.frame_dims.iter().all(|dims| *dims == (102, 58)));
    assert_eq!(rec.frame_dims.len(), 3);
}

#[test]
fn test_unit_files_removed_after_composition() {
    let dir = tempfile::tempdir().unwrap();
    let img = write_image(dir.path(), "1.png", 64, 48);
    let part1 = write_wav(dir.path(), "audio_1_part_1.wav", 0.2);
    let part2 = write_wav(dir.path(), "audio_1_part_2.wav", 0.2);
    let units = vec![
        DisplayUnit::narrated(1, 0, img.clone(), part1.clone(), 0.2),
        DisplayUnit::narrated(1, 1, img.clone(), part2.clone(), 0.7),
    ];
    let (composer, _recording) = recording_composer();

    composer.compose(units, &dir.path().join("out.mp4")).unwrap();

    assert!(!img.exists());
    assert!(!part1.exists());
    assert!(!part2.exists());
}

#[test]
fn test_empty_input_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (composer, recording) = recording_composer();
    let err = composer.compose(Vec::new(), &dir.path().join("out.mp4")).unwrap_err();
    assert!(matches!(err, ComposeError::Empty));
    assert!(recording.lock().unwrap().canvas.is_none());
}

#[test]
fn test_no_readable_image_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let missing: Arc<Path> = Arc::from(dir.path().join("1.png").as_path());
    let (composer, _recording) = recording_composer();
    let err = composer
        .compose(vec![DisplayUnit::silent(1, 0, missing, 3.0)], &dir.path().join("out.mp4"))
        .unwrap_err();
    assert!(matches!(err, ComposeError::NoReadableImage));
}

#[test]
fn test_encoder_init_failure_still_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let img = write_image(dir.path(), "1.png", 64, 48);
    let factory: SinkFactory = Box::new(|_spec: &SinkSpec| -> SlidecastResult<Box<dyn MediaSink>> {
        Err(SlidecastError::render("no encoder"))
    });
    let composer = Composer::new(EncodingSettings::default()).with_sink_factory(factory);

    let err = composer
        .compose(vec![DisplayUnit::silent(1, 0, img.clone(), 3.0)], &dir.path().join("out.mp4"))
        .unwrap_err();

    assert!(matches!(err, ComposeError::EncoderInit(_)));
    assert!(!img.exists());
}
