//! Output encoding.
//!
//! The composer talks to a [`MediaSink`]. [`FfmpegSink`] is the production
//! sink: it pipes raw RGB24 frames into an `ffmpeg` H.264 encode, collects
//! narration into a sample-addressed WAV track, and muxes both into the
//! final MP4 when finished.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use image::RgbImage;
use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_common::wav::pcm16_spec;
use slidecast_common::{us_to_samples, MediaClock, VideoConfig};

use crate::compositor::CanvasSize;

/// Fixed encoding policy for one output.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingSettings {
    pub fps: u32,
    pub gop: u32,
    pub crf: u8,
    pub preset: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub audio_bitrate_kbps: u32,
    /// Video frames written between audio flushes.
    pub audio_window_frames: u32,
}

impl From<&VideoConfig> for EncodingSettings {
    fn from(config: &VideoConfig) -> Self {
        Self {
            fps: config.fps.max(1),
            gop: config.gop.max(1),
            crf: config.crf,
            preset: config.preset.clone(),
            sample_rate: config.audio_sample_rate,
            channels: config.audio_channels.max(1),
            audio_bitrate_kbps: config.audio_bitrate_kbps,
            audio_window_frames: config.audio_window_frames.max(1),
        }
    }
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self::from(&VideoConfig::default())
    }
}

/// Everything a sink needs to open an output.
#[derive(Debug, Clone)]
pub struct SinkSpec {
    pub output_path: PathBuf,
    pub canvas: CanvasSize,
    pub settings: EncodingSettings,
}

/// Destination for timestamped video frames and audio samples.
///
/// Video timestamps must be strictly increasing. Audio is addressed by
/// its own timestamp and may arrive in any window order.
pub trait MediaSink: Send {
    /// Write one video frame presented at `pts_us`.
    fn write_video(&mut self, pts_us: u64, frame: &RgbImage) -> SlidecastResult<()>;

    /// Write interleaved samples starting at `pts_us`.
    fn write_audio(&mut self, pts_us: u64, samples: &[i16]) -> SlidecastResult<()>;

    /// Flush and close the output.
    fn finish(self: Box<Self>) -> SlidecastResult<()>;
}

/// Opens a sink for a given output.
pub type SinkFactory = Box<dyn Fn(&SinkSpec) -> SlidecastResult<Box<dyn MediaSink>> + Send + Sync>;

/// Default factory: an [`FfmpegSink`] per output.
pub fn ffmpeg_sink_factory() -> SinkFactory {
    Box::new(|spec: &SinkSpec| -> SlidecastResult<Box<dyn MediaSink>> {
        Ok(Box::new(FfmpegSink::open(spec)?))
    })
}

/// Whether `binary` is on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Narration samples placed by timestamp; gaps become silence.
struct NarrationTrack {
    writer: hound::WavWriter<BufWriter<File>>,
    sample_rate: u32,
    channels: u16,
    samples_written: u64,
}

impl NarrationTrack {
    fn create(path: &Path, sample_rate: u32, channels: u16) -> SlidecastResult<Self> {
        Ok(Self {
            writer: hound::WavWriter::create(path, pcm16_spec(sample_rate, channels))?,
            sample_rate,
            channels,
            samples_written: 0,
        })
    }

    fn position_of(&self, pts_us: u64) -> u64 {
        us_to_samples(pts_us, self.sample_rate) * self.channels as u64
    }

    fn write(&mut self, samples: &[i16]) -> SlidecastResult<()> {
        for &sample in samples {
            self.writer.write_sample(sample)?;
        }
        self.samples_written += samples.len() as u64;
        Ok(())
    }

    fn pad_to(&mut self, position: u64) -> SlidecastResult<()> {
        while self.samples_written < position {
            self.writer.write_sample(0i16)?;
            self.samples_written += 1;
        }
        Ok(())
    }

    fn place(&mut self, pts_us: u64, samples: &[i16]) -> SlidecastResult<()> {
        let target = self.position_of(pts_us);
        if target >= self.samples_written {
            self.pad_to(target)?;
            self.write(samples)
        } else {
            // Overlaps what is already written; keep the earlier audio.
            let overlap = (self.samples_written - target) as usize;
            match samples.get(overlap..) {
                Some(rest) => self.write(rest),
                None => Ok(()),
            }
        }
    }

    fn finish(mut self, end_us: u64) -> SlidecastResult<()> {
        let end = self.position_of(end_us);
        self.pad_to(end)?;
        self.writer.finalize()?;
        Ok(())
    }
}

/// Encodes through the `ffmpeg` CLI.
pub struct FfmpegSink {
    spec: SinkSpec,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_task: Option<JoinHandle<String>>,
    video_path: PathBuf,
    narration_path: PathBuf,
    narration: Option<NarrationTrack>,
    clock: MediaClock,
    last_pts_us: Option<u64>,
}

impl FfmpegSink {
    /// Start the video encoder and create the narration track.
    pub fn open(spec: &SinkSpec) -> SlidecastResult<Self> {
        if !command_exists("ffmpeg") {
            return Err(SlidecastError::render("ffmpeg not found on PATH"));
        }
        if let Some(parent) = spec.output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let video_path = sibling(&spec.output_path, "video.mp4");
        let narration_path = sibling(&spec.output_path, "narration.wav");
        let settings = &spec.settings;
        let size = format!("{}x{}", spec.canvas.width, spec.canvas.height);
        let fps = settings.fps.to_string();

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-s", &size, "-r", &fps, "-i", "-"])
            .args(["-an", "-c:v", "libx264"])
            .args(["-preset", &settings.preset])
            .args(["-crf", &settings.crf.to_string()])
            .args(["-g", &settings.gop.to_string()])
            .args(["-profile:v", "high", "-pix_fmt", "yuv420p", "-r", &fps])
            .arg(&video_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| SlidecastError::render(format!("Failed to start ffmpeg: {e}")))?;

        let stdin = child.stdin.take();
        let stderr = child.stderr.take();
        let (Some(stdin), Some(stderr)) = (stdin, stderr) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(SlidecastError::render("Failed to capture ffmpeg pipes"));
        };

        // Drain stderr concurrently to avoid ffmpeg blocking on a full stderr pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        tracing::info!(
            pid = child.id(),
            width = spec.canvas.width,
            height = spec.canvas.height,
            fps = settings.fps,
            "ffmpeg encoder started"
        );

        let mut sink = Self {
            spec: spec.clone(),
            child: Some(child),
            stdin: Some(stdin),
            stderr_task: Some(stderr_task),
            video_path,
            narration_path,
            narration: None,
            clock: MediaClock::new(settings.fps),
            last_pts_us: None,
        };
        sink.narration = Some(NarrationTrack::create(
            &sink.narration_path,
            settings.sample_rate,
            settings.channels,
        )?);
        Ok(sink)
    }

    /// Close stdin and wait for the video encode to exit.
    fn finish_video(&mut self) -> SlidecastResult<()> {
        drop(self.stdin.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child
            .wait()
            .map_err(|e| SlidecastError::render(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = self
            .stderr_task
            .take()
            .map(|task| {
                task.join()
                    .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
            })
            .unwrap_or_default();

        if !status.success() {
            return Err(SlidecastError::render(format!(
                "ffmpeg video encode failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }
        Ok(())
    }

    fn mux(&self) -> SlidecastResult<()> {
        let settings = &self.spec.settings;
        let output = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
            .arg(&self.video_path)
            .arg("-i")
            .arg(&self.narration_path)
            .args(["-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a", "aac"])
            .args(["-b:a", &format!("{}k", settings.audio_bitrate_kbps)])
            .args(["-ar", &settings.sample_rate.to_string()])
            .args(["-ac", &settings.channels.to_string()])
            .args(["-movflags", "+faststart"])
            .arg(&self.spec.output_path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| SlidecastError::render(format!("Failed to start ffmpeg: {e}")))?;

        if !output.status.success() {
            let _ = std::fs::remove_file(&self.spec.output_path);
            return Err(SlidecastError::render(format!(
                "ffmpeg mux failed (status {}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

impl MediaSink for FfmpegSink {
    fn write_video(&mut self, pts_us: u64, frame: &RgbImage) -> SlidecastResult<()> {
        if self.last_pts_us.is_some_and(|last| pts_us <= last) {
            return Err(SlidecastError::render(format!(
                "non-monotonic video timestamp {pts_us}us"
            )));
        }
        if frame.dimensions() != (self.spec.canvas.width, self.spec.canvas.height) {
            return Err(SlidecastError::render(format!(
                "frame {}x{} does not match canvas {}x{}",
                frame.width(),
                frame.height(),
                self.spec.canvas.width,
                self.spec.canvas.height
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| SlidecastError::render("video encoder already closed"))?;
        stdin
            .write_all(frame.as_raw())
            .map_err(|e| SlidecastError::render(format!("Failed to write frame: {e}")))?;
        self.last_pts_us = Some(pts_us);
        self.clock.advance(1);
        Ok(())
    }

    fn write_audio(&mut self, pts_us: u64, samples: &[i16]) -> SlidecastResult<()> {
        match self.narration.as_mut() {
            Some(track) => track.place(pts_us, samples),
            None => Err(SlidecastError::render("narration track already closed")),
        }
    }

    fn finish(mut self: Box<Self>) -> SlidecastResult<()> {
        self.finish_video()?;
        let end_us = self.clock.now_us();
        if let Some(track) = self.narration.take() {
            track.finish(end_us)?;
        }
        self.mux()?;
        tracing::info!(
            output = %self.spec.output_path.display(),
            frames = self.clock.frames_emitted(),
            duration_secs = self.clock.now_secs(),
            "Encoding finished"
        );
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        drop(self.narration.take());
        let _ = std::fs::remove_file(&self.video_path);
        let _ = std::fs::remove_file(&self.narration_path);
    }
}

/// `<output>.<suffix>` next to the output, for intermediates.
fn sibling(output: &Path, suffix: &str) -> PathBuf {
    let mut name = output
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_else(|| "output".into());
    name.push(".");
    name.push(suffix);
    output.with_file_name(name)
}
