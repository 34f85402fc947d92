//! Narration decoding and packetization.

use std::path::Path;
use std::process::{Command, Stdio};

use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_common::wav::is_pcm16;
use slidecast_common::{samples_to_us, us_to_samples};

/// Sample frames per audio packet (the AAC frame size).
pub const AUDIO_PACKET_FRAMES: usize = 1024;

/// Interleaved signed 16-bit PCM at a known rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

/// A run of samples stamped relative to the start of its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPacket {
    pub pts_us: u64,
    pub samples: Vec<i16>,
}

impl DecodedAudio {
    /// Sample frames (one sample per channel).
    pub fn frames(&self) -> u64 {
        self.samples.len() as u64 / self.channels.max(1) as u64
    }

    pub fn duration_us(&self) -> u64 {
        samples_to_us(self.frames(), self.sample_rate)
    }

    /// Drop everything past `limit_us`.
    pub fn truncate_to_us(&mut self, limit_us: u64) {
        let max_frames = us_to_samples(limit_us, self.sample_rate);
        let max_samples = (max_frames * self.channels.max(1) as u64) as usize;
        if self.samples.len() > max_samples {
            self.samples.truncate(max_samples);
        }
    }

    /// Cut into packets of `packet_frames` sample frames.
    pub fn packets(&self, packet_frames: usize) -> Vec<AudioPacket> {
        let channels = self.channels.max(1) as usize;
        let chunk = packet_frames.max(1) * channels;
        self.samples
            .chunks(chunk)
            .enumerate()
            .map(|(i, samples)| AudioPacket {
                pts_us: samples_to_us((i * packet_frames.max(1)) as u64, self.sample_rate),
                samples: samples.to_vec(),
            })
            .collect()
    }
}

/// Decode `path` to s16 PCM at `sample_rate` with `channels`.
///
/// WAV files already in the target layout are read directly. Everything
/// else is resampled through `ffmpeg`.
pub fn decode_audio(path: &Path, sample_rate: u32, channels: u16) -> SlidecastResult<DecodedAudio> {
    if !path.is_file() {
        return Err(SlidecastError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match read_wav(path, sample_rate, channels) {
        Ok(Some(samples)) => {
            return Ok(DecodedAudio {
                sample_rate,
                channels,
                samples,
            })
        }
        Ok(None) => {}
        Err(e) => {
            tracing::trace!(path = %path.display(), error = %e, "Not a readable WAV file");
        }
    }

    decode_with_ffmpeg(path, sample_rate, channels)
}

/// Samples of a WAV file already at the target layout, or `None` when it
/// needs resampling.
fn read_wav(path: &Path, sample_rate: u32, channels: u16) -> Result<Option<Vec<i16>>, hound::Error> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    if !is_pcm16(&spec) || spec.sample_rate != sample_rate || spec.channels != channels {
        tracing::debug!(
            path = %path.display(),
            source_rate = spec.sample_rate,
            source_channels = spec.channels,
            source_bits = spec.bits_per_sample,
            "Resampling narration"
        );
        return Ok(None);
    }
    reader.samples::<i16>().collect::<Result<Vec<_>, _>>().map(Some)
}

fn decode_with_ffmpeg(path: &Path, sample_rate: u32, channels: u16) -> SlidecastResult<DecodedAudio> {
    let output = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "s16le",
            "-acodec",
            "pcm_s16le",
            "-ac",
            &channels.to_string(),
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .stdin(Stdio::null())
        .output()
        .map_err(|e| SlidecastError::render(format!("Failed to start ffmpeg: {e}")))?;

    if !output.status.success() {
        return Err(SlidecastError::render(format!(
            "ffmpeg could not decode {} (status {}): {}",
            path.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let samples = output
        .stdout
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    Ok(DecodedAudio {
        sample_rate,
        channels,
        samples,
    })
}
