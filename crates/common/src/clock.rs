//! Clock and timing utilities for stream synchronization.
//!
//! The output video has a single timeline measured in microseconds.
//! This module provides utilities for:
//! - Assigning drift-free timestamps to constant-rate video frames
//! - Converting between seconds, microseconds, and sample positions
//! - Timing a pipeline run against the wall clock

use std::time::Instant;

/// Microseconds per second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Monotonic output timeline for a constant-frame-rate video.
///
/// Frame timestamps are derived from the global frame index rather than
/// accumulated, so `1/fps` rounding never builds up across slides.
#[derive(Debug, Clone)]
pub struct MediaClock {
    fps: u32,
    frames_emitted: u64,
}

impl MediaClock {
    /// Create a clock at position zero.
    pub fn new(fps: u32) -> Self {
        Self {
            fps: fps.max(1),
            frames_emitted: 0,
        }
    }

    /// Frame rate the clock ticks at.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Total frames emitted so far.
    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    /// Timestamp (µs) of the given global frame index.
    pub fn frame_pts_us(&self, frame_index: u64) -> u64 {
        frame_index * MICROS_PER_SEC / self.fps as u64
    }

    /// Current position: the timestamp the next frame will carry.
    pub fn now_us(&self) -> u64 {
        self.frame_pts_us(self.frames_emitted)
    }

    /// Current position in seconds.
    pub fn now_secs(&self) -> f64 {
        us_to_secs(self.now_us())
    }

    /// Move the clock forward by `frames` frames.
    pub fn advance(&mut self, frames: u64) {
        self.frames_emitted += frames;
    }

    /// Number of whole frames covering `duration_secs`, never less than one.
    pub fn frames_for(&self, duration_secs: f64) -> u64 {
        ((duration_secs * self.fps as f64).round() as u64).max(1)
    }
}

/// Convert seconds to microseconds.
pub fn secs_to_us(secs: f64) -> u64 {
    (secs.max(0.0) * MICROS_PER_SEC as f64).round() as u64
}

/// Convert microseconds to seconds.
pub fn us_to_secs(us: u64) -> f64 {
    us as f64 / MICROS_PER_SEC as f64
}

/// Timestamp (µs) of a sample position at the given rate.
pub fn samples_to_us(samples: u64, sample_rate: u32) -> u64 {
    samples * MICROS_PER_SEC / sample_rate.max(1) as u64
}

/// Sample position of a timestamp (µs) at the given rate.
pub fn us_to_samples(us: u64, sample_rate: u32) -> u64 {
    // Round to nearest so a packet stamped from samples_to_us maps back exactly.
    (us * sample_rate as u64 + MICROS_PER_SEC / 2) / MICROS_PER_SEC
}

/// Wall-clock stopwatch for a single pipeline run.
#[derive(Debug, Clone)]
pub struct TaskClock {
    /// The instant the run started.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl TaskClock {
    /// Start a stopwatch anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Seconds elapsed since start.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Milliseconds elapsed since start.
    pub fn elapsed_ms(&self) -> u128 {
        self.epoch.elapsed().as_millis()
    }

    /// Wall-clock time at start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}
