//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable that overrides the narration API key.
pub const TTS_API_KEY_ENV: &str = "SLIDECAST_TTS_API_KEY";

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root for per-task scratch directories.
    pub work_dir: PathBuf,

    /// Directory where finished videos are written.
    pub output_dir: PathBuf,

    /// Text-to-speech settings.
    pub narration: NarrationConfig,

    /// Per-slide duration policy.
    pub timeline: TimelineConfig,

    /// Output encoding policy.
    pub video: VideoConfig,

    /// Orchestrator settings.
    pub pipeline: PipelineConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Text-to-speech backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    /// Speech synthesis endpoint.
    pub endpoint: String,

    /// Bearer token. `SLIDECAST_TTS_API_KEY` takes precedence.
    pub api_key: Option<String>,

    /// Model identifier sent with each request.
    pub model: String,

    /// Voice used for every slide.
    pub voice: String,

    /// Audio container requested from the backend.
    pub response_format: String,

    /// Total attempts per text when the backend rate-limits.
    pub max_attempts: u32,

    /// Retry delay unit; attempt `n` waits `n * retry_base_delay_ms`.
    pub retry_base_delay_ms: u64,

    /// Per-request timeout.
    pub request_timeout_secs: u64,
}

/// Display-duration policy for slides and text segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Longest narration chunk sent to the backend, in characters.
    pub max_segment_chars: usize,

    /// Silence appended after the last narration chunk of a slide.
    pub trailing_buffer_secs: f64,

    /// Duration of a slide without measurable narration.
    pub default_duration_secs: f64,
}

/// Fixed output encoding policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Output frame rate.
    pub fps: u32,

    /// Output audio sample rate.
    pub audio_sample_rate: u32,

    /// Output audio channel count.
    pub audio_channels: u16,

    /// Keyframe interval in frames.
    pub gop: u32,

    /// x264 constant rate factor.
    pub crf: u8,

    /// x264 preset.
    pub preset: String,

    /// AAC bitrate.
    pub audio_bitrate_kbps: u32,

    /// Video frames emitted between audio flushes.
    pub audio_window_frames: u32,
}

/// Orchestrator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Width of the process-wide narration worker pool.
    pub worker_concurrency: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "slidecast=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("slidecast"),
            output_dir: dirs_default_output(),
            narration: NarrationConfig::default(),
            timeline: TimelineConfig::default(),
            video: VideoConfig::default(),
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://open.bigmodel.cn/api/paas/v4/audio/speech".to_string(),
            api_key: None,
            model: "glm-tts".to_string(),
            voice: "tongtong".to_string(),
            response_format: "wav".to_string(),
            max_attempts: 5,
            retry_base_delay_ms: 2000,
            request_timeout_secs: 120,
        }
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            max_segment_chars: 900,
            trailing_buffer_secs: 0.5,
            default_duration_secs: 3.0,
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            audio_sample_rate: 44_100,
            audio_channels: 1,
            gop: 30,
            crf: 25,
            preset: "ultrafast".to_string(),
            audio_bitrate_kbps: 128,
            audio_window_frames: 15,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_concurrency: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl NarrationConfig {
    /// API key from the environment, falling back to the config file.
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var(TTS_API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone())
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("slidecast").join("config.json")
}

/// Default directory for finished videos.
fn dirs_default_output() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("slidecast").join("videos")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_encoding_policy() {
        let config = AppConfig::default();
        assert_eq!(config.video.fps, 30);
        assert_eq!(config.video.gop, 30);
        assert_eq!(config.video.audio_sample_rate, 44_100);
        assert_eq!(config.video.audio_channels, 1);
        assert_eq!(config.timeline.max_segment_chars, 900);
        assert_eq!(config.pipeline.worker_concurrency, 5);
        assert_eq!(config.narration.max_attempts, 5);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{ "timeline": { "max_segment_chars": 400 } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.timeline.max_segment_chars, 400);
        assert!((config.timeline.default_duration_secs - 3.0).abs() < 1e-9);
        assert_eq!(config.video.fps, 30);
    }
}
