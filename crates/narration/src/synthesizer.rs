//! Narration synthesis with rate-limit retries.
//!
//! A failed synthesis never fails the conversion: the caller receives
//! [`SynthesisOutcome::NoAudio`] and falls back to a silent slide.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use slidecast_common::{NarrationConfig, SlidecastResult};

use crate::backend::{SpeechBackend, SpeechError};
use crate::http::HttpSpeechBackend;

/// Result of synthesizing one piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutcome {
    /// Audio was written to this path.
    Audio(PathBuf),
    /// No audio is available; the reason is for logs only.
    NoAudio { reason: String },
}

impl SynthesisOutcome {
    pub fn audio_path(&self) -> Option<&Path> {
        match self {
            SynthesisOutcome::Audio(path) => Some(path),
            SynthesisOutcome::NoAudio { .. } => None,
        }
    }
}

/// Drives a [`SpeechBackend`] and persists its output.
pub struct NarrationSynthesizer {
    backend: Arc<dyn SpeechBackend>,
    voice: String,
    max_attempts: u32,
    retry_base_delay: Duration,
}

impl NarrationSynthesizer {
    pub fn new(backend: Arc<dyn SpeechBackend>, voice: impl Into<String>) -> Self {
        let defaults = NarrationConfig::default();
        Self {
            backend,
            voice: voice.into(),
            max_attempts: defaults.max_attempts,
            retry_base_delay: Duration::from_millis(defaults.retry_base_delay_ms),
        }
    }

    /// Build a synthesizer backed by the configured HTTP service.
    pub fn from_config(config: &NarrationConfig) -> SlidecastResult<Self> {
        let backend = HttpSpeechBackend::new(config)?;
        Ok(Self::new(Arc::new(backend), config.voice.clone())
            .with_retry_policy(config.max_attempts, Duration::from_millis(config.retry_base_delay_ms)))
    }

    /// Override the retry policy. `max_attempts` is clamped to at least 1.
    pub fn with_retry_policy(mut self, max_attempts: u32, base_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_base_delay = base_delay;
        self
    }

    /// Default voice for this synthesizer.
    pub fn voice(&self) -> &str {
        &self.voice
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Synthesize `text` into `output_path`.
    ///
    /// Rate-limited requests are retried, waiting `attempt * base_delay`
    /// before attempt `attempt + 1`. Any other backend error, or running
    /// out of attempts, yields [`SynthesisOutcome::NoAudio`].
    pub async fn synthesize(
        &self,
        text: &str,
        voice: Option<&str>,
        output_path: &Path,
    ) -> SynthesisOutcome {
        if text.trim().is_empty() {
            return SynthesisOutcome::NoAudio {
                reason: "empty text".to_string(),
            };
        }
        let voice = voice.unwrap_or(self.voice.as_str());

        for attempt in 1..=self.max_attempts {
            match self.backend.synthesize(text, voice).await {
                Ok(bytes) => return write_audio(output_path, &bytes).await,
                Err(SpeechError::RateLimited) => {
                    tracing::warn!(
                        backend = self.backend.name(),
                        attempt,
                        max_attempts = self.max_attempts,
                        "Speech backend rate limited"
                    );
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_base_delay * attempt).await;
                    }
                }
                Err(SpeechError::Failed(reason)) => {
                    tracing::warn!(backend = self.backend.name(), %reason, "Speech synthesis failed");
                    return SynthesisOutcome::NoAudio { reason };
                }
            }
        }

        SynthesisOutcome::NoAudio {
            reason: format!("rate limited after {} attempts", self.max_attempts),
        }
    }
}

async fn write_audio(output_path: &Path, bytes: &[u8]) -> SynthesisOutcome {
    if let Some(parent) = output_path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            return SynthesisOutcome::NoAudio {
                reason: format!("cannot create {}: {e}", parent.display()),
            };
        }
    }
    match tokio::fs::write(output_path, bytes).await {
        Ok(()) => {
            tracing::debug!(path = %output_path.display(), bytes = bytes.len(), "Narration audio written");
            SynthesisOutcome::Audio(output_path.to_path_buf())
        }
        Err(e) => SynthesisOutcome::NoAudio {
            reason: format!("cannot write {}: {e}", output_path.display()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Rate-limits the first `limited` calls, then succeeds.
    struct FlakyBackend {
        limited: u32,
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl SpeechBackend for FlakyBackend {
        async fn synthesize(&self, text: &str, _voice: &str) -> Result<Vec<u8>, SpeechError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.limited {
                Err(SpeechError::RateLimited)
            } else {
                Ok(text.as_bytes().to_vec())
            }
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    struct BrokenBackend;

    #[async_trait::async_trait]
    impl SpeechBackend for BrokenBackend {
        async fn synthesize(&self, _text: &str, _voice: &str) -> Result<Vec<u8>, SpeechError> {
            Err(SpeechError::Failed("HTTP 500".to_string()))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn synthesizer(backend: Arc<dyn SpeechBackend>) -> NarrationSynthesizer {
        NarrationSynthesizer::new(backend, "tongtong")
            .with_retry_policy(5, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_retries_rate_limit_then_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FlakyBackend {
            limited: 2,
            calls: AtomicU32::new(0),
        });
        let out = dir.path().join("audio").join("audio_1.wav");

        let outcome = synthesizer(backend.clone()).synthesize("hello", None, &out).await;

        assert_eq!(outcome, SynthesisOutcome::Audio(out.clone()));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert_eq!(std::fs::read(&out).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FlakyBackend {
            limited: u32::MAX,
            calls: AtomicU32::new(0),
        });
        let out = dir.path().join("audio_1.wav");

        let outcome = synthesizer(backend.clone()).synthesize("hello", None, &out).await;

        assert!(matches!(outcome, SynthesisOutcome::NoAudio { .. }));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 5);
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_other_failure_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("audio_1.wav");
        let outcome = synthesizer(Arc::new(BrokenBackend))
            .synthesize("hello", None, &out)
            .await;
        assert_eq!(
            outcome,
            SynthesisOutcome::NoAudio {
                reason: "HTTP 500".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_blank_text_skips_backend() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FlakyBackend {
            limited: 0,
            calls: AtomicU32::new(0),
        });
        let outcome = synthesizer(backend.clone())
            .synthesize("  \n", None, &dir.path().join("a.wav"))
            .await;
        assert!(outcome.audio_path().is_none());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }
}
