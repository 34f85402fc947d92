//! Speech synthesis backend abstraction.

/// Failure reported by a speech backend for a single request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpeechError {
    /// The service asked us to slow down. The caller may retry.
    #[error("speech backend rate limited")]
    RateLimited,

    /// Any other failure. Not retried.
    #[error("speech synthesis failed: {0}")]
    Failed(String),
}

/// A text-to-speech service.
///
/// Implementations must be shareable across the narration worker pool.
#[async_trait::async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Synthesize `text` with `voice`, returning encoded audio bytes (WAV).
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, SpeechError>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}
