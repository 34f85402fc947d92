//! HTTP speech backend.
//!
//! Posts `{model, input, voice, response_format}` as JSON with a bearer
//! token and expects the audio file as the response body.

use std::time::Duration;

use serde::Serialize;
use slidecast_common::{NarrationConfig, SlidecastError, SlidecastResult};

use crate::backend::{SpeechBackend, SpeechError};

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

/// Remote text-to-speech service reached over HTTPS.
pub struct HttpSpeechBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    response_format: String,
}

impl HttpSpeechBackend {
    /// Build a backend from configuration. Fails if no API key is available.
    pub fn new(config: &NarrationConfig) -> SlidecastResult<Self> {
        let api_key = config.resolved_api_key().ok_or_else(|| {
            SlidecastError::config(format!(
                "no speech API key configured (set {})",
                slidecast_common::TTS_API_KEY_ENV
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SlidecastError::narration(format!("HTTP client init failed: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            response_format: config.response_format.clone(),
        })
    }
}

#[async_trait::async_trait]
impl SpeechBackend for HttpSpeechBackend {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, SpeechError> {
        let body = SpeechRequest {
            model: &self.model,
            input: text,
            voice,
            response_format: &self.response_format,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SpeechError::Failed(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SpeechError::RateLimited);
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SpeechError::Failed(format!("HTTP {status}: {detail}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SpeechError::Failed(e.to_string()))?;
        if bytes.is_empty() {
            return Err(SpeechError::Failed("empty response body".to_string()));
        }
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &str {
        "http"
    }
}
