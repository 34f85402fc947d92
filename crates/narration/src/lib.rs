//! Slidecast Narration
//!
//! Turns slide text into speech:
//! - **Backend:** pluggable text-to-speech service ([`SpeechBackend`])
//! - **HTTP:** the hosted speech API used in production
//! - **Synthesizer:** retry policy and persistence of the returned audio
//! - **Probe:** duration measurement for the generated files

pub mod backend;
pub mod http;
pub mod probe;
pub mod synthesizer;

pub use backend::{SpeechBackend, SpeechError};
pub use http::HttpSpeechBackend;
pub use probe::probe_duration;
pub use synthesizer::{NarrationSynthesizer, SynthesisOutcome};
