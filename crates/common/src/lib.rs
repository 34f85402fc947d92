//! Slidecast Common Utilities
//!
//! Shared infrastructure for all Slidecast crates:
//! - Error types and result aliases
//! - Media clock and timestamp conversions for stream synchronization
//! - 16-bit PCM WAV helpers (`hound`)
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod wav;

pub use clock::*;
pub use config::*;
pub use error::*;
