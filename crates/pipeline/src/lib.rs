//! Slidecast Pipeline
//!
//! Orchestrates a conversion from source document to narrated video and
//! tracks every request as a task.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    SlidecastService                      │
//! │   submit ──► TaskRegistry ◄── get_status / get_result    │
//! │                  ▲                                       │
//! │                  │ progress                              │
//! │  ┌───────────────┴──────────────────────────────────┐    │
//! │  │               ConversionPipeline                 │    │
//! │  │  DocumentRenderer ─► UnitWorkerPool ─► Composer  │    │
//! │  │  (pdf, text,         (narration,       (mp4)     │    │
//! │  │   page images)        timeline)                  │    │
//! │  └──────────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod document;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod registry;
pub mod service;
pub mod workspace;

pub use document::{check_tools, DocumentRenderer, OfficeRenderer};
pub use pipeline::{ConversionOutput, ConversionPipeline};
pub use pool::UnitWorkerPool;
pub use progress::{ProgressSink, RegistryProgress};
pub use registry::TaskRegistry;
pub use service::{ResultError, SlidecastService};
pub use workspace::TaskWorkspace;
