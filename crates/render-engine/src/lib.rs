//! Slidecast Render Engine
//!
//! Offline composition of slide images and narration into a single MP4.
//!
//! # Pipeline Architecture
//!
//! ```text
//! DisplayUnit[] ──┐
//!                 ├── Load + letterbox image (even canvas)
//!                 │         │
//!                 │         ├── N frames @ 30 fps ─── rawvideo ──► ffmpeg (H.264)
//!                 │         │                                          │
//!                 └── Decode narration (s16, 44.1 kHz mono)            │
//!                           │                                          │
//!                           └── 1024-sample packets ──► narration.wav  │
//!                                                             │        │
//!                                                             ▼        ▼
//!                                                          mux (AAC, +faststart)
//!                                                                 │
//!                                                                 ▼
//!                                                            video.mp4
//! ```

pub mod audio;
pub mod compose;
pub mod compositor;
pub mod encoder;

pub use compose::{ComposeError, ComposeProgress, ComposeReport, Composer, ProgressCallback};
pub use compositor::CanvasSize;
pub use encoder::{command_exists, EncodingSettings, FfmpegSink, MediaSink, SinkFactory, SinkSpec};
