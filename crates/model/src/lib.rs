//! Slidecast Data Model
//!
//! Defines the data contracts shared by every pipeline stage:
//! - **Slide:** A rendered page image with its extracted narration text
//! - **TextSegment:** A bounded-length chunk of a slide's text
//! - **DisplayUnit:** An (image, optional audio, duration) entry on the output timeline
//! - **Task:** The externally visible state of one conversion request

pub mod slide;
pub mod task;
pub mod unit;

pub use slide::*;
pub use task::*;
pub use unit::*;
