//! Slidecast Processing Core
//!
//! Decides what appears on the output timeline and for how long:
//! - **Segmentation:** Split long narration into backend-sized chunks at natural boundaries
//! - **Timeline:** Turn each slide into ordered display units with narration-driven durations
//!
//! Segmentation is pure computation. Timeline construction performs the
//! narration calls for its slide but shares no state across slides.

pub mod segment;
pub mod timeline;

pub use segment::segment_text;
pub use timeline::SlideTimelineBuilder;
