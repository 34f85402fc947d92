//! Display units: the atomic items scheduled onto the output timeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One (image, optional narration, duration) entry on the output timeline.
///
/// All units produced from the same slide share the slide's image path.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayUnit {
    /// Page this unit came from.
    pub page_index: u32,

    /// Position among the page's text segments (0 when the page was not split).
    pub segment_index: u32,

    /// Slide image, shared by every unit of the page.
    pub image_path: Arc<Path>,

    /// Narration audio created for this unit alone.
    pub audio_path: Option<PathBuf>,

    /// Time the image stays on screen. Always > 0.
    pub duration_secs: f64,
}

impl DisplayUnit {
    /// A unit without narration.
    pub fn silent(
        page_index: u32,
        segment_index: u32,
        image_path: Arc<Path>,
        duration_secs: f64,
    ) -> Self {
        Self {
            page_index,
            segment_index,
            image_path,
            audio_path: None,
            duration_secs,
        }
    }

    /// A unit with a narration track.
    pub fn narrated(
        page_index: u32,
        segment_index: u32,
        image_path: Arc<Path>,
        audio_path: PathBuf,
        duration_secs: f64,
    ) -> Self {
        Self {
            page_index,
            segment_index,
            image_path,
            audio_path: Some(audio_path),
            duration_secs,
        }
    }

    /// Composition order key.
    pub fn order_key(&self) -> (u32, u32) {
        (self.page_index, self.segment_index)
    }

    /// Whether the unit carries narration.
    pub fn has_audio(&self) -> bool {
        self.audio_path.is_some()
    }
}

/// Sort units into composition order: by page, then by segment.
pub fn sort_units(units: &mut [DisplayUnit]) {
    units.sort_by_key(DisplayUnit::order_key);
}
