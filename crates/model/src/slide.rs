//! Rendered slides and the narration text attached to them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One rendered page of the source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    /// 1-based position in the deck; the ordering key for everything downstream.
    pub page_index: u32,

    /// Rendered page image. Owned by the pipeline and deleted after composition.
    pub image_path: PathBuf,

    /// Narration source text extracted from the page.
    pub text: String,
}

impl Slide {
    pub fn new(page_index: u32, image_path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            page_index,
            image_path: image_path.into(),
            text: text.into(),
        }
    }

    /// Whether the page carries any narratable text.
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Text length in characters.
    pub fn text_chars(&self) -> usize {
        self.text.chars().count()
    }
}

/// A bounded-length chunk of a slide's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSegment {
    /// Page the segment belongs to.
    pub page_index: u32,

    /// 0-based position within the page.
    pub segment_index: u32,

    /// Segment text.
    pub text: String,
}

impl TextSegment {
    /// Number the raw chunks of one page in order.
    pub fn from_chunks(page_index: u32, chunks: Vec<String>) -> Vec<Self> {
        chunks
            .into_iter()
            .enumerate()
            .map(|(i, text)| Self {
                page_index,
                segment_index: i as u32,
                text,
            })
            .collect()
    }
}
