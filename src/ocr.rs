use crate::error::Result;
use image::RgbaImage;

/// One recognized piece of text with its bounding box within the frame,
/// in the order the engine emitted it. Only `text` is consumed downstream;
/// position and confidence ride along for debugging and future filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
    pub text: String,
    pub confidence: f32,
}

/// An OCR backend. The engine behind an implementation is initialized once
/// and reused across every call -- re-initializing per frame is far too slow.
pub trait Recognizer {
    /// Extracts text fragments from a frame. An empty vec is a valid result
    /// meaning "no legible text", not a failure.
    fn recognize(&self, frame: &RgbaImage) -> Result<Vec<Fragment>>;
}

/// Joins fragment texts in recognition order with single spaces.
///
/// An empty result maps to the empty string -- never a placeholder token.
pub fn assemble(fragments: &[Fragment]) -> String {
    fragments
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
