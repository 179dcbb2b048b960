use serde::{Deserialize, Serialize};

use super::detection::Rect;

/// Geometry for drawing one detection. Recomputed every frame; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationInstruction {
    /// Detection box as reported by the recognizer.
    pub box_rect: Rect,
    /// Tight bounding box of the rendered text.
    pub label_rect: Rect,
    /// Filled rectangle drawn beneath the text.
    pub background_rect: Rect,
    /// Left end of the text baseline, for renderers that position text by baseline.
    pub text_origin: (i32, i32),
    pub text: String,
    /// True only on the frame where the payload was first seen.
    pub is_new: bool,
}
