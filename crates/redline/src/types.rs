use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

/// Approximate character width as a fraction of font size, used whenever no
/// real glyph metrics are available (extraction fallback and replacement-line
/// measurement share the same model).
pub(crate) const APPROX_CHAR_WIDTH_RATIO: f32 = 0.6;

/// Nominal line height as a multiple of font size.
pub(crate) const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// One positioned fragment of text as reported by page extraction, before
/// any grouping.
///
/// `x`/`y` are the baseline origin in PDF user space (bottom-left origin,
/// larger `y` is higher on the page). Runs are immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphRun {
    pub text: String,
    /// 0-based page index.
    pub page: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub font_size: f32,
    pub font_name: Option<String>,
}

/// A maximal run of [`GlyphRun`]s judged contiguous, treated as one logical
/// unit of editable text.
///
/// The bounding box is the min/max envelope of the constituent runs at
/// creation time. After a text replacement it is *not* recomputed from the
/// new text: replacement text is fitted into the original region, it does
/// not resize it.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    /// Constituent runs in grouping order.
    pub runs: Vec<GlyphRun>,
    /// Run texts joined with single spaces.
    pub text: String,
    pub bbox: BoundingBox,
    /// 0-based page index.
    pub page: usize,
    pub is_modified: bool,
    /// The pre-edit text, set when the block is modified.
    pub original_text: Option<String>,
}

impl TextBlock {
    /// Whether `other` occupies the same origin on the same page. This is
    /// the identity used when locating an update target inside a map.
    pub fn same_origin(&self, other: &TextBlock) -> bool {
        self.page == other.page && self.bbox.x == other.bbox.x && self.bbox.y == other.bbox.y
    }
}

/// Page dimensions in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// A single requested text substitution, as produced by an external
/// suggestion generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    /// The fragment the request wants replaced.
    pub original_text: String,
    /// The text to draw in its place.
    pub suggested_text: String,
    /// 1-indexed page number, following the request convention.
    pub page: usize,
    /// Approximate region narrowing the candidate blocks.
    pub region: BoundingBox,
}
