//! Word wrapping of replacement text into a block's original region.

use crate::geometry::BoundingBox;
use crate::types::{APPROX_CHAR_WIDTH_RATIO, LINE_HEIGHT_FACTOR};

/// Extra vertical space after each paragraph, in line heights.
const PARAGRAPH_SPACING_FACTOR: f32 = 0.5;

/// One laid-out line of replacement text with its baseline position in page
/// coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

/// Estimated rendered width of `text` at `font_size`, using the shared
/// approximate character-width model.
pub fn estimate_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * APPROX_CHAR_WIDTH_RATIO
}

/// Lay `text` out inside `bbox` at a fixed font size.
///
/// Paragraphs are split on explicit newlines. Within a paragraph, words
/// accumulate greedily while the estimated line width stays within the box;
/// a word that alone exceeds the box width is emitted on its own line at
/// full width. Lines advance by `font_size * 1.2`, with an extra half line
/// after each paragraph; empty paragraphs keep their blank-line spacing.
///
/// The layout is not clipped: text taller than the box simply continues
/// below it, and over-wide single words extend past its right edge.
pub fn layout_text(text: &str, bbox: &BoundingBox, font_size: f32) -> Vec<PlacedLine> {
    let line_height = font_size * LINE_HEIGHT_FACTOR;
    let mut lines: Vec<PlacedLine> = Vec::new();
    // Distance from the top of the box down to the current line slot.
    let mut offset = 0.0_f32;

    let place = |text: String, offset: f32| PlacedLine {
        text,
        x: bbox.x,
        y: bbox.top() - font_size - offset,
    };

    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            offset += line_height;
            continue;
        }

        let mut current = String::new();
        for word in words {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };

            if current.is_empty() || estimate_text_width(&candidate, font_size) <= bbox.width {
                current = candidate;
            } else {
                lines.push(place(current, offset));
                offset += line_height;
                current = word.to_string();
            }
        }
        if !current.is_empty() {
            lines.push(place(current, offset));
            offset += line_height;
        }

        offset += line_height * PARAGRAPH_SPACING_FACTOR;
    }

    lines
}
