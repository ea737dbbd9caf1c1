//! Finding the block an edit request refers to.

use std::sync::Arc;

use crate::geometry::BoundingBox;
use crate::map::PdfTextMap;
use crate::matching::fuzzy_match;
use crate::types::TextBlock;

/// Outcome of a block lookup.
///
/// The distinction between [`Matched`](LocatedBlock::Matched) and
/// [`Fallback`](LocatedBlock::Fallback) matters: a fallback block merely
/// overlapped the requested region without its text matching, so callers
/// should treat any placement derived from it as approximate.
#[derive(Debug, Clone, PartialEq)]
pub enum LocatedBlock {
    /// An overlapping block whose text fuzzy-matched the requested fragment.
    Matched(Arc<TextBlock>),
    /// No overlapping block matched the text; this is the first overlapping
    /// block, returned as a best-effort placement.
    Fallback(Arc<TextBlock>),
    /// Nothing overlapped the requested region. Callers decide their own
    /// default-position strategy.
    NotFound,
}

impl LocatedBlock {
    /// The located block, if any.
    pub fn block(&self) -> Option<&Arc<TextBlock>> {
        match self {
            LocatedBlock::Matched(b) | LocatedBlock::Fallback(b) => Some(b),
            LocatedBlock::NotFound => None,
        }
    }

    /// True only for a text-confirmed match.
    pub fn is_confident(&self) -> bool {
        matches!(self, LocatedBlock::Matched(_))
    }
}

/// Find the block most likely holding `original_text` near `region` on the
/// given 0-indexed page.
///
/// Candidates are the page's blocks whose bounding boxes have positive-area
/// intersection with `region`. The first candidate (in extraction order)
/// whose text fuzzy-matches wins; with no textual match the first candidate
/// is returned as a fallback.
pub fn find_block_to_replace(
    map: &PdfTextMap,
    original_text: &str,
    region: &BoundingBox,
    page_index: usize,
) -> LocatedBlock {
    let overlapping: Vec<&Arc<TextBlock>> = map
        .blocks_on_page(page_index)
        .filter(|b| b.bbox.overlaps(region))
        .collect();

    if overlapping.is_empty() {
        return LocatedBlock::NotFound;
    }

    for block in &overlapping {
        if fuzzy_match(&block.text, original_text) {
            return LocatedBlock::Matched(Arc::clone(block));
        }
    }

    log::debug!(
        "no overlapping block on page {page_index} matched the requested text; \
         using the first overlapping block"
    );
    LocatedBlock::Fallback(Arc::clone(overlapping[0]))
}
