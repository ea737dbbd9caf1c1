//! The whole-document index of text blocks.
//!
//! A [`PdfTextMap`] is a persistent value: edits never mutate a map in
//! place, they produce a new map that shares every untouched block with its
//! predecessor. A caller can therefore keep the extraction-time map around
//! (for "reset to original") while holding any number of edited descendants,
//! at the cost of one shallow vector per edit.

use std::sync::Arc;

use crate::types::{PageSize, TextBlock};

/// Ordered collection of [`TextBlock`]s plus per-page dimensions.
///
/// Block order is extraction order, which follows page order but is not
/// guaranteed to be reading order within a page. The map holds no reference
/// to the document bytes it was extracted from; regeneration always takes
/// the bytes as an explicit input.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfTextMap {
    blocks: Vec<Arc<TextBlock>>,
    pages: Arc<[PageSize]>,
}

impl PdfTextMap {
    pub fn new(blocks: Vec<TextBlock>, pages: Vec<PageSize>) -> Self {
        Self {
            blocks: blocks.into_iter().map(Arc::new).collect(),
            pages: pages.into(),
        }
    }

    /// All blocks in extraction order.
    pub fn blocks(&self) -> &[Arc<TextBlock>] {
        &self.blocks
    }

    /// Blocks on one 0-indexed page, in extraction order.
    pub fn blocks_on_page(&self, page_index: usize) -> impl Iterator<Item = &Arc<TextBlock>> {
        self.blocks.iter().filter(move |b| b.page == page_index)
    }

    /// Blocks whose text has been replaced since extraction.
    pub fn modified_blocks(&self) -> impl Iterator<Item = &Arc<TextBlock>> {
        self.blocks.iter().filter(|b| b.is_modified)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Dimensions of one 0-indexed page.
    pub fn page_size(&self, page_index: usize) -> Option<&PageSize> {
        self.pages.get(page_index)
    }

    /// Produce a new map with `target`'s text replaced.
    ///
    /// The target is located by exact `(page, x, y)` origin equality, not by
    /// identity; if two blocks coincide on the same origin the first wins.
    /// When no block matches, the update is a logged no-op and the returned
    /// map equals `self`; callers that need to distinguish success should
    /// compare the two maps before assuming the edit landed.
    ///
    /// The replaced block keeps its bounding box, page, and constituent runs
    /// unchanged: replacement text is fitted into the original region later,
    /// at re-flow time.
    pub fn replace_text_in_block(&self, target: &TextBlock, new_text: &str) -> PdfTextMap {
        let Some(index) = self.blocks.iter().position(|b| b.same_origin(target)) else {
            log::warn!(
                "no block at ({}, {}) on page {}; text replacement skipped",
                target.bbox.x,
                target.bbox.y,
                target.page
            );
            return self.clone();
        };

        let previous = &self.blocks[index];
        let replaced = TextBlock {
            runs: previous.runs.clone(),
            text: new_text.to_string(),
            bbox: previous.bbox,
            page: previous.page,
            is_modified: true,
            original_text: Some(previous.text.clone()),
        };

        let mut blocks = self.blocks.clone();
        blocks[index] = Arc::new(replaced);
        PdfTextMap {
            blocks,
            pages: Arc::clone(&self.pages),
        }
    }
}
