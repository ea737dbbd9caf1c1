//! Text-block reconstruction and re-flow editing for fixed-layout PDFs.
//!
//! PDF content streams carry no semantic structure, only positioned glyph
//! runs. This crate recovers editable blocks from those runs by spatial
//! clustering, matches them against externally supplied edit requests with
//! approximate string matching, and re-renders edited pages by erasing the
//! original glyphs and word-wrapping the replacement text into the same
//! region.
//!
//! The typical flow:
//!
//! ```no_run
//! use redline::{EditRequest, EditSession, BoundingBox};
//!
//! # fn main() -> Result<(), redline::Error> {
//! let bytes = std::fs::read("resume.pdf")?;
//! let mut session = EditSession::from_bytes(&bytes)?;
//!
//! let outcome = session.apply(&EditRequest {
//!     original_text: "Managed a small team".into(),
//!     suggested_text: "Led a team of five engineers".into(),
//!     page: 1,
//!     region: BoundingBox::new(72.0, 500.0, 400.0, 48.0),
//! });
//! println!("edit outcome: {outcome:?}");
//!
//! let edited = session.regenerate(&bytes)?;
//! std::fs::write("resume-edited.pdf", edited)?;
//! # Ok(())
//! # }
//! ```

pub mod geometry;
pub mod locate;
pub mod map;
pub mod matching;
pub mod parser;
pub mod render;
pub mod types;

pub use geometry::BoundingBox;
pub use locate::{find_block_to_replace, LocatedBlock};
pub use map::PdfTextMap;
pub use matching::{fuzzy_match, jaccard_similarity};
pub use parser::backend::{LopdfTextSource, PageText, PageTextSource, RawTextItem};
pub use parser::layout::{build_text_map, group_runs_into_blocks, GroupingConfig};
pub use render::reflow::{regenerate, DocumentSink, LopdfSink};
pub use types::{EditRequest, GlyphRun, PageSize, TextBlock};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("Page not found: {0}")]
    PageNotFound(usize),
    #[error("Document regeneration error: {0}")]
    Regenerate(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// How an edit request landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// The replacement was applied to a block whose text fuzzy-matched the
    /// request.
    Matched,
    /// No overlapping block's text matched; the first block overlapping the
    /// requested region was rewritten as a best-effort placement.
    Fallback,
    /// Nothing overlapped the requested region; the map is unchanged.
    NotFound,
}

/// An editing session over one loaded document.
///
/// Holds the extraction-time text map alongside the current, possibly
/// edited, map. Maps are persistent values sharing untouched blocks, so
/// keeping both costs one shallow vector and [`reset`](EditSession::reset)
/// is free of re-parsing. The session holds no reference to the document
/// bytes; [`regenerate`](EditSession::regenerate) takes them explicitly.
///
/// Sessions process one request at a time; parser state acquired while
/// loading is released when the session is dropped or replaced.
pub struct EditSession {
    original: PdfTextMap,
    current: PdfTextMap,
}

impl EditSession {
    /// Extract a document with the bundled lopdf extractor and default
    /// grouping thresholds.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Self::from_bytes_with(bytes, &GroupingConfig::default())
    }

    /// Extract a document with custom grouping thresholds.
    pub fn from_bytes_with(bytes: &[u8], config: &GroupingConfig) -> Result<Self, Error> {
        let source = LopdfTextSource::load_bytes(bytes)?;
        Self::from_source(&source, config)
    }

    /// Build a session from any page text source.
    pub fn from_source(
        source: &dyn PageTextSource,
        config: &GroupingConfig,
    ) -> Result<Self, Error> {
        let map = build_text_map(source, config)?;
        Ok(Self {
            original: map.clone(),
            current: map,
        })
    }

    /// The current text map, including any applied edits.
    pub fn text_map(&self) -> &PdfTextMap {
        &self.current
    }

    /// Apply one edit request against the current map.
    ///
    /// A request that finds no overlapping block leaves the map untouched
    /// and reports [`EditOutcome::NotFound`]; earlier edits stay intact, so
    /// a batch can keep going past individual misses.
    pub fn apply(&mut self, edit: &EditRequest) -> EditOutcome {
        let page_index = edit.page.saturating_sub(1);
        match find_block_to_replace(&self.current, &edit.original_text, &edit.region, page_index) {
            LocatedBlock::Matched(block) => {
                self.current = self
                    .current
                    .replace_text_in_block(&block, &edit.suggested_text);
                EditOutcome::Matched
            }
            LocatedBlock::Fallback(block) => {
                self.current = self
                    .current
                    .replace_text_in_block(&block, &edit.suggested_text);
                EditOutcome::Fallback
            }
            LocatedBlock::NotFound => EditOutcome::NotFound,
        }
    }

    /// Discard all edits, restoring the extraction-time map.
    pub fn reset(&mut self) {
        self.current = self.original.clone();
    }

    /// Render the current map against the given document bytes.
    pub fn regenerate(&self, bytes: &[u8]) -> Result<Vec<u8>, Error> {
        render::reflow::regenerate(bytes, &self.current)
    }
}

/// Extract the text map from PDF bytes with the bundled lopdf extractor.
pub fn extract(bytes: &[u8]) -> Result<PdfTextMap, Error> {
    extract_with(bytes, &GroupingConfig::default())
}

/// Extract the text map with custom grouping thresholds.
pub fn extract_with(bytes: &[u8], config: &GroupingConfig) -> Result<PdfTextMap, Error> {
    let source = LopdfTextSource::load_bytes(bytes)?;
    build_text_map(&source, config)
}
