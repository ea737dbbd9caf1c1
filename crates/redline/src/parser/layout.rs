//! Glyph-run grouping and the document extraction pipeline.
//!
//! A page's content stream yields a flat list of positioned text fragments
//! with no structure. This module reconstructs logical blocks from them by
//! spatial proximity:
//!
//! ```text
//! document bytes -> PageTextSource -> GlyphRun[] -> TextBlock[] -> PdfTextMap
//!                     (per page)      build_text_map  group_runs_into_blocks
//! ```

use std::cmp::Ordering;

use crate::geometry::BoundingBox;
use crate::map::PdfTextMap;
use crate::parser::backend::{PageTextSource, RawTextItem};
use crate::types::{GlyphRun, PageSize, TextBlock, APPROX_CHAR_WIDTH_RATIO, LINE_HEIGHT_FACTOR};
use crate::Error;

/// Thresholds steering block grouping.
///
/// Both factors are heuristic constants, not derived from font metrics; the
/// defaults work for common single- and two-column documents but are exposed
/// here so callers can tune them for unusual layouts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupingConfig {
    /// Two runs whose baselines differ by more than this multiple of the run
    /// height start separate lines (and thus separate blocks).
    pub line_break_factor: f32,
    /// A horizontal gap wider than this multiple of the incoming run's width
    /// splits a block even inside the same line band (separate columns,
    /// distant fragments).
    pub gap_factor: f32,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            line_break_factor: 0.5,
            gap_factor: 0.5,
        }
    }
}

/// Group a flat sequence of [`GlyphRun`]s into ordered [`TextBlock`]s.
///
/// Runs are first ordered page by page, top-to-bottom, with runs inside the
/// same line band (baseline distance within `line_break_factor` of the
/// taller run) kept left-to-right. A single walk then closes the open block
/// whenever the page changes, the baseline jumps, or a horizontal gap opens
/// up, so each emitted block is a maximal contiguous group.
pub fn group_runs_into_blocks(runs: Vec<GlyphRun>, config: &GroupingConfig) -> Vec<TextBlock> {
    if runs.is_empty() {
        return Vec::new();
    }

    let mut runs = runs;
    runs.sort_by(|a, b| compare_runs(a, b, config));

    let mut blocks: Vec<TextBlock> = Vec::new();
    let mut open: Vec<GlyphRun> = Vec::new();
    let mut last_page = usize::MAX;
    let mut last_y = 0.0_f32;
    let mut last_right = 0.0_f32;

    for run in runs {
        let page_changed = run.page != last_page;
        let line_break = (run.y - last_y).abs() > run.height * config.line_break_factor;
        let horizontal_gap = run.x > last_right + run.width * config.gap_factor;

        if !open.is_empty() && (page_changed || line_break || horizontal_gap) {
            blocks.push(close_block(std::mem::take(&mut open)));
        }

        last_page = run.page;
        last_y = run.y;
        last_right = run.x + run.width;
        open.push(run);
    }

    if !open.is_empty() {
        blocks.push(close_block(open));
    }

    blocks
}

/// Stable ordering: page ascending, then top-to-bottom (larger y first in
/// PDF user space), with runs whose baselines sit within the shared line
/// band ordered left-to-right instead.
fn compare_runs(a: &GlyphRun, b: &GlyphRun, config: &GroupingConfig) -> Ordering {
    if a.page != b.page {
        return a.page.cmp(&b.page);
    }

    let band = a.height.max(b.height) * config.line_break_factor;
    if (a.y - b.y).abs() <= band {
        a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal)
    } else {
        b.y.partial_cmp(&a.y).unwrap_or(Ordering::Equal)
    }
}

/// Seal a non-empty group of runs into a block: union bounding box, texts
/// joined with single spaces.
fn close_block(runs: Vec<GlyphRun>) -> TextBlock {
    debug_assert!(!runs.is_empty(), "blocks are never built from zero runs");

    let bbox = runs
        .iter()
        .skip(1)
        .fold(BoundingBox::of_run(&runs[0]), |acc, run| {
            acc.union(&BoundingBox::of_run(run))
        });
    let text = runs
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    TextBlock {
        page: runs[0].page,
        text,
        bbox,
        runs,
        is_modified: false,
        original_text: None,
    }
}

/// Extract every page of a document into a [`PdfTextMap`].
///
/// Pages are processed strictly sequentially in page order; any page failure
/// aborts the whole extraction, so a partial map is never returned.
pub fn build_text_map(
    source: &dyn PageTextSource,
    config: &GroupingConfig,
) -> Result<PdfTextMap, Error> {
    let page_count = source.page_count();
    let mut runs: Vec<GlyphRun> = Vec::new();
    let mut pages: Vec<PageSize> = Vec::with_capacity(page_count);

    for page_number in 1..=page_count {
        let page = source.page_text(page_number)?;
        let page_index = page_number - 1;
        log::debug!(
            "page {page_number}: {} text items, {}x{} pt",
            page.items.len(),
            page.width,
            page.height
        );

        for item in page.items {
            runs.push(run_from_item(item, page_index));
        }
        pages.push(PageSize {
            width: page.width,
            height: page.height,
        });
    }

    let blocks = group_runs_into_blocks(runs, config);
    Ok(PdfTextMap::new(blocks, pages))
}

/// Turn one extractor wire item into a [`GlyphRun`]: position comes from the
/// transform's translation components, with heuristic width/height fallbacks
/// when the extractor omits real extents.
fn run_from_item(item: RawTextItem, page_index: usize) -> GlyphRun {
    let width = item.width.unwrap_or_else(|| {
        item.text.chars().count() as f32 * item.font_size * APPROX_CHAR_WIDTH_RATIO
    });
    let height = item
        .height
        .unwrap_or(item.font_size * LINE_HEIGHT_FACTOR);

    GlyphRun {
        x: item.transform[4],
        y: item.transform[5],
        width,
        height,
        page: page_index,
        font_size: item.font_size,
        font_name: item.font_name,
        text: item.text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::backend::PageText;

    fn make_run(text: &str, page: usize, x: f32, y: f32, font_size: f32) -> GlyphRun {
        GlyphRun {
            text: text.to_string(),
            page,
            x,
            y,
            width: text.chars().count() as f32 * font_size * APPROX_CHAR_WIDTH_RATIO,
            height: font_size * LINE_HEIGHT_FACTOR,
            font_size,
            font_name: None,
        }
    }

    fn group(runs: Vec<GlyphRun>) -> Vec<TextBlock> {
        group_runs_into_blocks(runs, &GroupingConfig::default())
    }

    #[test]
    fn test_empty_input_gives_empty_output() {
        assert!(group(Vec::new()).is_empty());
    }

    #[test]
    fn test_single_run_forms_single_block() {
        let blocks = group(vec![make_run("Hello", 0, 72.0, 700.0, 12.0)]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "Hello");
        assert!(!blocks[0].is_modified);
        assert!(blocks[0].original_text.is_none());
    }

    #[test]
    fn test_adjacent_runs_on_one_line_merge() {
        // y2 = 495 with height 12: baseline delta 5 < 6, and the gap of 1pt
        // is well inside half the incoming run's width.
        let a = make_run("Hello", 0, 100.0, 500.0, 10.0);
        let next_x = a.x + a.width + 1.0;
        let b = make_run("world", 0, next_x, 495.0, 10.0);
        // height fallback is font_size * 1.2 = 12.

        let blocks = group(vec![a, b]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "Hello world");
    }

    #[test]
    fn test_wide_horizontal_gap_splits_blocks() {
        let a = make_run("Hello", 0, 100.0, 500.0, 10.0);
        let b_width = "world".chars().count() as f32 * 10.0 * APPROX_CHAR_WIDTH_RATIO;
        // Gap equal to the run's own width: larger than width * 0.5.
        let b = make_run("world", 0, a.x + a.width + b_width, 500.0, 10.0);

        let blocks = group(vec![a, b]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "Hello");
        assert_eq!(blocks[1].text, "world");
    }

    #[test]
    fn test_line_band_orders_left_to_right() {
        // Same band, deliberately shuffled x order.
        let blocks = group(vec![
            make_run("c", 0, 114.0, 500.0, 10.0),
            make_run("a", 0, 100.0, 502.0, 10.0),
            make_run("b", 0, 107.0, 498.0, 10.0),
        ]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "a b c");
    }

    #[test]
    fn test_lines_order_top_to_bottom() {
        let blocks = group(vec![
            make_run("second line", 0, 72.0, 480.0, 10.0),
            make_run("first line", 0, 72.0, 500.0, 10.0),
        ]);
        // Baseline delta 20 > 6 closes the block between lines.
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "first line");
        assert_eq!(blocks[1].text, "second line");
    }

    #[test]
    fn test_page_change_always_splits() {
        let blocks = group(vec![
            make_run("page one", 0, 72.0, 700.0, 10.0),
            make_run("page two", 1, 72.0, 700.0, 10.0),
        ]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].page, 0);
        assert_eq!(blocks[1].page, 1);
    }

    #[test]
    fn test_block_bbox_is_union_of_runs() {
        let a = make_run("Hello", 0, 100.0, 500.0, 10.0);
        let b = make_run("world", 0, a.x + a.width + 1.0, 500.0, 10.0);
        let expected = BoundingBox::of_run(&a).union(&BoundingBox::of_run(&b));

        let blocks = group(vec![a, b]);
        assert_eq!(blocks[0].bbox, expected);
    }

    #[test]
    fn test_custom_config_changes_split_behavior() {
        let a = make_run("Hello", 0, 100.0, 500.0, 10.0);
        let b = make_run("world", 0, a.x + a.width + 4.0, 500.0, 10.0);

        // Default factors keep the pair together; a tiny gap factor splits it.
        assert_eq!(group(vec![a.clone(), b.clone()]).len(), 1);
        let strict = GroupingConfig {
            gap_factor: 0.1,
            ..GroupingConfig::default()
        };
        assert_eq!(group_runs_into_blocks(vec![a, b], &strict).len(), 2);
    }

    #[test]
    fn test_run_from_item_derives_position_and_fallbacks() {
        let item = RawTextItem {
            text: "abcd".to_string(),
            transform: [1.0, 0.0, 0.0, 1.0, 72.0, 640.0],
            width: None,
            height: None,
            font_size: 10.0,
            font_name: Some("Helvetica".to_string()),
        };
        let run = run_from_item(item, 2);
        assert_eq!(run.page, 2);
        assert_eq!(run.x, 72.0);
        assert_eq!(run.y, 640.0);
        assert_eq!(run.width, 4.0 * 10.0 * APPROX_CHAR_WIDTH_RATIO);
        assert_eq!(run.height, 12.0);
    }

    struct FakeSource {
        pages: Vec<PageText>,
    }

    impl PageTextSource for FakeSource {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page_text(&self, page_number: usize) -> Result<PageText, Error> {
            self.pages
                .get(page_number - 1)
                .map(|p| PageText {
                    width: p.width,
                    height: p.height,
                    items: p.items.clone(),
                })
                .ok_or(Error::PageNotFound(page_number))
        }
    }

    #[test]
    fn test_build_text_map_indexes_pages_from_zero() {
        let item = RawTextItem {
            text: "Second page text".to_string(),
            transform: [1.0, 0.0, 0.0, 1.0, 72.0, 700.0],
            width: Some(96.0),
            height: Some(12.0),
            font_size: 10.0,
            font_name: None,
        };
        let source = FakeSource {
            pages: vec![
                PageText {
                    width: 612.0,
                    height: 792.0,
                    items: Vec::new(),
                },
                PageText {
                    width: 595.0,
                    height: 842.0,
                    items: vec![item],
                },
            ],
        };

        let map = build_text_map(&source, &GroupingConfig::default()).unwrap();
        assert_eq!(map.page_count(), 2);
        assert_eq!(map.page_size(1).unwrap().height, 842.0);
        assert_eq!(map.blocks().len(), 1);
        assert_eq!(map.blocks()[0].page, 1);
        assert_eq!(map.blocks()[0].text, "Second page text");
    }
}
