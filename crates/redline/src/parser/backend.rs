//! The page-text-extraction boundary and its bundled lopdf implementation.
//!
//! The core never talks to a PDF library directly for extraction: it
//! consumes the narrow [`PageTextSource`] trait, which yields per-page
//! viewport dimensions and positioned raw text items. [`LopdfTextSource`] is
//! the default implementation, driving a simplified PDF text-rendering state
//! machine over each page's content stream.

use std::collections::BTreeMap;

use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};

use crate::render::cleanup::cleanup_text;
use crate::types::APPROX_CHAR_WIDTH_RATIO;
use crate::Error;

// ---------------------------------------------------------------------------
// Wire format and trait
// ---------------------------------------------------------------------------

/// One positioned text fragment as reported by an extractor, before the
/// pipeline turns it into a glyph run.
///
/// The position is the translation `(e, f)` of `transform`
/// (`[a, b, c, d, e, f]`). `width`/`height` may be omitted, in which case the
/// consumer falls back to heuristic extents derived from `font_size`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTextItem {
    pub text: String,
    pub transform: [f32; 6],
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub font_size: f32,
    pub font_name: Option<String>,
}

/// Everything an extractor reports for one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub width: f32,
    pub height: f32,
    pub items: Vec<RawTextItem>,
}

/// Capability interface over a page text extractor.
///
/// Implementations are free to be backed by anything that can enumerate
/// positioned text; the rest of the crate depends only on this trait, so
/// tests can substitute fakes.
pub trait PageTextSource {
    fn page_count(&self) -> usize;

    /// Extract one page. Pages are addressed 1-based, following the
    /// extractor convention; the pipeline converts to 0-based indices.
    fn page_text(&self, page_number: usize) -> Result<PageText, Error>;
}

// ---------------------------------------------------------------------------
// Shared decoding helpers
// ---------------------------------------------------------------------------

/// Extract an `f32` from a numeric content-stream operand.
pub(crate) fn operand_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}

/// Best-effort decoding of raw PDF string bytes.
///
/// Tries, in order: UTF-16BE with BOM (`\xFE\xFF` prefix), valid UTF-8, and
/// finally Latin-1 with each byte mapped to its code point.
pub(crate) fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let code_units: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter(|chunk| chunk.len() == 2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        return String::from_utf16_lossy(&code_units);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    bytes.iter().map(|&b| b as char).collect()
}

// ---------------------------------------------------------------------------
// Text-state machine
// ---------------------------------------------------------------------------

const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Fraction of a nominal character advance a TJ kerning displacement must
/// exceed before it is treated as an inter-word gap.
const KERN_GAP_FACTOR: f32 = 0.3;

/// Mutable text state tracked while walking a page's content stream.
#[derive(Debug, Clone)]
struct TextCursor {
    /// Resource key of the current font (the `/F1`-style name).
    font_key: Vec<u8>,
    font_size: f32,
    /// Current text matrix `[a, b, c, d, e, f]`.
    text_matrix: [f32; 6],
    /// Text line matrix, set by `BT`/`Tm` and advanced by `Td`/`TD`/`T*`.
    line_matrix: [f32; 6],
    /// Leading (`TL`), consumed by `T*`, `'` and `"`.
    leading: f32,
    char_spacing: f32,
    word_spacing: f32,
    /// Horizontal scaling as a fraction (`Tz` operand / 100).
    horiz_scale: f32,
    /// Text rise (`Ts`), added to the emitted baseline.
    rise: f32,
}

impl Default for TextCursor {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            leading: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horiz_scale: 1.0,
            rise: 0.0,
        }
    }
}

impl TextCursor {
    fn begin_text(&mut self) {
        self.text_matrix = IDENTITY_MATRIX;
        self.line_matrix = IDENTITY_MATRIX;
    }

    fn set_matrix(&mut self, m: [f32; 6]) {
        self.text_matrix = m;
        self.line_matrix = m;
    }

    /// Translate the line matrix by `(tx, ty)` and reset the text matrix to
    /// it (the `Td` operator).
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let e = self.line_matrix[0] * tx + self.line_matrix[2] * ty + self.line_matrix[4];
        let f = self.line_matrix[1] * tx + self.line_matrix[3] * ty + self.line_matrix[5];
        self.line_matrix[4] = e;
        self.line_matrix[5] = f;
        self.text_matrix = self.line_matrix;
    }

    /// Advance the text matrix horizontally by `dx` text-space units.
    fn advance(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    /// Nominal advance of one character under the current state. Real glyph
    /// widths are not available without font programs, so this uses the
    /// shared approximate ratio.
    fn char_advance(&self) -> f32 {
        self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale
    }

    /// Advance past `text` as if it had been rendered, honoring character
    /// and word spacing.
    fn advance_over(&mut self, text: &str) {
        let mut dx = 0.0;
        for ch in text.chars() {
            dx += self.char_advance() + self.char_spacing;
            if ch == ' ' {
                dx += self.word_spacing;
            }
        }
        self.advance(dx);
    }

    /// Rendered font size accounting for the text matrix vertical scale.
    fn effective_font_size(&self) -> f32 {
        let scale = (self.text_matrix[1].powi(2) + self.text_matrix[3].powi(2)).sqrt();
        (self.font_size * scale).abs()
    }

    /// Transform snapshot at a captured origin, with text rise applied to
    /// the baseline.
    fn transform_at(&self, origin: (f32, f32)) -> [f32; 6] {
        [
            self.text_matrix[0],
            self.text_matrix[1],
            self.text_matrix[2],
            self.text_matrix[3],
            origin.0,
            origin.1 + self.rise,
        ]
    }

    fn origin(&self) -> (f32, f32) {
        (self.text_matrix[4], self.text_matrix[5])
    }
}

// ---------------------------------------------------------------------------
// LopdfTextSource
// ---------------------------------------------------------------------------

/// Per-font metadata pulled from a page's resource dictionary.
#[derive(Debug, Clone, Default)]
struct FontMeta {
    base_name: Option<String>,
    encoding: Option<String>,
}

/// [`PageTextSource`] backed by [`lopdf::Document`].
pub struct LopdfTextSource {
    doc: Document,
}

impl LopdfTextSource {
    /// Parse a PDF from an in-memory byte slice. The slice is only read;
    /// encrypted documents are rejected up front.
    pub fn load_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let doc = Document::load_mem(bytes).map_err(|e| Error::Parse(e.to_string()))?;
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }
        Ok(Self { doc })
    }

    fn pages(&self) -> BTreeMap<u32, ObjectId> {
        self.doc.get_pages()
    }

    /// Extract page dimensions `(width, height)` from the MediaBox, walking
    /// up the page tree when the page inherits it.
    fn page_dimensions(&self, page_id: ObjectId) -> Result<(f32, f32), Error> {
        let page_dict = self
            .doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| Error::Parse(format!("page object is not a dictionary: {e}")))?;

        let media_box = self
            .find_media_box(page_dict)
            .ok_or_else(|| Error::Parse("MediaBox not found for page".into()))?;
        if media_box.len() < 4 {
            return Err(Error::Parse(format!(
                "MediaBox has {} elements, expected 4",
                media_box.len()
            )));
        }

        // MediaBox is [llx, lly, urx, ury].
        Ok((media_box[2] - media_box[0], media_box[3] - media_box[1]))
    }

    fn find_media_box(&self, dict: &lopdf::Dictionary) -> Option<Vec<f32>> {
        if let Ok(obj) = dict.get(b"MediaBox") {
            let resolved = match obj {
                Object::Reference(id) => self.doc.get_object(*id).ok()?,
                other => other,
            };
            if let Ok(arr) = resolved.as_array() {
                return Some(arr.iter().filter_map(operand_number).collect());
            }
        }

        // Recurse into Parent.
        let parent_id = dict.get(b"Parent").ok()?.as_reference().ok()?;
        let parent = self.doc.get_object(parent_id).ok()?.as_dict().ok()?;
        self.find_media_box(parent)
    }

    /// Collect base-font names and encodings for every font the page
    /// references, keyed by resource name.
    fn page_font_meta(&self, page_id: ObjectId) -> BTreeMap<Vec<u8>, FontMeta> {
        let mut meta = BTreeMap::new();
        let Ok(fonts) = self.doc.get_page_fonts(page_id) else {
            return meta;
        };

        for (key, dict) in &fonts {
            let base_name = dict
                .get(b"BaseFont")
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).into_owned());
            let encoding = dict.get(b"Encoding").ok().and_then(|o| match o {
                Object::Name(n) => Some(String::from_utf8_lossy(n).into_owned()),
                _ => None,
            });
            meta.insert(
                key.clone(),
                FontMeta {
                    base_name,
                    encoding,
                },
            );
        }

        meta
    }

    /// Decode raw string bytes from a text-showing operator, using the
    /// current font's declared encoding as a hint.
    fn decode_string(&self, fonts: &BTreeMap<Vec<u8>, FontMeta>, font_key: &[u8], bytes: &[u8]) -> String {
        if let Some(meta) = fonts.get(font_key) {
            // Identity-encoded composite fonts typically carry 2-byte codes
            // that map to Unicode; try UTF-16BE first.
            let is_identity = meta
                .encoding
                .as_deref()
                .is_some_and(|e| e.contains("Identity"));
            if is_identity && bytes.len() >= 2 && bytes.len() % 2 == 0 {
                let code_units: Vec<u16> = bytes
                    .chunks(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                let decoded = String::from_utf16_lossy(&code_units);
                if !decoded.is_empty() && !decoded.chars().all(|c| c == '\u{FFFD}' || c == '\0') {
                    return decoded;
                }
            }
        }

        decode_text_simple(bytes)
    }

    /// Walk one page's content stream and emit raw text items.
    fn extract_items(&self, page_id: ObjectId) -> Result<Vec<RawTextItem>, Error> {
        let raw = self
            .doc
            .get_page_content(page_id)
            .map_err(|e| Error::Parse(format!("cannot read page content: {e}")))?;
        let content = Content::decode(&raw)
            .map_err(|e| Error::Parse(format!("content stream decode error: {e}")))?;
        let fonts = self.page_font_meta(page_id);

        let mut cursor = TextCursor::default();
        let mut font_name: Option<String> = None;
        let mut items: Vec<RawTextItem> = Vec::new();

        for op in &content.operations {
            match op.operator.as_str() {
                "BT" => cursor.begin_text(),
                "ET" => {
                    // Font state is kept across text objects; some producers
                    // rely on a Tf issued in an earlier object.
                }

                "Tf" => {
                    if op.operands.len() >= 2 {
                        if let Object::Name(key) = &op.operands[0] {
                            cursor.font_key = key.clone();
                            font_name = fonts
                                .get(key)
                                .and_then(|m| m.base_name.clone())
                                .or_else(|| Some(String::from_utf8_lossy(key).into_owned()));
                        }
                        if let Some(size) = operand_number(&op.operands[1]) {
                            cursor.font_size = size;
                        }
                    }
                }

                "Tm" => {
                    let vals: Vec<f32> = op
                        .operands
                        .iter()
                        .take(6)
                        .filter_map(operand_number)
                        .collect();
                    if vals.len() == 6 {
                        cursor.set_matrix([vals[0], vals[1], vals[2], vals[3], vals[4], vals[5]]);
                    }
                }
                "Td" => {
                    if op.operands.len() >= 2 {
                        let tx = operand_number(&op.operands[0]).unwrap_or(0.0);
                        let ty = operand_number(&op.operands[1]).unwrap_or(0.0);
                        cursor.translate_line(tx, ty);
                    }
                }
                "TD" => {
                    // Equivalent to: -ty TL; tx ty Td.
                    if op.operands.len() >= 2 {
                        let tx = operand_number(&op.operands[0]).unwrap_or(0.0);
                        let ty = operand_number(&op.operands[1]).unwrap_or(0.0);
                        cursor.leading = -ty;
                        cursor.translate_line(tx, ty);
                    }
                }
                "T*" => cursor.translate_line(0.0, -cursor.leading),
                "TL" => {
                    if let Some(v) = op.operands.first().and_then(operand_number) {
                        cursor.leading = v;
                    }
                }

                "Tc" => {
                    if let Some(v) = op.operands.first().and_then(operand_number) {
                        cursor.char_spacing = v;
                    }
                }
                "Tw" => {
                    if let Some(v) = op.operands.first().and_then(operand_number) {
                        cursor.word_spacing = v;
                    }
                }
                "Tz" => {
                    if let Some(v) = op.operands.first().and_then(operand_number) {
                        cursor.horiz_scale = v / 100.0;
                    }
                }
                "Ts" => {
                    if let Some(v) = op.operands.first().and_then(operand_number) {
                        cursor.rise = v;
                    }
                }

                "Tj" => {
                    if let Some(operand) = op.operands.first() {
                        self.emit_string(operand, &fonts, &mut cursor, &font_name, &mut items);
                    }
                }
                "'" => {
                    cursor.translate_line(0.0, -cursor.leading);
                    if let Some(operand) = op.operands.first() {
                        self.emit_string(operand, &fonts, &mut cursor, &font_name, &mut items);
                    }
                }
                "\"" => {
                    // aw ac string: set Tw and Tc, move to the next line,
                    // then show.
                    if op.operands.len() >= 3 {
                        if let Some(aw) = operand_number(&op.operands[0]) {
                            cursor.word_spacing = aw;
                        }
                        if let Some(ac) = operand_number(&op.operands[1]) {
                            cursor.char_spacing = ac;
                        }
                        cursor.translate_line(0.0, -cursor.leading);
                        self.emit_string(&op.operands[2], &fonts, &mut cursor, &font_name, &mut items);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(elements)) = op.operands.first() {
                        self.emit_kerned_array(elements, &fonts, &mut cursor, &font_name, &mut items);
                    }
                }

                _ => { /* non-text operators are irrelevant here */ }
            }
        }

        Ok(items)
    }

    /// Emit one item for a `Tj`/`'`/`"` string operand and advance the
    /// cursor past it.
    fn emit_string(
        &self,
        operand: &Object,
        fonts: &BTreeMap<Vec<u8>, FontMeta>,
        cursor: &mut TextCursor,
        font_name: &Option<String>,
        items: &mut Vec<RawTextItem>,
    ) {
        let Object::String(bytes, _) = operand else {
            return;
        };
        let text = cleanup_text(&self.decode_string(fonts, &cursor.font_key, bytes));
        if text.is_empty() {
            return;
        }

        let origin = cursor.origin();
        let width = text.chars().count() as f32 * cursor.char_advance();
        let item = RawTextItem {
            transform: cursor.transform_at(origin),
            width: Some(width),
            height: None,
            font_size: cursor.effective_font_size(),
            font_name: font_name.clone(),
            text: text.clone(),
        };
        cursor.advance_over(&text);
        items.push(item);
    }

    /// Process a `TJ` array: strings accumulate into one item, numeric
    /// kerning adjustments move the cursor and, when large enough to look
    /// like a word gap, insert a space.
    fn emit_kerned_array(
        &self,
        elements: &[Object],
        fonts: &BTreeMap<Vec<u8>, FontMeta>,
        cursor: &mut TextCursor,
        font_name: &Option<String>,
        items: &mut Vec<RawTextItem>,
    ) {
        let mut buf = String::new();
        let mut origin = cursor.origin();

        for element in elements {
            match element {
                Object::String(bytes, _) => {
                    let fragment = self.decode_string(fonts, &cursor.font_key, bytes);
                    if buf.is_empty() {
                        origin = cursor.origin();
                    }
                    cursor.advance_over(&fragment);
                    buf.push_str(&fragment);
                }
                other => {
                    // Kerning in thousandths of a text-space unit; negative
                    // values move the cursor right.
                    if let Some(adjust) = operand_number(other) {
                        let dx = -adjust / 1000.0 * cursor.font_size * cursor.horiz_scale;
                        if dx > cursor.char_advance() * KERN_GAP_FACTOR && !buf.is_empty() {
                            buf.push(' ');
                        }
                        cursor.advance(dx);
                    }
                }
            }
        }

        let text = cleanup_text(buf.trim_end());
        if text.is_empty() {
            return;
        }
        let width = text.chars().count() as f32 * cursor.char_advance();
        items.push(RawTextItem {
            transform: cursor.transform_at(origin),
            width: Some(width),
            height: None,
            font_size: cursor.effective_font_size(),
            font_name: font_name.clone(),
            text,
        });
    }
}

impl PageTextSource for LopdfTextSource {
    fn page_count(&self) -> usize {
        self.pages().len()
    }

    fn page_text(&self, page_number: usize) -> Result<PageText, Error> {
        let page_id = self
            .pages()
            .get(&(page_number as u32))
            .copied()
            .ok_or(Error::PageNotFound(page_number))?;
        let (width, height) = self.page_dimensions(page_id)?;
        let items = self.extract_items(page_id)?;
        Ok(PageText {
            width,
            height,
            items,
        })
    }
}
