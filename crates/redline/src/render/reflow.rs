//! Regenerating document bytes from an edited text map.
//!
//! Every modified block is erased with an opaque white rectangle over its
//! original bounding box, then its replacement text is word-wrapped back
//! into the same region using a single fallback font. Unmodified blocks are
//! left byte-for-byte alone.

use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat};

use crate::map::PdfTextMap;
use crate::render::wrap::layout_text;
use crate::types::TextBlock;
use crate::Error;

/// Size of the fallback font used for all replacement text.
const REPLACEMENT_FONT_SIZE: f32 = 10.0;

/// Base font drawn for replacement text. Original fonts are not reused: a
/// replacement may need glyphs the embedded subset lacks.
const REPLACEMENT_BASE_FONT: &str = "Helvetica";

/// Capability interface over document regeneration, so orchestration code
/// can be tested against fakes.
pub trait DocumentSink {
    /// Produce new document bytes with every modified block in `map`
    /// re-rendered. The input bytes are never mutated.
    fn regenerate(&self, bytes: &[u8], map: &PdfTextMap) -> Result<Vec<u8>, Error>;
}

/// [`DocumentSink`] backed by [`lopdf`].
#[derive(Debug, Default)]
pub struct LopdfSink;

impl DocumentSink for LopdfSink {
    fn regenerate(&self, bytes: &[u8], map: &PdfTextMap) -> Result<Vec<u8>, Error> {
        regenerate(bytes, map)
    }
}

/// Re-render every modified block of `map` into a fresh copy of the
/// document.
///
/// Map coordinates and content-stream coordinates share the PDF bottom-left
/// origin, so block boxes are drawn without any axis conversion. Failures
/// are hard: on any error no partial output is returned.
pub fn regenerate(bytes: &[u8], map: &PdfTextMap) -> Result<Vec<u8>, Error> {
    let mut touched: BTreeMap<usize, Vec<&TextBlock>> = BTreeMap::new();
    for block in map.modified_blocks() {
        touched.entry(block.page).or_default().push(block);
    }
    if touched.is_empty() {
        // Nothing to redraw; hand back an owned copy of the input.
        return Ok(bytes.to_vec());
    }

    let mut doc = Document::load_mem(bytes).map_err(|e| Error::Parse(e.to_string()))?;
    let pages = doc.get_pages();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => REPLACEMENT_BASE_FONT,
    });

    for (page_index, blocks) in touched {
        let page_number = page_index as u32 + 1;
        let page_id = pages.get(&page_number).copied().ok_or_else(|| {
            Error::Regenerate(format!("page {page_number} missing from document"))
        })?;

        let font_name = bind_page_font(&mut doc, page_id, font_id)?;

        let raw = doc
            .get_page_content(page_id)
            .map_err(|e| Error::Regenerate(format!("cannot read page content: {e}")))?;
        let mut content = Content::decode(&raw)
            .map_err(|e| Error::Regenerate(format!("content stream decode error: {e}")))?;

        for block in blocks {
            append_block_ops(&mut content.operations, block, &font_name);
        }

        let encoded = content
            .encode()
            .map_err(|e| Error::Regenerate(format!("content stream encode error: {e}")))?;
        doc.change_page_content(page_id, encoded)
            .map_err(|e| Error::Regenerate(format!("cannot replace page content: {e}")))?;
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| Error::Regenerate(e.to_string()))?;
    Ok(output)
}

/// Append the white-out rectangle and wrapped replacement text for one
/// block.
fn append_block_ops(ops: &mut Vec<Operation>, block: &TextBlock, font_name: &str) {
    let b = &block.bbox;

    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new(
        "rg",
        vec![Object::Real(1.0), Object::Real(1.0), Object::Real(1.0)],
    ));
    ops.push(Operation::new(
        "re",
        vec![
            Object::Real(b.x),
            Object::Real(b.y),
            Object::Real(b.width),
            Object::Real(b.height),
        ],
    ));
    ops.push(Operation::new("f", vec![]));
    ops.push(Operation::new("Q", vec![]));

    let lines = layout_text(&block.text, b, REPLACEMENT_FONT_SIZE);
    if lines.is_empty() {
        return;
    }

    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "Tf",
        vec![
            Object::Name(font_name.as_bytes().to_vec()),
            Object::Real(REPLACEMENT_FONT_SIZE),
        ],
    ));
    ops.push(Operation::new(
        "rg",
        vec![Object::Real(0.0), Object::Real(0.0), Object::Real(0.0)],
    ));
    for line in lines {
        ops.push(Operation::new(
            "Tm",
            vec![
                Object::Real(1.0),
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(1.0),
                Object::Real(line.x),
                Object::Real(line.y),
            ],
        ));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(
                encode_latin1(&line.text),
                StringFormat::Literal,
            )],
        ));
    }
    ops.push(Operation::new("ET", vec![]));
}

/// Encode replacement text for a standard-font `Tj` operand. Characters
/// outside Latin-1 degrade to `?`.
fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect()
}

/// Where a dictionary lives relative to its owner: inline, or behind an
/// indirect reference.
#[derive(Clone, Copy)]
enum DictSlot {
    Inline,
    Indirect(ObjectId),
}

/// Register the fallback font on a page under a fresh resource name and
/// return that name.
///
/// Handles pages whose `/Resources` (or nested `/Font`) are either inline
/// dictionaries or indirect references, creating missing dictionaries as
/// needed.
fn bind_page_font(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
) -> Result<String, Error> {
    // Locate the page's Resources dictionary. A page without its own entry
    // inherits one from an ancestor; that entry is materialized onto the
    // page itself, because a page-level Resources would otherwise shadow the
    // inherited fonts the existing content depends on.
    let resources_slot = match dict_ref(doc, page_id)?.get(b"Resources") {
        Ok(Object::Reference(id)) => DictSlot::Indirect(*id),
        Ok(Object::Dictionary(_)) => DictSlot::Inline,
        _ => {
            let resources = inherited_resources(doc, page_id)
                .unwrap_or_else(|| Object::Dictionary(Dictionary::new()));
            let slot = match &resources {
                Object::Reference(id) => DictSlot::Indirect(*id),
                _ => DictSlot::Inline,
            };
            dict_mut(doc, page_id)?.set("Resources", resources);
            slot
        }
    };

    // Locate (or create) the Font dictionary inside Resources.
    let font_slot = match resources_dict(doc, page_id, resources_slot)?.get(b"Font") {
        Ok(Object::Reference(id)) => DictSlot::Indirect(*id),
        Ok(Object::Dictionary(_)) => DictSlot::Inline,
        _ => {
            resources_dict_mut(doc, page_id, resources_slot)?
                .set("Font", Object::Dictionary(Dictionary::new()));
            DictSlot::Inline
        }
    };

    // Pick a resource name not already taken on this page.
    let existing: Vec<Vec<u8>> = match font_slot {
        DictSlot::Inline => resources_dict(doc, page_id, resources_slot)?
            .get(b"Font")
            .and_then(Object::as_dict)
            .map_err(|e| Error::Regenerate(format!("font dictionary: {e}")))?,
        DictSlot::Indirect(id) => dict_ref(doc, id)?,
    }
    .iter()
    .map(|(key, _)| key.clone())
    .collect();

    let mut n = 0;
    let name = loop {
        let candidate = format!("RF{n}");
        if !existing.iter().any(|key| key.as_slice() == candidate.as_bytes()) {
            break candidate;
        }
        n += 1;
    };

    let fonts = match font_slot {
        DictSlot::Inline => resources_dict_mut(doc, page_id, resources_slot)?
            .get_mut(b"Font")
            .and_then(Object::as_dict_mut)
            .map_err(|e| Error::Regenerate(format!("font dictionary: {e}")))?,
        DictSlot::Indirect(id) => dict_mut(doc, id)?,
    };
    fonts.set(name.as_bytes(), Object::Reference(font_id));

    Ok(name)
}

/// Walk up the page tree looking for an inherited Resources entry.
fn inherited_resources(doc: &Document, page_id: ObjectId) -> Option<Object> {
    let mut dict = dict_ref(doc, page_id).ok()?;
    loop {
        let parent_id = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = dict_ref(doc, parent_id).ok()?;
        match dict.get(b"Resources") {
            Ok(Object::Reference(id)) => return Some(Object::Reference(*id)),
            Ok(Object::Dictionary(d)) => return Some(Object::Dictionary(d.clone())),
            _ => continue,
        }
    }
}

fn dict_ref(doc: &Document, id: ObjectId) -> Result<&Dictionary, Error> {
    doc.get_object(id)
        .and_then(Object::as_dict)
        .map_err(|e| Error::Regenerate(format!("object {id:?} is not a dictionary: {e}")))
}

fn dict_mut(doc: &mut Document, id: ObjectId) -> Result<&mut Dictionary, Error> {
    doc.get_object_mut(id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| Error::Regenerate(format!("object {id:?} is not a dictionary: {e}")))
}

fn resources_dict(
    doc: &Document,
    page_id: ObjectId,
    slot: DictSlot,
) -> Result<&Dictionary, Error> {
    match slot {
        DictSlot::Inline => dict_ref(doc, page_id)?
            .get(b"Resources")
            .and_then(Object::as_dict)
            .map_err(|e| Error::Regenerate(format!("resources dictionary: {e}"))),
        DictSlot::Indirect(id) => dict_ref(doc, id),
    }
}

fn resources_dict_mut(
    doc: &mut Document,
    page_id: ObjectId,
    slot: DictSlot,
) -> Result<&mut Dictionary, Error> {
    match slot {
        DictSlot::Inline => dict_mut(doc, page_id)?
            .get_mut(b"Resources")
            .and_then(Object::as_dict_mut)
            .map_err(|e| Error::Regenerate(format!("resources dictionary: {e}"))),
        DictSlot::Indirect(id) => dict_mut(doc, id),
    }
}
