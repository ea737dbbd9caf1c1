//! End-to-end tests driving extract -> locate -> replace -> regenerate ->
//! re-extract against synthetic in-memory documents.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use redline::{
    extract, regenerate, BoundingBox, EditOutcome, EditRequest, EditSession,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Build a minimal uncompressed PDF. Each inner slice is one page; each
/// `(text, x, y)` entry becomes its own positioned text object at 12pt.
fn build_pdf(pages: &[&[(&str, f32, f32)]]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for texts in pages {
        let mut operations = Vec::new();
        for (text, x, y) in *texts {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new(
                    "Tm",
                    vec![
                        1.into(),
                        0.into(),
                        0.into(),
                        1.into(),
                        Object::Real(*x),
                        Object::Real(*y),
                    ],
                ),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]);
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn sample_pdf() -> Vec<u8> {
    build_pdf(&[&[
        ("Senior Software Engineer", 72.0, 720.0),
        ("Managed a small team of developers", 72.0, 600.0),
    ]])
}

#[test]
fn extraction_recovers_page_geometry_and_blocks() {
    init_logging();
    let map = extract(&sample_pdf()).unwrap();

    assert_eq!(map.page_count(), 1);
    let size = map.page_size(0).unwrap();
    assert_eq!((size.width, size.height), (612.0, 792.0));

    let texts: Vec<&str> = map.blocks().iter().map(|b| b.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Senior Software Engineer",
            "Managed a small team of developers"
        ]
    );
    assert!(map.blocks().iter().all(|b| !b.is_modified));

    // Positions come straight from the text matrix.
    let first = &map.blocks()[0];
    assert_eq!(first.bbox.x, 72.0);
    assert_eq!(first.bbox.y, 720.0);
}

#[test]
fn unmodified_map_regenerates_input_bytes_unchanged() {
    init_logging();
    let bytes = sample_pdf();
    let map = extract(&bytes).unwrap();

    let output = regenerate(&bytes, &map).unwrap();
    assert_eq!(output, bytes);
}

#[test]
fn matched_edit_survives_the_full_round_trip() {
    init_logging();
    let bytes = sample_pdf();
    let mut session = EditSession::from_bytes(&bytes).unwrap();

    let outcome = session.apply(&EditRequest {
        original_text: "Managed a small team".to_string(),
        suggested_text: "Led a team of five engineers".to_string(),
        page: 1,
        region: BoundingBox::new(60.0, 590.0, 400.0, 30.0),
    });
    assert_eq!(outcome, EditOutcome::Matched);

    let edited = session.regenerate(&bytes).unwrap();
    assert_ne!(edited, bytes);
    assert!(edited.starts_with(b"%PDF-"));

    // The output parses, and re-extraction sees the replacement text on the
    // same page.
    let reread = extract(&edited).unwrap();
    assert_eq!(reread.page_count(), 1);
    assert!(reread
        .blocks()
        .iter()
        .any(|b| b.page == 0 && b.text.contains("Led a team of five engineers")));
    // The untouched block is still there.
    assert!(reread
        .blocks()
        .iter()
        .any(|b| b.text.contains("Senior Software Engineer")));
}

#[test]
fn regenerating_an_already_edited_document_is_stable() {
    init_logging();
    let bytes = sample_pdf();
    let mut session = EditSession::from_bytes(&bytes).unwrap();
    session.apply(&EditRequest {
        original_text: "Managed a small team".to_string(),
        suggested_text: "Led a team of five engineers".to_string(),
        page: 1,
        region: BoundingBox::new(60.0, 590.0, 400.0, 30.0),
    });
    let edited = session.regenerate(&bytes).unwrap();

    // A fresh extraction of the edited document has nothing marked modified,
    // so another regeneration pass leaves the bytes alone.
    let fresh = extract(&edited).unwrap();
    assert_eq!(fresh.modified_blocks().count(), 0);
    assert_eq!(regenerate(&edited, &fresh).unwrap(), edited);
}

#[test]
fn missed_region_changes_nothing() {
    init_logging();
    let bytes = sample_pdf();
    let mut session = EditSession::from_bytes(&bytes).unwrap();

    let outcome = session.apply(&EditRequest {
        original_text: "Managed a small team".to_string(),
        suggested_text: "irrelevant".to_string(),
        page: 1,
        // Bottom of the page, overlapping nothing.
        region: BoundingBox::new(60.0, 40.0, 100.0, 20.0),
    });
    assert_eq!(outcome, EditOutcome::NotFound);
    assert_eq!(session.regenerate(&bytes).unwrap(), bytes);
}

#[test]
fn edits_land_on_the_requested_page() {
    init_logging();
    let bytes = build_pdf(&[
        &[("Front page heading", 72.0, 720.0)],
        &[("Back page paragraph", 72.0, 720.0)],
    ]);
    let mut session = EditSession::from_bytes(&bytes).unwrap();

    let outcome = session.apply(&EditRequest {
        original_text: "Back page paragraph".to_string(),
        suggested_text: "Rewritten on page two".to_string(),
        page: 2,
        region: BoundingBox::new(60.0, 700.0, 300.0, 40.0),
    });
    assert_eq!(outcome, EditOutcome::Matched);

    let edited = session.regenerate(&bytes).unwrap();
    let reread = extract(&edited).unwrap();
    assert!(reread
        .blocks()
        .iter()
        .any(|b| b.page == 1 && b.text.contains("Rewritten on page two")));
    // Page one is untouched.
    assert!(reread
        .blocks()
        .iter()
        .any(|b| b.page == 0 && b.text == "Front page heading"));
}

#[test]
fn fallback_edit_reports_approximate_placement() {
    init_logging();
    let bytes = sample_pdf();
    let mut session = EditSession::from_bytes(&bytes).unwrap();

    // Region hits the first block, but the request text matches neither.
    let outcome = session.apply(&EditRequest {
        original_text: "wording the document never contained".to_string(),
        suggested_text: "best effort".to_string(),
        page: 1,
        region: BoundingBox::new(60.0, 710.0, 300.0, 30.0),
    });
    assert_eq!(outcome, EditOutcome::Fallback);

    let block = session
        .text_map()
        .modified_blocks()
        .next()
        .expect("one block should be modified")
        .clone();
    assert_eq!(block.original_text.as_deref(), Some("Senior Software Engineer"));
    assert_eq!(block.text, "best effort");
}

#[test]
fn edit_requests_deserialize_from_generator_output() {
    let json = r#"{
        "originalText": "Managed a small team",
        "suggestedText": "Led a team of five engineers",
        "page": 1,
        "region": { "x": 60.0, "y": 590.0, "width": 400.0, "height": 30.0 }
    }"#;
    let edit: EditRequest = serde_json::from_str(json).unwrap();

    let bytes = sample_pdf();
    let mut session = EditSession::from_bytes(&bytes).unwrap();
    assert_eq!(session.apply(&edit), EditOutcome::Matched);
}
