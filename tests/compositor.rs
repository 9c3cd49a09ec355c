//! End-to-end runs against small documents built in-test.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use tempfile::TempDir;

use pdfstamp::geometry::{MARGIN, size_in_points};
use pdfstamp::{
    Degradation, MetadataFields, Position, RelativeDirection, StampError, StampOptions,
    TimestampFormat, TimestampSpec, stamp_pdf,
};

const A4_WIDTH: f32 = 595.27;
const A4_HEIGHT: f32 = 841.89;

/// Builds a document of `page_count` pages, each with its own content
/// stream, and saves it at `path`.
fn build_fixture(path: &Path, page_count: usize, width: f32, height: f32) {
    let mut doc = Document::with_version("1.5");

    let f1_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut page_ids = Vec::new();
    for number in 1..=page_count {
        let text = format!("BT /F1 12 Tf 72 700 Td (Page {number}) Tj ET");
        let content_id = doc.add_object(Stream::new(Dictionary::new(), text.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::Real(width),
                Object::Real(height),
            ],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(f1_id) },
            },
            "Contents" => Object::Reference(content_id),
        });
        page_ids.push(page_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| Object::Reference(*id)).collect();
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count as i64,
    });
    for page_id in &page_ids {
        doc.get_object_mut(*page_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("Parent", Object::Reference(pages_id));
    }

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.save(path).unwrap();
}

fn build_mark(path: &Path, width: u32, height: u32) {
    RgbaImage::from_pixel(width, height, Rgba([180, 30, 30, 255]))
        .save(path)
        .unwrap();
}

struct Fixture {
    _dir: TempDir,
    input: PathBuf,
    mark: PathBuf,
    output: PathBuf,
}

fn fixture(page_count: usize) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.pdf");
    let mark = dir.path().join("mark.png");
    let output = dir.path().join("output.pdf");
    build_fixture(&input, page_count, A4_WIDTH, A4_HEIGHT);
    build_mark(&mark, 300, 120);
    Fixture {
        _dir: dir,
        input,
        mark,
        output,
    }
}

/// Number of content streams attached to a page.
fn content_count(doc: &Document, page_id: (u32, u16)) -> usize {
    let page = doc.get_dictionary(page_id).unwrap();
    match page.get(b"Contents").unwrap() {
        Object::Reference(_) => 1,
        Object::Array(array) => array.len(),
        other => panic!("unexpected contents {other:?}"),
    }
}

fn has_xobject(doc: &Document, page_id: (u32, u16), name: &[u8]) -> bool {
    let page = doc.get_dictionary(page_id).unwrap();
    page.get(b"Resources")
        .and_then(|obj| obj.as_dict())
        .and_then(|resources| resources.get(b"XObject"))
        .and_then(|obj| obj.as_dict())
        .map(|xobjects| xobjects.get(name).is_ok())
        .unwrap_or(false)
}

#[test]
fn stamps_selected_pages_and_passes_the_rest_through() {
    let fx = fixture(3);
    let options = StampOptions {
        pages: "1,3".to_string(),
        ..StampOptions::default()
    };
    let outcome = stamp_pdf(&fx.input, &fx.mark, &fx.output, &options).unwrap();
    assert_eq!(outcome.total_pages, 3);
    assert_eq!(outcome.stamped_pages, vec![0, 2]);
    assert!(outcome.degradations.is_empty());

    let doc = Document::load(&fx.output).unwrap();
    let pages: Vec<_> = doc.get_pages().into_values().collect();
    assert_eq!(pages.len(), 3);

    // Stamped pages gained exactly one stream; the middle page kept its
    // single original reference.
    assert_eq!(content_count(&doc, pages[0]), 2);
    assert_eq!(content_count(&doc, pages[1]), 1);
    assert_eq!(content_count(&doc, pages[2]), 2);
    assert!(has_xobject(&doc, pages[0], b"WmMark"));
    assert!(!has_xobject(&doc, pages[1], b"WmMark"));
}

#[test]
fn exclude_spec_is_subtracted_from_the_selection() {
    let fx = fixture(5);
    let options = StampOptions {
        pages: "all".to_string(),
        exclude_pages: Some("2,4".to_string()),
        ..StampOptions::default()
    };
    let outcome = stamp_pdf(&fx.input, &fx.mark, &fx.output, &options).unwrap();
    assert_eq!(outcome.stamped_pages, vec![0, 2, 4]);

    let doc = Document::load(&fx.output).unwrap();
    let pages: Vec<_> = doc.get_pages().into_values().collect();
    for (index, page_id) in pages.iter().enumerate() {
        let expected = if index % 2 == 0 { 2 } else { 1 };
        assert_eq!(content_count(&doc, *page_id), expected, "page {index}");
    }
}

#[test]
fn placement_matrix_matches_geometry_on_a4() {
    let fx = fixture(1);
    let options = StampOptions {
        scale_factor: 0.2,
        position: Position::BottomRight,
        ..StampOptions::default()
    };
    stamp_pdf(&fx.input, &fx.mark, &fx.output, &options).unwrap();

    let doc = Document::load(&fx.output).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let page = doc.get_dictionary(page_id).unwrap();
    let contents = page.get(b"Contents").unwrap().as_array().unwrap();
    let overlay_id = contents.last().unwrap().as_reference().unwrap();
    let stream = match doc.get_object(overlay_id).unwrap() {
        Object::Stream(stream) => stream,
        other => panic!("expected stream, got {other:?}"),
    };

    let ops = String::from_utf8(stream.content.clone()).unwrap();
    let matrix_line = ops.lines().nth(1).unwrap();
    let numbers: Vec<f64> = matrix_line
        .split_whitespace()
        .take(6)
        .map(|n| n.parse().unwrap())
        .collect();

    let (expected_w, expected_h) = size_in_points(300, 120, 0.2);
    let page_w = A4_WIDTH as f64;
    assert!((numbers[0] - expected_w).abs() < 1e-9);
    assert!((numbers[3] - expected_h).abs() < 1e-9);
    assert!((numbers[4] - (page_w - expected_w - MARGIN)).abs() < 1e-2);
    assert!((numbers[5] - MARGIN).abs() < 1e-9);
}

#[test]
fn missing_input_is_fatal_and_leaves_no_output() {
    let fx = fixture(1);
    let missing = fx.input.with_file_name("nope.pdf");
    let err = stamp_pdf(&missing, &fx.mark, &fx.output, &StampOptions::default()).unwrap_err();
    assert!(matches!(err, StampError::NotFound(_)));
    assert!(!fx.output.exists());
}

#[test]
fn missing_watermark_is_fatal() {
    let fx = fixture(1);
    let missing = fx.mark.with_file_name("nope.png");
    let err = stamp_pdf(&fx.input, &missing, &fx.output, &StampOptions::default()).unwrap_err();
    assert!(matches!(err, StampError::NotFound(_)));
    assert!(!fx.output.exists());
}

#[test]
fn unreadable_timestamp_font_degrades_instead_of_failing() {
    let fx = fixture(2);
    let options = StampOptions {
        timestamp: Some(TimestampSpec {
            format: TimestampFormat::Short,
            custom_format: None,
            relative_position: RelativeDirection::Below,
            font_path: fx.input.with_file_name("missing.ttf"),
        }),
        ..StampOptions::default()
    };
    let outcome = stamp_pdf(&fx.input, &fx.mark, &fx.output, &options).unwrap();
    assert_eq!(outcome.degradations.len(), 1);
    assert!(matches!(
        outcome.degradations[0],
        Degradation::TimestampSkipped(_)
    ));

    // The main layer still went on: one extra stream, not two.
    let doc = Document::load(&fx.output).unwrap();
    let pages: Vec<_> = doc.get_pages().into_values().collect();
    assert_eq!(content_count(&doc, pages[0]), 2);
    assert!(!has_xobject(&doc, pages[0], b"WmStamp"));
}

#[test]
fn invalid_options_are_rejected_before_processing() {
    let fx = fixture(1);
    let options = StampOptions {
        scale_factor: -1.0,
        ..StampOptions::default()
    };
    let err = stamp_pdf(&fx.input, &fx.mark, &fx.output, &options).unwrap_err();
    assert!(matches!(err, StampError::InvalidOptions(_)));
    assert!(!fx.output.exists());
}

#[test]
fn metadata_is_written_after_compositing() {
    let fx = fixture(1);
    let options = StampOptions {
        metadata: Some(MetadataFields {
            author: Some("Ada Lovelace".to_string()),
            title: Some("Signed report".to_string()),
            subject: None,
        }),
        ..StampOptions::default()
    };
    stamp_pdf(&fx.input, &fx.mark, &fx.output, &options).unwrap();

    let doc = Document::load(&fx.output).unwrap();
    let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
    let info = doc.get_dictionary(info_id).unwrap();
    assert_eq!(
        info.get(b"Author").unwrap().as_str().unwrap(),
        b"Ada Lovelace".as_slice()
    );
    assert_eq!(
        info.get(b"Title").unwrap().as_str().unwrap(),
        b"Signed report".as_slice()
    );
    let producer = info.get(b"Producer").unwrap().as_str().unwrap();
    assert!(producer.starts_with(b"pdfstamp"));
}

#[test]
fn restamping_an_output_double_stamps() {
    // Merging is intentionally not idempotent; a second run adds a second
    // mark on top of the first.
    let fx = fixture(1);
    stamp_pdf(&fx.input, &fx.mark, &fx.output, &StampOptions::default()).unwrap();
    let second = fx.output.with_file_name("twice.pdf");
    stamp_pdf(&fx.output, &fx.mark, &second, &StampOptions::default()).unwrap();

    let doc = Document::load(&second).unwrap();
    let pages: Vec<_> = doc.get_pages().into_values().collect();
    assert_eq!(content_count(&doc, pages[0]), 3);
}

#[test]
fn empty_selection_still_writes_a_full_copy() {
    let fx = fixture(3);
    let options = StampOptions {
        pages: "invalid".to_string(),
        ..StampOptions::default()
    };
    let outcome = stamp_pdf(&fx.input, &fx.mark, &fx.output, &options).unwrap();
    assert!(outcome.stamped_pages.is_empty());

    let doc = Document::load(&fx.output).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
}
