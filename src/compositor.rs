//! The watermark engine. One call stamps one document: validate inputs,
//! build the overlay layers, resolve the page selection, merge, write
//! metadata, and persist the output atomically.

use std::collections::BTreeSet;
use std::path::Path;

use image::RgbaImage;
use log::{info, warn};
use lopdf::{Document, Object, ObjectId};

use crate::effects::apply_effects;
use crate::error::StampError;
use crate::geometry::{resolve_position, size_in_points};
use crate::metadata::write_metadata;
use crate::options::StampOptions;
use crate::overlay::{Overlay, build_overlay, merge_into_page};
use crate::pagespec::parse_pages;
use crate::timestamp::{TIMESTAMP_SCALE, render_timestamp, timestamp_position};

/// XObject names for the two layers a run can produce.
const MARK_NAME: &str = "WmMark";
const STAMP_NAME: &str = "WmStamp";

/// A non-fatal downgrade that happened during a run. The run completed, but
/// not with everything the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degradation {
    /// Effects could not be applied; the unmodified watermark was used.
    EffectsSkipped(String),
    /// The timestamp layer could not be rendered and was left out.
    TimestampSkipped(String),
}

impl std::fmt::Display for Degradation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Degradation::EffectsSkipped(reason) => {
                write!(f, "effects skipped: {reason}")
            }
            Degradation::TimestampSkipped(reason) => {
                write!(f, "timestamp skipped: {reason}")
            }
        }
    }
}

/// What a completed run did.
#[derive(Debug)]
pub struct StampOutcome {
    pub total_pages: usize,
    /// Zero-based indices of the pages that received the overlay(s).
    pub stamped_pages: Vec<usize>,
    pub degradations: Vec<Degradation>,
}

/// Stamps `watermark_image` onto the selected pages of `input_pdf` and
/// writes the result to `output_pdf`.
///
/// The output appears atomically: it is staged in a tempfile next to the
/// destination and renamed into place only after the document saved cleanly,
/// so a failed run leaves no partial file behind.
pub fn stamp_pdf(
    input_pdf: &Path,
    watermark_image: &Path,
    output_pdf: &Path,
    options: &StampOptions,
) -> Result<StampOutcome, StampError> {
    // Validating
    if !input_pdf.exists() {
        return Err(StampError::NotFound(input_pdf.to_path_buf()));
    }
    if !watermark_image.exists() {
        return Err(StampError::NotFound(watermark_image.to_path_buf()));
    }
    options.validate()?;

    let mut degradations = Vec::new();
    let mut doc = Document::load(input_pdf)?;
    let pages = doc.get_pages();
    let total_pages = pages.len();
    info!(
        "stamping {} ({total_pages} pages) with {}",
        input_pdf.display(),
        watermark_image.display()
    );

    let mut stamped_pages = Vec::new();
    if let Some(&first_page_id) = pages.values().next() {
        // BuildingOverlays: geometry comes from the first page; pages are
        // assumed uniform.
        let (page_w, page_h) = page_size(&doc, first_page_id);

        let mut mark = image::open(watermark_image)?.to_rgba8();
        match apply_effects(&mark, &options.effects) {
            Ok(decorated) => mark = decorated,
            Err(err) => {
                warn!("could not apply effects, using unmodified watermark: {err}");
                degradations.push(Degradation::EffectsSkipped(err.to_string()));
            }
        }
        let mark = apply_opacity(mark, options.opacity);

        let (mark_w, mark_h) = size_in_points(mark.width(), mark.height(), options.scale_factor);
        let (x, y) = resolve_position(options.position, page_w, page_h, mark_w, mark_h);
        let main_overlay = build_overlay(&mut doc, &mark, MARK_NAME, mark_w, mark_h, x, y)?;

        let stamp_overlay = match &options.timestamp {
            Some(spec) => match render_timestamp(spec) {
                Ok(rendered) => {
                    let corner = timestamp_position(options.position, spec.relative_position);
                    let (w, h) = size_in_points(rendered.width(), rendered.height(), TIMESTAMP_SCALE);
                    let (tx, ty) = resolve_position(corner, page_w, page_h, w, h);
                    Some(build_overlay(&mut doc, &rendered, STAMP_NAME, w, h, tx, ty)?)
                }
                Err(err) => {
                    warn!("could not render timestamp, leaving the layer out: {err}");
                    degradations.push(Degradation::TimestampSkipped(err.to_string()));
                    None
                }
            },
            None => None,
        };

        // SelectingPages
        let mut selected: BTreeSet<usize> =
            parse_pages(&options.pages, total_pages).into_iter().collect();
        if let Some(exclude) = &options.exclude_pages {
            for index in parse_pages(exclude, total_pages) {
                selected.remove(&index);
            }
        }

        // Merging: document order, selected pages only; the rest pass
        // through untouched.
        for (index, (_, page_id)) in pages.iter().enumerate() {
            if !selected.contains(&index) {
                continue;
            }
            merge_layers(&mut doc, *page_id, &main_overlay, stamp_overlay.as_ref())?;
            stamped_pages.push(index);
        }
    }

    // WritingMetadata
    if let Some(fields) = &options.metadata {
        write_metadata(&mut doc, fields)?;
    }

    save_atomically(&mut doc, output_pdf)?;
    info!(
        "wrote {} ({} of {total_pages} pages stamped)",
        output_pdf.display(),
        stamped_pages.len()
    );
    Ok(StampOutcome {
        total_pages,
        stamped_pages,
        degradations,
    })
}

fn merge_layers(
    doc: &mut Document,
    page_id: ObjectId,
    main: &Overlay,
    stamp: Option<&Overlay>,
) -> Result<(), StampError> {
    merge_into_page(doc, page_id, main)?;
    if let Some(overlay) = stamp {
        merge_into_page(doc, page_id, overlay)?;
    }
    Ok(())
}

/// First-page dimensions in points, following the Parent chain for an
/// inherited MediaBox. Falls back to US Letter.
fn page_size(doc: &Document, page_id: ObjectId) -> (f64, f64) {
    let mut current = page_id;
    // Bounded walk in case of a malformed Parent cycle.
    for _ in 0..32 {
        let Ok(dict) = doc.get_dictionary(current) else {
            break;
        };
        if let Some(rect) = dict
            .get(b"MediaBox")
            .ok()
            .and_then(|obj| resolve_rect(doc, obj))
        {
            let [x0, y0, x1, y1] = rect;
            return ((x1 - x0).abs(), (y1 - y0).abs());
        }
        match dict.get(b"Parent").and_then(|obj| obj.as_reference()) {
            Ok(parent) => current = parent,
            Err(_) => break,
        }
    }
    warn!("no MediaBox found, assuming US Letter");
    (612.0, 792.0)
}

fn resolve_rect(doc: &Document, obj: &Object) -> Option<[f64; 4]> {
    let array = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_array().ok()?,
        Object::Array(array) => array,
        _ => return None,
    };
    if array.len() < 4 {
        return None;
    }
    Some([
        as_f64(&array[0])?,
        as_f64(&array[1])?,
        as_f64(&array[2])?,
        as_f64(&array[3])?,
    ])
}

fn as_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn apply_opacity(mut image: RgbaImage, opacity: f64) -> RgbaImage {
    if opacity >= 1.0 {
        return image;
    }
    for pixel in image.pixels_mut() {
        pixel[3] = (pixel[3] as f64 * opacity).round() as u8;
    }
    image
}

/// Saves into a tempfile in the destination directory and renames it over
/// `output_pdf`. The tempfile handle cleans up after itself on every early
/// return above this point and on a failed save here.
fn save_atomically(doc: &mut Document, output_pdf: &Path) -> Result<(), StampError> {
    let dir = output_pdf.parent().filter(|p| !p.as_os_str().is_empty());
    let mut staged = tempfile::Builder::new()
        .prefix(".pdfstamp-")
        .suffix(".pdf")
        .tempfile_in(dir.unwrap_or_else(|| Path::new(".")))?;
    doc.save_to(staged.as_file_mut())?;
    staged
        .persist(output_pdf)
        .map_err(|err| StampError::Io(err.error))?;
    Ok(())
}
