//! Overlay construction: turns a raster layer into a PDF image XObject with
//! an alpha SMask plus a single drawing stream, added to the output document
//! once per layer and merged into every selected page.

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::RgbaImage;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use crate::error::StampError;

/// One visual layer of a run. The XObject and its draw stream exist once in
/// the document; merging a page only adds references.
#[derive(Debug)]
pub struct Overlay {
    pub name: String,
    xobject_id: ObjectId,
    stream_id: ObjectId,
}

/// Embeds `image` as an RGB XObject with its alpha channel as a DeviceGray
/// SMask, and builds the content stream that draws it at `(x, y)` scaled to
/// `width_pt` x `height_pt`.
pub fn build_overlay(
    doc: &mut Document,
    image: &RgbaImage,
    name: &str,
    width_pt: f64,
    height_pt: f64,
    x: f64,
    y: f64,
) -> Result<Overlay, StampError> {
    let (width, height) = image.dimensions();

    let mut rgb_buf = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha_buf = Vec::with_capacity((width * height) as usize);
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        rgb_buf.extend_from_slice(&[r, g, b]);
        alpha_buf.push(a);
    }

    let smask_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        deflate(&alpha_buf)?,
    ));

    let xobject_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
            "SMask" => Object::Reference(smask_id),
        },
        deflate(&rgb_buf)?,
    ));

    let draw_ops = format!("q\n{width_pt} 0 0 {height_pt} {x} {y} cm\n/{name} Do\nQ\n");
    let stream_id = doc.add_object(Stream::new(dictionary! {}, draw_ops.into_bytes()));

    Ok(Overlay {
        name: name.to_string(),
        xobject_id,
        stream_id,
    })
}

/// Merges the overlay into one page: registers the XObject under the page's
/// resources and appends the draw stream after the existing content, so the
/// mark lands on top of whatever the page already shows.
pub fn merge_into_page(
    doc: &mut Document,
    page_id: ObjectId,
    overlay: &Overlay,
) -> Result<(), StampError> {
    register_xobject(doc, page_id, &overlay.name, overlay.xobject_id)?;
    append_content(doc, page_id, overlay.stream_id)
}

fn register_xobject(
    doc: &mut Document,
    page_id: ObjectId,
    name: &str,
    xobject_id: ObjectId,
) -> Result<(), StampError> {
    // Resources and the XObject map inside it may each live behind an
    // indirect reference; resolve before mutating.
    let resources_ref = {
        let page = doc.get_dictionary(page_id)?;
        page.get(b"Resources")
            .ok()
            .and_then(|obj| obj.as_reference().ok())
    };
    let xobject_ref = {
        let resources = match resources_ref {
            Some(id) => doc.get_dictionary(id).ok(),
            None => doc
                .get_dictionary(page_id)
                .ok()
                .and_then(|page| page.get(b"Resources").ok())
                .and_then(|obj| obj.as_dict().ok()),
        };
        resources
            .and_then(|dict| dict.get(b"XObject").ok())
            .and_then(|obj| obj.as_reference().ok())
    };

    if let Some(xid) = xobject_ref {
        let xobjects = doc.get_object_mut(xid)?.as_dict_mut()?;
        xobjects.set(name.as_bytes().to_vec(), Object::Reference(xobject_id));
        return Ok(());
    }

    let resources = match resources_ref {
        Some(rid) => doc.get_object_mut(rid)?.as_dict_mut()?,
        None => {
            let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
            if page
                .get(b"Resources")
                .map_or(true, |obj| obj.as_dict().is_err())
            {
                page.set("Resources", Object::Dictionary(Dictionary::new()));
            }
            page.get_mut(b"Resources")?.as_dict_mut()?
        }
    };
    if resources
        .get(b"XObject")
        .map_or(true, |obj| obj.as_dict().is_err())
    {
        resources.set("XObject", Object::Dictionary(Dictionary::new()));
    }
    resources
        .get_mut(b"XObject")?
        .as_dict_mut()?
        .set(name.as_bytes().to_vec(), Object::Reference(xobject_id));
    Ok(())
}

fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    stream_id: ObjectId,
) -> Result<(), StampError> {
    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    let new_contents = match page.remove(b"Contents") {
        Some(Object::Reference(existing)) => Object::Array(vec![
            Object::Reference(existing),
            Object::Reference(stream_id),
        ]),
        Some(Object::Array(mut array)) => {
            array.push(Object::Reference(stream_id));
            Object::Array(array)
        }
        _ => Object::Reference(stream_id),
    };
    page.set("Contents", new_contents);
    Ok(())
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, StampError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
