//! Writes the Info dictionary of the output document: caller fields merged
//! over any pre-existing metadata, plus fixed producer and modification
//! fields. Last writer wins on key collisions.

use chrono::Local;
use lopdf::{Dictionary, Document, Object};

use crate::error::StampError;
use crate::options::MetadataFields;

const PRODUCER: &str = concat!("pdfstamp ", env!("CARGO_PKG_VERSION"));

pub fn write_metadata(doc: &mut Document, fields: &MetadataFields) -> Result<(), StampError> {
    // Start from whatever Info the document already carries.
    let mut info = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => match doc.get_dictionary(*id) {
            Ok(dict) => dict.clone(),
            Err(_) => Dictionary::new(),
        },
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };

    if let Some(author) = &fields.author {
        info.set("Author", Object::string_literal(author.as_str()));
    }
    if let Some(title) = &fields.title {
        info.set("Title", Object::string_literal(title.as_str()));
    }
    if let Some(subject) = &fields.subject {
        info.set("Subject", Object::string_literal(subject.as_str()));
    }
    info.set("Creator", Object::string_literal("pdfstamp"));
    info.set("Producer", Object::string_literal(PRODUCER));
    let mod_date = Local::now().format("D:%Y%m%d%H%M%S").to_string();
    info.set("ModDate", Object::string_literal(mod_date.as_str()));

    let info_id = doc.add_object(Object::Dictionary(info));
    doc.trailer.set("Info", Object::Reference(info_id));
    Ok(())
}
