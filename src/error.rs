use std::path::PathBuf;
use thiserror::Error;

/// Fatal failures of a stamping run. Non-fatal conditions (a broken effect,
/// an unreadable timestamp font, a bad page-spec token) never show up here;
/// they degrade the run and are reported through the outcome instead.
#[derive(Error, Debug)]
pub enum StampError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error(
        "unknown position '{0}' (expected top-left, top-right, bottom-left, bottom-right, center or custom:<rx>,<ry>)"
    )]
    InvalidPosition(String),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("pdf error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while producing a raster layer (effects, timestamp text).
/// The compositor downgrades these to a logged degradation and keeps going.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("font {0} could not be loaded")]
    Font(PathBuf),

    #[error("rendered text has no visible glyphs")]
    EmptyText,

    #[error("effect canvas dimensions overflow")]
    CanvasOverflow,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
