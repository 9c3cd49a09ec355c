//! Stamps a watermark image onto selected pages of a PDF document, with
//! configurable placement, scaling, border/shadow effects, an optional
//! timestamp layer and metadata injection.

pub mod compositor;
pub mod effects;
pub mod error;
pub mod geometry;
pub mod metadata;
pub mod options;
pub mod overlay;
pub mod pagespec;
pub mod timestamp;

pub use compositor::{Degradation, StampOutcome, stamp_pdf};
pub use error::{RenderError, StampError};
pub use options::{
    EffectsSpec, MetadataFields, Position, RelativeDirection, StampOptions, TimestampFormat,
    TimestampSpec,
};
