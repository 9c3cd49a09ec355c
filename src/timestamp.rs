//! Renders the date/time stamp that can accompany the watermark, and maps
//! its placement relative to the main mark onto a page corner.

use std::fs;

use chrono::Local;
use image::{ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use log::debug;
use rusttype::{Font, Scale, point};

use crate::error::RenderError;
use crate::options::{Position, RelativeDirection, TimestampFormat, TimestampSpec};

/// The timestamp layer is always placed at this scale, independent of the
/// main watermark's scale factor.
pub const TIMESTAMP_SCALE: f64 = 1.0;

/// Raster font size of the stamp text, in pixels.
const FONT_SIZE: f32 = 28.0;
const PADDING: u32 = 10;
const TEXT_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Formats the current local time according to the named format, or the
/// caller-supplied pattern for `Custom`.
pub fn format_timestamp(format: TimestampFormat, custom: Option<&str>) -> String {
    let pattern = match format {
        TimestampFormat::Short => "%d/%m/%Y",
        TimestampFormat::Long => "%d/%m/%Y %H:%M",
        TimestampFormat::Full => "%d/%m/%Y %H:%M:%S",
        TimestampFormat::Iso => "%Y-%m-%d %H:%M:%S",
        TimestampFormat::Custom => custom.unwrap_or("%d/%m/%Y"),
    };
    Local::now().format(pattern).to_string()
}

/// Renders the stamp text into a minimally-sized transparent image.
pub fn render_timestamp(spec: &TimestampSpec) -> Result<RgbaImage, RenderError> {
    let font_data = fs::read(&spec.font_path)?;
    let font =
        Font::try_from_vec(font_data).ok_or_else(|| RenderError::Font(spec.font_path.clone()))?;
    let text = format_timestamp(spec.format, spec.custom_format.as_deref());
    debug!("rendering timestamp '{text}'");
    render_text_image(&font, &text)
}

/// Lays the glyphs out once to measure their joint bounding box, then draws
/// them into a canvas just big enough to hold them plus a small padding.
fn render_text_image(font: &Font, text: &str) -> Result<RgbaImage, RenderError> {
    let scale = Scale::uniform(FONT_SIZE);
    let glyphs: Vec<_> = font.layout(text, scale, point(0.0, 0.0)).collect();

    let boxes: Vec<_> = glyphs.iter().filter_map(|g| g.pixel_bounding_box()).collect();
    if boxes.is_empty() {
        return Err(RenderError::EmptyText);
    }
    let min_x = boxes.iter().map(|bb| bb.min.x).min().unwrap_or(0);
    let max_x = boxes.iter().map(|bb| bb.max.x).max().unwrap_or(0);
    let min_y = boxes.iter().map(|bb| bb.min.y).min().unwrap_or(0);
    let max_y = boxes.iter().map(|bb| bb.max.y).max().unwrap_or(0);

    let text_w = (max_x - min_x).max(0) as u32;
    let text_h = (max_y - min_y).max(0) as u32;
    if text_w == 0 || text_h == 0 {
        return Err(RenderError::EmptyText);
    }

    let mut image: RgbaImage =
        ImageBuffer::from_pixel(text_w + 2 * PADDING, text_h + 2 * PADDING, Rgba([0, 0, 0, 0]));
    // Shift so the glyph box starts at (PADDING, PADDING).
    draw_text_mut(
        &mut image,
        TEXT_COLOR,
        PADDING as i32 - min_x,
        PADDING as i32 - min_y,
        scale,
        font,
        text,
    );
    Ok(image)
}

/// Maps the main watermark's position and a relative direction onto the page
/// corner the timestamp goes to. This is a fixed editorial table, not a
/// geometric formula; a direction toward a nearby edge keeps the stamp in
/// the same corner. Custom signature positions map to bottom-right.
pub fn timestamp_position(signature: Position, direction: RelativeDirection) -> Position {
    use Position::*;
    use RelativeDirection::*;

    match (signature, direction) {
        (TopLeft, Above) => TopLeft,
        (TopLeft, Below) => BottomLeft,
        (TopLeft, Left) => TopLeft,
        (TopLeft, Right) => TopRight,

        (TopRight, Above) => TopRight,
        (TopRight, Below) => BottomRight,
        (TopRight, Left) => TopLeft,
        (TopRight, Right) => TopRight,

        (BottomLeft, Above) => BottomLeft,
        (BottomLeft, Below) => BottomLeft,
        (BottomLeft, Left) => BottomLeft,
        (BottomLeft, Right) => BottomRight,

        (BottomRight, Above) => BottomRight,
        (BottomRight, Below) => BottomRight,
        (BottomRight, Left) => BottomLeft,
        (BottomRight, Right) => BottomRight,

        (Center, Above) => TopRight,
        (Center, Below) => BottomRight,
        (Center, Left) => BottomLeft,
        (Center, Right) => BottomRight,

        (Custom { .. }, _) => BottomRight,
    }
}
