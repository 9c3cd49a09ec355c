//! Pixel-to-point conversion and mark placement on a page.
//!
//! All coordinates are PDF points with the origin at the bottom-left of the
//! page.

use crate::options::Position;

/// Assumed pixel density of the watermark image.
pub const DPI: f64 = 300.0;

/// Inset kept between a placed mark and the page edge, in points.
pub const MARGIN: f64 = 20.0;

/// Converts image pixel dimensions into point dimensions at the given scale.
/// `points = pixels / dpi * 72 * scale`; linear in the scale factor.
pub fn size_in_points(px_width: u32, px_height: u32, scale_factor: f64) -> (f64, f64) {
    let width = px_width as f64 / DPI * 72.0 * scale_factor;
    let height = px_height as f64 / DPI * 72.0 * scale_factor;
    (width, height)
}

/// Resolves a position to the bottom-left corner of a `mark_w` x `mark_h`
/// mark on a `page_w` x `page_h` page, then clamps so the mark stays on the
/// page. Clamping applies to every position, custom and center included.
pub fn resolve_position(
    position: Position,
    page_w: f64,
    page_h: f64,
    mark_w: f64,
    mark_h: f64,
) -> (f64, f64) {
    let (x, y) = match position {
        Position::BottomRight => (page_w - mark_w - MARGIN, MARGIN),
        Position::BottomLeft => (MARGIN, MARGIN),
        Position::TopRight => (page_w - mark_w - MARGIN, page_h - mark_h - MARGIN),
        Position::TopLeft => (MARGIN, page_h - mark_h - MARGIN),
        Position::Center => ((page_w - mark_w) / 2.0, (page_h - mark_h) / 2.0),
        Position::Custom { rx, ry } => (rx * page_w, ry * page_h),
    };
    clamp_to_page(x, y, page_w, page_h, mark_w, mark_h)
}

fn clamp_to_page(mut x: f64, mut y: f64, page_w: f64, page_h: f64, mark_w: f64, mark_h: f64) -> (f64, f64) {
    if x < 0.0 {
        x = MARGIN;
    }
    if x + mark_w > page_w {
        x = page_w - mark_w - MARGIN;
    }
    if y < 0.0 {
        y = MARGIN;
    }
    if y + mark_h > page_h {
        y = page_h - mark_h - MARGIN;
    }
    (x, y)
}
