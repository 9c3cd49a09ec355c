//! Optional decoration of the watermark image: a solid border and a flat
//! drop shadow. Both produce a new image; the source buffer is never touched.

use image::{Rgba, RgbaImage, imageops};

use crate::error::RenderError;
use crate::options::EffectsSpec;

const SHADOW_COLOR: Rgba<u8> = Rgba([40, 40, 40, 140]);

/// Applies the requested effects, border first, shadow on the bordered
/// result. A no-op spec returns a pixel-identical copy.
pub fn apply_effects(image: &RgbaImage, spec: &EffectsSpec) -> Result<RgbaImage, RenderError> {
    if spec.is_noop() {
        return Ok(image.clone());
    }
    let mut out = image.clone();
    if spec.border_width > 0 {
        out = add_border(&out, spec.border_width, spec.border_color)?;
    }
    if spec.shadow_enabled {
        let (dx, dy) = spec.shadow_offset;
        out = add_shadow(&out, dx, dy)?;
    }
    Ok(out)
}

/// Pads the image symmetrically by `width` pixels of opaque border color and
/// composites the original centered on top, alpha intact.
fn add_border(image: &RgbaImage, width: u32, color: [u8; 3]) -> Result<RgbaImage, RenderError> {
    let (w, h) = image.dimensions();
    let new_w = w
        .checked_add(width.checked_mul(2).ok_or(RenderError::CanvasOverflow)?)
        .ok_or(RenderError::CanvasOverflow)?;
    let new_h = h
        .checked_add(width * 2)
        .ok_or(RenderError::CanvasOverflow)?;
    let mut canvas = RgbaImage::from_pixel(new_w, new_h, Rgba([color[0], color[1], color[2], 255]));
    imageops::overlay(&mut canvas, image, i64::from(width), i64::from(width));
    Ok(canvas)
}

/// Grows the canvas by `|dx|,|dy|` and paints a uniform semi-transparent
/// silhouette of the image offset by `(dx, dy)` beneath the original. Flat
/// shape only, no blur.
fn add_shadow(image: &RgbaImage, dx: i32, dy: i32) -> Result<RgbaImage, RenderError> {
    let (w, h) = image.dimensions();
    let grow_x = dx.unsigned_abs();
    let grow_y = dy.unsigned_abs();
    let canvas_w = w.checked_add(grow_x).ok_or(RenderError::CanvasOverflow)?;
    let canvas_h = h.checked_add(grow_y).ok_or(RenderError::CanvasOverflow)?;
    let mut canvas = RgbaImage::new(canvas_w, canvas_h);

    // The original keeps its corner; the shadow takes the offset one.
    let (orig_x, shadow_x) = if dx >= 0 { (0, grow_x) } else { (grow_x, 0) };
    let (orig_y, shadow_y) = if dy >= 0 { (0, grow_y) } else { (grow_y, 0) };

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] > 0 {
            canvas.put_pixel(x + shadow_x, y + shadow_y, SHADOW_COLOR);
        }
    }
    imageops::overlay(&mut canvas, image, i64::from(orig_x), i64::from(orig_y));
    Ok(canvas)
}
