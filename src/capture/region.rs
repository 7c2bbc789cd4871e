//! Pure cropping logic — pixel data in, pixel data out.

use crate::config::Rect;
use crate::error::RelayError;
use image::DynamicImage;

/// Crops a frame to `rect` (left, top, right, bottom in frame coordinates).
///
/// The rectangle must lie fully inside the frame and have positive area;
/// anything else is `InvalidCropRect`. Cropping is a pure function of the
/// input frame — the same frame and rect always yield the same pixels.
pub fn crop_frame(frame: &DynamicImage, rect: Rect) -> Result<DynamicImage, RelayError> {
    let (width, height) = (frame.width(), frame.height());

    let in_bounds = rect.left >= 0
        && rect.top >= 0
        && rect.right > rect.left
        && rect.bottom > rect.top
        && rect.right as u32 <= width
        && rect.bottom as u32 <= height;

    if !in_bounds {
        return Err(RelayError::InvalidCropRect {
            rect,
            width,
            height,
        });
    }

    Ok(frame.crop_imm(
        rect.left as u32,
        rect.top as u32,
        rect.width() as u32,
        rect.height() as u32,
    ))
}
