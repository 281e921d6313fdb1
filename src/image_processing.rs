//! Pixel-level primitives used by the local processors
//!
//! Drawing here always clips to the image silently: boxes that extend past an
//! edge are painted only where they overlap the image, and boxes entirely
//! outside are ignored.

use crate::types::PixelBox;
use image::{DynamicImage, GenericImageView, GrayImage, Luma, Rgba};
use imageproc::{drawing::draw_filled_rect_mut, rect::Rect};

/// Intersect the inclusive rectangle `[left, right] × [top, bottom]` with the image
fn clip_to_image(
    (left, top, right, bottom): (i64, i64, i64, i64),
    (width, height): (u32, u32),
) -> Option<Rect> {
    let x0 = left.max(0);
    let y0 = top.max(0);
    let x1 = right.min(i64::from(width) - 1);
    let y1 = bottom.min(i64::from(height) - 1);

    if x0 > x1 || y0 > y1 {
        return None;
    }

    let rect = Rect::at(i32::try_from(x0).ok()?, i32::try_from(y0).ok()?)
        .of_size(u32::try_from(x1 - x0 + 1).ok()?, u32::try_from(y1 - y0 + 1).ok()?);
    Some(rect)
}

/// Fill the inclusive rectangle `[left, right] × [top, bottom]` with `color`
///
/// Returns the number of pixels painted after clipping.
pub fn fill_rect_clipped(
    image: &mut DynamicImage,
    corners: (i64, i64, i64, i64),
    color: Rgba<u8>,
) -> u64 {
    let Some(rect) = clip_to_image(corners, image.dimensions()) else {
        return 0;
    };

    draw_filled_rect_mut(image, rect, color);
    u64::from(rect.width()) * u64::from(rect.height())
}

/// Rasterize pixel boxes into a binary mask of `size`
///
/// Each box covers `[x, x + w) × [y, y + h)`; overlapping boxes union.
#[must_use]
pub fn rasterize_mask(size: (u32, u32), boxes: &[PixelBox]) -> GrayImage {
    let mut mask = GrayImage::new(size.0, size.1);

    for pixels in boxes {
        if pixels.w <= 0 || pixels.h <= 0 {
            continue;
        }
        let corners = (
            pixels.x,
            pixels.y,
            pixels.x.saturating_add(pixels.w - 1),
            pixels.y.saturating_add(pixels.h - 1),
        );
        if let Some(rect) = clip_to_image(corners, size) {
            draw_filled_rect_mut(&mut mask, rect, Luma([255u8]));
        }
    }

    mask
}

/// Number of set pixels in a binary mask
#[must_use]
pub fn mask_coverage(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p.0[0] > 0).count()
}

/// Crop `[left, right) × [top, bottom)` after clamping to the image
///
/// Returns `None` when the clamped area is empty. The result keeps the
/// colour type of the input.
#[must_use]
pub fn crop_clamped(
    image: &DynamicImage,
    (left, top, right, bottom): (i64, i64, i64, i64),
) -> Option<DynamicImage> {
    let (width, height) = image.dimensions();
    let x0 = left.clamp(0, i64::from(width));
    let y0 = top.clamp(0, i64::from(height));
    let x1 = right.clamp(x0, i64::from(width));
    let y1 = bottom.clamp(y0, i64::from(height));

    if x1 == x0 || y1 == y0 {
        return None;
    }

    Some(image.crop_imm(
        x0 as u32,
        y0 as u32,
        (x1 - x0) as u32,
        (y1 - y0) as u32,
    ))
}
