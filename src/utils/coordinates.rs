//! Conversion from normalized regions to pixel space

use crate::types::{PixelBox, Region};

/// Convert a unit-interval region to absolute pixel coordinates
///
/// Each component is multiplied by the matching image dimension and floored.
/// Inputs are not validated: a negative `x` yields a box starting left of the
/// image, which drawing later clips. NaN products become `0` and infinite ones
/// saturate.
///
/// # Examples
/// ```rust
/// use vsp_postprocess::{utils::normalize_to_absolute, PixelBox, Region};
///
/// let pixels = normalize_to_absolute(&Region::new(0.125, 0.25, 0.5, 0.5), (400, 300));
/// assert_eq!(pixels, PixelBox { x: 50, y: 75, w: 200, h: 150 });
/// ```
#[must_use]
pub fn normalize_to_absolute(region: &Region, image_size: (u32, u32)) -> PixelBox {
    let (width, height) = (f64::from(image_size.0), f64::from(image_size.1));
    PixelBox {
        x: (region.x * width).floor() as i64,
        y: (region.y * height).floor() as i64,
        w: (region.w * width).floor() as i64,
        h: (region.h * height).floor() as i64,
    }
}

/// Inclusive corners `(left, top, right, bottom)` of a box grown by `padding` on every side
///
/// Corners may fall outside the image; drawing clips them.
#[must_use]
pub fn padded_box(pixels: &PixelBox, padding: u32) -> (i64, i64, i64, i64) {
    let padding = i64::from(padding);
    (
        pixels.x.saturating_sub(padding),
        pixels.y.saturating_sub(padding),
        pixels.x.saturating_add(pixels.w).saturating_add(padding),
        pixels.y.saturating_add(pixels.h).saturating_add(padding),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncating_conversion() {
        // 0.125 * 400 = 50, 0.167 * 300 = 50.1, 0.333 * 300 = 99.9
        let pixels = normalize_to_absolute(&Region::new(0.125, 0.167, 0.25, 0.333), (400, 300));
        assert_eq!(pixels, PixelBox { x: 50, y: 50, w: 100, h: 99 });
    }

    #[test]
    fn test_width_never_exceeds_image() {
        let sizes = [(1, 1), (7, 3), (640, 480), (1001, 999), (4096, 2160)];
        let fractions = [0.0, 0.001, 0.333, 0.5, 0.999, 1.0];

        for &(width, height) in &sizes {
            for &w in &fractions {
                for &h in &fractions {
                    let pixels = normalize_to_absolute(&Region::new(0.0, 0.0, w, h), (width, height));
                    assert_eq!(pixels.w, (w * f64::from(width)).floor() as i64);
                    assert_eq!(pixels.h, (h * f64::from(height)).floor() as i64);
                    assert!(pixels.w <= i64::from(width));
                    assert!(pixels.h <= i64::from(height));
                }
            }
        }
    }

    #[test]
    fn test_full_region_covers_image() {
        let pixels = normalize_to_absolute(&Region::new(0.0, 0.0, 1.0, 1.0), (1920, 1080));
        assert_eq!(pixels, PixelBox { x: 0, y: 0, w: 1920, h: 1080 });
    }

    #[test]
    fn test_negative_origin_keeps_its_position() {
        // x spans -50..10, not 0..60
        let pixels = normalize_to_absolute(&Region::new(-0.5, 0.0, 0.6, 0.2), (100, 100));
        assert_eq!(pixels, PixelBox { x: -50, y: 0, w: 60, h: 20 });

        // -0.25 * 10 = -2.5 floors to -3
        let pixels = normalize_to_absolute(&Region::new(-0.25, 0.0, 0.5, 0.5), (10, 10));
        assert_eq!(pixels.x, -3);
    }

    #[test]
    fn test_out_of_range_input_is_not_rejected() {
        let pixels = normalize_to_absolute(&Region::new(-0.5, 1.5, 0.1, f64::NAN), (100, 100));
        assert_eq!(pixels, PixelBox { x: -50, y: 150, w: 10, h: 0 });

        let pixels = normalize_to_absolute(&Region::new(0.5, 0.5, f64::INFINITY, 0.1), (100, 100));
        assert_eq!(pixels.w, i64::MAX);
        assert_eq!(padded_box(&pixels, 5).2, i64::MAX);
    }

    #[test]
    fn test_padded_box_goes_negative() {
        let corners = padded_box(&PixelBox { x: 5, y: 10, w: 20, h: 30 }, 8);
        assert_eq!(corners, (-3, 2, 33, 48));
    }
}
