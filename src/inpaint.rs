//! Fast-marching inpainting (Telea, 2004)
//!
//! Masked pixels are filled in order of their distance from the mask
//! boundary. Each one is estimated from the already-known pixels within
//! `radius`, weighted by direction along the distance gradient, geometric
//! distance and level-set proximity, with a first-order gradient correction.
//! Pixels outside the mask are never written.

use crate::error::{PostProcessError, Result};
use image::{DynamicImage, GenericImageView, GrayImage, ImageBuffer, Pixel};
use ndarray::{Array2, Array3};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::trace;

const KNOWN: u8 = 0;
const BAND: u8 = 1;
const INSIDE: u8 = 2;

const UNREACHED: f32 = 1.0e6;

/// Channel sample types the marcher can read and write
trait Sample: Copy {
    fn to_f32(self) -> f32;
    fn from_f32(value: f32) -> Self;
}

impl Sample for u8 {
    fn to_f32(self) -> f32 {
        f32::from(self)
    }

    fn from_f32(value: f32) -> Self {
        value.round().clamp(0.0, f32::from(u8::MAX)) as u8
    }
}

impl Sample for u16 {
    fn to_f32(self) -> f32 {
        f32::from(self)
    }

    fn from_f32(value: f32) -> Self {
        value.round().clamp(0.0, f32::from(u16::MAX)) as u16
    }
}

impl Sample for f32 {
    fn to_f32(self) -> f32 {
        self
    }

    fn from_f32(value: f32) -> Self {
        value
    }
}

/// Narrow-band entry ordered so that `BinaryHeap` pops the smallest distance first
#[derive(Debug, Clone, Copy)]
struct BandPixel {
    distance: f32,
    y: usize,
    x: usize,
}

impl PartialEq for BandPixel {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BandPixel {}

impl PartialOrd for BandPixel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BandPixel {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.y.cmp(&self.y))
            .then_with(|| other.x.cmp(&self.x))
    }
}

/// Inpaint the white pixels of `mask` in `image`
///
/// `mask` must have the same dimensions as `image`. The result has the same
/// colour type as the input; a radius of `0` is treated as `1`.
///
/// # Errors
/// - Mask dimensions differ from the image
/// - Colour types the marcher has no sample conversion for
pub fn inpaint_telea(image: &DynamicImage, mask: &GrayImage, radius: u32) -> Result<DynamicImage> {
    if image.dimensions() != mask.dimensions() {
        return Err(PostProcessError::processing(format!(
            "inpainting mask is {}x{} but image is {}x{}",
            mask.width(),
            mask.height(),
            image.width(),
            image.height()
        )));
    }

    let radius = radius.max(1);
    let inpainted = match image {
        DynamicImage::ImageLuma8(buffer) => DynamicImage::ImageLuma8(inpaint_buffer(buffer, mask, radius)?),
        DynamicImage::ImageLumaA8(buffer) => DynamicImage::ImageLumaA8(inpaint_buffer(buffer, mask, radius)?),
        DynamicImage::ImageRgb8(buffer) => DynamicImage::ImageRgb8(inpaint_buffer(buffer, mask, radius)?),
        DynamicImage::ImageRgba8(buffer) => DynamicImage::ImageRgba8(inpaint_buffer(buffer, mask, radius)?),
        DynamicImage::ImageLuma16(buffer) => DynamicImage::ImageLuma16(inpaint_buffer(buffer, mask, radius)?),
        DynamicImage::ImageLumaA16(buffer) => DynamicImage::ImageLumaA16(inpaint_buffer(buffer, mask, radius)?),
        DynamicImage::ImageRgb16(buffer) => DynamicImage::ImageRgb16(inpaint_buffer(buffer, mask, radius)?),
        DynamicImage::ImageRgba16(buffer) => DynamicImage::ImageRgba16(inpaint_buffer(buffer, mask, radius)?),
        DynamicImage::ImageRgb32F(buffer) => DynamicImage::ImageRgb32F(inpaint_buffer(buffer, mask, radius)?),
        DynamicImage::ImageRgba32F(buffer) => DynamicImage::ImageRgba32F(inpaint_buffer(buffer, mask, radius)?),
        other => {
            return Err(PostProcessError::processing(format!(
                "inpainting does not support colour type {:?}",
                other.color()
            )))
        },
    };

    Ok(inpainted)
}

fn inpaint_buffer<P>(
    buffer: &ImageBuffer<P, Vec<P::Subpixel>>,
    mask: &GrayImage,
    radius: u32,
) -> Result<ImageBuffer<P, Vec<P::Subpixel>>>
where
    P: Pixel,
    P::Subpixel: Sample,
{
    let mut output = buffer.clone();
    let (width, height) = buffer.dimensions();
    let channels = usize::from(P::CHANNEL_COUNT);

    let mut marcher = FastMarcher::new(&output, width as usize, height as usize, channels, mask, radius)?;
    marcher.run();
    marcher.write_back(&mut output);

    Ok(output)
}

struct FastMarcher {
    width: usize,
    height: usize,
    channels: usize,
    radius: i64,
    flags: Array2<u8>,
    masked: Array2<bool>,
    distance: Array2<f32>,
    values: Array3<f32>,
    band: BinaryHeap<BandPixel>,
}

impl FastMarcher {
    fn new<T: Sample>(
        data: &[T],
        width: usize,
        height: usize,
        channels: usize,
        mask: &GrayImage,
        radius: u32,
    ) -> Result<Self> {
        let values = Array3::from_shape_vec(
            (height, width, channels),
            data.iter().map(|sample| sample.to_f32()).collect(),
        )
        .map_err(|e| PostProcessError::internal(format!("pixel buffer shape mismatch: {}", e)))?;

        let masked = Array2::from_shape_fn((height, width), |(y, x)| {
            mask.get_pixel(x as u32, y as u32).0[0] > 0
        });
        let flags = masked.mapv(|inside| if inside { INSIDE } else { KNOWN });
        let distance = masked.mapv(|inside| if inside { UNREACHED } else { 0.0 });

        let mut marcher = Self {
            width,
            height,
            channels,
            radius: i64::from(radius),
            flags,
            masked,
            distance,
            values,
            band: BinaryHeap::new(),
        };
        marcher.seed_band();
        Ok(marcher)
    }

    /// Known pixels touching the mask form the initial narrow band
    fn seed_band(&mut self) {
        for y in 0..self.height {
            for x in 0..self.width {
                if self.flags[[y, x]] != KNOWN {
                    continue;
                }
                let touches_mask = self
                    .neighbours(y, x)
                    .any(|(ny, nx)| self.flags[[ny, nx]] == INSIDE);
                if touches_mask {
                    self.flags[[y, x]] = BAND;
                    self.band.push(BandPixel { distance: 0.0, y, x });
                }
            }
        }
        trace!(band = self.band.len(), "Seeded inpainting band");
    }

    fn neighbours(&self, y: usize, x: usize) -> impl Iterator<Item = (usize, usize)> {
        let (height, width) = (self.height, self.width);
        let candidates = [
            (y.checked_sub(1), Some(x)),
            (Some(y + 1), Some(x)),
            (Some(y), x.checked_sub(1)),
            (Some(y), Some(x + 1)),
        ];
        candidates.into_iter().filter_map(move |(ny, nx)| match (ny, nx) {
            (Some(ny), Some(nx)) if ny < height && nx < width => Some((ny, nx)),
            _ => None,
        })
    }

    fn run(&mut self) {
        while let Some(BandPixel { y, x, .. }) = self.band.pop() {
            if self.flags[[y, x]] == KNOWN {
                continue;
            }
            self.flags[[y, x]] = KNOWN;

            let inside: Vec<(usize, usize)> = self
                .neighbours(y, x)
                .filter(|&(ny, nx)| self.flags[[ny, nx]] == INSIDE)
                .collect();

            for (ny, nx) in inside {
                let distance = self.solve_distance(ny, nx);
                self.distance[[ny, nx]] = distance;
                self.flags[[ny, nx]] = BAND;
                self.inpaint_pixel(ny, nx);
                self.band.push(BandPixel { distance, y: ny, x: nx });
            }
        }
    }

    fn flag_at(&self, y: i64, x: i64) -> Option<u8> {
        if y < 0 || x < 0 || y >= self.height as i64 || x >= self.width as i64 {
            return None;
        }
        Some(self.flags[[y as usize, x as usize]])
    }

    /// Eikonal update from the two diagonal neighbour pairs around `(y, x)`
    fn solve_distance(&self, y: usize, x: usize) -> f32 {
        let (y, x) = (y as i64, x as i64);
        [
            ((y - 1, x), (y, x - 1)),
            ((y + 1, x), (y, x - 1)),
            ((y - 1, x), (y, x + 1)),
            ((y + 1, x), (y, x + 1)),
        ]
        .into_iter()
        .map(|(a, b)| self.solve_pair(a, b))
        .fold(UNREACHED, f32::min)
    }

    fn solve_pair(&self, (y1, x1): (i64, i64), (y2, x2): (i64, i64)) -> f32 {
        let known = |y, x| self.flag_at(y, x) == Some(KNOWN);
        let distance = |y: i64, x: i64| self.distance[[y as usize, x as usize]];

        match (known(y1, x1), known(y2, x2)) {
            (true, true) => {
                let (d1, d2) = (distance(y1, x1), distance(y2, x2));
                let r = (2.0 - (d1 - d2) * (d1 - d2)).max(0.0).sqrt();
                let s = (d1 + d2 - r) / 2.0;
                if s >= d1 && s >= d2 {
                    s
                } else if s + r >= d1 && s + r >= d2 {
                    s + r
                } else {
                    UNREACHED
                }
            },
            (true, false) => 1.0 + distance(y1, x1),
            (false, true) => 1.0 + distance(y2, x2),
            (false, false) => UNREACHED,
        }
    }

    fn is_filled(&self, y: i64, x: i64) -> bool {
        matches!(self.flag_at(y, x), Some(KNOWN | BAND))
    }

    /// Central difference where both sides are filled, one-sided otherwise
    fn difference<F>(&self, y: i64, x: i64, (dy, dx): (i64, i64), sample: F) -> f32
    where
        F: Fn(usize, usize) -> f32,
    {
        let (py, px) = (y + dy, x + dx);
        let (ny, nx) = (y - dy, x - dx);
        match (self.is_filled(py, px), self.is_filled(ny, nx)) {
            (true, true) => (sample(py as usize, px as usize) - sample(ny as usize, nx as usize)) / 2.0,
            (true, false) => sample(py as usize, px as usize) - sample(y as usize, x as usize),
            (false, true) => sample(y as usize, x as usize) - sample(ny as usize, nx as usize),
            (false, false) => 0.0,
        }
    }

    fn inpaint_pixel(&mut self, y: usize, x: usize) {
        let (py, px) = (y as i64, x as i64);
        let distance_at = |yy: usize, xx: usize| self.distance[[yy, xx]];
        let grad_y = self.difference(py, px, (1, 0), distance_at);
        let grad_x = self.difference(py, px, (0, 1), distance_at);
        let here = self.distance[[y, x]];

        let mut weighted = vec![0.0f32; self.channels];
        let mut low = vec![f32::INFINITY; self.channels];
        let mut high = vec![f32::NEG_INFINITY; self.channels];
        let mut total_weight = 0.0f32;
        let radius_sq = (self.radius * self.radius) as f32;

        for qy in (py - self.radius)..=(py + self.radius) {
            for qx in (px - self.radius)..=(px + self.radius) {
                if !self.is_filled(qy, qx) {
                    continue;
                }
                let ry = (py - qy) as f32;
                let rx = (px - qx) as f32;
                let length_sq = ry * ry + rx * rx;
                if length_sq == 0.0 || length_sq > radius_sq {
                    continue;
                }
                let length = length_sq.sqrt();
                let (uy, ux) = (qy as usize, qx as usize);

                let direction = ((rx * grad_x + ry * grad_y).abs() / length).max(1.0e-6);
                let geometric = 1.0 / length_sq;
                let level = 1.0 / (1.0 + (self.distance[[uy, ux]] - here).abs());
                let weight = direction * geometric * level;

                for channel in 0..self.channels {
                    let sample = |yy: usize, xx: usize| self.values[[yy, xx, channel]];
                    let gy = self.difference(qy, qx, (1, 0), sample);
                    let gx = self.difference(qy, qx, (0, 1), sample);
                    let value = self.values[[uy, ux, channel]];

                    weighted[channel] += weight * (value + gx * rx + gy * ry);
                    low[channel] = low[channel].min(value);
                    high[channel] = high[channel].max(value);
                }
                total_weight += weight;
            }
        }

        if total_weight > 0.0 {
            for channel in 0..self.channels {
                self.values[[y, x, channel]] =
                    (weighted[channel] / total_weight).clamp(low[channel], high[channel]);
            }
        }
    }

    fn write_back<T: Sample>(&self, data: &mut [T]) {
        let channels = self.channels;
        let width = self.width;
        for (index, sample) in data.iter_mut().enumerate() {
            let pixel = index / channels;
            let (y, x) = (pixel / width, pixel % width);
            if self.masked[[y, x]] {
                *sample = T::from_f32(self.values[[y, x, index % channels]]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_processing::rasterize_mask;
    use crate::types::PixelBox;
    use image::{Luma, Rgb, RgbImage, Rgba, RgbaImage};

    fn striped_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgb([200, 40, 40])
            } else {
                Rgb([40, 40, 200])
            }
        })
    }

    #[test]
    fn test_uniform_image_fills_with_same_colour() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([90, 120, 150])));
        let mask = rasterize_mask((32, 32), &[PixelBox { x: 10, y: 10, w: 8, h: 8 }]);

        let result = inpaint_telea(&image, &mask, 3).unwrap();
        let result = result.as_rgb8().unwrap();
        for pixel in result.pixels() {
            assert_eq!(*pixel, Rgb([90, 120, 150]));
        }
    }

    #[test]
    fn test_unmasked_pixels_untouched() {
        let mut source = striped_image(40, 30);
        // a dark blob that the mask removes
        for y in 12..18 {
            for x in 5..12 {
                source.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        let image = DynamicImage::ImageRgb8(source.clone());
        let mask = rasterize_mask((40, 30), &[PixelBox { x: 5, y: 12, w: 7, h: 6 }]);

        let result = inpaint_telea(&image, &mask, 3).unwrap();
        let result = result.as_rgb8().unwrap();

        for (x, y, pixel) in result.enumerate_pixels() {
            if mask.get_pixel(x, y).0[0] == 0 {
                assert_eq!(pixel, source.get_pixel(x, y));
            } else {
                // the blob sits inside the red half, so it is replaced by red
                assert_eq!(*pixel, Rgb([200, 40, 40]), "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_filled_values_stay_within_border_range() {
        let source = RgbImage::from_fn(24, 24, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 128]));
        let image = DynamicImage::ImageRgb8(source);
        let mask = rasterize_mask((24, 24), &[PixelBox { x: 8, y: 8, w: 8, h: 8 }]);

        let result = inpaint_telea(&image, &mask, 4).unwrap();
        let result = result.as_rgb8().unwrap();
        for y in 8..16 {
            for x in 8..16 {
                let [r, g, b] = result.get_pixel(x, y).0;
                assert!((56..=128).contains(&r), "r={} at ({}, {})", r, x, y);
                assert!((56..=128).contains(&g), "g={} at ({}, {})", g, x, y);
                assert_eq!(b, 128);
            }
        }
    }

    #[test]
    fn test_empty_mask_is_identity() {
        let image = DynamicImage::ImageRgb8(striped_image(16, 16));
        let mask = GrayImage::new(16, 16);
        let result = inpaint_telea(&image, &mask, 3).unwrap();
        assert_eq!(result, image);
    }

    #[test]
    fn test_fully_masked_image_is_left_as_is() {
        let image = DynamicImage::ImageRgb8(striped_image(8, 8));
        let mask = GrayImage::from_pixel(8, 8, Luma([255]));
        let result = inpaint_telea(&image, &mask, 3).unwrap();
        assert_eq!(result, image);
    }

    #[test]
    fn test_preserves_colour_type() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(12, 12, Rgba([10, 20, 30, 255])));
        let luma16 = DynamicImage::ImageLuma16(ImageBuffer::from_pixel(12, 12, Luma([40_000u16])));
        let mask = rasterize_mask((12, 12), &[PixelBox { x: 3, y: 3, w: 4, h: 4 }]);

        let result = inpaint_telea(&rgba, &mask, 2).unwrap();
        assert_eq!(result.color(), rgba.color());
        assert_eq!(result.as_rgba8().unwrap().get_pixel(4, 4).0, [10, 20, 30, 255]);

        let result = inpaint_telea(&luma16, &mask, 2).unwrap();
        assert_eq!(result.color(), luma16.color());
        assert_eq!(result.as_luma16().unwrap().get_pixel(4, 4).0, [40_000]);
    }

    #[test]
    fn test_mask_size_mismatch_is_error() {
        let image = DynamicImage::new_rgb8(10, 10);
        let mask = GrayImage::new(5, 5);
        assert!(inpaint_telea(&image, &mask, 3).is_err());
    }

    #[test]
    fn test_band_pops_smallest_distance_first() {
        let mut heap = BinaryHeap::new();
        heap.push(BandPixel { distance: 2.0, y: 0, x: 0 });
        heap.push(BandPixel { distance: 0.5, y: 1, x: 1 });
        heap.push(BandPixel { distance: 1.0, y: 2, x: 2 });
        assert_eq!(heap.pop().map(|p| p.distance), Some(0.5));
        assert_eq!(heap.pop().map(|p| p.distance), Some(1.0));
        assert_eq!(heap.pop().map(|p| p.distance), Some(2.0));
    }
}
