//! Local pixel-manipulation backend
//!
//! Edits the image directly without any remote service. Three methods are
//! available: solid masking of detected regions, content-aware removal by
//! inpainting, and zooming into the first region.

use crate::{
    config::{SettingsReader, LOCAL_BACKEND},
    error::Result,
    image_processing::{crop_clamped, fill_rect_clipped, mask_coverage, rasterize_mask},
    inpaint::inpaint_telea,
    processor::PostProcessor,
    tracing_config::spans,
    types::{PixelBox, ProcessingContext, Region},
    utils::{normalize_to_absolute, padded_box, NumericValidator},
};
use image::{DynamicImage, GenericImageView, Rgba};
use instant::Instant;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Largest accepted inpainting radius; each masked pixel scans `(2r + 1)²` neighbours
pub const MAX_INPAINT_RADIUS: u32 = 64;

/// Method selected for the local backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalMethod {
    /// Paint an opaque rectangle over every padded region
    VisualMask,
    /// Remove regions by inpainting from surrounding texture
    VisualEdit,
    /// Crop to the first region plus relative padding
    ZoomIn,
    /// Unrecognized method name; processing is a pass-through
    Other(String),
}

impl LocalMethod {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::VisualMask => "visual_mask",
            Self::VisualEdit => "visual_edit",
            Self::ZoomIn => "zoom_in",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for LocalMethod {
    fn from(name: &str) -> Self {
        match name {
            "visual_mask" => Self::VisualMask,
            "visual_edit" => Self::VisualEdit,
            "zoom_in" => Self::ZoomIn,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for LocalMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings of the local backend
#[derive(Debug, Clone, PartialEq)]
pub struct LocalManipulationConfig {
    pub method: LocalMethod,
    /// Pixels added on every side of a masked region
    pub mask_padding: u32,
    /// Opaque fill colour for masking
    pub mask_color: [u8; 3],
    /// Neighbourhood radius for inpainting, in pixels
    pub inpaint_radius: u32,
    /// Fraction of the image added on every side of the zoomed region
    pub zoom_padding: f64,
}

impl Default for LocalManipulationConfig {
    fn default() -> Self {
        Self {
            method: LocalMethod::VisualMask,
            mask_padding: 20,
            mask_color: [0, 0, 0],
            inpaint_radius: 3,
            zoom_padding: 0.05,
        }
    }
}

impl LocalManipulationConfig {
    /// Read settings key by key, falling back to defaults for anything missing or invalid
    #[must_use]
    pub fn from_settings(settings: &Value) -> Self {
        let defaults = Self::default();
        let reader = SettingsReader::new(LOCAL_BACKEND, settings);

        Self {
            method: LocalMethod::from(reader.string("method", defaults.method.as_str()).as_str()),
            mask_padding: reader.u32("mask_padding", defaults.mask_padding),
            mask_color: reader.rgb("mask_color", defaults.mask_color),
            inpaint_radius: reader.u32_checked("inpaint_radius", defaults.inpaint_radius, |v| {
                NumericValidator::validate_range(v, 0, MAX_INPAINT_RADIUS, "inpaint_radius")
            }),
            zoom_padding: reader.f64_checked("zoom_padding", defaults.zoom_padding, |v| {
                NumericValidator::validate_range(v, 0.0, 0.5, "zoom_padding")
            }),
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({
            "method": self.method.as_str(),
            "mask_padding": self.mask_padding,
            "mask_color": self.mask_color,
            "inpaint_radius": self.inpaint_radius,
            "zoom_padding": self.zoom_padding,
        })
    }
}

/// Backend that masks, inpaints or crops the image locally
#[derive(Debug, Clone)]
pub struct LocalManipulationProcessor {
    config: LocalManipulationConfig,
}

impl LocalManipulationProcessor {
    #[must_use]
    pub fn new(config: LocalManipulationConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn from_settings(settings: &Value) -> Self {
        Self::new(LocalManipulationConfig::from_settings(settings))
    }

    #[must_use]
    pub fn config(&self) -> &LocalManipulationConfig {
        &self.config
    }

    /// Paint every padded region with the mask colour
    fn apply_visual_mask(&self, image: &DynamicImage, regions: &[Region]) -> DynamicImage {
        let mut output = image.clone();
        let size = output.dimensions();
        let [r, g, b] = self.config.mask_color;
        let color = Rgba([r, g, b, u8::MAX]);

        let painted: u64 = regions
            .iter()
            .map(|region| {
                let pixels = normalize_to_absolute(region, size);
                fill_rect_clipped(&mut output, padded_box(&pixels, self.config.mask_padding), color)
            })
            .sum();

        debug!(regions = regions.len(), painted, "Masked regions");
        output
    }

    /// Inpaint the union of all region boxes
    fn apply_visual_edit(&self, image: &DynamicImage, regions: &[Region]) -> Result<DynamicImage> {
        let size = image.dimensions();
        let boxes: Vec<PixelBox> = regions
            .iter()
            .map(|region| normalize_to_absolute(region, size))
            .collect();
        let mask = rasterize_mask(size, &boxes);

        let coverage = mask_coverage(&mask);
        if coverage == 0 {
            debug!("Inpainting mask is empty, nothing to remove");
            return Ok(image.clone());
        }

        debug!(coverage, radius = self.config.inpaint_radius, "Inpainting masked regions");
        inpaint_telea(image, &mask, self.config.inpaint_radius)
    }

    /// Crop to the first region grown by the zoom padding
    fn apply_zoom_in(&self, image: &DynamicImage, regions: &[Region]) -> DynamicImage {
        let Some(region) = regions.first() else {
            return image.clone();
        };

        let padding = self.config.zoom_padding;
        let x = (region.x - padding).max(0.0);
        let y = (region.y - padding).max(0.0);
        let w = (region.w + 2.0 * padding).min(1.0 - x);
        let h = (region.h + 2.0 * padding).min(1.0 - y);

        let (width, height) = image.dimensions();
        let (width, height) = (f64::from(width), f64::from(height));
        let bounds = (
            (x * width).round() as i64,
            (y * height).round() as i64,
            ((x + w) * width).round() as i64,
            ((y + h) * height).round() as i64,
        );

        match crop_clamped(image, bounds) {
            Some(cropped) => {
                debug!(
                    width = cropped.width(),
                    height = cropped.height(),
                    "Zoomed into first region"
                );
                cropped
            },
            None => {
                warn!(region = %region, "Zoom crop is empty, returning image unchanged");
                image.clone()
            },
        }
    }
}

impl PostProcessor for LocalManipulationProcessor {
    fn process(
        &self,
        image: &DynamicImage,
        regions: &[Region],
        context: &ProcessingContext,
    ) -> Result<DynamicImage> {
        let span = spans::processor(self.name(), self.config.method.as_str());
        let _guard = span.enter();
        let start = Instant::now();

        debug!(
            tool_name = %context.tool_name,
            regions = regions.len(),
            width = context.image_size.0,
            height = context.image_size.1,
            "Running local post-processor"
        );

        let output = match &self.config.method {
            LocalMethod::VisualMask => self.apply_visual_mask(image, regions),
            LocalMethod::VisualEdit => self.apply_visual_edit(image, regions)?,
            LocalMethod::ZoomIn => self.apply_zoom_in(image, regions),
            LocalMethod::Other(name) => {
                debug!(method = %name, "Unrecognized local method, passing image through");
                image.clone()
            },
        };

        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Local post-processor finished");
        Ok(output)
    }

    fn name(&self) -> &str {
        LOCAL_BACKEND
    }
}
