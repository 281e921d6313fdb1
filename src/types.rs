//! Core data types shared by processors and the pipeline

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

/// A detected object's location as fractions of image width and height
///
/// Components are expected to lie in `[0, 1]`. Values outside that range are a
/// contract violation by the producer; see [`crate::utils::RegionValidator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Region {
    #[must_use]
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Whether every component lies in the unit interval
    #[must_use]
    pub fn is_normalized(&self) -> bool {
        [self.x, self.y, self.w, self.h]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
    }
}

impl From<(f64, f64, f64, f64)> for Region {
    fn from((x, y, w, h): (f64, f64, f64, f64)) -> Self {
        Self { x, y, w, h }
    }
}

impl From<[f64; 4]> for Region {
    fn from([x, y, w, h]: [f64; 4]) -> Self {
        Self { x, y, w, h }
    }
}

impl From<Region> for [f64; 4] {
    fn from(region: Region) -> Self {
        [region.x, region.y, region.w, region.h]
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3}, {:.3})", self.x, self.y, self.w, self.h)
    }
}

/// A region converted to absolute pixel coordinates
///
/// Coordinates are signed: a box may start left of or above the image, or
/// extend past it. Drawing clips it to the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelBox {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

/// Image returned by a vision tool
///
/// Some tools return a plain image, others bundle the untouched original with
/// a copy carrying visual markers for the language model.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolImage {
    Plain(DynamicImage),
    Annotated {
        original: DynamicImage,
        annotated: DynamicImage,
    },
}

impl ToolImage {
    #[must_use]
    pub fn annotated(original: DynamicImage, annotated: DynamicImage) -> Self {
        Self::Annotated {
            original,
            annotated,
        }
    }

    /// The view the language model sees
    #[must_use]
    pub fn displayed(&self) -> &DynamicImage {
        match self {
            Self::Plain(image) => image,
            Self::Annotated { annotated, .. } => annotated,
        }
    }

    /// Dimensions of the displayed view
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.displayed().dimensions()
    }

    #[must_use]
    pub fn is_annotated(&self) -> bool {
        matches!(self, Self::Annotated { .. })
    }

    /// Consume the bundle, keeping only the displayed view
    #[must_use]
    pub fn into_displayed(self) -> DynamicImage {
        match self {
            Self::Plain(image) => image,
            Self::Annotated { annotated, .. } => annotated,
        }
    }
}

impl From<DynamicImage> for ToolImage {
    fn from(image: DynamicImage) -> Self {
        Self::Plain(image)
    }
}

/// Per-call metadata handed to a processor alongside the image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingContext {
    /// Name of the vision tool that produced the image
    pub tool_name: String,
    /// `(width, height)` of the image being processed
    pub image_size: (u32, u32),
}

impl ProcessingContext {
    #[must_use]
    pub fn new<S: Into<String>>(tool_name: S, image_size: (u32, u32)) -> Self {
        Self {
            tool_name: tool_name.into(),
            image_size,
        }
    }

    /// Context for an image, taking its size from the buffer
    #[must_use]
    pub fn for_image<S: Into<String>>(tool_name: S, image: &DynamicImage) -> Self {
        Self::new(tool_name, image.dimensions())
    }
}
