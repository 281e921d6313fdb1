//! Post-processor contract and factory abstraction
//!
//! Every backend implements [`PostProcessor`]. Backends are never constructed
//! directly by the pipeline; a [`ProcessorFactory`] registered under a name in
//! the [`crate::registry::ProcessorRegistry`] binds them to their settings.

use crate::{
    error::Result,
    types::{ProcessingContext, Region},
};
use image::DynamicImage;
use serde_json::Value;

/// Trait for post-processing backends
pub trait PostProcessor: Send + Sync {
    /// Transform `image` according to the detected `regions`
    ///
    /// The input is borrowed and never modified; implementations work on a
    /// private copy and return an image of the same colour type. Regions are
    /// normalized `[0, 1]` boxes.
    ///
    /// # Errors
    /// - Backend capability gaps (for example an unimplemented remote method)
    /// - Pixel processing failures
    fn process(
        &self,
        image: &DynamicImage,
        regions: &[Region],
        context: &ProcessingContext,
    ) -> Result<DynamicImage>;

    /// Stable identifier used for logging
    fn name(&self) -> &str;
}

/// Factory that binds a backend to one settings sub-tree
///
/// Construction never fails: missing or invalid settings fall back to
/// documented defaults.
pub trait ProcessorFactory: Send + Sync {
    fn create(&self, settings: &Value) -> Box<dyn PostProcessor>;
}

impl<F> ProcessorFactory for F
where
    F: Fn(&Value) -> Box<dyn PostProcessor> + Send + Sync,
{
    fn create(&self, settings: &Value) -> Box<dyn PostProcessor> {
        self(settings)
    }
}
