//! Post-processing pipeline entry point
//!
//! Sits between a vision tool and the agent: takes the tool's image and the
//! normalized regions it detected, and returns what the agent should see.
//! The public entry point never fails. Anything that goes wrong is logged and
//! the input is handed back unchanged.

use crate::{
    config::PostProcessConfig,
    error::Result,
    registry::ProcessorRegistry,
    services::SnapshotService,
    tracing_config::{events, spans},
    types::{ProcessingContext, Region, ToolImage},
};
use instant::Instant;
use std::sync::Arc;
use tracing::{debug, warn};

/// Configured pipeline bound to a processor registry
#[derive(Debug, Clone)]
pub struct PostProcessPipeline {
    config: Arc<PostProcessConfig>,
    registry: Arc<ProcessorRegistry>,
}

impl PostProcessPipeline {
    #[must_use]
    pub fn new(config: Arc<PostProcessConfig>, registry: Arc<ProcessorRegistry>) -> Self {
        Self { config, registry }
    }

    /// Pipeline with the built-in backends
    #[must_use]
    pub fn with_config(config: PostProcessConfig) -> Self {
        Self::new(Arc::new(config), Arc::new(ProcessorRegistry::with_defaults()))
    }

    #[must_use]
    pub fn config(&self) -> &PostProcessConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    /// Whether a call would do anything at all
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled && self.config.active_backend().is_some()
    }

    /// Post-process a vision tool's image
    ///
    /// Returns the input unchanged when processing is disabled or when any
    /// step fails.
    ///
    /// # Examples
    /// ```rust
    /// use image::DynamicImage;
    /// use vsp_postprocess::{PostProcessConfig, PostProcessPipeline, Region, ToolImage};
    ///
    /// let config = PostProcessConfig::builder()
    ///     .enabled(true)
    ///     .save_before_image(false)
    ///     .backend_option("local-manipulation", "method", "zoom_in")
    ///     .build()?;
    /// let pipeline = PostProcessPipeline::with_config(config);
    ///
    /// let image = ToolImage::from(DynamicImage::new_rgb8(1000, 1000));
    /// let zoomed = pipeline.apply_postprocess(image, &[Region::new(0.5, 0.5, 0.1, 0.1)], "detection");
    /// assert_eq!(zoomed.dimensions(), (200, 200));
    /// # Ok::<(), vsp_postprocess::PostProcessError>(())
    /// ```
    #[must_use]
    pub fn apply_postprocess(&self, image: ToolImage, regions: &[Region], tool_name: &str) -> ToolImage {
        if !self.is_enabled() {
            return image;
        }

        match self.try_apply(&image, regions, tool_name) {
            Ok(processed) => processed,
            Err(e) => {
                events::absorbed_failure(&e, tool_name, self.config.active_backend().unwrap_or_default());
                image
            },
        }
    }

    /// Run the pipeline, surfacing failures
    ///
    /// Disabled processing yields a copy of the input. A failed snapshot is
    /// logged and does not stop processing.
    ///
    /// # Errors
    /// - `UnknownBackend` when the configured backend is not registered
    /// - Any error returned by the processor
    pub fn try_apply(&self, image: &ToolImage, regions: &[Region], tool_name: &str) -> Result<ToolImage> {
        let Some(backend) = self.config.active_backend().filter(|_| self.config.enabled) else {
            return Ok(image.clone());
        };

        let span = spans::postprocess(tool_name, backend);
        let _guard = span.enter();
        let start = Instant::now();

        for (index, region) in regions.iter().enumerate() {
            if !region.is_normalized() {
                warn!(index, region = %region, "Region outside the unit square, clipping to the image");
            }
        }

        if self.config.save_before_image {
            if let Err(e) =
                SnapshotService::save_before_image(image.displayed(), tool_name, self.config.working_dir.as_deref())
            {
                warn!(error = %e, "Could not save before image");
            }
        }

        let processor = self.registry.get(backend, self.config.backend_settings(backend))?;
        debug!(processor = processor.name(), regions = regions.len(), "Resolved post-processor");

        let target = image.displayed();
        let context = ProcessingContext::for_image(tool_name, target);
        let processed = processor.process(target, regions, &context)?;

        let output = match image {
            ToolImage::Plain(_) => ToolImage::Plain(processed),
            ToolImage::Annotated { original, .. } => ToolImage::annotated(original.clone(), processed),
        };

        events::performance_metric("postprocess", start.elapsed().as_millis() as u64);
        Ok(output)
    }
}
