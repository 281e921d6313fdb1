#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Visual Sketchpad Post-Processing
//!
//! A pluggable image-transformation stage that sits between a vision tool
//! (object detection, Set-of-Marks segmentation, depth estimation) and the
//! language model that consumes its output. Detected regions arrive as
//! normalized `[0, 1]` boxes; a configured backend turns them into pixel edits
//! before the agent sees the image.
//!
//! ## Features
//!
//! - **Local manipulation**: solid masking, content-aware removal by
//!   fast-marching inpainting, and zooming into a region
//! - **Remote generative editing**: configuration surface for a diffusion
//!   service (inpainting is reported as not implemented)
//! - **Registry**: new backends can be registered by name at runtime
//! - **Never fails**: errors are logged and the tool's image is returned as-is
//! - **Snapshots**: the image before processing is saved for inspection
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust
//! use image::DynamicImage;
//! use vsp_postprocess::{PostProcessConfig, PostProcessPipeline, Region, ToolImage};
//!
//! # fn example() -> vsp_postprocess::Result<()> {
//! let config = PostProcessConfig::builder()
//!     .enabled(true)
//!     .backend("local-manipulation")
//!     .backend_option("local-manipulation", "method", "visual_mask")
//!     .save_before_image(false)
//!     .build()?;
//! let pipeline = PostProcessPipeline::with_config(config);
//!
//! let detection = ToolImage::from(DynamicImage::new_rgb8(640, 480));
//! let regions = [Region::new(0.1, 0.2, 0.3, 0.25)];
//! let masked = pipeline.apply_postprocess(detection, &regions, "detection");
//! assert_eq!(masked.dimensions(), (640, 480));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Configuration
//!
//! [`PostProcessConfig::from_env`] reads `VSP_POSTPROC_*` variables on top of
//! the defaults; [`PostProcessConfig::from_json_file`] loads a JSON file with
//! the same structure. Processing is disabled by default.
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface and tracing subscriber setup
//! - `tracing-json`: JSON log output
//! - `webp-support`: WebP image format support

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod image_processing;
pub mod inpaint;
pub mod pipeline;
pub mod processor;
pub mod registry;
pub mod services;
pub mod tracing_config;
pub mod types;
pub mod utils;

// Public API exports
pub use backends::{
    LocalManipulationConfig, LocalManipulationProcessor, LocalMethod, RemoteGenerativeConfig,
    RemoteGenerativeProcessor, RemoteMethod,
};
pub use config::{PostProcessConfig, PostProcessConfigBuilder, LOCAL_BACKEND, REMOTE_BACKEND};
pub use error::{PostProcessError, Result};
pub use pipeline::PostProcessPipeline;
pub use processor::{PostProcessor, ProcessorFactory};
pub use registry::ProcessorRegistry;
pub use services::{ImageIOService, SnapshotService};
pub use types::{PixelBox, ProcessingContext, Region, ToolImage};
pub use utils::{normalize_to_absolute, NumericValidator, RegionValidator};

pub use tracing_config::{events, spans, TracingConfig, TracingFormat};
#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, init_library_tracing};

/// Post-process one image with the built-in backends
///
/// Convenience for callers that do not keep a pipeline around. The registry is
/// rebuilt on every call, so hold a [`PostProcessPipeline`] when processing
/// many images.
///
/// # Examples
/// ```rust
/// use image::DynamicImage;
/// use vsp_postprocess::{postprocess_image, PostProcessConfig, Region};
///
/// let image = DynamicImage::new_rgb8(64, 64);
/// // disabled by default: the image comes back untouched
/// let result = postprocess_image(image.clone(), &[Region::new(0.0, 0.0, 0.5, 0.5)], "som", &PostProcessConfig::default());
/// assert_eq!(result, image);
/// ```
#[must_use]
pub fn postprocess_image(
    image: image::DynamicImage,
    regions: &[Region],
    tool_name: &str,
    config: &PostProcessConfig,
) -> image::DynamicImage {
    PostProcessPipeline::with_config(config.clone())
        .apply_postprocess(ToolImage::Plain(image), regions, tool_name)
        .into_displayed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn test_postprocess_image_zoom() {
        let config = PostProcessConfig::builder()
            .enabled(true)
            .save_before_image(false)
            .backend_option(LOCAL_BACKEND, "method", "zoom_in")
            .build()
            .unwrap();
        let image = image::DynamicImage::new_rgb8(1000, 1000);

        let result = postprocess_image(image, &[Region::new(0.5, 0.5, 0.1, 0.1)], "detection", &config);
        assert_eq!(result.dimensions(), (200, 200));
    }
}
