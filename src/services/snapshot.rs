//! "Before" snapshots of images entering post-processing
//!
//! Each invocation can persist the image it is about to transform so that the
//! effect of a backend can be inspected afterwards next to the tool's output.

use crate::{
    error::{PostProcessError, Result},
    tracing_config::spans,
};
use chrono::Utc;
use image::{ColorType, DynamicImage, ImageFormat};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Writes PNG snapshots into a working directory
pub struct SnapshotService;

impl SnapshotService {
    /// File name for a snapshot of `tool_name` taken at `timestamp_ms`
    ///
    /// Only `[A-Za-z0-9_-]` survive from the tool name, everything else becomes
    /// `_`, so the name can never leave the working directory.
    #[must_use]
    pub fn snapshot_filename(tool_name: &str, timestamp_ms: i64) -> String {
        let sanitized: String = tool_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        format!("before_postproc_{}_{}.png", sanitized, timestamp_ms.rem_euclid(1_000_000))
    }

    /// Save `image` as a PNG snapshot and return its path
    ///
    /// The directory must exist; without one the current directory is used.
    ///
    /// # Errors
    /// - The image cannot be encoded or the file cannot be written
    pub fn save_before_image(
        image: &DynamicImage,
        tool_name: &str,
        working_dir: Option<&Path>,
    ) -> Result<PathBuf> {
        let filename = Self::snapshot_filename(tool_name, Utc::now().timestamp_millis());
        let path = match working_dir {
            Some(dir) => dir.join(filename),
            None => {
                warn!(
                    filename = %filename,
                    "No working directory configured, saving snapshot to the current directory"
                );
                PathBuf::from(filename)
            },
        };

        let span = spans::snapshot(&path);
        let _guard = span.enter();

        // PNG has no float sample support
        let result = match image.color() {
            ColorType::Rgb32F | ColorType::Rgba32F => {
                DynamicImage::ImageRgba16(image.to_rgba16()).save_with_format(&path, ImageFormat::Png)
            },
            _ => image.save_with_format(&path, ImageFormat::Png),
        };
        result.map_err(|e| PostProcessError::snapshot_error(&path, &e))?;

        info!(path = %path.display(), "Saved before image");
        Ok(path)
    }
}
