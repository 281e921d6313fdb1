//! Image file I/O for the command line front-end

use crate::error::{PostProcessError, Result};
use image::{DynamicImage, ImageFormat};
use std::path::Path;
use tracing::debug;

/// Loads and saves images on disk
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image, falling back to content sniffing when the extension is misleading
    ///
    /// # Examples
    /// ```rust,no_run
    /// use vsp_postprocess::services::ImageIOService;
    ///
    /// let image = ImageIOService::load_image("detection.png")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(PostProcessError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path_ref) {
            Ok(image) => Ok(image),
            Err(e) => {
                debug!(
                    path = %path_ref.display(),
                    error = %e,
                    "Extension-based loading failed, trying content-based detection"
                );

                let data = std::fs::read(path_ref)
                    .map_err(|io_err| PostProcessError::file_io_error("read image data", path_ref, &io_err))?;

                image::load_from_memory(&data).map_err(|content_err| {
                    PostProcessError::processing_stage_error(
                        "image loading",
                        &format!(
                            "extension-based error: {}; content-based error: {}",
                            e, content_err
                        ),
                        Some(&format!("path: {}, size: {} bytes", path_ref.display(), data.len())),
                    )
                })
            },
        }
    }

    /// Save an image, choosing the format from the file extension (PNG when unknown)
    ///
    /// JPEG has no alpha channel, so images with alpha are flattened to RGB first.
    pub fn save_image<P: AsRef<Path>>(image: &DynamicImage, path: P) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| PostProcessError::file_io_error("create output directory", parent, &e))?;
        }

        let format = ImageFormat::from_path(path_ref).unwrap_or(ImageFormat::Png);
        let result = if format == ImageFormat::Jpeg && image.color().has_alpha() {
            DynamicImage::ImageRgb8(image.to_rgb8()).save_with_format(path_ref, format)
        } else {
            image.save_with_format(path_ref, format)
        };

        result.map_err(|e| {
            PostProcessError::processing_stage_error(
                "image save",
                &format!("failed to save as {:?}: {}", format, e),
                Some(&format!("path: {}", path_ref.display())),
            )
        })?;

        debug!(path = %path_ref.display(), ?format, "Saved image");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out.png");
        let image = DynamicImage::new_rgba8(12, 7);

        ImageIOService::save_image(&image, &path).unwrap();
        let loaded = ImageIOService::load_image(&path).unwrap();
        assert_eq!(loaded.dimensions(), (12, 7));
    }

    #[test]
    fn test_jpeg_with_alpha_is_flattened() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.jpg");

        ImageIOService::save_image(&DynamicImage::new_rgba8(8, 8), &path).unwrap();
        let loaded = ImageIOService::load_image(&path).unwrap();
        assert!(!loaded.color().has_alpha());
    }

    #[test]
    fn test_misleading_extension_uses_content() {
        let dir = TempDir::new().unwrap();
        let png = dir.path().join("real.png");
        ImageIOService::save_image(&DynamicImage::new_rgb8(5, 4), &png).unwrap();

        let disguised = dir.path().join("disguised.jpg");
        std::fs::copy(&png, &disguised).unwrap();
        assert_eq!(ImageIOService::load_image(&disguised).unwrap().dimensions(), (5, 4));
    }

    #[test]
    fn test_missing_file() {
        let err = ImageIOService::load_image("/nonexistent/input.png").unwrap_err();
        assert!(matches!(err, PostProcessError::Io(_)));
    }
}
