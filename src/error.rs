//! Error types for post-processing operations

use thiserror::Error;

/// Result type alias for post-processing operations
pub type Result<T> = std::result::Result<T, PostProcessError>;

/// Error taxonomy for the post-processing pipeline
#[derive(Error, Debug)]
pub enum PostProcessError {
    /// Input/output errors (snapshot writes, image files, config files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding, encoding or buffer errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// A backend name was requested that is not registered
    #[error("Unknown processor backend '{name}' (registered: {})", .available.join(", "))]
    UnknownBackend {
        name: String,
        available: Vec<String>,
    },

    /// A backend method that is known but intentionally not implemented yet
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A region that violates the unit-interval contract
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    /// Failure while transforming pixels
    #[error("Processing error: {0}")]
    Processing(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PostProcessError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new invalid region error
    pub fn invalid_region<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRegion(msg.into())
    }

    /// Create a new not-implemented error
    pub fn not_implemented<S: Into<String>>(msg: S) -> Self {
        Self::NotImplemented(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an unknown-backend error listing the registered names
    pub fn unknown_backend<S: Into<String>>(name: S, available: Vec<String>) -> Self {
        Self::UnknownBackend {
            name: name.into(),
            available,
        }
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create a snapshot persistence error with the target path
    pub fn snapshot_error<P: AsRef<std::path::Path>>(path: P, error: &image::ImageError) -> Self {
        Self::Processing(format!(
            "Failed to write snapshot '{}': {}",
            path.as_ref().display(),
            error
        ))
    }

    /// Create processing error with stage context
    pub fn processing_stage_error(stage: &str, details: &str, input_info: Option<&str>) -> Self {
        let input_context = match input_info {
            Some(info) => format!(" (input: {})", info),
            None => String::new(),
        };

        Self::Processing(format!(
            "Processing failed at stage '{}'{}: {}",
            stage, input_context, details
        ))
    }

    /// Whether this error is the deliberate placeholder of an unfinished backend
    #[must_use]
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = PostProcessError::invalid_config("test config error");
        assert!(matches!(err, PostProcessError::InvalidConfig(_)));

        let err = PostProcessError::not_implemented("remote inpainting");
        assert!(err.is_not_implemented());

        let err = PostProcessError::invalid_region("x out of range");
        assert!(!err.is_not_implemented());
    }

    #[test]
    fn test_error_display() {
        let err = PostProcessError::invalid_config("blank backend name");
        assert_eq!(err.to_string(), "Invalid configuration: blank backend name");

        let err = PostProcessError::unknown_backend(
            "diffusion",
            vec!["local-manipulation".to_string(), "remote-generative".to_string()],
        );
        assert_eq!(
            err.to_string(),
            "Unknown processor backend 'diffusion' (registered: local-manipulation, remote-generative)"
        );
    }

    #[test]
    fn test_enhanced_error_context() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = PostProcessError::file_io_error("read config file", Path::new("/etc/vsp.json"), &io_error);
        let error_string = err.to_string();
        assert!(error_string.contains("read config file"));
        assert!(error_string.contains("/etc/vsp.json"));

        let err = PostProcessError::processing_stage_error("zoom_in", "empty crop", Some("10x10 RGB"));
        let error_string = err.to_string();
        assert!(error_string.contains("zoom_in"));
        assert!(error_string.contains("10x10 RGB"));
    }
}
