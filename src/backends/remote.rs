//! Remote generative-editing backend
//!
//! Placeholder for delegating edits to a diffusion service. The configuration
//! surface is complete so deployments can be prepared ahead of time, but the
//! inpainting call itself reports `NotImplemented` and the pipeline falls back
//! to the unmodified image.

use crate::{
    config::{SettingsReader, REMOTE_BACKEND},
    error::{PostProcessError, Result},
    processor::PostProcessor,
    tracing_config::spans,
    types::{ProcessingContext, Region},
};
use image::DynamicImage;
use serde_json::{json, Value};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteMethod {
    /// Regenerate the masked regions from a text prompt
    Inpaint,
    Other(String),
}

impl RemoteMethod {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Inpaint => "inpaint",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for RemoteMethod {
    fn from(name: &str) -> Self {
        match name {
            "inpaint" => Self::Inpaint,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for RemoteMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings of the remote backend
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteGenerativeConfig {
    /// Base URL of the generation service
    pub endpoint: String,
    pub method: RemoteMethod,
    /// Text prompt sent with inpainting requests
    pub prompt: String,
    /// Denoising strength in `[0, 1]`
    pub strength: f64,
}

impl Default for RemoteGenerativeConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:7860".to_string(),
            method: RemoteMethod::Inpaint,
            prompt: String::new(),
            strength: 0.8,
        }
    }
}

impl RemoteGenerativeConfig {
    #[must_use]
    pub fn from_settings(settings: &Value) -> Self {
        let defaults = Self::default();
        let reader = SettingsReader::new(REMOTE_BACKEND, settings);

        Self {
            endpoint: reader.string("endpoint", &defaults.endpoint),
            method: RemoteMethod::from(reader.string("method", defaults.method.as_str()).as_str()),
            prompt: reader.string("prompt", &defaults.prompt),
            strength: reader.f64_checked("strength", defaults.strength, |v| Ok(v.clamp(0.0, 1.0))),
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({
            "endpoint": self.endpoint,
            "method": self.method.as_str(),
            "prompt": self.prompt,
            "strength": self.strength,
        })
    }
}

/// Backend that delegates edits to a remote generation service
#[derive(Debug, Clone)]
pub struct RemoteGenerativeProcessor {
    config: RemoteGenerativeConfig,
}

impl RemoteGenerativeProcessor {
    #[must_use]
    pub fn new(config: RemoteGenerativeConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn from_settings(settings: &Value) -> Self {
        Self::new(RemoteGenerativeConfig::from_settings(settings))
    }

    #[must_use]
    pub fn config(&self) -> &RemoteGenerativeConfig {
        &self.config
    }
}

impl PostProcessor for RemoteGenerativeProcessor {
    fn process(
        &self,
        image: &DynamicImage,
        regions: &[Region],
        context: &ProcessingContext,
    ) -> Result<DynamicImage> {
        let span = spans::processor(self.name(), self.config.method.as_str());
        let _guard = span.enter();

        debug!(
            tool_name = %context.tool_name,
            regions = regions.len(),
            endpoint = %self.config.endpoint,
            "Running remote post-processor"
        );

        match &self.config.method {
            RemoteMethod::Inpaint => {
                warn!(endpoint = %self.config.endpoint, "Remote inpainting requested but not available");
                Err(PostProcessError::not_implemented(format!(
                    "remote inpainting via {} is not available",
                    self.config.endpoint
                )))
            },
            RemoteMethod::Other(name) => {
                debug!(method = %name, "Unrecognized remote method, passing image through");
                Ok(image.clone())
            },
        }
    }

    fn name(&self) -> &str {
        REMOTE_BACKEND
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RemoteGenerativeConfig::from_settings(&Value::Null);
        assert_eq!(config, RemoteGenerativeConfig::default());
        assert_eq!(config.endpoint, "http://localhost:7860");
        assert_eq!(config.method, RemoteMethod::Inpaint);
    }

    #[test]
    fn test_strength_is_clamped() {
        let config = RemoteGenerativeConfig::from_settings(&json!({"strength": 1.7}));
        assert!((config.strength - 1.0).abs() < f64::EPSILON);

        let config = RemoteGenerativeConfig::from_settings(&json!({"strength": -0.2}));
        assert!(config.strength.abs() < f64::EPSILON);

        let config = RemoteGenerativeConfig::from_settings(&json!({"strength": "strong"}));
        assert!((config.strength - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_inpaint_is_not_implemented() {
        let processor = RemoteGenerativeProcessor::from_settings(&json!({
            "endpoint": "http://sd.internal:7860",
        }));
        let image = DynamicImage::new_rgb8(16, 16);
        let context = ProcessingContext::for_image("detection", &image);

        let err = processor
            .process(&image, &[Region::new(0.1, 0.1, 0.2, 0.2)], &context)
            .unwrap_err();
        assert!(err.is_not_implemented());
        assert!(err.to_string().contains("http://sd.internal:7860"));
    }

    #[test]
    fn test_other_method_is_pass_through() {
        let processor = RemoteGenerativeProcessor::from_settings(&json!({"method": "img2img"}));
        let image = DynamicImage::new_rgba8(8, 8);
        let context = ProcessingContext::for_image("detection", &image);

        let result = processor.process(&image, &[], &context).unwrap();
        assert_eq!(result, image);
        assert_eq!(processor.config().method.as_str(), "img2img");
        assert_eq!(processor.name(), REMOTE_BACKEND);
    }
}
