//! Configuration types for the post-processing pipeline
//!
//! The configuration is read once at startup from static defaults, an optional
//! JSON file and `VSP_*` environment variables, then shared immutably. Each
//! backend owns one sub-tree under `backends`, keyed by its registry name and
//! stored as raw JSON so that newly registered backends can carry their own
//! keys without changes here.

use crate::backends::{LocalManipulationConfig, RemoteGenerativeConfig};
use crate::error::{PostProcessError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Registry name of the local pixel-manipulation backend
pub const LOCAL_BACKEND: &str = "local-manipulation";

/// Registry name of the remote generative-editing backend
pub const REMOTE_BACKEND: &str = "remote-generative";

/// Environment variable naming the directory for "before" snapshots
pub const WORKING_DIR_ENV: &str = "VSP_WORKING_DIR";

static EMPTY_SETTINGS: Value = Value::Null;

/// Global post-processing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessConfig {
    /// Master switch; when false the pipeline is an identity
    pub enabled: bool,

    /// Registry name of the backend to use (`None` or blank disables processing)
    pub backend: Option<String>,

    /// Persist the image as PNG before it is transformed
    pub save_before_image: bool,

    /// Directory for snapshots (current directory when unset)
    pub working_dir: Option<PathBuf>,

    /// Per-backend settings keyed by registry name
    pub backends: BTreeMap<String, Value>,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        let mut backends = BTreeMap::new();
        backends.insert(LOCAL_BACKEND.to_string(), LocalManipulationConfig::default().to_value());
        backends.insert(REMOTE_BACKEND.to_string(), RemoteGenerativeConfig::default().to_value());

        Self {
            enabled: false,
            backend: Some(LOCAL_BACKEND.to_string()),
            save_before_image: true,
            working_dir: None,
            backends,
        }
    }
}

impl PostProcessConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> PostProcessConfigBuilder {
        PostProcessConfigBuilder::default()
    }

    /// Defaults with process environment overrides applied
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides_from(|key| std::env::var(key).ok());
        config
    }

    /// Load a JSON configuration file; keys missing from the file keep their defaults
    ///
    /// # Errors
    /// - The file cannot be read
    /// - The file is not valid JSON for this structure
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PostProcessError::file_io_error("read configuration file", path, &e))?;
        Self::from_json_str(&content).map_err(|e| match e {
            PostProcessError::InvalidConfig(msg) => {
                PostProcessError::invalid_config(format!("{} ({})", msg, path.display()))
            },
            other => other,
        })
    }

    /// Parse configuration from JSON text
    ///
    /// # Errors
    /// - Malformed JSON or mistyped top-level keys
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| PostProcessError::invalid_config(format!("malformed configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `VSP_*` overrides resolved through `lookup`
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(enabled) = lookup("VSP_POSTPROC_ENABLED").and_then(|v| parse_flag("VSP_POSTPROC_ENABLED", &v)) {
            self.enabled = enabled;
        }
        if let Some(backend) = lookup("VSP_POSTPROC_BACKEND") {
            let backend = backend.trim();
            self.backend = (!backend.is_empty()).then(|| backend.to_string());
        }
        if let Some(save) = lookup("VSP_POSTPROC_SAVE_BEFORE").and_then(|v| parse_flag("VSP_POSTPROC_SAVE_BEFORE", &v)) {
            self.save_before_image = save;
        }
        if let Some(dir) = lookup(WORKING_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            self.working_dir = Some(PathBuf::from(dir));
        }

        let string_overrides = [
            ("VSP_POSTPROC_LOCAL_METHOD", LOCAL_BACKEND, "method"),
            ("VSP_POSTPROC_REMOTE_ENDPOINT", REMOTE_BACKEND, "endpoint"),
            ("VSP_POSTPROC_REMOTE_METHOD", REMOTE_BACKEND, "method"),
            ("VSP_POSTPROC_REMOTE_PROMPT", REMOTE_BACKEND, "prompt"),
        ];
        for (variable, backend, key) in string_overrides {
            if let Some(value) = lookup(variable) {
                self.set_backend_option(backend, key, Value::String(value));
            }
        }

        let integer_overrides = [
            ("VSP_POSTPROC_MASK_PADDING", LOCAL_BACKEND, "mask_padding"),
            ("VSP_POSTPROC_INPAINT_RADIUS", LOCAL_BACKEND, "inpaint_radius"),
        ];
        for (variable, backend, key) in integer_overrides {
            if let Some(raw) = lookup(variable) {
                match raw.trim().parse::<u32>() {
                    Ok(value) => self.set_backend_option(backend, key, Value::from(value)),
                    Err(e) => warn!(variable, value = %raw, error = %e, "Ignoring unparseable override"),
                }
            }
        }

        let float_overrides = [
            ("VSP_POSTPROC_ZOOM_PADDING", LOCAL_BACKEND, "zoom_padding"),
            ("VSP_POSTPROC_REMOTE_STRENGTH", REMOTE_BACKEND, "strength"),
        ];
        for (variable, backend, key) in float_overrides {
            if let Some(raw) = lookup(variable) {
                match raw.trim().parse::<f64>() {
                    Ok(value) if value.is_finite() => {
                        self.set_backend_option(backend, key, Value::from(value));
                    },
                    Ok(value) => warn!(variable, value, "Ignoring non-finite override"),
                    Err(e) => warn!(variable, value = %raw, error = %e, "Ignoring unparseable override"),
                }
            }
        }
    }

    /// The backend to run, if processing should happen at all
    #[must_use]
    pub fn active_backend(&self) -> Option<&str> {
        self.backend
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Settings sub-tree for a backend (`Null` when absent)
    #[must_use]
    pub fn backend_settings(&self, name: &str) -> &Value {
        self.backends.get(name).unwrap_or(&EMPTY_SETTINGS)
    }

    /// Set one key of a backend's settings, creating the sub-tree if needed
    pub fn set_backend_option<K: Into<String>>(&mut self, backend: &str, key: K, value: Value) {
        let entry = self
            .backends
            .entry(backend.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(key.into(), value);
        }
    }

    /// Validate structural consistency
    ///
    /// # Errors
    /// - Blank backend names in `backends`
    pub fn validate(&self) -> Result<()> {
        if let Some(blank) = self.backends.keys().find(|name| name.trim().is_empty()) {
            return Err(PostProcessError::invalid_config(format!(
                "backend settings key '{}' is blank",
                blank
            )));
        }
        Ok(())
    }
}

fn parse_flag(variable: &str, raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!(variable, value = %raw, "Ignoring unparseable boolean override");
            None
        },
    }
}

/// Builder for `PostProcessConfig`
#[derive(Debug, Default)]
pub struct PostProcessConfigBuilder {
    config: PostProcessConfig,
}

impl PostProcessConfigBuilder {
    /// Enable or disable post-processing
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Select the backend by registry name
    #[must_use]
    pub fn backend<S: Into<String>>(mut self, backend: S) -> Self {
        self.config.backend = Some(backend.into());
        self
    }

    /// Clear the backend selection
    #[must_use]
    pub fn no_backend(mut self) -> Self {
        self.config.backend = None;
        self
    }

    /// Enable or disable "before" snapshots
    #[must_use]
    pub fn save_before_image(mut self, save: bool) -> Self {
        self.config.save_before_image = save;
        self
    }

    /// Set the snapshot directory
    #[must_use]
    pub fn working_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.working_dir = Some(dir.into());
        self
    }

    /// Replace a backend's whole settings sub-tree
    #[must_use]
    pub fn backend_settings<S: Into<String>>(mut self, backend: S, settings: Value) -> Self {
        self.config.backends.insert(backend.into(), settings);
        self
    }

    /// Set a single backend option
    #[must_use]
    pub fn backend_option<K: Into<String>, V: Into<Value>>(mut self, backend: &str, key: K, value: V) -> Self {
        self.config.set_backend_option(backend, key, value.into());
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// - Validation failures, see [`PostProcessConfig::validate`]
    pub fn build(self) -> Result<PostProcessConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Typed, per-key view over a backend's settings sub-tree
///
/// Missing keys yield the supplied default silently; keys with the wrong
/// type or an out-of-range value yield the default with a warning.
pub struct SettingsReader<'a> {
    backend: &'a str,
    settings: Option<&'a Map<String, Value>>,
}

impl<'a> SettingsReader<'a> {
    #[must_use]
    pub fn new(backend: &'a str, settings: &'a Value) -> Self {
        let settings = match settings {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                warn!(backend, settings = %other, "Backend settings are not an object, using defaults");
                None
            },
        };
        Self { backend, settings }
    }

    fn raw(&self, key: &str) -> Option<&'a Value> {
        self.settings.and_then(|map| map.get(key))
    }

    fn invalid(&self, key: &str, value: &Value, expected: &str) {
        warn!(
            backend = self.backend,
            key,
            value = %value,
            expected,
            "Invalid backend setting, using default"
        );
    }

    #[must_use]
    pub fn string(&self, key: &str, default: &str) -> String {
        match self.raw(key) {
            None => default.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                self.invalid(key, other, "string");
                default.to_string()
            },
        }
    }

    #[must_use]
    pub fn u32(&self, key: &str, default: u32) -> u32 {
        self.u32_checked(key, default, Ok)
    }

    /// Read a non-negative integer and validate it with `check`
    pub fn u32_checked<F>(&self, key: &str, default: u32, check: F) -> u32
    where
        F: Fn(u32) -> Result<u32>,
    {
        match self.raw(key) {
            None => default,
            Some(value) => match value.as_u64().and_then(|v| u32::try_from(v).ok()).map(&check) {
                Some(Ok(v)) => v,
                Some(Err(e)) => {
                    self.invalid(key, value, &e.to_string());
                    default
                },
                None => {
                    self.invalid(key, value, "non-negative integer");
                    default
                },
            },
        }
    }

    /// Read a float and validate it with `check`
    pub fn f64_checked<F>(&self, key: &str, default: f64, check: F) -> f64
    where
        F: Fn(f64) -> Result<f64>,
    {
        match self.raw(key) {
            None => default,
            Some(value) => match value.as_f64().map(&check) {
                Some(Ok(v)) => v,
                Some(Err(e)) => {
                    self.invalid(key, value, &e.to_string());
                    default
                },
                None => {
                    self.invalid(key, value, "number");
                    default
                },
            },
        }
    }

    #[must_use]
    pub fn rgb(&self, key: &str, default: [u8; 3]) -> [u8; 3] {
        let Some(value) = self.raw(key) else {
            return default;
        };
        let parsed = value.as_array().and_then(|items| {
            let channels = items
                .iter()
                .map(|item| item.as_u64().and_then(|c| u8::try_from(c).ok()))
                .collect::<Option<Vec<u8>>>()?;
            <[u8; 3]>::try_from(channels).ok()
        });
        parsed.unwrap_or_else(|| {
            self.invalid(key, value, "[r, g, b] with 0-255 channels");
            default
        })
    }
}
