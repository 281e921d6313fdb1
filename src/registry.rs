//! Registry mapping backend names to processor factories
//!
//! The registry is an ordinary value built once at startup and shared by
//! reference (usually behind an `Arc`) with every pipeline that needs to
//! resolve backends. New backends can be registered at any time without
//! touching call sites.

use crate::{
    backends::{LocalManipulationProcessor, RemoteGenerativeProcessor},
    config::{LOCAL_BACKEND, REMOTE_BACKEND},
    error::{PostProcessError, Result},
    processor::{PostProcessor, ProcessorFactory},
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Name-to-factory mapping for post-processing backends
pub struct ProcessorRegistry {
    factories: RwLock<BTreeMap<String, Arc<dyn ProcessorFactory>>>,
}

impl ProcessorRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a registry with the built-in local and remote backends
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(LOCAL_BACKEND, |settings: &Value| {
            Box::new(LocalManipulationProcessor::from_settings(settings)) as Box<dyn PostProcessor>
        });
        registry.register(REMOTE_BACKEND, |settings: &Value| {
            Box::new(RemoteGenerativeProcessor::from_settings(settings)) as Box<dyn PostProcessor>
        });
        registry
    }

    /// Register a factory under `name`, replacing any existing entry
    pub fn register<S, F>(&self, name: S, factory: F)
    where
        S: Into<String>,
        F: ProcessorFactory + 'static,
    {
        let name = name.into();
        let previous = self
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), Arc::new(factory));
        debug!(backend = %name, replaced = previous.is_some(), "Registered post-processor backend");
    }

    /// Instantiate the processor registered under `name` with `settings`
    ///
    /// # Errors
    /// - `PostProcessError::UnknownBackend` when nothing is registered under `name`
    pub fn get(&self, name: &str, settings: &Value) -> Result<Box<dyn PostProcessor>> {
        // Clone the factory out so construction runs without holding the lock
        let factory = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();

        match factory {
            Some(factory) => Ok(factory.create(settings)),
            None => Err(PostProcessError::unknown_backend(name, self.list())),
        }
    }

    /// Registered backend names in sorted order
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("backends", &self.list())
            .finish()
    }
}
