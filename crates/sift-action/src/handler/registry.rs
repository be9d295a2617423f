//! Handler type registry: type tag to constructor.
//!
//! Built once at startup and read-only afterwards. Built-in kinds are
//! registered by [`HandlerTypeRegistry::with_builtins`]; embedders add their
//! own with [`HandlerTypeRegistry::register`].

use std::collections::HashMap;
use std::sync::Arc;

use sift_core::condition;
use sift_core::types::HandlerSpec;

use super::custom::CustomHandler;
use super::file::FileHandler;
use super::lookup::LookupHandler;
use super::plugin::PluginRegistry;
use super::regex::RegexHandler;
use super::trigger::{CronHandler, ManualHandler, SyntheticHandler};
use super::{Handler, HandlerFactory, HandlerKind};
use crate::error::HandlerError;

type Constructor = fn(&HandlerSpec, &PluginRegistry) -> Result<Box<dyn HandlerKind>, HandlerError>;

fn construct<T: HandlerFactory>(
    spec: &HandlerSpec,
    plugins: &PluginRegistry,
) -> Result<Box<dyn HandlerKind>, HandlerError> {
    Ok(Box::new(T::from_spec(spec, plugins)?))
}

pub struct HandlerTypeRegistry {
    constructors: HashMap<String, Constructor>,
    plugins: Arc<PluginRegistry>,
}

impl HandlerTypeRegistry {
    /// Empty registry over the given plugins.
    pub fn new(plugins: PluginRegistry) -> Self {
        Self {
            constructors: HashMap::new(),
            plugins: Arc::new(plugins),
        }
    }

    /// Registry with every built-in handler type and the built-in plugins.
    pub fn with_builtins() -> Self {
        Self::with_plugins(PluginRegistry::with_builtins())
    }

    /// Registry with every built-in handler type over caller-supplied plugins.
    pub fn with_plugins(plugins: PluginRegistry) -> Self {
        let mut registry = Self::new(plugins);
        registry.register::<RegexHandler>();
        registry.register::<FileHandler>();
        registry.register::<LookupHandler>();
        registry.register::<CustomHandler>();
        registry.register::<ManualHandler>();
        registry.register::<CronHandler>();
        registry.register::<SyntheticHandler>();
        registry
    }

    /// Register `T` under its `TYPE_NAME`, lowercased. A later registration wins.
    pub fn register<T: HandlerFactory>(&mut self) {
        if self
            .constructors
            .insert(normalize_type(T::TYPE_NAME), construct::<T> as Constructor)
            .is_some()
        {
            tracing::warn!(handler_type = T::TYPE_NAME, "Handler type re-registered; previous entry replaced");
        }
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(&normalize_type(type_name))
    }

    /// Registered type names (lowercased), sorted.
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Build a live handler from a spec.
    ///
    /// Unknown types come back as [`HandlerError::UnknownType`]; callers skip
    /// the spec and carry on.
    pub fn create(&self, spec: &HandlerSpec) -> Result<Handler, HandlerError> {
        if spec.name.trim().is_empty() {
            return Err(HandlerError::config("<unnamed>", "handler name must not be empty"));
        }
        if let Some(condition) = &spec.condition {
            condition::validate(condition)?;
        }
        for request in spec.user_inputs.iter().flatten() {
            if let Some(pattern) = request.validation_regex.as_deref().filter(|p| !p.is_empty()) {
                regex::Regex::new(pattern).map_err(|e| {
                    HandlerError::config(
                        &spec.name,
                        format!("invalid validation_regex for '{}': {}", request.key, e),
                    )
                })?;
            }
        }

        let constructor = self
            .constructors
            .get(&normalize_type(&spec.handler_type))
            .ok_or_else(|| HandlerError::UnknownType(spec.handler_type.clone()))?;
        let kind = constructor(spec, &self.plugins)?;
        Ok(Handler::new(spec.clone(), kind))
    }
}

fn normalize_type(type_name: &str) -> String {
    type_name.trim().to_ascii_lowercase()
}

impl Default for HandlerTypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
