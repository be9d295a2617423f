//! Validator and context-provider plugins for `custom` handlers.
//!
//! Plugins are registered by name in a [`PluginRegistry`] before the handler
//! type registry is built; a `custom` spec names one of each.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sift_core::types::{keys, CapturedInput, ExecutionContext};

use crate::error::HandlerError;

/// Decides whether a custom handler matches.
pub trait ContentValidator: Send + Sync {
    fn name(&self) -> &str;
    fn validate(&self, input: &CapturedInput) -> bool;
}

/// Builds the context for a custom handler.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn provide(&self, input: &CapturedInput) -> Result<ExecutionContext, HandlerError>;
}

/// Name-keyed plugin tables.
#[derive(Default)]
pub struct PluginRegistry {
    validators: HashMap<String, Arc<dyn ContentValidator>>,
    providers: HashMap<String, Arc<dyn ContextProvider>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `json` validator and provider.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_validator(Arc::new(JsonValidator));
        registry.register_provider(Arc::new(JsonContextProvider));
        registry
    }

    pub fn register_validator(&mut self, validator: Arc<dyn ContentValidator>) {
        let name = validator.name().to_string();
        if self.validators.insert(name.clone(), validator).is_some() {
            tracing::warn!(validator = %name, "Validator re-registered; previous entry replaced");
        }
    }

    pub fn register_provider(&mut self, provider: Arc<dyn ContextProvider>) {
        let name = provider.name().to_string();
        if self.providers.insert(name.clone(), provider).is_some() {
            tracing::warn!(provider = %name, "Context provider re-registered; previous entry replaced");
        }
    }

    pub fn validator(&self, name: &str) -> Option<Arc<dyn ContentValidator>> {
        self.validators.get(name).cloned()
    }

    pub fn provider(&self, name: &str) -> Option<Arc<dyn ContextProvider>> {
        self.providers.get(name).cloned()
    }
}

/// Matches text that parses as a JSON object.
pub struct JsonValidator;

impl ContentValidator for JsonValidator {
    fn name(&self) -> &str {
        "json"
    }

    fn validate(&self, input: &CapturedInput) -> bool {
        input
            .as_text()
            .and_then(|text| serde_json::from_str::<serde_json::Value>(text.trim()).ok())
            .is_some_and(|value| value.is_object())
    }
}

/// Flattens the top-level fields of a JSON object into the context.
///
/// String values are copied as-is; everything else is stored as its JSON text.
pub struct JsonContextProvider;

#[async_trait]
impl ContextProvider for JsonContextProvider {
    fn name(&self) -> &str {
        "json"
    }

    async fn provide(&self, input: &CapturedInput) -> Result<ExecutionContext, HandlerError> {
        let text = input.raw_text();
        let value: serde_json::Value = serde_json::from_str(text.trim())
            .map_err(|e| HandlerError::ContextBuild(format!("invalid JSON: {}", e)))?;
        let object = value
            .as_object()
            .ok_or_else(|| HandlerError::ContextBuild("JSON input is not an object".to_string()))?;

        let mut context = ExecutionContext::new();
        context.insert(keys::INPUT.to_string(), text.clone());
        for (key, value) in object {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            context.insert(key.clone(), rendered);
        }
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_validator() {
        let v = JsonValidator;
        assert!(v.validate(&CapturedInput::text(r#"{"a": 1}"#)));
        assert!(!v.validate(&CapturedInput::text("[1, 2]")));
        assert!(!v.validate(&CapturedInput::text("not json")));
        assert!(!v.validate(&CapturedInput::empty()));
    }

    #[tokio::test]
    async fn test_json_provider_flattens_top_level() {
        let input = CapturedInput::text(r#"{"user": "ada", "id": 7, "tags": ["x"]}"#);
        let context = JsonContextProvider.provide(&input).await.unwrap();
        assert_eq!(context.get("user").map(String::as_str), Some("ada"));
        assert_eq!(context.get("id").map(String::as_str), Some("7"));
        assert_eq!(context.get("tags").map(String::as_str), Some(r#"["x"]"#));
        assert!(context.contains_key(keys::INPUT));
    }

    #[tokio::test]
    async fn test_json_provider_rejects_non_object() {
        let err = JsonContextProvider
            .provide(&CapturedInput::text("42"))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::ContextBuild(_)));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = PluginRegistry::with_builtins();
        assert!(registry.validator("json").is_some());
        assert!(registry.provider("json").is_some());
        assert!(registry.validator("xml").is_none());
        assert!(PluginRegistry::new().provider("json").is_none());
    }
}
