//! Custom handler: matching and context delegated to registered plugins.

use std::sync::Arc;

use async_trait::async_trait;
use sift_core::types::{keys, CapturedInput, ExecutionContext, HandlerSpec};

use super::plugin::{ContentValidator, ContextProvider, PluginRegistry};
use super::{HandlerFactory, HandlerKind};
use crate::error::HandlerError;

/// Handler whose match and context come from named plugins.
pub struct CustomHandler {
    validator: Arc<dyn ContentValidator>,
    provider: Arc<dyn ContextProvider>,
}

#[async_trait]
impl HandlerKind for CustomHandler {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn matches(&self, input: &CapturedInput) -> bool {
        self.validator.validate(input)
    }

    async fn build_context(&self, input: &CapturedInput) -> Result<ExecutionContext, HandlerError> {
        let mut context = self.provider.provide(input).await?;
        if !context.contains_key(keys::INPUT) {
            context.shift_insert(0, keys::INPUT.to_string(), input.raw_text());
        }
        Ok(context)
    }
}

impl HandlerFactory for CustomHandler {
    const TYPE_NAME: &'static str = "custom";

    fn from_spec(spec: &HandlerSpec, plugins: &PluginRegistry) -> Result<Self, HandlerError> {
        let validator_name = spec
            .validator
            .as_deref()
            .ok_or_else(|| HandlerError::config(&spec.name, "missing 'validator'"))?;
        let provider_name = spec
            .context_provider
            .as_deref()
            .ok_or_else(|| HandlerError::config(&spec.name, "missing 'context_provider'"))?;

        let validator = plugins.validator(validator_name).ok_or_else(|| {
            HandlerError::config(&spec.name, format!("unknown validator '{}'", validator_name))
        })?;
        let provider = plugins.provider(provider_name).ok_or_else(|| {
            HandlerError::config(
                &spec.name,
                format!("unknown context provider '{}'", provider_name),
            )
        })?;
        Ok(Self {
            validator,
            provider,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Uppercase;

    #[async_trait]
    impl ContextProvider for Uppercase {
        fn name(&self) -> &str {
            "upper"
        }

        async fn provide(&self, input: &CapturedInput) -> Result<ExecutionContext, HandlerError> {
            let mut context = ExecutionContext::new();
            context.insert("upper".to_string(), input.raw_text().to_uppercase());
            Ok(context)
        }
    }

    fn plugins() -> PluginRegistry {
        let mut plugins = PluginRegistry::with_builtins();
        plugins.register_provider(Arc::new(Uppercase));
        plugins
    }

    fn spec(validator: &str, provider: &str) -> HandlerSpec {
        let mut spec = HandlerSpec::new("custom", "custom");
        spec.validator = Some(validator.to_string());
        spec.context_provider = Some(provider.to_string());
        spec
    }

    #[tokio::test]
    async fn test_plugins_drive_match_and_context() {
        let handler = CustomHandler::from_spec(&spec("json", "upper"), &plugins()).unwrap();
        let input = CapturedInput::text(r#"{"a": "b"}"#);
        assert!(handler.matches(&input));
        assert!(!handler.matches(&CapturedInput::text("plain")));

        let context = handler.build_context(&input).await.unwrap();
        let keys: Vec<&String> = context.keys().collect();
        assert_eq!(keys, vec!["input", "upper"]);
        assert_eq!(context.get("upper").map(String::as_str), Some(r#"{"A": "B"}"#));
    }

    #[test]
    fn test_unknown_plugins_rejected() {
        assert!(CustomHandler::from_spec(&spec("xml", "json"), &plugins()).is_err());
        assert!(CustomHandler::from_spec(&spec("json", "xml"), &plugins()).is_err());
        assert!(CustomHandler::from_spec(&HandlerSpec::new("c", "custom"), &plugins()).is_err());
    }
}
