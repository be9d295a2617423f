//! Pattern handler: matches text input against a regular expression.

use async_trait::async_trait;
use regex::Regex;
use sift_core::types::{keys, CapturedInput, ExecutionContext, HandlerSpec};

use super::plugin::PluginRegistry;
use super::{HandlerFactory, HandlerKind};
use crate::error::HandlerError;

/// Writes `input`, `matched`, and one entry per configured group.
///
/// A group name is looked up as a named capture first, then by position
/// (the first listed group is capture 1). With no configured groups, every
/// named capture in the pattern is exported.
pub struct RegexHandler {
    pattern: Regex,
    groups: Vec<String>,
}

impl RegexHandler {
    fn group_value<'t>(&self, caps: &regex::Captures<'t>, index: usize, name: &str) -> &'t str {
        caps.name(name)
            .or_else(|| caps.get(index + 1))
            .map(|m| m.as_str())
            .unwrap_or("")
    }
}

#[async_trait]
impl HandlerKind for RegexHandler {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn matches(&self, input: &CapturedInput) -> bool {
        input.as_text().is_some_and(|text| self.pattern.is_match(text))
    }

    async fn build_context(&self, input: &CapturedInput) -> Result<ExecutionContext, HandlerError> {
        let text = input.as_text().unwrap_or("");
        let mut context = ExecutionContext::new();
        context.insert(keys::INPUT.to_string(), text.to_string());

        let Some(caps) = self.pattern.captures(text) else {
            return Ok(context);
        };
        context.insert(
            keys::MATCHED.to_string(),
            caps.get(0).map(|m| m.as_str()).unwrap_or("").to_string(),
        );

        if self.groups.is_empty() {
            for name in self.pattern.capture_names().flatten() {
                let value = caps.name(name).map(|m| m.as_str()).unwrap_or("");
                context.insert(name.to_string(), value.to_string());
            }
        } else {
            for (index, name) in self.groups.iter().enumerate() {
                let value = self.group_value(&caps, index, name);
                context.insert(name.clone(), value.to_string());
            }
        }
        Ok(context)
    }
}

impl HandlerFactory for RegexHandler {
    const TYPE_NAME: &'static str = "regex";

    fn from_spec(spec: &HandlerSpec, _plugins: &PluginRegistry) -> Result<Self, HandlerError> {
        let source = spec
            .regex
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| HandlerError::config(&spec.name, "missing 'regex'"))?;
        let pattern = Regex::new(source)
            .map_err(|e| HandlerError::config(&spec.name, format!("invalid regex: {}", e)))?;
        Ok(Self {
            pattern,
            groups: spec.groups.clone().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(pattern: &str, groups: &[&str]) -> RegexHandler {
        let mut spec = HandlerSpec::new("errors", "regex");
        spec.regex = Some(pattern.to_string());
        spec.groups = Some(groups.iter().map(|g| g.to_string()).collect());
        RegexHandler::from_spec(&spec, &PluginRegistry::new()).unwrap()
    }

    #[tokio::test]
    async fn test_positional_group() {
        let handler = build(r"ERR-(\d+)", &["code"]);
        let input = CapturedInput::text("ERR-404 Not Found");
        assert!(handler.matches(&input));

        let context = handler.build_context(&input).await.unwrap();
        assert_eq!(context.get("input").map(String::as_str), Some("ERR-404 Not Found"));
        assert_eq!(context.get("matched").map(String::as_str), Some("ERR-404"));
        assert_eq!(context.get("code").map(String::as_str), Some("404"));
    }

    #[tokio::test]
    async fn test_named_group_preferred() {
        let handler = build(r"(?P<host>[a-z]+)\.(?P<tld>com|org)", &["tld", "host"]);
        let context = handler
            .build_context(&CapturedInput::text("visit example.org"))
            .await
            .unwrap();
        assert_eq!(context.get("tld").map(String::as_str), Some("org"));
        assert_eq!(context.get("host").map(String::as_str), Some("example"));
    }

    #[tokio::test]
    async fn test_named_captures_exported_without_groups() {
        let handler = build(r"#(?P<ticket>\d+)", &[]);
        let context = handler
            .build_context(&CapturedInput::text("fixes #12"))
            .await
            .unwrap();
        assert_eq!(context.get("ticket").map(String::as_str), Some("12"));
    }

    #[test]
    fn test_only_text_matches() {
        let handler = build(".*", &[]);
        assert!(handler.matches(&CapturedInput::text("")));
        assert!(!handler.matches(&CapturedInput::files(vec!["/a".into()])));
        assert!(!handler.matches(&CapturedInput::empty()));
    }

    #[test]
    fn test_config_errors() {
        let spec = HandlerSpec::new("bad", "regex");
        assert!(RegexHandler::from_spec(&spec, &PluginRegistry::new()).is_err());

        let mut spec = HandlerSpec::new("bad", "regex");
        spec.regex = Some("(unclosed".to_string());
        let err = RegexHandler::from_spec(&spec, &PluginRegistry::new()).err().unwrap();
        assert!(err.is_config());
    }
}
