//! URL open action.
//!
//! Hands an http(s) URL to the UI for opening, with scheme validation.

use async_trait::async_trait;
use sift_core::types::{keys, ExecutionContext};

use super::{Action, ActionResult};
use crate::error::ActionError;
use crate::ui::UiBridge;

/// Opens the context's `url` entry, falling back to the formatted output.
///
/// Only allows `http://` and `https://` schemes. Rejects `javascript:`,
/// `file://`, `data:`, and all other schemes.
pub struct UrlOpenAction {
    ui: UiBridge,
}

impl UrlOpenAction {
    pub const NAME: &'static str = "open_url";

    pub fn new(ui: UiBridge) -> Self {
        Self { ui }
    }
}

#[async_trait]
impl Action for UrlOpenAction {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&self, context: &ExecutionContext) -> Result<ActionResult, ActionError> {
        let url = context
            .get("url")
            .or_else(|| context.get(keys::FORMATTED_OUTPUT))
            .map(|s| s.trim())
            .unwrap_or("");

        if url.is_empty() {
            return Err(ActionError::InvalidPayload(
                "URL must not be empty".to_string(),
            ));
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ActionError::InvalidPayload(format!(
                "Unsupported URL scheme. Only http:// and https:// are allowed, got: {}",
                url
            )));
        }

        let mut shown = ExecutionContext::new();
        shown.insert("url".to_string(), url.to_string());
        self.ui.show_result("browser", url, &shown);
        tracing::info!(url = %url, "Opened URL");

        Ok(ActionResult::ok(format!("Opened URL: {}", url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ctx, RecordingUi};

    fn action() -> UrlOpenAction {
        UrlOpenAction::new(UiBridge::new(RecordingUi::new()))
    }

    #[tokio::test]
    async fn test_url_open_https() {
        let result = action()
            .run(&ctx(&[("url", "https://example.com")]))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.message, "Opened URL: https://example.com");
    }

    #[tokio::test]
    async fn test_url_open_from_formatted_output() {
        let result = action()
            .run(&ctx(&[(keys::FORMATTED_OUTPUT, " http://example.com/path?q=1\n")]))
            .await
            .unwrap();
        assert_eq!(result.message, "Opened URL: http://example.com/path?q=1");
    }

    #[tokio::test]
    async fn test_url_open_rejects_other_schemes() {
        for url in [
            "javascript:alert(1)",
            "file:///etc/passwd",
            "data:text/html,<h1>hi</h1>",
            "ftp://files.example.com",
        ] {
            let err = action().run(&ctx(&[("url", url)])).await.unwrap_err();
            assert!(matches!(err, ActionError::InvalidPayload(_)), "{}", url);
        }
    }

    #[tokio::test]
    async fn test_url_open_missing_url() {
        let err = action().run(&ExecutionContext::new()).await.unwrap_err();
        assert!(matches!(err, ActionError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_url_open_shows_result() {
        let ui = RecordingUi::new();
        let action = UrlOpenAction::new(UiBridge::new(ui.clone()));
        action
            .run(&ctx(&[("url", "https://example.com")]))
            .await
            .unwrap();
        let results = ui.results.lock().unwrap();
        assert_eq!(results[0].0, "browser");
        assert_eq!(results[0].2.get("url").map(String::as_str), Some("https://example.com"));
    }
}
