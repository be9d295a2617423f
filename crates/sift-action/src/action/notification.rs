//! Notification action.
//!
//! Posts the formatted output to the user-visible log as a notice.

use async_trait::async_trait;
use sift_core::types::{keys, ExecutionContext};

use super::{Action, ActionResult};
use crate::error::ActionError;
use crate::ui::{LogLevel, UiBridge};

pub struct NotificationAction {
    ui: UiBridge,
}

impl NotificationAction {
    pub const NAME: &'static str = "show_notification";

    pub fn new(ui: UiBridge) -> Self {
        Self { ui }
    }
}

#[async_trait]
impl Action for NotificationAction {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&self, context: &ExecutionContext) -> Result<ActionResult, ActionError> {
        let body = context
            .get(keys::FORMATTED_OUTPUT)
            .map(String::as_str)
            .unwrap_or("");
        if body.is_empty() {
            return Err(ActionError::InvalidPayload(
                "Notification body must not be empty".to_string(),
            ));
        }
        let title = context.get(keys::TITLE).map(String::as_str).unwrap_or("Sift");

        self.ui.log(LogLevel::Info, &format!("{}: {}", title, body));
        tracing::info!(title = %title, "Notification shown");

        Ok(ActionResult::ok(format!("Notification shown: {}", title)))
    }
}
