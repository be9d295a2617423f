//! Result window action.

use async_trait::async_trait;
use sift_core::types::{keys, ExecutionContext};

use super::{Action, ActionResult};
use crate::error::ActionError;
use crate::ui::UiBridge;

/// Screen used when the handler names none.
pub const DEFAULT_SCREEN: &str = "markdown2";

/// Hands the whole context to the UI's result screen.
pub struct WindowAction {
    ui: UiBridge,
}

impl WindowAction {
    pub const NAME: &'static str = "show_window";

    pub fn new(ui: UiBridge) -> Self {
        Self { ui }
    }
}

#[async_trait]
impl Action for WindowAction {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&self, context: &ExecutionContext) -> Result<ActionResult, ActionError> {
        let screen = context
            .get(keys::SCREEN_ID)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SCREEN);
        let title = context.get(keys::TITLE).map(String::as_str).unwrap_or("Sift");

        self.ui.show_result(screen, title, context);
        tracing::info!(screen = %screen, title = %title, "Result window shown");

        Ok(ActionResult::ok(format!("Window shown: {}", title)))
    }
}
