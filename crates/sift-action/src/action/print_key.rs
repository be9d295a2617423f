//! Print-key action: logs one context value.

use async_trait::async_trait;
use sift_core::types::{keys, ExecutionContext};

use super::{Action, ActionResult};
use crate::error::ActionError;

/// Writes the formatted output to the log and returns it as the result output.
pub struct PrintKeyAction;

impl PrintKeyAction {
    pub const NAME: &'static str = "simple_print_key";
}

#[async_trait]
impl Action for PrintKeyAction {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&self, context: &ExecutionContext) -> Result<ActionResult, ActionError> {
        let output = context
            .get(keys::FORMATTED_OUTPUT)
            .cloned()
            .unwrap_or_default();
        tracing::info!(output = %output, "Printed key");
        Ok(ActionResult::ok("Printed").with_output(output))
    }
}
