//! Action trait, registry, and condition-gated dispatcher.
//!
//! Actions are looked up by name from an [`ActionRegistry`] built once at
//! startup. [`ActionRegistry::dispatch`] is the only path handlers use: it
//! evaluates the handler's condition, runs the confirmation round-trip when
//! the handler asks for one, and then runs the action.

mod notification;
mod print_key;
mod url_open;
mod window;

pub use notification::NotificationAction;
pub use print_key::PrintKeyAction;
pub use url_open::UrlOpenAction;
pub use window::WindowAction;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sift_core::condition;
use sift_core::types::{keys, ExecutionContext, HandlerSpec};

use crate::error::ActionError;
use crate::ui::UiBridge;

/// Result of a single action run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    pub output: Option<String>,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            output: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }
}

/// What happened to one dispatched action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Executed(ActionResult),
    ConditionFailed,
    /// Confirmation declined while enforcement is on.
    Declined,
}

/// A named side effect driven by an execution context.
#[async_trait]
pub trait Action: Send + Sync {
    /// Registry name, as referenced from handler `actions` lists.
    fn name(&self) -> &str;

    /// Run against the full context.
    async fn run(&self, context: &ExecutionContext) -> Result<ActionResult, ActionError>;

    /// Run for a single key: the key's value becomes the formatted output.
    async fn run_key(
        &self,
        key: &str,
        context: &ExecutionContext,
    ) -> Result<ActionResult, ActionError> {
        let value = context.get(key).ok_or_else(|| {
            ActionError::InvalidPayload(format!("Key '{}' not present in context", key))
        })?;
        let mut scoped = context.clone();
        scoped.insert(keys::FORMATTED_OUTPUT.to_string(), value.clone());
        self.run(&scoped).await
    }
}

/// Name-keyed table of actions.
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// Register an action. A later registration under the same name wins.
    pub fn register(&mut self, action: Arc<dyn Action>) {
        let name = action.name().to_string();
        if self.actions.insert(name.clone(), action).is_some() {
            tracing::warn!(action = %name, "Action re-registered; previous entry replaced");
        }
    }

    /// Register the built-in actions.
    pub fn register_defaults(&mut self, ui: UiBridge) {
        self.register(Arc::new(NotificationAction::new(ui.clone())));
        self.register(Arc::new(WindowAction::new(ui.clone())));
        self.register(Arc::new(PrintKeyAction));
        self.register(Arc::new(UrlOpenAction::new(ui)));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.actions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Condition-gated, optionally confirmed run of the named action.
    pub async fn dispatch(
        &self,
        name: &str,
        spec: &HandlerSpec,
        context: &ExecutionContext,
        ui: &UiBridge,
    ) -> Result<DispatchOutcome, ActionError> {
        let action = self
            .get(name)
            .ok_or_else(|| ActionError::Unregistered(name.to_string()))?;

        if !condition::evaluate(spec.condition.as_ref(), context)? {
            tracing::info!(handler = %spec.name, action = %name, "Condition not met; action skipped");
            return Ok(DispatchOutcome::ConditionFailed);
        }

        if spec.requires_confirmation {
            let message = format!("Run '{}' for '{}'?", name, spec.display_title());
            let confirmed = ui.confirm(spec.display_title(), &message).await;
            if !confirmed {
                if ui.enforces_confirmation() {
                    tracing::info!(handler = %spec.name, action = %name, "Confirmation declined; action skipped");
                    return Ok(DispatchOutcome::Declined);
                }
                tracing::warn!(handler = %spec.name, action = %name, "Confirmation declined; running anyway");
            }
        }

        let result = action.run(context).await?;
        tracing::debug!(handler = %spec.name, action = %name, success = result.success, "Action finished");
        Ok(DispatchOutcome::Executed(result))
    }

    /// Run the named action for one key, bypassing condition and confirmation.
    pub async fn dispatch_key(
        &self,
        name: &str,
        key: &str,
        context: &ExecutionContext,
    ) -> Result<ActionResult, ActionError> {
        let action = self
            .get(name)
            .ok_or_else(|| ActionError::Unregistered(name.to_string()))?;
        action.run_key(key, context).await
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
