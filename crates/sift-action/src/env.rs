//! Collaborators handed to every dispatch attempt.

use std::sync::Arc;

use crate::action::ActionRegistry;
use crate::ui::UiBridge;

/// Shared, immutable dispatch environment.
///
/// Cloned into each concurrent attempt; the registry is frozen after
/// construction so no locking is needed.
#[derive(Clone)]
pub struct DispatchEnv {
    pub actions: Arc<ActionRegistry>,
    pub ui: UiBridge,
}

impl DispatchEnv {
    pub fn new(actions: Arc<ActionRegistry>, ui: UiBridge) -> Self {
        Self { actions, ui }
    }
}
