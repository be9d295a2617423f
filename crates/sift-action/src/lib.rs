//! Handler dispatch and execution engine for Sift.
//!
//! Routes captured input through configured handlers: each handler matches
//! the input, builds an execution context, and fans out to named actions.
//! The orchestrator runs every automatic handler concurrently for one
//! capture, and bridges manual and cron triggers into the same pipeline.

pub mod action;
pub mod env;
pub mod error;
pub mod handler;
pub mod orchestrator;
pub mod scheduler;
pub mod ui;

#[cfg(test)]
mod test_support;

pub use action::{Action, ActionRegistry, ActionResult, DispatchOutcome};
pub use env::DispatchEnv;
pub use error::{ActionError, HandlerError, OrchestratorError, SchedulerError};
pub use handler::registry::HandlerTypeRegistry;
pub use handler::plugin::PluginRegistry;
pub use handler::{
    ActionReport, ActionStatus, AttemptOutcome, AttemptReport, Handler, HandlerFactory, HandlerKind,
};
pub use orchestrator::{DispatchSummary, LoadReport, Orchestrator};
pub use scheduler::{CronJob, CronScheduler, SpecExecutor};
pub use ui::{HeadlessUi, LogLevel, UiBridge, UserInterface};
