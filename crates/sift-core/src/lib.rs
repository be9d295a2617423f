//! Core types, configuration, and pure evaluation helpers for Sift.
//!
//! Everything in this crate is free of async I/O: the condition evaluator and
//! template renderer are pure functions over an [`ExecutionContext`], and the
//! handler store is a small synchronous JSON document wrapper.

pub mod condition;
pub mod config;
pub mod error;
pub mod store;
pub mod template;
pub mod types;

pub use condition::{ConditionError, ConditionOperator};
pub use config::SiftConfig;
pub use error::{Result, SiftError};
pub use store::HandlerStore;
pub use types::*;
