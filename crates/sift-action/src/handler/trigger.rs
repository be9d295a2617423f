//! Trigger handlers: manual, cron, and synthetic.
//!
//! These always match. Their context is the input text plus which trigger
//! fired and when.

use async_trait::async_trait;
use chrono::Utc;
use sift_core::types::{keys, CapturedInput, ExecutionContext, HandlerSpec};

use super::plugin::PluginRegistry;
use super::{HandlerFactory, HandlerKind};
use crate::error::HandlerError;

fn trigger_context(trigger: &str, input: &CapturedInput) -> ExecutionContext {
    let mut context = ExecutionContext::new();
    context.insert(keys::INPUT.to_string(), input.raw_text());
    context.insert(keys::TRIGGER.to_string(), trigger.to_string());
    context.insert(keys::TIMESTAMP.to_string(), Utc::now().to_rfc3339());
    context
}

macro_rules! trigger_handler {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        pub struct $name;

        #[async_trait]
        impl HandlerKind for $name {
            fn type_name(&self) -> &'static str {
                Self::TYPE_NAME
            }

            fn matches(&self, _input: &CapturedInput) -> bool {
                true
            }

            async fn build_context(
                &self,
                input: &CapturedInput,
            ) -> Result<ExecutionContext, HandlerError> {
                Ok(trigger_context(Self::TYPE_NAME, input))
            }
        }

        impl HandlerFactory for $name {
            const TYPE_NAME: &'static str = $tag;

            fn from_spec(_spec: &HandlerSpec, _plugins: &PluginRegistry) -> Result<Self, HandlerError> {
                Ok($name)
            }
        }
    };
}

trigger_handler!(
    /// Run on demand from the trigger command.
    ManualHandler,
    "manual"
);
trigger_handler!(
    /// Run by the cron scheduler.
    CronHandler,
    "cron"
);
trigger_handler!(
    /// Run only with input built from a synthetic descriptor.
    SyntheticHandler,
    "synthetic"
);
