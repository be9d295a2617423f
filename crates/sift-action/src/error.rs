//! Error types for the dispatch engine.

use sift_core::condition::ConditionError;
use sift_core::error::SiftError;

/// Errors from action lookup and execution.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Action not registered: {0}")]
    Unregistered(String),
    #[error("Payload validation failed: {0}")]
    InvalidPayload(String),
    #[error("Action failed: {0}")]
    Failed(String),
    #[error("Condition error: {0}")]
    Condition(#[from] ConditionError),
}

/// Errors from handler construction and context building.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Unknown handler type: {0}")]
    UnknownType(String),
    #[error("Invalid configuration for handler '{handler}': {reason}")]
    InvalidConfig { handler: String, reason: String },
    #[error("Condition error: {0}")]
    Condition(#[from] ConditionError),
    #[error("Context build failed: {0}")]
    ContextBuild(String),
}

impl HandlerError {
    /// Shorthand for a configuration error on a named handler.
    pub fn config(handler: &str, reason: impl Into<String>) -> Self {
        HandlerError::InvalidConfig {
            handler: handler.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the error is a configuration defect rather than a runtime failure.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            HandlerError::UnknownType(_)
                | HandlerError::InvalidConfig { .. }
                | HandlerError::Condition(_)
        )
    }
}

/// Errors surfaced by the orchestrator's manual and administrative entry points.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Handler not found: {0}")]
    HandlerNotFound(String),
    #[error("Input prompt cancelled for handler '{0}'")]
    InputCancelled(String),
    #[error("No handler store attached")]
    NoStore,
    #[error(transparent)]
    Handler(#[from] HandlerError),
    #[error(transparent)]
    Store(#[from] SiftError),
}

/// Errors from the cron scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidCron { expression: String, reason: String },
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_error_display() {
        let err = ActionError::Unregistered("notify".to_string());
        assert_eq!(err.to_string(), "Action not registered: notify");

        let err = ActionError::InvalidPayload("missing url".to_string());
        assert_eq!(err.to_string(), "Payload validation failed: missing url");

        let err = ActionError::Failed("connection reset".to_string());
        assert_eq!(err.to_string(), "Action failed: connection reset");
    }

    #[test]
    fn test_action_error_from_condition_error() {
        let err: ActionError = ConditionError::UnknownOperator("near".to_string()).into();
        assert!(matches!(err, ActionError::Condition(_)));
        assert!(err.to_string().contains("near"));
    }

    #[test]
    fn test_handler_error_display() {
        let err = HandlerError::UnknownType("ftp".to_string());
        assert_eq!(err.to_string(), "Unknown handler type: ftp");

        let err = HandlerError::config("errors", "missing 'regex'");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for handler 'errors': missing 'regex'"
        );
    }

    #[test]
    fn test_handler_error_is_config() {
        assert!(HandlerError::UnknownType("x".into()).is_config());
        assert!(HandlerError::config("h", "bad").is_config());
        assert!(HandlerError::Condition(ConditionError::UnknownOperator("x".into())).is_config());
        assert!(!HandlerError::ContextBuild("boom".into()).is_config());

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(!HandlerError::from(io).is_config());
    }

    #[test]
    fn test_orchestrator_error_transparent() {
        let err: OrchestratorError = HandlerError::UnknownType("ftp".into()).into();
        assert_eq!(err.to_string(), "Unknown handler type: ftp");

        let err: OrchestratorError = SiftError::Store("locked".into()).into();
        assert_eq!(err.to_string(), "Handler store error: locked");
    }

    #[test]
    fn test_scheduler_error_display() {
        let err = SchedulerError::InvalidCron {
            expression: "61 * * * *".to_string(),
            reason: "out of range".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid cron expression '61 * * * *': out of range"
        );
        assert_eq!(
            SchedulerError::InvalidTimezone("Mars/Base".into()).to_string(),
            "Invalid timezone: Mars/Base"
        );
    }
}
