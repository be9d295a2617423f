//! User interface collaborator.
//!
//! Dialogs, toasts, and result windows live outside this crate. The engine
//! only sees the [`UserInterface`] trait; [`UiBridge`] adds the configured
//! round-trip timeout and confirmation policy on top of it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sift_core::config::DispatchConfig;
use sift_core::types::{ExecutionContext, UserInputRequest};

/// Severity of a user-facing log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// Host-side user interaction surface.
///
/// `confirm` and `prompt_input` are user round-trips and may take a long
/// time; callers never hold locks across them.
#[async_trait]
pub trait UserInterface: Send + Sync {
    /// Ask a yes/no question.
    async fn confirm(&self, title: &str, message: &str) -> bool;

    /// Ask for a value. `None` means the user cancelled.
    async fn prompt_input(&self, request: &UserInputRequest) -> Option<String>;

    /// Present a finished context on the named result screen.
    fn show_result(&self, screen_id: &str, title: &str, context: &ExecutionContext);

    /// Append a line to the user-visible log.
    fn log(&self, level: LogLevel, message: &str);
}

/// Non-interactive UI that writes everything to tracing.
pub struct HeadlessUi {
    auto_confirm: bool,
}

impl HeadlessUi {
    pub fn new(auto_confirm: bool) -> Self {
        Self { auto_confirm }
    }
}

impl Default for HeadlessUi {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl UserInterface for HeadlessUi {
    async fn confirm(&self, title: &str, message: &str) -> bool {
        tracing::info!(title = %title, answer = self.auto_confirm, "Confirmation auto-answered: {}", message);
        self.auto_confirm
    }

    async fn prompt_input(&self, request: &UserInputRequest) -> Option<String> {
        tracing::info!(key = %request.key, "Prompt answered with default value");
        request.default_value.clone()
    }

    fn show_result(&self, screen_id: &str, title: &str, context: &ExecutionContext) {
        let output = context
            .get(sift_core::types::keys::FORMATTED_OUTPUT)
            .map(String::as_str)
            .unwrap_or("");
        tracing::info!(screen = %screen_id, title = %title, entries = context.len(), "{}", output);
    }

    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!("{}", message),
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Warning => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }
    }
}

/// Shared handle to the UI plus the dispatch policy that governs it.
#[derive(Clone)]
pub struct UiBridge {
    ui: Arc<dyn UserInterface>,
    enforce_confirmation: bool,
    round_trip_timeout: Option<Duration>,
}

impl UiBridge {
    /// Bridge with advisory confirmation and no timeout.
    pub fn new(ui: Arc<dyn UserInterface>) -> Self {
        Self {
            ui,
            enforce_confirmation: false,
            round_trip_timeout: None,
        }
    }

    /// Bridge configured from the `[dispatch]` section.
    pub fn from_config(ui: Arc<dyn UserInterface>, config: &DispatchConfig) -> Self {
        let round_trip_timeout = match config.round_trip_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self {
            ui,
            enforce_confirmation: config.enforce_confirmation,
            round_trip_timeout,
        }
    }

    pub fn with_enforced_confirmation(mut self, enforce: bool) -> Self {
        self.enforce_confirmation = enforce;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.round_trip_timeout = timeout;
        self
    }

    /// Whether a declined confirmation blocks the action.
    pub fn enforces_confirmation(&self) -> bool {
        self.enforce_confirmation
    }

    /// Confirmation round-trip. A timeout counts as a decline.
    pub async fn confirm(&self, title: &str, message: &str) -> bool {
        match self.round_trip_timeout {
            None => self.ui.confirm(title, message).await,
            Some(limit) => match tokio::time::timeout(limit, self.ui.confirm(title, message)).await {
                Ok(answer) => answer,
                Err(_) => {
                    tracing::warn!(title = %title, timeout_secs = limit.as_secs(), "Confirmation timed out");
                    false
                }
            },
        }
    }

    /// Prompt round-trip. A timeout counts as a cancel.
    pub async fn prompt_input(&self, request: &UserInputRequest) -> Option<String> {
        match self.round_trip_timeout {
            None => self.ui.prompt_input(request).await,
            Some(limit) => match tokio::time::timeout(limit, self.ui.prompt_input(request)).await {
                Ok(answer) => answer,
                Err(_) => {
                    tracing::warn!(key = %request.key, timeout_secs = limit.as_secs(), "Prompt timed out");
                    None
                }
            },
        }
    }

    pub fn show_result(&self, screen_id: &str, title: &str, context: &ExecutionContext) {
        self.ui.show_result(screen_id, title, context);
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        self.ui.log(level, message);
    }
}
