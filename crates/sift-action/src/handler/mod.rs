//! Handlers: one configured rule each.
//!
//! A [`Handler`] pairs a [`HandlerSpec`] with a [`HandlerKind`], the
//! type-specific half that decides whether an input matches and builds the
//! initial context. Everything after that (seed merging, prompts, seed
//! rendering, default entries, action fan-out) is shared and lives in
//! [`Handler::execute`].

pub mod custom;
pub mod file;
pub mod lookup;
pub mod plugin;
pub mod regex;
pub mod registry;
pub mod trigger;

use async_trait::async_trait;
use serde::Serialize;
use sift_core::template;
use sift_core::types::{keys, CapturedInput, ExecutionContext, HandlerSpec, UserInputRequest};

use crate::action::DispatchOutcome;
use crate::env::DispatchEnv;
use crate::error::HandlerError;
use crate::ui::{LogLevel, UiBridge};

use self::plugin::PluginRegistry;

/// Type-specific matching and context building.
#[async_trait]
pub trait HandlerKind: Send + Sync {
    /// Type tag this kind was registered under.
    fn type_name(&self) -> &'static str;

    fn matches(&self, input: &CapturedInput) -> bool;

    /// Build the initial context for a matching input.
    ///
    /// Recoverable I/O problems belong in an `_error` entry, not in `Err`.
    async fn build_context(&self, input: &CapturedInput) -> Result<ExecutionContext, HandlerError>;
}

/// A [`HandlerKind`] constructible from a spec, registered under `TYPE_NAME`.
pub trait HandlerFactory: HandlerKind + Sized + 'static {
    const TYPE_NAME: &'static str;

    fn from_spec(spec: &HandlerSpec, plugins: &PluginRegistry) -> Result<Self, HandlerError>;
}

/// Per-action result of an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ActionStatus {
    Executed,
    ConditionFailed,
    Declined,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionReport {
    pub action: String,
    pub status: ActionStatus,
}

/// Everything one processed attempt produced.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptReport {
    pub handler: String,
    pub context: ExecutionContext,
    pub actions: Vec<ActionReport>,
}

impl AttemptReport {
    /// Number of actions that actually ran.
    pub fn executed(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| a.status == ActionStatus::Executed)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a.status, ActionStatus::Failed(_)))
            .count()
    }
}

#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// The input did not match; nothing ran.
    Skipped,
    Processed(AttemptReport),
}

impl AttemptOutcome {
    pub fn is_processed(&self) -> bool {
        matches!(self, AttemptOutcome::Processed(_))
    }

    pub fn report(&self) -> Option<&AttemptReport> {
        match self {
            AttemptOutcome::Processed(report) => Some(report),
            AttemptOutcome::Skipped => None,
        }
    }
}

/// A live handler built from a spec by the type registry.
pub struct Handler {
    spec: HandlerSpec,
    kind: Box<dyn HandlerKind>,
}

impl Handler {
    pub fn new(spec: HandlerSpec, kind: Box<dyn HandlerKind>) -> Self {
        Self { spec, kind }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &HandlerSpec {
        &self.spec
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    pub fn actions(&self) -> &[String] {
        &self.spec.actions
    }

    pub fn output_template(&self) -> Option<&str> {
        self.spec.output_format.as_deref()
    }

    pub fn matches(&self, input: &CapturedInput) -> bool {
        self.kind.matches(input)
    }

    pub async fn build_context(&self, input: &CapturedInput) -> Result<ExecutionContext, HandlerError> {
        self.kind.build_context(input).await
    }

    /// Build the full context for a matching input: steps up to, but not
    /// including, action fan-out.
    pub async fn prepare_context(
        &self,
        input: &CapturedInput,
        ui: &UiBridge,
    ) -> Result<ExecutionContext, HandlerError> {
        let mut context = self.build_context(input).await?;

        if let Some(seeds) = &input.seeds {
            for (key, value) in seeds {
                if self.spec.seed_overwrite || !context.contains_key(key) {
                    context.insert(key.clone(), value.clone());
                }
            }
        }

        let raw = input.raw_text();
        let selector = context
            .iter()
            .find(|(key, value)| key.as_str() != keys::INPUT && **value == raw)
            .map(|(key, _)| key.clone());
        if let Some(selector) = selector {
            context.insert(keys::SELECTOR_KEY.to_string(), selector);
        }

        for request in self.spec.user_inputs.iter().flatten() {
            let answer = self.prompt(request, ui).await;
            context.insert(request.key.clone(), answer);
        }

        for (key, template) in self.spec.seed.iter().flatten() {
            self.note_unresolved(&format!("seed '{}'", key), template, &context, ui);
            let rendered = template::render(template, &context);
            context.insert(key.clone(), rendered);
        }

        if !context.contains_key(keys::SELF) {
            let dump = serde_json::to_string_pretty(&context)
                .map_err(|e| HandlerError::ContextBuild(e.to_string()))?;
            context.insert(keys::SELF.to_string(), dump);
        }
        if !context.contains_key(keys::FORMATTED_OUTPUT) {
            let output = match self.output_template() {
                Some(template) => {
                    self.note_unresolved("output_format", template, &context, ui);
                    template::render(template, &context)
                }
                None => context.get(keys::SELF).cloned().unwrap_or_default(),
            };
            context.insert(keys::FORMATTED_OUTPUT.to_string(), output);
        }
        if let Some(title) = &self.spec.title {
            context.entry(keys::TITLE.to_string()).or_insert_with(|| title.clone());
        }
        if let Some(screen_id) = &self.spec.screen_id {
            context
                .entry(keys::SCREEN_ID.to_string())
                .or_insert_with(|| screen_id.clone());
        }

        if let Some(error) = context.get(keys::ERROR) {
            ui.log(LogLevel::Warning, &format!("{}: {}", self.name(), error));
        }

        Ok(context)
    }

    /// Run one full attempt for `input`.
    pub async fn execute(
        &self,
        input: &CapturedInput,
        env: &DispatchEnv,
    ) -> Result<AttemptOutcome, HandlerError> {
        if !self.matches(input) {
            return Ok(AttemptOutcome::Skipped);
        }

        let context = self.prepare_context(input, &env.ui).await?;

        let mut reports = Vec::with_capacity(self.spec.actions.len());
        for action in &self.spec.actions {
            let status = match env.actions.dispatch(action, &self.spec, &context, &env.ui).await {
                Ok(DispatchOutcome::Executed(_)) => ActionStatus::Executed,
                Ok(DispatchOutcome::ConditionFailed) => ActionStatus::ConditionFailed,
                Ok(DispatchOutcome::Declined) => ActionStatus::Declined,
                Err(e) => {
                    tracing::error!(handler = %self.name(), action = %action, error = %e, "Action failed");
                    env.ui.log(
                        LogLevel::Error,
                        &format!("{}: action '{}' failed: {}", self.name(), action, e),
                    );
                    ActionStatus::Failed(e.to_string())
                }
            };
            reports.push(ActionReport {
                action: action.clone(),
                status,
            });
        }

        Ok(AttemptOutcome::Processed(AttemptReport {
            handler: self.name().to_string(),
            context,
            actions: reports,
        }))
    }

    /// Report placeholders a template is about to leave unrendered.
    fn note_unresolved(&self, target: &str, template: &str, context: &ExecutionContext, ui: &UiBridge) {
        let missing = template::unresolved(template, context);
        if missing.is_empty() {
            return;
        }
        let missing = missing.join(", ");
        tracing::debug!(handler = %self.name(), target = %target, missing = %missing, "Unresolved placeholders");
        ui.log(
            LogLevel::Debug,
            &format!("{}: {} leaves unresolved: {}", self.name(), target, missing),
        );
    }

    /// One prompt round-trip. Cancellation and invalid answers yield "".
    async fn prompt(&self, request: &UserInputRequest, ui: &UiBridge) -> String {
        let Some(answer) = ui.prompt_input(request).await else {
            tracing::warn!(handler = %self.name(), key = %request.key, "Prompt cancelled");
            return String::new();
        };
        match validate_answer(request, &answer) {
            Ok(()) => answer,
            Err(reason) => {
                tracing::warn!(handler = %self.name(), key = %request.key, reason = %reason, "Prompt answer rejected");
                String::new()
            }
        }
    }
}

fn validate_answer(request: &UserInputRequest, answer: &str) -> Result<(), String> {
    if request.is_required && answer.trim().is_empty() {
        return Err("a value is required".to_string());
    }
    if !request.available_options.is_empty() && !request.available_options.iter().any(|o| o == answer) {
        return Err(format!("'{}' is not one of the available options", answer));
    }
    if let Some(pattern) = request.validation_regex.as_deref().filter(|p| !p.is_empty()) {
        let re = ::regex::Regex::new(pattern).map_err(|e| format!("invalid validation pattern: {}", e))?;
        if !re.is_match(answer) {
            return Err(format!("'{}' does not match {}", answer, pattern));
        }
    }
    Ok(())
}
