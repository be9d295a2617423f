//! Dispatch orchestrator.
//!
//! Owns the live handler collections and fans each captured input out to
//! every automatic handler as an independent tokio task. Manual and cron
//! triggers build a synthetic input and run a single attempt through the
//! same [`Handler::execute`] path.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use sift_core::store::HandlerStore;
use sift_core::template;
use sift_core::types::{keys, CapturedInput, ExecutionContext, HandlerSpec};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::env::DispatchEnv;
use crate::error::OrchestratorError;
use crate::handler::registry::HandlerTypeRegistry;
use crate::handler::trigger::{CronHandler, ManualHandler, SyntheticHandler};
use crate::handler::{AttemptOutcome, Handler, HandlerFactory};
use crate::scheduler::{CronScheduler, SpecExecutor};
use crate::ui::LogLevel;

/// Handler types that never see captured input.
const TRIGGERED_TYPES: [&str; 3] = [
    ManualHandler::TYPE_NAME,
    SyntheticHandler::TYPE_NAME,
    CronHandler::TYPE_NAME,
];

/// Live handlers, replaced wholesale on reload.
#[derive(Default)]
struct HandlerSet {
    /// Run for every captured input.
    automatic: Vec<Arc<Handler>>,
    /// Manual, synthetic, and cron handlers, by name.
    triggered: HashMap<String, Arc<Handler>>,
    /// Specs to register with the cron scheduler.
    cron: Vec<HandlerSpec>,
}

impl HandlerSet {
    /// A manual, synthetic, or cron handler by name.
    fn find_triggered(&self, name: &str) -> Option<Arc<Handler>> {
        self.triggered.get(name).cloned()
    }

    /// Any live handler by name; used to resolve `reference_handler`.
    fn find(&self, name: &str) -> Option<Arc<Handler>> {
        self.triggered.get(name).cloned().or_else(|| {
            self.automatic
                .iter()
                .find(|handler| handler.name() == name)
                .cloned()
        })
    }
}

/// Result of building handlers from specs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub automatic: usize,
    pub triggered: usize,
    pub cron: usize,
    pub disabled: usize,
    /// `(handler, reason)` for every spec that could not be built.
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedAttempt {
    pub handler: String,
    pub error: String,
}

/// One summary per captured input, emitted after every attempt finished.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchSummary {
    pub dispatch_id: Uuid,
    pub attempted: usize,
    pub processed: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<FailedAttempt>,
    pub elapsed_ms: u64,
}

impl DispatchSummary {
    fn empty(dispatch_id: Uuid) -> Self {
        Self {
            dispatch_id,
            attempted: 0,
            processed: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            elapsed_ms: 0,
        }
    }

    pub fn processed_any(&self) -> bool {
        !self.processed.is_empty()
    }

    /// Attempts that were skipped or failed.
    pub fn not_processed(&self) -> usize {
        self.attempted - self.processed.len()
    }
}

pub struct Orchestrator {
    types: Arc<HandlerTypeRegistry>,
    env: DispatchEnv,
    store: Option<Arc<HandlerStore>>,
    handlers: RwLock<HandlerSet>,
}

impl Orchestrator {
    pub fn new(types: Arc<HandlerTypeRegistry>, env: DispatchEnv) -> Self {
        Self {
            types,
            env,
            store: None,
            handlers: RwLock::new(HandlerSet::default()),
        }
    }

    /// Attach the handler store used by `reload` and `set_handler_enabled`.
    pub fn with_store(mut self, store: Arc<HandlerStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn env(&self) -> &DispatchEnv {
        &self.env
    }

    pub fn types(&self) -> &HandlerTypeRegistry {
        &self.types
    }

    fn read_handlers(&self) -> std::sync::RwLockReadGuard<'_, HandlerSet> {
        self.handlers.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Build live handlers from specs, replacing the current ones.
    ///
    /// Disabled specs are skipped. Specs that fail to build are logged and
    /// skipped; the rest still load.
    pub fn load_handlers(&self, specs: &[HandlerSpec]) -> LoadReport {
        let mut set = HandlerSet::default();
        let mut report = LoadReport::default();

        for spec in specs {
            if !spec.enabled {
                tracing::debug!(handler = %spec.name, "Handler disabled; skipped");
                report.disabled += 1;
                continue;
            }
            let handler = match self.types.create(spec) {
                Ok(handler) => Arc::new(handler),
                Err(e) => {
                    tracing::warn!(handler = %spec.name, error = %e, "Handler could not be built; skipped");
                    self.env
                        .ui
                        .log(LogLevel::Warning, &format!("Handler '{}' skipped: {}", spec.name, e));
                    report.failed.push((spec.name.clone(), e.to_string()));
                    continue;
                }
            };

            if spec.is_cron() {
                set.cron.push(spec.clone());
            }
            let triggered = TRIGGERED_TYPES.contains(&handler.type_name()) || spec.is_cron();
            if triggered {
                if set.triggered.insert(spec.name.clone(), handler).is_some() {
                    tracing::warn!(handler = %spec.name, "Duplicate handler name; later entry wins");
                }
            } else {
                set.automatic.push(handler);
            }
        }

        report.automatic = set.automatic.len();
        report.triggered = set.triggered.len();
        report.cron = set.cron.len();
        tracing::info!(
            automatic = report.automatic,
            triggered = report.triggered,
            cron = report.cron,
            disabled = report.disabled,
            failed = report.failed.len(),
            "Handlers loaded"
        );

        *self.handlers.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = set;
        report
    }

    /// Re-read the store and rebuild every handler.
    pub fn reload(&self) -> Result<LoadReport, OrchestratorError> {
        let store = self.store.as_ref().ok_or(OrchestratorError::NoStore)?;
        store.reload()?;
        let specs = store.specs()?;
        Ok(self.load_handlers(&specs))
    }

    /// Names of the automatic handlers, in load order.
    pub fn automatic_names(&self) -> Vec<String> {
        self.read_handlers()
            .automatic
            .iter()
            .map(|h| h.name().to_string())
            .collect()
    }

    /// Names of the manual, synthetic, and cron handlers, sorted.
    pub fn triggered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_handlers().triggered.keys().cloned().collect();
        names.sort();
        names
    }

    /// Register every loaded cron spec with the scheduler.
    pub fn register_cron_jobs(&self, scheduler: &CronScheduler) -> usize {
        let specs = self.read_handlers().cron.clone();
        specs
            .into_iter()
            .filter(|spec| {
                let expression = spec.cron_expression.as_deref().unwrap_or("");
                scheduler.register_job(
                    spec.job_id(),
                    expression,
                    spec.clone(),
                    spec.cron_timezone.as_deref(),
                )
            })
            .count()
    }

    /// Fan one captured input out to every automatic handler.
    pub async fn dispatch(&self, input: CapturedInput) -> DispatchSummary {
        let dispatch_id = Uuid::new_v4();
        if !input.success {
            tracing::warn!(dispatch_id = %dispatch_id, "Capture failed; nothing dispatched");
            self.env.ui.log(LogLevel::Warning, "Capture failed; nothing dispatched");
            return DispatchSummary::empty(dispatch_id);
        }

        let handlers = self.read_handlers().automatic.clone();
        let input = Arc::new(input);
        let started = Instant::now();

        // Dropping the set aborts every attempt still in flight.
        let mut attempts = JoinSet::new();
        let mut names = HashMap::new();
        for handler in handlers {
            let input = Arc::clone(&input);
            let env = self.env.clone();
            let name = handler.name().to_string();
            let task = attempts.spawn(async move { handler.execute(&input, &env).await });
            names.insert(task.id(), name);
        }

        let mut summary = DispatchSummary::empty(dispatch_id);
        while let Some(joined) = attempts.join_next_with_id().await {
            let (id, result) = match joined {
                Ok((id, result)) => (id, Ok(result)),
                Err(e) => (e.id(), Err(e)),
            };
            let name = names
                .remove(&id)
                .unwrap_or_else(|| "<unknown>".to_string());
            let elapsed_ms = started.elapsed().as_millis() as u64;
            summary.attempted += 1;
            match result {
                Ok(Ok(AttemptOutcome::Processed(report))) => {
                    tracing::info!(
                        handler = %name,
                        elapsed_ms,
                        executed = report.executed(),
                        failed_actions = report.failed(),
                        "Handler processed input"
                    );
                    summary.processed.push(name);
                }
                Ok(Ok(AttemptOutcome::Skipped)) => {
                    tracing::debug!(handler = %name, elapsed_ms, "Handler did not match");
                    summary.skipped.push(name);
                }
                Ok(Err(e)) => {
                    tracing::error!(handler = %name, elapsed_ms, error = %e, "Handler attempt failed");
                    summary.failed.push(FailedAttempt {
                        handler: name,
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    let error = if e.is_panic() {
                        "handler panicked".to_string()
                    } else {
                        e.to_string()
                    };
                    tracing::error!(handler = %name, elapsed_ms, error = %error, "Handler attempt aborted");
                    summary.failed.push(FailedAttempt {
                        handler: name,
                        error,
                    });
                }
            }
        }

        summary.processed.sort();
        summary.skipped.sort();
        summary.elapsed_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            dispatch_id = %dispatch_id,
            attempted = summary.attempted,
            processed = summary.processed.len(),
            not_processed = summary.not_processed(),
            failed = summary.failed.len(),
            elapsed_ms = summary.elapsed_ms,
            "Dispatch finished"
        );
        self.env.ui.log(
            LogLevel::Info,
            &format!(
                "Dispatch finished: {} of {} handler(s) processed the input",
                summary.processed.len(),
                summary.attempted
            ),
        );
        summary
    }

    /// Run a manual handler by name.
    pub async fn trigger_manual(&self, name: &str) -> Result<AttemptOutcome, OrchestratorError> {
        let handler = self
            .read_handlers()
            .find_triggered(name)
            .ok_or_else(|| OrchestratorError::HandlerNotFound(name.to_string()))?;

        let default_text = format!("Manual trigger: {}", Utc::now().to_rfc3339());
        let (input, reference) = self
            .build_synthetic_input(handler.spec(), ManualHandler::TYPE_NAME, default_text)
            .await?;
        let target = match reference {
            Some(reference) => self
                .read_handlers()
                .find(&reference)
                .ok_or(OrchestratorError::HandlerNotFound(reference))?,
            None => handler,
        };

        tracing::info!(handler = %name, target = %target.name(), "Manual trigger");
        Ok(target.execute(&input, &self.env).await?)
    }

    /// Turn a spec's synthetic descriptor into a live input.
    ///
    /// Returns the input and, when the descriptor names one, the handler
    /// that should run it instead of the triggering one.
    pub async fn build_synthetic_input(
        &self,
        spec: &HandlerSpec,
        trigger: &str,
        default_text: String,
    ) -> Result<(CapturedInput, Option<String>), OrchestratorError> {
        let Some(synthetic) = &spec.synthetic_input else {
            return Ok((CapturedInput::text(default_text), None));
        };

        let mut meta = ExecutionContext::new();
        meta.insert(keys::TRIGGER.to_string(), trigger.to_string());
        meta.insert(keys::TIMESTAMP.to_string(), Utc::now().to_rfc3339());
        meta.insert("handler".to_string(), spec.name.clone());

        let mut answer = None;
        if let Some(prompt) = &synthetic.prompt {
            let value = self
                .env
                .ui
                .prompt_input(prompt)
                .await
                .ok_or_else(|| OrchestratorError::InputCancelled(spec.name.clone()))?;
            meta.insert(prompt.key.clone(), value.clone());
            answer = Some(value);
        }

        let mut input = if !synthetic.files.is_empty() {
            CapturedInput::files(synthetic.files.clone())
        } else {
            let text = match (&synthetic.content, answer) {
                (Some(content), _) => template::render(content, &meta),
                (None, Some(answer)) => answer,
                (None, None) => default_text,
            };
            CapturedInput::text(text)
        };

        if let Some(seeds) = &synthetic.seeds {
            let rendered = seeds
                .iter()
                .map(|(key, value)| (key.clone(), template::render(value, &meta)))
                .collect();
            input = input.with_seeds(rendered);
        }

        let reference = synthetic
            .reference_handler
            .as_deref()
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        Ok((input, reference))
    }

    /// Persist a handler's enabled flag. Live handlers change on the next reload.
    pub fn set_handler_enabled(&self, name: &str, enabled: bool) -> Result<(), OrchestratorError> {
        let store = self.store.as_ref().ok_or(OrchestratorError::NoStore)?;
        store.set_enabled(name, enabled)?;
        tracing::info!(handler = %name, enabled, "Handler enabled flag updated; takes effect on reload");
        Ok(())
    }

    async fn run_spec(&self, spec: &HandlerSpec) -> Result<AttemptOutcome, OrchestratorError> {
        let transient = Arc::new(self.types.create(spec)?);
        let default_text = format!("Cron trigger: {}", Utc::now().to_rfc3339());
        let (input, reference) = self
            .build_synthetic_input(spec, CronHandler::TYPE_NAME, default_text)
            .await?;
        let target = match reference {
            Some(reference) => self
                .read_handlers()
                .find(&reference)
                .ok_or(OrchestratorError::HandlerNotFound(reference))?,
            None => transient,
        };
        Ok(target.execute(&input, &self.env).await?)
    }
}

#[async_trait]
impl SpecExecutor for Orchestrator {
    async fn execute_spec(&self, spec: HandlerSpec) -> String {
        let started = Instant::now();
        let result = match self.run_spec(&spec).await {
            Ok(AttemptOutcome::Processed(report)) => format!(
                "Processed '{}': {} action(s) executed, {} failed",
                report.handler,
                report.executed(),
                report.failed()
            ),
            Ok(AttemptOutcome::Skipped) => format!("Skipped '{}': input did not match", spec.name),
            Err(e) => format!("Error in '{}': {}", spec.name, e),
        };
        tracing::info!(
            handler = %spec.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            result = %result,
            "Scheduled handler finished"
        );
        result
    }
}
