use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Per-attempt working set of string entries, in insertion order.
///
/// Built fresh for every dispatch attempt and owned by that attempt alone.
pub type ExecutionContext = IndexMap<String, String>;

/// Well-known context keys written by the dispatch engine.
pub mod keys {
    /// The verbatim captured text (or newline-joined file paths).
    pub const INPUT: &str = "input";
    /// The whole regex match for pattern handlers.
    pub const MATCHED: &str = "matched";
    /// Structured JSON dump of the context.
    pub const SELF: &str = "_self";
    /// Rendered output template, or a copy of `_self`.
    pub const FORMATTED_OUTPUT: &str = "_formatted_output";
    /// Key whose value equals the raw captured input.
    pub const SELECTOR_KEY: &str = "_selector_key";
    /// Degraded-context error message from a handler.
    pub const ERROR: &str = "_error";
    /// Which trigger produced a synthetic input ("manual", "cron", ...).
    pub const TRIGGER: &str = "_trigger";
    /// RFC 3339 timestamp of a synthetic trigger.
    pub const TIMESTAMP: &str = "_timestamp";
    /// Handler title, copied for display actions.
    pub const TITLE: &str = "_title";
    /// Result screen identifier, copied for display actions.
    pub const SCREEN_ID: &str = "_screen_id";
}

// =============================================================================
// Captured input
// =============================================================================

/// Payload delivered by a capture source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CapturedContent {
    Text(String),
    Files(Vec<PathBuf>),
    None,
}

/// One captured event, immutable once built.
///
/// Shared read-only between all concurrent dispatch attempts for the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedInput {
    pub content: CapturedContent,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeds: Option<IndexMap<String, String>>,
}

impl CapturedInput {
    /// A successful text capture.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: CapturedContent::Text(text.into()),
            success: true,
            seeds: None,
        }
    }

    /// A successful file-selection capture.
    pub fn files(paths: Vec<PathBuf>) -> Self {
        Self {
            content: CapturedContent::Files(paths),
            success: true,
            seeds: None,
        }
    }

    /// A failed capture with no payload.
    pub fn empty() -> Self {
        Self {
            content: CapturedContent::None,
            success: false,
            seeds: None,
        }
    }

    /// Attach seed entries to be merged into every handler's context.
    pub fn with_seeds(mut self, seeds: IndexMap<String, String>) -> Self {
        self.seeds = Some(seeds);
        self
    }

    /// The captured text, if this is a text capture.
    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            CapturedContent::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The selected files, if this is a file capture.
    pub fn as_files(&self) -> Option<&[PathBuf]> {
        match &self.content {
            CapturedContent::Files(paths) => Some(paths),
            _ => None,
        }
    }

    /// Raw textual form: the text, newline-joined file paths, or "".
    pub fn raw_text(&self) -> String {
        match &self.content {
            CapturedContent::Text(text) => text.clone(),
            CapturedContent::Files(paths) => paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join("\n"),
            CapturedContent::None => String::new(),
        }
    }
}

// =============================================================================
// Conditions
// =============================================================================

/// A node of a boolean condition tree.
///
/// Leaves compare `field` in the context against `value`; `and`/`or` nodes
/// combine `conditions`. The operator is kept as text so an unknown operator
/// surfaces as an evaluation error rather than a deserialization failure for
/// the whole handler document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

impl Condition {
    /// A leaf comparison.
    pub fn leaf(operator: &str, field: &str, value: &str) -> Self {
        Self {
            operator: operator.to_string(),
            field: Some(field.to_string()),
            value: Some(value.to_string()),
            conditions: None,
        }
    }

    /// An `and` node.
    pub fn all(conditions: Vec<Condition>) -> Self {
        Self {
            operator: "and".to_string(),
            conditions: Some(conditions),
            ..Self::default()
        }
    }

    /// An `or` node.
    pub fn any(conditions: Vec<Condition>) -> Self {
        Self {
            operator: "or".to_string(),
            conditions: Some(conditions),
            ..Self::default()
        }
    }
}

// =============================================================================
// Handler specification
// =============================================================================

/// A value the user is asked for before actions run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInputRequest {
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_regex: Option<String>,
    #[serde(default)]
    pub is_password: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_options: Vec<String>,
}

/// Descriptor used to build a [`CapturedInput`] for manual and cron triggers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticInput {
    /// Run this handler (by name) instead of the triggering one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_handler: Option<String>,
    /// Text template; `$(key)` placeholders see trigger metadata and the
    /// prompt answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// File paths; when non-empty the input is a file capture.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PathBuf>,
    /// Ask the user for the content before dispatching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<UserInputRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeds: Option<IndexMap<String, String>>,
}

fn default_true() -> bool {
    true
}

/// Declarative rule loaded from the handler document.
///
/// Type-specific parameters are plain optional fields; each handler type
/// reads the ones it needs and rejects the spec when a required one is
/// missing. Unknown fields are kept in `extra` so the document round-trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub handler_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_id: Option<String>,

    // ---- type-specific parameters ----
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_extensions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthetic_input: Option<SyntheticInput>,

    // ---- dispatch ----
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<IndexMap<String, String>>,
    #[serde(default)]
    pub seed_overwrite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_inputs: Option<Vec<UserInputRequest>>,
    #[serde(default)]
    pub requires_confirmation: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,

    // ---- cron ----
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_timezone: Option<String>,
    #[serde(default = "default_true")]
    pub cron_enabled: bool,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for HandlerSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            handler_type: String::new(),
            title: None,
            screen_id: None,
            regex: None,
            groups: None,
            file_extensions: None,
            path: None,
            delimiter: None,
            key_names: None,
            value_names: None,
            validator: None,
            context_provider: None,
            synthetic_input: None,
            actions: Vec::new(),
            condition: None,
            seed: None,
            seed_overwrite: false,
            user_inputs: None,
            requires_confirmation: false,
            enabled: true,
            output_format: None,
            cron_job_id: None,
            cron_expression: None,
            cron_timezone: None,
            cron_enabled: true,
            extra: serde_json::Map::new(),
        }
    }
}

impl HandlerSpec {
    /// Minimal enabled spec of the given type.
    pub fn new(name: &str, handler_type: &str) -> Self {
        Self {
            name: name.to_string(),
            handler_type: handler_type.to_string(),
            ..Self::default()
        }
    }

    /// Title shown to the user, falling back to the handler name.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }

    /// Whether the spec carries a cron schedule.
    pub fn is_cron(&self) -> bool {
        self.cron_expression
            .as_deref()
            .is_some_and(|expr| !expr.trim().is_empty())
    }

    /// Scheduler job identifier, defaulting to the handler name.
    pub fn job_id(&self) -> &str {
        self.cron_job_id.as_deref().unwrap_or(&self.name)
    }
}
