//! Lookup handler backed by a delimited flat file.
//!
//! Each non-blank line is one row; columns are named by `value_names` and
//! `key_names` picks the columns an input may match. Lines starting with
//! `#` are comments. The file is read once, when the handler is built.

use async_trait::async_trait;
use sift_core::config::expand_home;
use sift_core::types::{keys, CapturedInput, ExecutionContext, HandlerSpec};

use super::plugin::PluginRegistry;
use super::{HandlerFactory, HandlerKind};
use crate::error::HandlerError;

pub const DEFAULT_DELIMITER: &str = "||";

pub struct LookupHandler {
    columns: Vec<String>,
    key_columns: Vec<usize>,
    rows: Vec<Vec<String>>,
}

impl LookupHandler {
    /// Build from already-loaded file content.
    pub fn from_content(
        spec: &HandlerSpec,
        content: &str,
    ) -> Result<Self, HandlerError> {
        let delimiter = spec
            .delimiter
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_DELIMITER);

        let rows: Vec<Vec<String>> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| line.split(delimiter).map(|c| c.trim().to_string()).collect())
            .collect();

        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let columns: Vec<String> = match &spec.value_names {
            Some(names) if !names.is_empty() => names.clone(),
            _ => (0..width).map(|i| format!("column{}", i)).collect(),
        };

        let key_columns = match &spec.key_names {
            Some(names) if !names.is_empty() => names
                .iter()
                .map(|name| {
                    columns.iter().position(|c| c == name).ok_or_else(|| {
                        HandlerError::config(
                            &spec.name,
                            format!("key column '{}' is not in 'value_names'", name),
                        )
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => vec![0],
        };

        Ok(Self {
            columns,
            key_columns,
            rows,
        })
    }

    fn find_row(&self, needle: &str) -> Option<&Vec<String>> {
        self.rows.iter().find(|row| {
            self.key_columns
                .iter()
                .any(|&i| row.get(i).is_some_and(|cell| cell == needle))
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl HandlerKind for LookupHandler {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn matches(&self, input: &CapturedInput) -> bool {
        let raw = input.raw_text();
        let needle = raw.trim();
        !needle.is_empty() && self.find_row(needle).is_some()
    }

    async fn build_context(&self, input: &CapturedInput) -> Result<ExecutionContext, HandlerError> {
        let raw = input.raw_text();
        let mut context = ExecutionContext::new();
        context.insert(keys::INPUT.to_string(), raw.clone());
        if let Some(row) = self.find_row(raw.trim()) {
            for (i, column) in self.columns.iter().enumerate() {
                let cell = row.get(i).cloned().unwrap_or_default();
                context.insert(column.clone(), cell);
            }
        }
        Ok(context)
    }
}

impl HandlerFactory for LookupHandler {
    const TYPE_NAME: &'static str = "lookup";

    fn from_spec(spec: &HandlerSpec, _plugins: &PluginRegistry) -> Result<Self, HandlerError> {
        let path = spec
            .path
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| HandlerError::config(&spec.name, "missing 'path'"))?;
        let path = expand_home(path);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            HandlerError::config(
                &spec.name,
                format!("cannot read lookup file '{}': {}", path.display(), e),
            )
        })?;
        let handler = Self::from_content(spec, &content)?;
        tracing::debug!(handler = %spec.name, rows = handler.len(), "Lookup table loaded");
        Ok(handler)
    }
}
