//! File-selection handler: matches on extension, exports per-file metadata.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use sift_core::types::{keys, CapturedInput, ExecutionContext, HandlerSpec};

use super::plugin::PluginRegistry;
use super::{HandlerFactory, HandlerKind};
use crate::error::HandlerError;

pub struct FileHandler {
    /// Lowercase, without the leading dot.
    extensions: Vec<String>,
}

impl FileHandler {
    fn accepts(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

#[async_trait]
impl HandlerKind for FileHandler {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    /// Every selected file must carry one of the configured extensions.
    fn matches(&self, input: &CapturedInput) -> bool {
        match input.as_files() {
            Some(paths) if !paths.is_empty() => paths.iter().all(|p| self.accepts(p)),
            _ => false,
        }
    }

    async fn build_context(&self, input: &CapturedInput) -> Result<ExecutionContext, HandlerError> {
        let paths = input.as_files().unwrap_or(&[]);
        let mut context = ExecutionContext::new();
        context.insert(keys::INPUT.to_string(), input.raw_text());
        context.insert("FileCount".to_string(), paths.len().to_string());

        let mut errors = Vec::new();
        for (i, path) in paths.iter().enumerate() {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            context.insert(format!("FileName{}", i), file_name);
            context.insert(format!("FullPath{}", i), path.display().to_string());
            context.insert(format!("Extension{}", i), extension_of(path).unwrap_or_default());

            match tokio::fs::metadata(path).await {
                Ok(meta) => {
                    context.insert(format!("SizeBytes{}", i), meta.len().to_string());
                    if let Ok(modified) = meta.modified() {
                        let modified: DateTime<Local> = modified.into();
                        context.insert(format!("Modified{}", i), modified.to_rfc3339());
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "File metadata unavailable");
                    errors.push(format!("{}: {}", path.display(), e));
                }
            }
        }

        if !errors.is_empty() {
            context.insert(keys::ERROR.to_string(), errors.join("; "));
        }
        Ok(context)
    }
}

impl HandlerFactory for FileHandler {
    const TYPE_NAME: &'static str = "file";

    fn from_spec(spec: &HandlerSpec, _plugins: &PluginRegistry) -> Result<Self, HandlerError> {
        let extensions: Vec<String> = spec
            .file_extensions
            .iter()
            .flatten()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        if extensions.is_empty() {
            return Err(HandlerError::config(&spec.name, "missing 'file_extensions'"));
        }
        Ok(Self { extensions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn build(exts: &[&str]) -> FileHandler {
        let mut spec = HandlerSpec::new("docs", "file");
        spec.file_extensions = Some(exts.iter().map(|e| e.to_string()).collect());
        FileHandler::from_spec(&spec, &PluginRegistry::new()).unwrap()
    }

    #[test]
    fn test_matches_all_files_by_extension() {
        let handler = build(&[".TXT", "md"]);
        let ok = CapturedInput::files(vec![PathBuf::from("/a/notes.txt"), PathBuf::from("/b/README.MD")]);
        let mixed = CapturedInput::files(vec![PathBuf::from("/a/notes.txt"), PathBuf::from("/b/pic.png")]);
        assert!(handler.matches(&ok));
        assert!(!handler.matches(&mixed));
        assert!(!handler.matches(&CapturedInput::files(vec![])));
        assert!(!handler.matches(&CapturedInput::text("notes.txt")));
    }

    #[tokio::test]
    async fn test_metadata_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, "hello").unwrap();

        let handler = build(&["txt"]);
        let context = handler
            .build_context(&CapturedInput::files(vec![path.clone()]))
            .await
            .unwrap();
        assert_eq!(context.get("FileCount").map(String::as_str), Some("1"));
        assert_eq!(context.get("FileName0").map(String::as_str), Some("report.txt"));
        assert_eq!(context.get("Extension0").map(String::as_str), Some("txt"));
        assert_eq!(context.get("SizeBytes0").map(String::as_str), Some("5"));
        assert!(context.contains_key("Modified0"));
        assert!(!context.contains_key(keys::ERROR));
    }

    #[tokio::test]
    async fn test_missing_file_degrades_to_error_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.txt");

        let handler = build(&["txt"]);
        let context = handler
            .build_context(&CapturedInput::files(vec![path]))
            .await
            .unwrap();
        assert_eq!(context.get("FileName0").map(String::as_str), Some("gone.txt"));
        assert!(!context.contains_key("SizeBytes0"));
        assert!(context.get(keys::ERROR).unwrap().contains("gone.txt"));
    }

    #[test]
    fn test_missing_extensions_is_config_error() {
        let spec = HandlerSpec::new("docs", "file");
        assert!(FileHandler::from_spec(&spec, &PluginRegistry::new()).is_err());
    }
}
