//! Handler document store.
//!
//! Handlers are declared in a JSON document with a top-level `handlers`
//! array. The document is read once at startup; the only mutation written
//! back is a handler's `enabled` flag. Unknown fields at either level are
//! preserved across the round-trip.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SiftError};
use crate::types::HandlerSpec;

/// On-disk shape of the handler document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandlerDocument {
    #[serde(default)]
    pub handlers: Vec<HandlerSpec>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// File-backed handler document with enable/disable write-back.
pub struct HandlerStore {
    path: PathBuf,
    document: RwLock<HandlerDocument>,
}

impl HandlerStore {
    /// Load the document at `path`. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        let document = read_document(path)?;
        info!(
            path = %path.display(),
            handlers = document.handlers.len(),
            "Handler document loaded"
        );
        Ok(Self {
            path: path.to_path_buf(),
            document: RwLock::new(document),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the backing file, replacing the in-memory document.
    pub fn reload(&self) -> Result<()> {
        let document = read_document(&self.path)?;
        let mut guard = self
            .document
            .write()
            .map_err(|e| SiftError::Store(format!("Lock poisoned: {}", e)))?;
        *guard = document;
        Ok(())
    }

    /// Snapshot of every declared handler.
    pub fn specs(&self) -> Result<Vec<HandlerSpec>> {
        let guard = self
            .document
            .read()
            .map_err(|e| SiftError::Store(format!("Lock poisoned: {}", e)))?;
        Ok(guard.handlers.clone())
    }

    /// Look up one handler by name.
    pub fn get(&self, name: &str) -> Result<HandlerSpec> {
        let guard = self
            .document
            .read()
            .map_err(|e| SiftError::Store(format!("Lock poisoned: {}", e)))?;
        guard
            .handlers
            .iter()
            .find(|spec| spec.name == name)
            .cloned()
            .ok_or_else(|| SiftError::HandlerNotFound {
                name: name.to_string(),
            })
    }

    /// Set a handler's `enabled` flag and write the document back.
    ///
    /// The in-memory document only changes once the write succeeds.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        let mut guard = self
            .document
            .write()
            .map_err(|e| SiftError::Store(format!("Lock poisoned: {}", e)))?;
        let mut updated = guard.clone();
        let spec = updated
            .handlers
            .iter_mut()
            .find(|spec| spec.name == name)
            .ok_or_else(|| SiftError::HandlerNotFound {
                name: name.to_string(),
            })?;
        spec.enabled = enabled;
        write_document(&self.path, &updated)?;
        *guard = updated;
        info!(handler = %name, enabled, "Handler enabled flag persisted");
        Ok(())
    }
}

fn read_document(path: &Path) -> Result<HandlerDocument> {
    if !path.exists() {
        return Ok(HandlerDocument::default());
    }
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(HandlerDocument::default());
    }
    Ok(serde_json::from_str(&content)?)
}

fn write_document(path: &Path, document: &HandlerDocument) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(document)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "version": 3,
        "handlers": [
            {"name": "errors", "type": "regex", "regex": "ERR-(\\d+)", "actions": ["show_notification"]},
            {"name": "files", "type": "file", "file_extensions": ["txt"], "enabled": false, "owner": "ops"}
        ]
    }"#;

    fn write_temp(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("handlers.json");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_specs() {
        let (_dir, path) = write_temp(DOCUMENT);
        let store = HandlerStore::load(&path).unwrap();
        let specs = store.specs().unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "errors");
        assert!(specs[0].enabled);
        assert!(!specs[1].enabled);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HandlerStore::load(&dir.path().join("absent.json")).unwrap();
        assert!(store.specs().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_json_is_error() {
        let (_dir, path) = write_temp("{ not json");
        assert!(matches!(
            HandlerStore::load(&path),
            Err(SiftError::Serialization(_))
        ));
    }

    #[test]
    fn test_get_unknown_handler() {
        let (_dir, path) = write_temp(DOCUMENT);
        let store = HandlerStore::load(&path).unwrap();
        assert!(store.get("errors").is_ok());
        assert!(matches!(
            store.get("nope"),
            Err(SiftError::HandlerNotFound { .. })
        ));
    }

    #[test]
    fn test_set_enabled_round_trips_and_preserves_unknown_fields() {
        let (_dir, path) = write_temp(DOCUMENT);
        let store = HandlerStore::load(&path).unwrap();

        store.set_enabled("files", true).unwrap();
        store.set_enabled("errors", false).unwrap();

        let reloaded = HandlerStore::load(&path).unwrap();
        assert!(reloaded.get("files").unwrap().enabled);
        assert!(!reloaded.get("errors").unwrap().enabled);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], 3);
        assert_eq!(raw["handlers"][1]["owner"], "ops");
    }

    #[test]
    fn test_set_enabled_unknown_handler() {
        let (_dir, path) = write_temp(DOCUMENT);
        let store = HandlerStore::load(&path).unwrap();
        assert!(store.set_enabled("ghost", true).is_err());
    }

    #[test]
    fn test_failed_write_leaves_flag_unchanged() {
        let (_dir, path) = write_temp(DOCUMENT);
        let store = HandlerStore::load(&path).unwrap();

        // A directory in place of the file makes the write fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(store.set_enabled("files", true).is_err());
        assert!(!store.get("files").unwrap().enabled);
    }

    #[test]
    fn test_reload_picks_up_external_edits() {
        let (_dir, path) = write_temp(DOCUMENT);
        let store = HandlerStore::load(&path).unwrap();
        std::fs::write(&path, r#"{"handlers": []}"#).unwrap();
        store.reload().unwrap();
        assert!(store.specs().unwrap().is_empty());
    }
}
