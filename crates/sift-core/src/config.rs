use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SiftError};

/// Top-level configuration for the Sift application.
///
/// Loaded from `~/.sift/config.toml` by default. Handler rules live in a
/// separate JSON document (see [`crate::store::HandlerStore`]); this file only
/// carries process-wide knobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiftConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl SiftConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SiftConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| SiftError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Path of the handler document with `~` expanded.
    pub fn handlers_path(&self) -> PathBuf {
        expand_home(&self.general.handlers_path)
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// JSON document holding the `handlers` collection.
    pub handlers_path: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            handlers_path: "~/.sift/handlers.json".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Capture source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Hotkey that triggers a capture (e.g., "Ctrl+Shift+C").
    pub hotkey: String,
    /// Trim surrounding whitespace from captured text.
    pub trim_whitespace: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            hotkey: "Ctrl+Shift+C".to_string(),
            trim_whitespace: true,
        }
    }
}

/// Dispatch engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// When true, a declined confirmation skips the action. When false the
    /// decline is logged and the action still runs.
    pub enforce_confirmation: bool,
    /// Answer used by the headless UI for confirmation prompts.
    pub auto_confirm: bool,
    /// Upper bound on confirmation and prompt round-trips. 0 disables it.
    pub round_trip_timeout_seconds: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            enforce_confirmation: false,
            auto_confirm: true,
            round_trip_timeout_seconds: 300,
        }
    }
}

/// Cron scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Whether cron handlers are registered at startup.
    pub enabled: bool,
    /// Seconds between due-job checks.
    pub tick_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_seconds: 30,
        }
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path.starts_with("~/") || path.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&path[2..])
    } else {
        PathBuf::from(path)
    }
}
