//! CLI argument definitions for the Sift binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Sift - routes captured selections to rule-driven handlers and actions.
#[derive(Parser, Debug)]
#[command(name = "sift", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Path to the handler document (overrides the config value).
    #[arg(long = "handlers")]
    pub handlers: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Read captures from stdin and run the cron scheduler (default).
    Run,
    /// Dispatch one piece of text to every automatic handler.
    Dispatch {
        /// Captured text.
        text: String,
    },
    /// Run a manual handler by name.
    Trigger { name: String },
    /// List loaded handlers and registered actions.
    List,
    /// Enable a handler in the handler document.
    Enable { name: String },
    /// Disable a handler in the handler document.
    Disable { name: String },
}

impl CliArgs {
    /// The subcommand, defaulting to `run`.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }

    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > SIFT_CONFIG env var > ~/.sift/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("SIFT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the handler document path.
    ///
    /// Priority: --handlers flag > SIFT_HANDLERS env var > config file value.
    pub fn resolve_handlers_path(&self, config_path: PathBuf) -> PathBuf {
        if let Some(ref p) = self.handlers {
            return p.clone();
        }
        if let Ok(p) = std::env::var("SIFT_HANDLERS") {
            return PathBuf::from(p);
        }
        config_path
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".sift").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".sift").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_run() {
        let args = CliArgs::parse_from(["sift"]);
        assert_eq!(args.command(), Command::Run);
        assert!(args.config.is_none());
        assert_eq!(args.resolve_log_level("warn"), "warn");
    }

    #[test]
    fn test_parse_subcommands() {
        let args = CliArgs::parse_from(["sift", "dispatch", "ERR-404 Not Found"]);
        assert_eq!(
            args.command(),
            Command::Dispatch {
                text: "ERR-404 Not Found".to_string()
            }
        );

        let args = CliArgs::parse_from(["sift", "-l", "debug", "trigger", "daily-report"]);
        assert_eq!(
            args.command(),
            Command::Trigger {
                name: "daily-report".to_string()
            }
        );
        assert_eq!(args.resolve_log_level("info"), "debug");

        let args = CliArgs::parse_from(["sift", "disable", "tickets"]);
        assert_eq!(
            args.command(),
            Command::Disable {
                name: "tickets".to_string()
            }
        );
    }

    #[test]
    fn test_flags_take_priority() {
        let args = CliArgs::parse_from([
            "sift",
            "--config",
            "/tmp/sift.toml",
            "--handlers",
            "/tmp/handlers.json",
            "list",
        ]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/sift.toml"));
        assert_eq!(
            args.resolve_handlers_path(PathBuf::from("/etc/ignored.json")),
            PathBuf::from("/tmp/handlers.json")
        );
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(CliArgs::try_parse_from(["sift", "explode"]).is_err());
    }
}
