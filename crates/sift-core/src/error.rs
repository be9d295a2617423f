use thiserror::Error;

/// Top-level error type for Sift configuration and storage.
///
/// Dispatch-time failures have their own error types in `sift-action`; this
/// type covers what happens before a handler ever runs: reading the config,
/// reading and writing the handler document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SiftError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Handler store error: {0}")]
    Store(String),

    #[error("Handler not found: {name}")]
    HandlerNotFound { name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for SiftError {
    fn from(err: toml::de::Error) -> Self {
        SiftError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SiftError {
    fn from(err: toml::ser::Error) -> Self {
        SiftError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for SiftError {
    fn from(err: serde_json::Error) -> Self {
        SiftError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Sift core operations.
pub type Result<T> = std::result::Result<T, SiftError>;
