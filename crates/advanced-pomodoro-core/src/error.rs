//! Core error types for advanced-pomodoro-core.
//!
//! None of these are fatal to the session state machine: the controller
//! degrades override and logging failures to defaults, so `LogError` and
//! `OverrideError` stop at the collaborator boundary. `CoreError` is what
//! the front ends report.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for advanced-pomodoro-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Errors from the session log sink.
#[derive(Error, Debug)]
pub enum LogError {
    /// Could not create or append to the log file
    #[error("Failed to write session log {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Timestamp format string is not valid strftime
    #[error("Invalid timestamp format: {0}")]
    InvalidFormat(String),
}

/// Errors from a context override source.
#[derive(Error, Debug)]
pub enum OverrideError {
    /// The note could not be read
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The frontmatter block is not valid YAML
    #[error("Malformed frontmatter in {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    /// The lookup did not answer in time
    #[error("Override lookup timed out after {timeout_ms} ms")]
    TimedOut { timeout_ms: u64 },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
