//! Error types for the core module.

use std::path::PathBuf;

use nextver_events::EventError;
use thiserror::Error;

/// Result type alias for core operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Errors that can occur while computing a version.
#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Invalid version '{input}': {message}")]
    InvalidVersion { input: String, message: String },

    #[error("Invalid configuration in {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Git error: {0}")]
    Git(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Event error: {0}")]
    Event(EventError),
}

impl VersionError {
    pub fn invalid_version(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidVersion {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Whether the error stems from configuration rather than the repository.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::Config(_)
                | Self::Pattern { .. }
                | Self::Yaml(_)
                | Self::Toml(_)
                | Self::InvalidVersion { .. }
        )
    }
}

/// Handler faults travel through the engine as [`EventError::Handler`].
impl From<VersionError> for EventError {
    fn from(err: VersionError) -> Self {
        EventError::Handler(anyhow::Error::new(err))
    }
}

/// Recovers the original [`VersionError`] when a handler raised one.
impl From<EventError> for VersionError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::Handler(inner) => match inner.downcast::<VersionError>() {
                Ok(version_err) => version_err,
                Err(other) => VersionError::Event(EventError::Handler(other)),
            },
            other => VersionError::Event(other),
        }
    }
}
