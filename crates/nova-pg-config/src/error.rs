//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file does not exist
    #[error("Configuration file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Requested environment section is absent (or empty) in the file
    #[error("Environment '{env}' not found in {}", path.display())]
    EnvironmentNotFound { env: String, path: PathBuf },

    /// Malformed configuration content
    #[error("Failed to parse {context}: {message}")]
    Parse { context: String, message: String },

    /// One or more required credential fields are absent or empty
    #[error("Missing required keys: {}", fields.join(", "))]
    MissingFields { fields: Vec<String> },

    /// A field is present but its value is unusable
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// IO error other than a missing file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of [`ConfigError`] for callers that branch on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// File or environment key missing
    NotFound,
    /// Malformed configuration content
    Parse,
    /// Missing or invalid credential field
    Validation,
    /// Filesystem failure
    Io,
}

impl ConfigError {
    /// Classify this error
    pub const fn kind(&self) -> ConfigErrorKind {
        match self {
            Self::NotFound { .. } | Self::EnvironmentNotFound { .. } => ConfigErrorKind::NotFound,
            Self::Parse { .. } => ConfigErrorKind::Parse,
            Self::MissingFields { .. } | Self::InvalidValue { .. } => ConfigErrorKind::Validation,
            Self::Io(_) => ConfigErrorKind::Io,
        }
    }

    pub(crate) fn parse(context: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
