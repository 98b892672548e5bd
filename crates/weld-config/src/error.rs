//! Error types for configuration loading and validation.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config not found")]
    NotFound,

    #[error("project root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("invalid config value for '{field}'{}", hint.as_ref().map(|h| format!(": {h}")).unwrap_or_default())]
    InvalidValue { field: String, hint: Option<String> },

    #[error("invalid override layer: {message}")]
    InvalidOverride { message: String },

    #[error("failed to read {}: {message}", path.display())]
    Unreadable { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, hint: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            hint: Some(hint.into()),
        }
    }
}
