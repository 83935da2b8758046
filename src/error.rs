//! Error types for settings construction

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HypersError>;

#[derive(Debug, Error)]
pub enum HypersError {
    /// A declared field cannot be used (no type, bad name, bad default).
    #[error("invalid declaration for field `{field}`: {reason}")]
    Declaration { field: String, reason: String },

    /// A config file could not be read or interpreted.
    #[error("{} is not a valid config file: {reason}", path.display())]
    ConfigFile { path: PathBuf, reason: String },

    /// A command-line token does not fit the declared type of its field.
    #[error("invalid value `{token}` for --{field}: expected {expected}")]
    TypeCoercion {
        field: String,
        token: String,
        expected: String,
    },

    /// A config file sets a name the schema does not declare (strict mode only).
    #[error("unknown field `{field}` set by {}", source_path.display())]
    UnknownField { field: String, source_path: PathBuf },

    /// A field declared without default was not set by any layer.
    #[error("field `{field}` has no default and was not set by a config file or the command line")]
    MissingValue { field: String },

    #[error("no field named `{field}`")]
    UnknownKey { field: String },

    #[error(transparent)]
    Cli(#[from] clap::Error),

    #[error("failed to extract settings: {0}")]
    Extract(#[from] serde_json::Error),
}

impl HypersError {
    pub(crate) fn declaration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Declaration { field: field.into(), reason: reason.into() }
    }

    pub(crate) fn config_file(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigFile { path: path.into(), reason: reason.into() }
    }
}
