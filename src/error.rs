//! Error types for configuration generation, loading and checking.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("{0}")]
    Python(String),

    #[error("missing configuration key '{0}'")]
    MissingKey(String),

    #[error("configuration key '{key}' should be {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: String,
        found: String,
    },

    #[error("unknown language domain '{0}' (expected 'c' or 'cpp')")]
    UnknownDomain(String),

    #[error("invalid theme file {path}: {message}")]
    InvalidTheme { path: String, message: String },

    #[error("theme error: {0}")]
    Theme(String),

    #[error("unresolved placeholders: {}", .0.join(", "))]
    UnresolvedPlaceholders(Vec<String>),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("cannot walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
