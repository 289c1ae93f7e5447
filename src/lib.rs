//! ulib-docs
//!
//! Generates, configures and checks the Sphinx configuration of a
//! Doxygen → Breathe → Sphinx documentation pipeline, and ships the Doxygen
//! input filter the pipeline relies on.

pub mod alias;
pub mod config;
pub mod domains;
pub mod error;
pub mod matching;
pub mod placeholders;
pub mod python_config;
pub mod theme;
pub mod validation;
pub mod value;

pub use alias::AliasFilter;
pub use config::BuildConfig;
pub use domains::LanguageDomain;
pub use error::ConfigError;
pub use placeholders::{substitute, PlaceholderSettings, Placeholders, Substitution};
pub use python_config::{ConfPy, PythonConfigParser};
pub use theme::ThemeRegistry;
pub use validation::{
    validate, ConfigValidator, Diagnostic, Report, ValidationOptions, ValidationSeverity,
};
pub use value::{ConfigValue, Namespace};
