//! Configure-time `@NAME@` placeholder substitution
//!
//! The configuration template carries `@NAME@` tokens for values only known
//! when the documentation build is configured (project name, version,
//! directories). [`substitute`] replaces the tokens it has values for and
//! leaves the others as literal text, which the renderer then embeds
//! verbatim in its output.

use chrono::Datelike;
use config::{Config, Environment, File};
use indexmap::IndexMap;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::path::Path;

use crate::error::{ConfigError, Result};

lazy_static::lazy_static! {
    static ref TOKEN_REGEX: Regex = Regex::new(r"@([A-Za-z_][A-Za-z0-9_]*)@").unwrap();
}

pub const PROJECT_NAME: &str = "PROJECT_NAME";
pub const COPYRIGHT_YEAR: &str = "ULIB_COPYRIGHT_YEAR";
pub const AUTHOR: &str = "ULIB_AUTHOR";
pub const PROJECT_VERSION: &str = "PROJECT_VERSION";
pub const GIT_URL: &str = "ULIB_GIT_URL";
pub const SPHINX_INPUT_DIRECTORY: &str = "SPHINX_INPUT_DIRECTORY";
pub const DOXYGEN_XML_OUTPUT_DIRECTORY: &str = "DOXYGEN_XML_OUTPUT_DIRECTORY";

/// Every token the configuration template uses
pub const KNOWN_TOKENS: &[&str] = &[
    PROJECT_NAME,
    COPYRIGHT_YEAR,
    AUTHOR,
    PROJECT_VERSION,
    GIT_URL,
    SPHINX_INPUT_DIRECTORY,
    DOXYGEN_XML_OUTPUT_DIRECTORY,
];

/// Prefix of the environment variables read by [`PlaceholderSettings::load`]
pub const ENV_PREFIX: &str = "ULIB_DOCS";

/// `@NAME@` form of a token name
pub fn token(name: &str) -> String {
    format!("@{}@", name)
}

/// Placeholder values as read from a settings file and the environment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceholderSettings {
    pub project_name: Option<String>,
    pub copyright_year: Option<String>,
    pub author: Option<String>,
    pub version: Option<String>,
    pub git_url: Option<String>,
    pub sphinx_input_directory: Option<String>,
    pub doxygen_xml_output_directory: Option<String>,
}

impl PlaceholderSettings {
    /// Layer an optional settings file under `ULIB_DOCS_*` environment
    /// variables. The file format follows its extension.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            log::debug!("Reading placeholder settings from {}", path.display());
            builder = builder.add_source(File::from(path));
        }
        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(false))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

/// Mapping of token names to substitution values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placeholders {
    values: IndexMap<String, String>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every known token bound to its own `@NAME@` text.
    ///
    /// Building a configuration from these yields the template.
    pub fn unresolved() -> Self {
        let mut placeholders = Self::new();
        for name in KNOWN_TOKENS {
            placeholders.define(name, token(name));
        }
        placeholders
    }

    /// Placeholders from settings. The copyright year defaults to the
    /// current year; other missing values stay undefined.
    pub fn from_settings(settings: &PlaceholderSettings) -> Self {
        let mut placeholders = Self::new();
        let pairs = [
            (PROJECT_NAME, &settings.project_name),
            (COPYRIGHT_YEAR, &settings.copyright_year),
            (AUTHOR, &settings.author),
            (PROJECT_VERSION, &settings.version),
            (GIT_URL, &settings.git_url),
            (SPHINX_INPUT_DIRECTORY, &settings.sphinx_input_directory),
            (
                DOXYGEN_XML_OUTPUT_DIRECTORY,
                &settings.doxygen_xml_output_directory,
            ),
        ];
        for (name, value) in pairs {
            if let Some(value) = value {
                placeholders.define(name, value.clone());
            }
        }
        if placeholders.get(COPYRIGHT_YEAR).is_none() {
            let year = chrono::Local::now().year().to_string();
            log::debug!("Defaulting {} to {}", COPYRIGHT_YEAR, year);
            placeholders.define(COPYRIGHT_YEAR, year);
        }
        placeholders
    }

    /// Define or override a token
    pub fn define(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Value of a token, or its literal `@NAME@` text when undefined
    pub fn value_or_token(&self, name: &str) -> String {
        self.get(name)
            .map(str::to_string)
            .unwrap_or_else(|| token(name))
    }

    /// Known tokens without a value
    pub fn missing(&self) -> Vec<&'static str> {
        KNOWN_TOKENS
            .iter()
            .copied()
            .filter(|name| self.get(name).is_none())
            .collect()
    }
}

/// Result of substituting placeholders into a text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    /// Distinct tokens left in place, in order of first appearance
    pub unresolved: Vec<String>,
}

impl Substitution {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// The substituted text, or an error naming the tokens left in it
    pub fn into_complete(self) -> Result<String> {
        if self.is_complete() {
            Ok(self.text)
        } else {
            Err(ConfigError::UnresolvedPlaceholders(self.unresolved))
        }
    }
}

/// Distinct `@NAME@` token names in `text`, in order of first appearance
pub fn find_tokens(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in TOKEN_REGEX.captures_iter(text) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Replace every defined token in a single pass.
///
/// Substituted values are not rescanned, so a value containing `@X@` is
/// inserted as is.
pub fn substitute(text: &str, placeholders: &Placeholders) -> Substitution {
    let mut unresolved: Vec<String> = Vec::new();

    let replaced = TOKEN_REGEX.replace_all(text, |caps: &Captures| {
        let name = &caps[1];
        match placeholders.get(name) {
            Some(value) => value.to_string(),
            None => {
                if !unresolved.iter().any(|n| n == name) {
                    unresolved.push(name.to_string());
                }
                caps[0].to_string()
            }
        }
    });

    for name in &unresolved {
        log::warn!("Placeholder {} is not defined and is left as is", token(name));
    }

    Substitution {
        text: replaced.into_owned(),
        unresolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Mutex;

    // Settings loading reads the process environment
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn sample() -> Placeholders {
        let mut placeholders = Placeholders::new();
        placeholders.define(PROJECT_NAME, "ulib");
        placeholders.define(PROJECT_VERSION, "0.3.0");
        placeholders
    }

    #[test]
    fn test_find_tokens() {
        let text = r#"project = "@PROJECT_NAME@"  # @PROJECT_NAME@ @ULIB_AUTHOR@ user@host"#;
        assert_eq!(find_tokens(text), vec!["PROJECT_NAME", "ULIB_AUTHOR"]);
        assert!(find_tokens("mail me at a@b.c").is_empty());
    }

    #[test]
    fn test_substitute_known_and_unknown() {
        let result = substitute(
            "@PROJECT_NAME@ @PROJECT_VERSION@ by @ULIB_AUTHOR@",
            &sample(),
        );
        assert_eq!(result.text, "ulib 0.3.0 by @ULIB_AUTHOR@");
        assert_eq!(result.unresolved, vec!["ULIB_AUTHOR"]);
        assert!(!result.is_complete());
    }

    #[test]
    fn test_substitute_does_not_rescan_values() {
        let mut placeholders = Placeholders::new();
        placeholders.define("A", "@B@");
        placeholders.define("B", "b");
        let result = substitute("@A@", &placeholders);
        assert_eq!(result.text, "@B@");
        assert!(result.is_complete());
    }

    #[test]
    fn test_unresolved_maps_tokens_to_themselves() {
        let placeholders = Placeholders::unresolved();
        let text = "@PROJECT_NAME@/@DOXYGEN_XML_OUTPUT_DIRECTORY@";
        assert_eq!(substitute(text, &placeholders).text, text);
        assert!(placeholders.missing().is_empty());
    }

    #[test]
    fn test_from_settings_defaults_copyright_year() {
        let settings = PlaceholderSettings {
            project_name: Some("ulib".to_string()),
            ..Default::default()
        };
        let placeholders = Placeholders::from_settings(&settings);
        assert_eq!(placeholders.get(PROJECT_NAME), Some("ulib"));
        let year = placeholders.get(COPYRIGHT_YEAR).unwrap();
        assert_eq!(year.len(), 4);
        assert!(placeholders.missing().contains(&AUTHOR));
        assert!(!placeholders.missing().contains(&COPYRIGHT_YEAR));
        assert_eq!(placeholders.value_or_token(AUTHOR), "@ULIB_AUTHOR@");
    }

    #[test]
    fn test_strict_substitution_names_missing_tokens() {
        let complete = substitute("@PROJECT_NAME@", &sample()).into_complete();
        assert_eq!(complete.unwrap(), "ulib");

        let partial = substitute("@ULIB_GIT_URL@ @PROJECT_NAME@ @ULIB_AUTHOR@", &sample());
        match partial.into_complete() {
            Err(ConfigError::UnresolvedPlaceholders(names)) => {
                assert_eq!(names, vec!["ULIB_GIT_URL", "ULIB_AUTHOR"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_load_settings_file() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("docs.toml");
        std::fs::write(
            &path,
            "project_name = \"ulib\"\nversion = \"1.2.3\"\ngit_url = \"https://example.com/ulib\"\n",
        )
        .unwrap();

        let settings = PlaceholderSettings::load(Some(&path)).unwrap();
        assert_eq!(settings.project_name.as_deref(), Some("ulib"));
        assert_eq!(settings.version.as_deref(), Some("1.2.3"));
        assert_eq!(settings.git_url.as_deref(), Some("https://example.com/ulib"));
    }

    #[test]
    fn test_environment_overrides_settings_file() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("docs.yaml");
        std::fs::write(&path, "project_name: ulib\nversion: 1.2.3\n").unwrap();

        std::env::set_var("ULIB_DOCS_VERSION", "2.0.0");
        std::env::set_var("ULIB_DOCS_AUTHOR", "Jane Doe");
        let settings = PlaceholderSettings::load(Some(&path));
        std::env::remove_var("ULIB_DOCS_VERSION");
        std::env::remove_var("ULIB_DOCS_AUTHOR");

        let settings = settings.unwrap();
        assert_eq!(settings.project_name.as_deref(), Some("ulib"));
        assert_eq!(settings.version.as_deref(), Some("2.0.0"));
        assert_eq!(settings.author.as_deref(), Some("Jane Doe"));
    }

    proptest! {
        #[test]
        fn substitution_leaves_no_defined_token(
            name in "[A-Z][A-Z_]{0,12}",
            value in "[a-z0-9 ./:-]{0,20}",
            prefix in "[a-z =\"]{0,10}",
        ) {
            let mut placeholders = Placeholders::new();
            placeholders.define(&name, value.clone());
            let text = format!("{}@{}@{}", prefix, name, prefix);
            let result = substitute(&text, &placeholders);
            prop_assert!(result.is_complete());
            prop_assert_eq!(result.text, format!("{}{}{}", prefix, value, prefix));
        }
    }
}
