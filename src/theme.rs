//! HTML theme knowledge for configuration checks
//!
//! The renderer aborts on an unknown `html_theme` and ignores (with a
//! warning) options the theme does not declare. This module knows the
//! themes shipped with Sphinx plus `sphinx_rtd_theme`, can load local
//! themes from a `theme.toml`, and checks `html_theme_options` against the
//! merged option schema of a theme and its ancestors.

use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::value::{ConfigValue, Namespace};

/// Theme option type for validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeOptionType {
    Bool,
    String,
    Integer,
    /// Untyped option, as declared by `theme.toml` string defaults
    Any,
}

impl fmt::Display for ThemeOptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeOptionType::Bool => write!(f, "bool"),
            ThemeOptionType::String => write!(f, "string"),
            ThemeOptionType::Integer => write!(f, "integer"),
            ThemeOptionType::Any => write!(f, "any"),
        }
    }
}

/// Theme option specification
#[derive(Debug, Clone)]
pub struct ThemeOptionSpec {
    pub option_type: ThemeOptionType,
    pub default: ConfigValue,
    pub values: Option<Vec<String>>,
}

impl ThemeOptionSpec {
    fn boolean(default: bool) -> Self {
        Self {
            option_type: ThemeOptionType::Bool,
            default: ConfigValue::Bool(default),
            values: None,
        }
    }

    fn string(default: &str) -> Self {
        Self {
            option_type: ThemeOptionType::String,
            default: ConfigValue::str(default),
            values: None,
        }
    }

    fn integer(default: i64) -> Self {
        Self {
            option_type: ThemeOptionType::Integer,
            default: ConfigValue::Int(default),
            values: None,
        }
    }

    fn choice(default: &str, values: &[&str]) -> Self {
        Self {
            option_type: ThemeOptionType::String,
            default: ConfigValue::str(default),
            values: Some(values.iter().map(|v| v.to_string()).collect()),
        }
    }

    fn accepts(&self, value: &ConfigValue) -> bool {
        match self.option_type {
            ThemeOptionType::Bool => value.as_bool().is_some(),
            ThemeOptionType::String => value.as_str().is_some(),
            ThemeOptionType::Integer => value.as_int().is_some(),
            ThemeOptionType::Any => true,
        }
    }
}

/// A problem found in `html_theme_options`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionProblem {
    /// The theme chain does not declare the option
    Unknown(String),
    WrongType {
        key: String,
        expected: ThemeOptionType,
    },
    InvalidValue {
        key: String,
        value: String,
        allowed: Vec<String>,
    },
}

impl fmt::Display for OptionProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionProblem::Unknown(key) => write!(f, "unsupported theme option '{}'", key),
            OptionProblem::WrongType { key, expected } => {
                write!(f, "theme option '{}' should be of type {}", key, expected)
            }
            OptionProblem::InvalidValue {
                key,
                value,
                allowed,
            } => write!(
                f,
                "theme option '{}' has invalid value '{}', allowed: {}",
                key,
                value,
                allowed.join(", ")
            ),
        }
    }
}

/// Raw theme.toml structure for deserialization
#[derive(Debug, Clone, Deserialize)]
struct ThemeToml {
    theme: ThemeTomlMeta,
    #[serde(default)]
    options: toml::Table,
}

#[derive(Debug, Clone, Deserialize)]
struct ThemeTomlMeta {
    #[serde(default)]
    inherit: Option<String>,
}

/// A Sphinx HTML theme
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
    /// Parent theme to inherit from
    pub inherit: Option<String>,
    pub options_schema: IndexMap<String, ThemeOptionSpec>,
}

impl Theme {
    fn builtin(name: &str, inherit: Option<&str>, options: Vec<(&str, ThemeOptionSpec)>) -> Self {
        Self {
            name: name.to_string(),
            inherit: inherit.map(str::to_string),
            options_schema: options
                .into_iter()
                .map(|(key, spec)| (key.to_string(), spec))
                .collect(),
        }
    }

    /// Load a local theme from a directory containing `theme.toml`.
    ///
    /// The theme is named after its directory, as the renderer does.
    pub fn from_path(path: &Path) -> Result<Self> {
        let theme_toml_path = path.join("theme.toml");
        let content = std::fs::read_to_string(&theme_toml_path)?;
        let parsed: ThemeToml = toml::from_str(&content).map_err(|e| ConfigError::InvalidTheme {
            path: theme_toml_path.display().to_string(),
            message: e.to_string(),
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let options_schema = parsed
            .options
            .into_iter()
            .map(|(key, default)| {
                let spec = match default {
                    toml::Value::Boolean(b) => ThemeOptionSpec::boolean(b),
                    toml::Value::Integer(i) => ThemeOptionSpec::integer(i),
                    toml::Value::String(s) => ThemeOptionSpec {
                        option_type: ThemeOptionType::Any,
                        default: ConfigValue::Str(s),
                        values: None,
                    },
                    _ => ThemeOptionSpec {
                        option_type: ThemeOptionType::Any,
                        default: ConfigValue::None,
                        values: None,
                    },
                };
                (key, spec)
            })
            .collect();

        Ok(Theme {
            name,
            inherit: parsed.theme.inherit,
            options_schema,
        })
    }
}

/// Registry of themes the renderer can resolve
#[derive(Debug, Default)]
pub struct ThemeRegistry {
    themes: IndexMap<String, Theme>,
}

impl ThemeRegistry {
    /// Create a new empty theme registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the stock Sphinx themes and `sphinx_rtd_theme`
    pub fn with_builtin_themes() -> Self {
        let mut registry = Self::new();

        registry.register(Theme::builtin(
            "basic",
            None,
            vec![
                ("nosidebar", ThemeOptionSpec::boolean(false)),
                ("sidebarwidth", ThemeOptionSpec::integer(230)),
                ("body_min_width", ThemeOptionSpec::integer(360)),
                ("body_max_width", ThemeOptionSpec::integer(800)),
                ("navigation_with_keys", ThemeOptionSpec::boolean(false)),
                ("enable_search_shortcuts", ThemeOptionSpec::boolean(true)),
                ("globaltoc_collapse", ThemeOptionSpec::boolean(true)),
                ("globaltoc_includehidden", ThemeOptionSpec::boolean(false)),
                ("globaltoc_maxdepth", ThemeOptionSpec::integer(-1)),
            ],
        ));

        for name in [
            "classic",
            "sphinxdoc",
            "scrolls",
            "agogo",
            "traditional",
            "nature",
            "haiku",
            "pyramid",
            "bizstyle",
        ] {
            registry.register(Theme::builtin(name, Some("basic"), Vec::new()));
        }

        registry.register(Theme::builtin(
            "alabaster",
            Some("basic"),
            vec![
                ("logo", ThemeOptionSpec::string("")),
                ("logo_name", ThemeOptionSpec::boolean(false)),
                ("description", ThemeOptionSpec::string("")),
                ("github_user", ThemeOptionSpec::string("")),
                ("github_repo", ThemeOptionSpec::string("")),
                ("github_button", ThemeOptionSpec::boolean(true)),
                ("fixed_sidebar", ThemeOptionSpec::boolean(false)),
                ("page_width", ThemeOptionSpec::string("940px")),
                ("sidebar_width", ThemeOptionSpec::string("220px")),
            ],
        ));

        registry.register(Theme::builtin(
            "sphinx_rtd_theme",
            Some("basic"),
            vec![
                ("analytics_id", ThemeOptionSpec::string("")),
                ("analytics_anonymize_ip", ThemeOptionSpec::boolean(false)),
                ("logo_only", ThemeOptionSpec::boolean(false)),
                (
                    "prev_next_buttons_location",
                    ThemeOptionSpec::choice("bottom", &["bottom", "top", "both"]),
                ),
                ("style_external_links", ThemeOptionSpec::boolean(false)),
                ("vcs_pageview_mode", ThemeOptionSpec::string("")),
                ("style_nav_header_background", ThemeOptionSpec::string("")),
                (
                    "flyout_display",
                    ThemeOptionSpec::choice("hidden", &["hidden", "attached"]),
                ),
                ("version_selector", ThemeOptionSpec::boolean(true)),
                ("language_selector", ThemeOptionSpec::boolean(true)),
                ("collapse_navigation", ThemeOptionSpec::boolean(true)),
                ("sticky_navigation", ThemeOptionSpec::boolean(true)),
                ("navigation_depth", ThemeOptionSpec::integer(4)),
                ("includehidden", ThemeOptionSpec::boolean(true)),
                ("titles_only", ThemeOptionSpec::boolean(false)),
            ],
        ));

        registry
    }

    /// Builtin themes plus the local themes below every `html_theme_path`
    /// entry of `ns`. Relative entries are resolved against `base_dir`.
    pub fn for_namespace(ns: &Namespace, base_dir: Option<&Path>) -> Result<Self> {
        let mut registry = Self::with_builtin_themes();
        let dirs = ns
            .get("html_theme_path")
            .and_then(|v| v.as_seq())
            .unwrap_or_default();
        for dir in dirs.iter().filter_map(|d| d.as_str()) {
            let path = base_dir.map_or_else(|| PathBuf::from(dir), |base| base.join(dir));
            registry.discover_themes(&path)?;
        }
        Ok(registry)
    }

    /// Register every theme found directly below `dir`.
    ///
    /// Directories without `theme.toml` are skipped, unreadable themes are
    /// logged and skipped.
    pub fn discover_themes(&mut self, dir: &Path) -> Result<usize> {
        let mut found = 0;
        for entry in std::fs::read_dir(dir)?.flatten() {
            let path = entry.path();
            if !path.join("theme.toml").is_file() {
                continue;
            }
            match Theme::from_path(&path) {
                Ok(theme) => {
                    log::debug!("Discovered theme: {} at {}", theme.name, path.display());
                    self.register(theme);
                    found += 1;
                }
                Err(e) => log::warn!("Failed to load theme from {}: {}", path.display(), e),
            }
        }
        Ok(found)
    }

    pub fn register(&mut self, theme: Theme) {
        self.themes.insert(theme.name.clone(), theme);
    }

    pub fn get_theme(&self, name: &str) -> Option<&Theme> {
        self.themes.get(name)
    }

    pub fn has_theme(&self, name: &str) -> bool {
        self.themes.contains_key(name)
    }

    /// Resolve the inheritance chain for a theme, root ancestor first
    pub fn resolve_theme_chain(&self, name: &str) -> std::result::Result<Vec<&Theme>, String> {
        let mut chain = Vec::new();
        let mut current_name = name;
        let mut seen = HashSet::new();

        loop {
            if !seen.insert(current_name) {
                return Err(format!(
                    "circular theme inheritance detected at '{}'",
                    current_name
                ));
            }

            let theme = self
                .get_theme(current_name)
                .ok_or_else(|| format!("theme '{}' not found", current_name))?;
            chain.push(theme);

            match &theme.inherit {
                Some(parent) => current_name = parent,
                None => break,
            }
        }

        chain.reverse();
        Ok(chain)
    }

    /// Option defaults along the chain overridden by the user's options
    pub fn get_merged_options(
        &self,
        name: &str,
        user_options: &IndexMap<String, ConfigValue>,
    ) -> std::result::Result<IndexMap<String, ConfigValue>, String> {
        let mut merged = IndexMap::new();
        for theme in self.resolve_theme_chain(name)? {
            for (key, spec) in &theme.options_schema {
                merged.insert(key.clone(), spec.default.clone());
            }
        }
        for (key, value) in user_options {
            merged.insert(key.clone(), value.clone());
        }
        Ok(merged)
    }

    /// Check user options against the merged schema of the theme chain
    pub fn validate_options(
        &self,
        name: &str,
        user_options: &IndexMap<String, ConfigValue>,
    ) -> std::result::Result<Vec<OptionProblem>, String> {
        let chain = self.resolve_theme_chain(name)?;
        let mut problems = Vec::new();

        for (key, value) in user_options {
            let spec = chain
                .iter()
                .rev()
                .find_map(|theme| theme.options_schema.get(key));

            let Some(spec) = spec else {
                problems.push(OptionProblem::Unknown(key.clone()));
                continue;
            };

            if !spec.accepts(value) {
                problems.push(OptionProblem::WrongType {
                    key: key.clone(),
                    expected: spec.option_type,
                });
                continue;
            }

            if let (Some(allowed), Some(s)) = (&spec.values, value.as_str()) {
                if !allowed.iter().any(|a| a == s) {
                    problems.push(OptionProblem::InvalidValue {
                        key: key.clone(),
                        value: s.to_string(),
                        allowed: allowed.clone(),
                    });
                }
            }
        }

        Ok(problems)
    }
}

/// `html_theme_options` of `ns` completed with the option defaults of its
/// theme chain
pub fn merged_theme_options(
    ns: &Namespace,
    registry: &ThemeRegistry,
) -> Result<IndexMap<String, ConfigValue>> {
    let theme = ns
        .get("html_theme")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ConfigError::MissingKey("html_theme".to_string()))?;
    let empty = IndexMap::new();
    let user_options = ns
        .get("html_theme_options")
        .and_then(|v| v.as_dict())
        .unwrap_or(&empty);
    registry
        .get_merged_options(theme, user_options)
        .map_err(ConfigError::Theme)
}
