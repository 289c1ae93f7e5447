//! Configuration contract checks
//!
//! Nothing in `conf.py` validates itself: an unknown domain or theme makes
//! the renderer abort at load time, a dangling `breathe_default_project`
//! fails on the first directive, and a leftover `@NAME@` token silently
//! ends up in the generated pages. [`ConfigValidator`] runs those checks
//! ahead of the build and reports them as [`Diagnostic`]s.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{short_title, BREATHE_EXTENSION};
use crate::domains;
use crate::matching;
use crate::placeholders::{find_tokens, token};
use crate::theme::{OptionProblem, ThemeRegistry};
use crate::value::{ConfigValue, Namespace};

/// Represents the severity level of a validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSeverity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationSeverity::Info => write!(f, "info"),
            ValidationSeverity::Warning => write!(f, "warning"),
            ValidationSeverity::Error => write!(f, "error"),
        }
    }
}

/// A single finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: ValidationSeverity,
    /// Configuration key the finding is about
    pub key: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.key, self.message)
    }
}

/// Findings of one validation run, in check order
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    fn push(&mut self, severity: ValidationSeverity, key: &str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            key: key.to_string(),
            message: message.into(),
        });
    }

    fn error(&mut self, key: &str, message: impl Into<String>) {
        self.push(ValidationSeverity::Error, key, message);
    }

    fn warning(&mut self, key: &str, message: impl Into<String>) {
        self.push(ValidationSeverity::Warning, key, message);
    }

    fn info(&mut self, key: &str, message: impl Into<String>) {
        self.push(ValidationSeverity::Info, key, message);
    }

    pub fn has_errors(&self) -> bool {
        self.count(ValidationSeverity::Error) > 0
    }

    pub fn has_warnings(&self) -> bool {
        self.count(ValidationSeverity::Warning) > 0
    }

    pub fn count(&self, severity: ValidationSeverity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Findings about `key`
    pub fn for_key<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics.iter().filter(move |d| d.key == key)
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics
            .iter()
            .all(|d| d.severity == ValidationSeverity::Info)
    }
}

/// Expected shape of a required key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Str,
    Bool,
    /// List or tuple of strings
    StrSeq,
    Dict,
    /// Dict with string values
    StrDict,
}

impl Expected {
    pub fn matches(self, value: &ConfigValue) -> bool {
        match self {
            Expected::Str => value.as_str().is_some(),
            Expected::Bool => value.as_bool().is_some(),
            Expected::StrSeq => value
                .as_seq()
                .is_some_and(|items| items.iter().all(|i| i.as_str().is_some())),
            Expected::Dict => value.as_dict().is_some(),
            Expected::StrDict => value
                .as_dict()
                .is_some_and(|map| map.values().all(|v| v.as_str().is_some())),
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Str => write!(f, "a string"),
            Expected::Bool => write!(f, "a boolean"),
            Expected::StrSeq => write!(f, "a list or tuple of strings"),
            Expected::Dict => write!(f, "a dict"),
            Expected::StrDict => write!(f, "a dict of strings"),
        }
    }
}

/// Keys every configuration must define
pub const REQUIRED_KEYS: &[(&str, Expected)] = &[
    ("project", Expected::Str),
    ("author", Expected::Str),
    ("copyright", Expected::Str),
    ("version", Expected::Str),
    ("release", Expected::Str),
    ("primary_domain", Expected::Str),
    ("default_role", Expected::Str),
    ("extensions", Expected::StrSeq),
    ("exclude_patterns", Expected::StrSeq),
    ("html_theme", Expected::Str),
    ("html_theme_options", Expected::Dict),
    ("html_short_title", Expected::Str),
    ("html_copy_source", Expected::Bool),
    ("html_show_sphinx", Expected::Bool),
    ("html_use_index", Expected::Bool),
    ("breathe_projects", Expected::StrDict),
    ("breathe_default_project", Expected::Str),
    ("breathe_default_members", Expected::StrSeq),
    ("breathe_domain_by_extension", Expected::StrDict),
];

/// Keys that are checked when present
const OPTIONAL_KEYS: &[(&str, Expected)] = &[
    ("git_url", Expected::Str),
    ("toc_object_entries", Expected::Bool),
    ("rst_prolog", Expected::Str),
    ("rst_epilog", Expected::Str),
    ("html_static_path", Expected::StrSeq),
    ("html_css_files", Expected::StrSeq),
    ("html_theme_path", Expected::StrSeq),
];

#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    /// Check that referenced directories and files exist
    pub check_paths: bool,
    /// Directory relative paths are resolved against (the `conf.py` directory)
    pub base_dir: Option<PathBuf>,
}

/// Runs the contract checks over a loaded namespace
pub struct ConfigValidator {
    options: ValidationOptions,
    themes: ThemeRegistry,
}

impl ConfigValidator {
    pub fn new(options: ValidationOptions) -> Self {
        Self {
            options,
            themes: ThemeRegistry::with_builtin_themes(),
        }
    }

    pub fn validate(&mut self, ns: &Namespace) -> Report {
        let mut report = Report::default();

        self.check_types(ns, &mut report);
        self.check_placeholders(ns, &mut report);
        self.check_domains(ns, &mut report);
        self.check_breathe(ns, &mut report);
        self.check_theme(ns, &mut report);
        self.check_exclude_patterns(ns, &mut report);
        self.check_short_title(ns, &mut report);
        if self.options.check_paths {
            self.check_paths(ns, &mut report);
        }

        log::debug!(
            "Validation finished: {} error(s), {} warning(s)",
            report.count(ValidationSeverity::Error),
            report.count(ValidationSeverity::Warning)
        );
        report
    }

    fn check_types(&self, ns: &Namespace, report: &mut Report) {
        for (key, expected) in REQUIRED_KEYS {
            match ns.get(*key) {
                None => report.error(key, "required key is not defined"),
                Some(value) if !expected.matches(value) => report.error(
                    key,
                    format!("should be {}, found {}", expected, value.kind()),
                ),
                Some(_) => {}
            }
        }
        for (key, expected) in OPTIONAL_KEYS {
            if let Some(value) = ns.get(*key) {
                if !expected.matches(value) {
                    report.error(
                        key,
                        format!("should be {}, found {}", expected, value.kind()),
                    );
                }
            }
        }
    }

    fn check_placeholders(&self, ns: &Namespace, report: &mut Report) {
        for (key, value) in ns {
            let mut tokens: Vec<String> = Vec::new();
            value.for_each_str(&mut |s| {
                for name in find_tokens(s) {
                    if !tokens.contains(&name) {
                        tokens.push(name);
                    }
                }
            });
            if !tokens.is_empty() {
                let tokens: Vec<String> = tokens.iter().map(|t| token(t)).collect();
                report.warning(
                    key,
                    format!(
                        "unresolved placeholder(s) {} will appear verbatim in the output",
                        tokens.join(", ")
                    ),
                );
            }
        }
    }

    fn check_domains(&self, ns: &Namespace, report: &mut Report) {
        let primary = str_value(ns, "primary_domain");
        if let Some(domain) = primary {
            if !domains::is_known_domain(domain) {
                report.error(
                    "primary_domain",
                    format!(
                        "unknown domain '{}' (known: {})",
                        domain,
                        domains::known_domains().join(", ")
                    ),
                );
            }
        }

        if let Some(role) = str_value(ns, "default_role") {
            if !domains::is_known_role(role, primary) {
                report.error("default_role", format!("unknown role '{}'", role));
            }
        }

        if let Some(map) = ns.get("breathe_domain_by_extension").and_then(|v| v.as_dict()) {
            for (ext, domain) in map {
                if let Some(domain) = domain.as_str() {
                    if !domains::is_known_domain(domain) {
                        report.error(
                            "breathe_domain_by_extension",
                            format!("extension '{}' maps to unknown domain '{}'", ext, domain),
                        );
                    }
                }
            }
        }
    }

    fn check_breathe(&self, ns: &Namespace, report: &mut Report) {
        let projects = ns.get("breathe_projects").and_then(|v| v.as_dict());
        if let (Some(projects), Some(default)) =
            (projects, str_value(ns, "breathe_default_project"))
        {
            if !projects.contains_key(default) {
                let known: Vec<&str> = projects.keys().map(String::as_str).collect();
                report.error(
                    "breathe_default_project",
                    format!(
                        "'{}' is not a key of breathe_projects (keys: {})",
                        default,
                        known.join(", ")
                    ),
                );
            }
        }

        let uses_breathe = ns.keys().any(|k| k.starts_with("breathe_"));
        let has_extension = ns
            .get("extensions")
            .and_then(|v| v.as_seq())
            .is_some_and(|exts| exts.iter().any(|e| e.as_str() == Some(BREATHE_EXTENSION)));
        if uses_breathe && !has_extension {
            report.warning(
                "extensions",
                "breathe_* settings are defined but the breathe extension is not enabled",
            );
        }
    }

    fn check_theme(&mut self, ns: &Namespace, report: &mut Report) {
        if let Some(dirs) = ns.get("html_theme_path").and_then(|v| v.as_seq()) {
            for dir in dirs.iter().filter_map(|d| d.as_str()) {
                let path = self.resolve(dir);
                if let Err(e) = self.themes.discover_themes(&path) {
                    report.warning(
                        "html_theme_path",
                        format!("cannot read theme directory {}: {}", path.display(), e),
                    );
                }
            }
        }

        let Some(theme) = str_value(ns, "html_theme") else {
            return;
        };
        if !self.themes.has_theme(theme) {
            report.error("html_theme", format!("unknown theme '{}'", theme));
            return;
        }

        let Some(options) = ns.get("html_theme_options").and_then(|v| v.as_dict()) else {
            return;
        };
        match self.themes.validate_options(theme, options) {
            Ok(problems) => {
                for problem in problems {
                    match problem {
                        OptionProblem::Unknown(_) => {
                            report.warning("html_theme_options", problem.to_string())
                        }
                        _ => report.error("html_theme_options", problem.to_string()),
                    }
                }
            }
            Err(e) => report.error("html_theme", e),
        }
    }

    fn check_exclude_patterns(&self, ns: &Namespace, report: &mut Report) {
        let Some(patterns) = ns.get("exclude_patterns").and_then(|v| v.as_seq()) else {
            return;
        };
        for pattern in patterns.iter().filter_map(|p| p.as_str()) {
            if let Err(e) = matching::compile_pattern(pattern) {
                report.error(
                    "exclude_patterns",
                    format!("invalid pattern '{}': {}", pattern, e),
                );
            }
        }
    }

    fn check_short_title(&self, ns: &Namespace, report: &mut Report) {
        if let (Some(project), Some(title)) =
            (str_value(ns, "project"), str_value(ns, "html_short_title"))
        {
            if title != short_title(project) {
                report.info(
                    "html_short_title",
                    format!("differs from the usual '{}'", short_title(project)),
                );
            }
        }
    }

    fn check_paths(&self, ns: &Namespace, report: &mut Report) {
        if let Some(projects) = ns.get("breathe_projects").and_then(|v| v.as_dict()) {
            for (name, dir) in projects {
                let Some(dir) = dir.as_str().filter(|d| find_tokens(d).is_empty()) else {
                    continue;
                };
                let path = self.resolve(dir);
                if !path.is_dir() {
                    report.warning(
                        "breathe_projects",
                        format!(
                            "Doxygen XML directory {} of project '{}' does not exist",
                            path.display(),
                            name
                        ),
                    );
                    continue;
                }
                let xml = match matching::get_matching_files(&path, &["*.xml"], &[]) {
                    Ok(xml) => xml,
                    Err(e) => {
                        report.warning(
                            "breathe_projects",
                            format!("cannot list Doxygen XML directory {}: {}", path.display(), e),
                        );
                        continue;
                    }
                };
                if xml.is_empty() {
                    report.warning(
                        "breathe_projects",
                        format!(
                            "Doxygen XML directory {} of project '{}' contains no XML files",
                            path.display(),
                            name
                        ),
                    );
                } else if !xml.iter().any(|f| f == "index.xml") {
                    report.warning(
                        "breathe_projects",
                        format!("{} has no index.xml", path.display()),
                    );
                }
            }
        }

        let static_dirs: Vec<PathBuf> = ns
            .get("html_static_path")
            .and_then(|v| v.as_seq())
            .unwrap_or_default()
            .iter()
            .filter_map(|d| d.as_str())
            .filter(|d| find_tokens(d).is_empty())
            .map(|d| self.resolve(d))
            .collect();

        for dir in &static_dirs {
            if !dir.is_dir() {
                report.warning(
                    "html_static_path",
                    format!("static directory {} does not exist", dir.display()),
                );
            }
        }

        if let Some(css_files) = ns.get("html_css_files").and_then(|v| v.as_seq()) {
            for css in css_files.iter().filter_map(|c| c.as_str()) {
                if css.contains("://") {
                    continue;
                }
                if !static_dirs.iter().any(|dir| dir.join(css).is_file()) {
                    report.warning(
                        "html_css_files",
                        format!("'{}' is not found in any static directory", css),
                    );
                }
            }
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.options.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

fn str_value<'a>(ns: &'a Namespace, key: &str) -> Option<&'a str> {
    ns.get(key).and_then(|v| v.as_str())
}

/// Run every check over `ns`
pub fn validate(ns: &Namespace, options: ValidationOptions) -> Report {
    ConfigValidator::new(options).validate(ns)
}
