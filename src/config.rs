//! The documentation build configuration record
//!
//! [`BuildConfig`] holds the values the renderer, the Breathe bridge and the
//! HTML theme read from `conf.py`. One record describes both the C and the
//! C++ flavour of the configuration; [`LanguageDomain`] selects which.

use indexmap::IndexMap;

use crate::domains::LanguageDomain;
use crate::error::{ConfigError, Result};
use crate::placeholders::{self, Placeholders};
use crate::python_config::{ConfPy, Expr, Section, Statement, StrPart};
use crate::value::{ConfigValue, Namespace, ValueKind};

/// Suffix appended to the project name for `html_short_title`
pub const SHORT_TITLE_SUFFIX: &str = " docs";

/// Name of the Breathe extension
pub const BREATHE_EXTENSION: &str = "breathe";

/// Default `html_theme`
pub const DEFAULT_THEME: &str = "sphinx_rtd_theme";

/// `html_short_title` derived from the project name
pub fn short_title(project: &str) -> String {
    format!("{}{}", project, SHORT_TITLE_SUFFIX)
}

/// `rst_prolog` derived from the repository URL
pub fn rst_prolog(git_url: &str) -> String {
    format!(":github_url: {}", git_url)
}

/// `rst_epilog` derived from the repository URL: a link target and a
/// `|git_url|` substitution usable anywhere in the prose.
pub fn rst_epilog(git_url: &str) -> String {
    format!(
        ".. _git_url: {url}\n.. |git_url| replace:: {url}.git\n",
        url = git_url
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    // Project metadata
    pub project: String,
    pub copyright: String,
    pub author: String,
    pub version: String,
    pub release: String,
    pub git_url: String,

    // Sphinx
    pub primary_domain: String,
    pub default_role: String,
    pub toc_object_entries: Option<bool>,
    pub exclude_patterns: Vec<String>,
    pub extensions: Vec<String>,
    pub rst_prolog: String,
    pub rst_epilog: String,

    // HTML
    pub html_theme: String,
    pub html_theme_options: IndexMap<String, ConfigValue>,
    pub html_static_path: Vec<String>,
    pub html_css_files: Vec<String>,
    pub html_short_title: String,
    pub html_copy_source: bool,
    pub html_show_sphinx: bool,
    pub html_use_index: bool,

    // Breathe
    pub breathe_projects: IndexMap<String, String>,
    pub breathe_default_project: String,
    pub breathe_default_members: Vec<String>,
    pub breathe_domain_by_extension: IndexMap<String, String>,
}

impl BuildConfig {
    /// Configuration for `domain` with placeholders resolved from
    /// `placeholders`; undefined ones stay as `@NAME@` text.
    pub fn for_domain(placeholders: &Placeholders, domain: LanguageDomain) -> Self {
        let value = |name: &str| placeholders.value_or_token(name);

        let project = value(placeholders::PROJECT_NAME);
        let author = value(placeholders::AUTHOR);
        let version = value(placeholders::PROJECT_VERSION);
        let git_url = value(placeholders::GIT_URL);
        let copyright = format!("{}, {}", value(placeholders::COPYRIGHT_YEAR), author);

        // Only the C flavour ships its own stylesheet
        let (toc_object_entries, html_static_path, html_css_files) = match domain {
            LanguageDomain::C => (
                Some(false),
                vec![format!(
                    "{}/_static",
                    value(placeholders::SPHINX_INPUT_DIRECTORY)
                )],
                vec!["style.css".to_string()],
            ),
            LanguageDomain::Cpp => (None, Vec::new(), Vec::new()),
        };

        let mut html_theme_options = IndexMap::new();
        html_theme_options.insert("logo_only".to_string(), ConfigValue::Bool(false));

        let mut breathe_projects = IndexMap::new();
        breathe_projects.insert(
            project.clone(),
            value(placeholders::DOXYGEN_XML_OUTPUT_DIRECTORY),
        );

        let breathe_domain_by_extension = domain
            .header_extensions()
            .iter()
            .map(|ext| (ext.to_string(), domain.name().to_string()))
            .collect();

        BuildConfig {
            html_short_title: short_title(&project),
            rst_prolog: rst_prolog(&git_url),
            rst_epilog: rst_epilog(&git_url),
            breathe_default_project: project.clone(),
            project,
            copyright,
            author,
            release: version.clone(),
            version,
            git_url,

            primary_domain: domain.name().to_string(),
            default_role: "any".to_string(),
            toc_object_entries,
            exclude_patterns: vec![
                "_build".to_string(),
                "Thumbs.db".to_string(),
                ".DS_Store".to_string(),
            ],
            extensions: vec![BREATHE_EXTENSION.to_string()],

            html_theme: DEFAULT_THEME.to_string(),
            html_theme_options,
            html_static_path,
            html_css_files,
            html_copy_source: false,
            html_show_sphinx: false,
            html_use_index: false,

            breathe_projects,
            breathe_default_members: vec!["members".to_string(), "undocmembers".to_string()],
            breathe_domain_by_extension,
        }
    }

    /// The `conf.py.in` template: every placeholder left unresolved
    pub fn template(domain: LanguageDomain) -> Self {
        Self::for_domain(&Placeholders::unresolved(), domain)
    }

    /// All bindings in file order
    pub fn to_namespace(&self) -> Namespace {
        self.sections()
            .into_iter()
            .flat_map(|(_, bindings)| bindings)
            .map(|(key, value, _)| (key.to_string(), value))
            .collect()
    }

    /// Typed view of a loaded namespace
    pub fn from_namespace(ns: &Namespace) -> Result<Self> {
        let optional_bool = |key: &str| -> Result<Option<bool>> {
            match ns.get(key) {
                None => Ok(None),
                Some(_) => get_bool(ns, key).map(Some),
            }
        };
        let optional_list = |key: &str| -> Result<Vec<String>> {
            match ns.get(key) {
                None => Ok(Vec::new()),
                Some(_) => get_str_seq(ns, key, ValueKind::List),
            }
        };
        let optional_str = |key: &str| -> Result<String> {
            match ns.get(key) {
                None => Ok(String::new()),
                Some(_) => get_str(ns, key),
            }
        };

        Ok(BuildConfig {
            project: get_str(ns, "project")?,
            copyright: get_str(ns, "copyright")?,
            author: get_str(ns, "author")?,
            version: get_str(ns, "version")?,
            release: get_str(ns, "release")?,
            git_url: optional_str("git_url")?,

            primary_domain: get_str(ns, "primary_domain")?,
            default_role: get_str(ns, "default_role")?,
            toc_object_entries: optional_bool("toc_object_entries")?,
            exclude_patterns: get_str_seq(ns, "exclude_patterns", ValueKind::List)?,
            extensions: get_str_seq(ns, "extensions", ValueKind::List)?,
            rst_prolog: optional_str("rst_prolog")?,
            rst_epilog: optional_str("rst_epilog")?,

            html_theme: get_str(ns, "html_theme")?,
            html_theme_options: get_dict(ns, "html_theme_options")?.clone(),
            html_static_path: optional_list("html_static_path")?,
            html_css_files: optional_list("html_css_files")?,
            html_short_title: get_str(ns, "html_short_title")?,
            html_copy_source: get_bool(ns, "html_copy_source")?,
            html_show_sphinx: get_bool(ns, "html_show_sphinx")?,
            html_use_index: get_bool(ns, "html_use_index")?,

            breathe_projects: get_str_dict(ns, "breathe_projects")?,
            breathe_default_project: get_str(ns, "breathe_default_project")?,
            breathe_default_members: get_str_seq(
                ns,
                "breathe_default_members",
                ValueKind::Tuple,
            )?,
            breathe_domain_by_extension: get_str_dict(ns, "breathe_domain_by_extension")?,
        })
    }

    /// Render as `conf.py` source.
    ///
    /// Values that still equal their derivation are written as the
    /// expression deriving them, so substituting the placeholders of a
    /// rendered template keeps the derived values consistent.
    pub fn to_conf_py(&self) -> Result<String> {
        let sections = self
            .sections()
            .into_iter()
            .map(|(title, bindings)| Section {
                title: title.to_string(),
                statements: bindings
                    .into_iter()
                    .map(|(key, value, expr)| {
                        Statement::new(key, expr.unwrap_or_else(|| Expr::from_value(&value)))
                    })
                    .collect(),
            })
            .collect();

        ConfPy {
            header: vec![
                "Configuration file for the Sphinx documentation builder.".to_string(),
                format!(
                    "Generated by {} {}.",
                    env!("CARGO_PKG_NAME"),
                    env!("CARGO_PKG_VERSION")
                ),
            ],
            sections,
        }
        .render()
    }

    /// Bindings grouped into sections: key, value, and the deriving
    /// expression when the value still matches it.
    #[allow(clippy::type_complexity)]
    fn sections(&self) -> Vec<(&'static str, Vec<(&'static str, ConfigValue, Option<Expr>)>)> {
        let derived = |matches: bool, expr: Expr| matches.then_some(expr);
        let fstring = |parts: Vec<StrPart>| Expr::Str(parts);
        let lit = |s: &str| StrPart::Literal(s.to_string());
        let name = |s: &str| StrPart::Name(s.to_string());

        let mut sphinx = vec![
            (
                "primary_domain",
                ConfigValue::str(&self.primary_domain),
                None,
            ),
            ("default_role", ConfigValue::str(&self.default_role), None),
        ];
        if let Some(entries) = self.toc_object_entries {
            sphinx.push(("toc_object_entries", ConfigValue::Bool(entries), None));
        }
        sphinx.extend([
            (
                "exclude_patterns",
                ConfigValue::str_list(&self.exclude_patterns),
                None,
            ),
            ("extensions", ConfigValue::str_list(&self.extensions), None),
            (
                "rst_prolog",
                ConfigValue::str(&self.rst_prolog),
                derived(
                    self.rst_prolog == rst_prolog(&self.git_url),
                    fstring(vec![lit(":github_url: "), name("git_url")]),
                ),
            ),
            (
                "rst_epilog",
                ConfigValue::str(&self.rst_epilog),
                derived(
                    self.rst_epilog == rst_epilog(&self.git_url),
                    fstring(vec![
                        lit(".. _git_url: "),
                        name("git_url"),
                        lit("\n.. |git_url| replace:: "),
                        name("git_url"),
                        lit(".git\n"),
                    ]),
                ),
            ),
        ]);

        let mut html = vec![
            ("html_theme", ConfigValue::str(&self.html_theme), None),
            (
                "html_theme_options",
                ConfigValue::Dict(self.html_theme_options.clone()),
                None,
            ),
        ];
        if !self.html_static_path.is_empty() {
            html.push((
                "html_static_path",
                ConfigValue::str_list(&self.html_static_path),
                None,
            ));
        }
        if !self.html_css_files.is_empty() {
            html.push((
                "html_css_files",
                ConfigValue::str_list(&self.html_css_files),
                None,
            ));
        }
        html.extend([
            (
                "html_short_title",
                ConfigValue::str(&self.html_short_title),
                derived(
                    self.html_short_title == short_title(&self.project),
                    fstring(vec![name("project"), lit(SHORT_TITLE_SUFFIX)]),
                ),
            ),
            ("html_copy_source", ConfigValue::Bool(self.html_copy_source), None),
            ("html_show_sphinx", ConfigValue::Bool(self.html_show_sphinx), None),
            ("html_use_index", ConfigValue::Bool(self.html_use_index), None),
        ]);

        let projects_expr = Expr::Dict(
            self.breathe_projects
                .iter()
                .map(|(key, path)| {
                    let key = if *key == self.project {
                        Expr::name("project")
                    } else {
                        Expr::literal(key.clone())
                    };
                    (key, Expr::literal(path.clone()))
                })
                .collect(),
        );
        let breathe = vec![
            (
                "breathe_projects",
                ConfigValue::str_dict(&self.breathe_projects),
                Some(projects_expr),
            ),
            (
                "breathe_default_project",
                ConfigValue::str(&self.breathe_default_project),
                derived(
                    self.breathe_default_project == self.project,
                    Expr::name("project"),
                ),
            ),
            (
                "breathe_default_members",
                ConfigValue::str_tuple(&self.breathe_default_members),
                None,
            ),
            (
                "breathe_domain_by_extension",
                ConfigValue::str_dict(&self.breathe_domain_by_extension),
                None,
            ),
        ];

        vec![
            (
                "Project metadata",
                vec![
                    ("project", ConfigValue::str(&self.project), None),
                    ("copyright", ConfigValue::str(&self.copyright), None),
                    ("author", ConfigValue::str(&self.author), None),
                    ("version", ConfigValue::str(&self.version), None),
                    ("release", ConfigValue::str(&self.release), None),
                    ("git_url", ConfigValue::str(&self.git_url), None),
                ],
            ),
            ("Sphinx", sphinx),
            ("HTML", html),
            ("Breathe", breathe),
        ]
    }
}

fn get<'a>(ns: &'a Namespace, key: &str) -> Result<&'a ConfigValue> {
    ns.get(key)
        .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
}

fn mismatch(key: &str, expected: &str, found: &ConfigValue) -> ConfigError {
    ConfigError::TypeMismatch {
        key: key.to_string(),
        expected: expected.to_string(),
        found: found.kind().to_string(),
    }
}

fn get_str(ns: &Namespace, key: &str) -> Result<String> {
    let value = get(ns, key)?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| mismatch(key, "a string", value))
}

fn get_bool(ns: &Namespace, key: &str) -> Result<bool> {
    let value = get(ns, key)?;
    value
        .as_bool()
        .ok_or_else(|| mismatch(key, "a boolean", value))
}

fn get_dict<'a>(ns: &'a Namespace, key: &str) -> Result<&'a IndexMap<String, ConfigValue>> {
    let value = get(ns, key)?;
    value.as_dict().ok_or_else(|| mismatch(key, "a dict", value))
}

/// Sequence of strings. `kind` is the preferred shape for messages; lists
/// and tuples are both accepted, as the renderer does.
fn get_str_seq(ns: &Namespace, key: &str, kind: ValueKind) -> Result<Vec<String>> {
    let value = get(ns, key)?;
    let expected = format!("{} of strings", kind);
    let items = value.as_seq().ok_or_else(|| mismatch(key, &expected, value))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| mismatch(key, &expected, value))
        })
        .collect()
}

fn get_str_dict(ns: &Namespace, key: &str) -> Result<IndexMap<String, String>> {
    let map = get_dict(ns, key)?;
    map.iter()
        .map(|(k, v)| {
            v.as_str()
                .map(|s| (k.clone(), s.to_string()))
                .ok_or_else(|| mismatch(key, "a dict of strings", &ConfigValue::Dict(map.clone())))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholders::{find_tokens, substitute};
    use crate::python_config::PythonConfigParser;

    fn mylib() -> Placeholders {
        let mut placeholders = Placeholders::new();
        placeholders.define(placeholders::PROJECT_NAME, "MyLib");
        placeholders.define(placeholders::AUTHOR, "Jane Doe");
        placeholders.define(placeholders::COPYRIGHT_YEAR, "2024");
        placeholders.define(placeholders::PROJECT_VERSION, "1.2.3");
        placeholders.define(placeholders::GIT_URL, "https://example.com/repo");
        placeholders.define(placeholders::SPHINX_INPUT_DIRECTORY, "/src/docs");
        placeholders.define(placeholders::DOXYGEN_XML_OUTPUT_DIRECTORY, "/build/xml");
        placeholders
    }

    #[test]
    fn test_derived_values() {
        let config = BuildConfig::for_domain(&mylib(), LanguageDomain::C);
        assert_eq!(config.html_short_title, "MyLib docs");
        assert_eq!(config.copyright, "2024, Jane Doe");
        assert_eq!(config.release, "1.2.3");
        assert_eq!(config.rst_prolog, ":github_url: https://example.com/repo");
        assert!(config
            .rst_epilog
            .contains(".. |git_url| replace:: https://example.com/repo.git"));
        assert_eq!(config.breathe_default_project, "MyLib");
        assert_eq!(config.breathe_projects["MyLib"], "/build/xml");
        assert_eq!(config.html_static_path, vec!["/src/docs/_static"]);
    }

    #[test]
    fn test_domain_variants() {
        let c = BuildConfig::for_domain(&mylib(), LanguageDomain::C);
        let cpp = BuildConfig::for_domain(&mylib(), LanguageDomain::Cpp);

        assert_eq!(c.primary_domain, "c");
        assert_eq!(cpp.primary_domain, "cpp");
        assert_eq!(c.breathe_domain_by_extension["h"], "c");
        assert_eq!(cpp.breathe_domain_by_extension["h"], "cpp");
        assert_eq!(c.toc_object_entries, Some(false));
        assert_eq!(cpp.toc_object_entries, None);
        assert!(cpp.html_static_path.is_empty());
        assert!(cpp.html_css_files.is_empty());
        assert_eq!(cpp.primary_domain.parse::<LanguageDomain>().unwrap(), LanguageDomain::Cpp);

        let ns = cpp.to_namespace();
        assert!(!ns.contains_key("html_static_path"));
        assert!(!ns.contains_key("toc_object_entries"));
    }

    #[test]
    fn test_template_uses_every_token() {
        let source = BuildConfig::template(LanguageDomain::C).to_conf_py().unwrap();
        let tokens = find_tokens(&source);
        for name in placeholders::KNOWN_TOKENS {
            assert!(tokens.iter().any(|t| t == name), "{} missing", name);
        }
        assert!(source.contains("html_short_title = f\"{project} docs\""));
        assert!(source.contains("breathe_projects = {project: \"@DOXYGEN_XML_OUTPUT_DIRECTORY@\"}"));
        assert!(source.contains("breathe_default_project = project\n"));
        assert!(source.contains("rst_prolog = f\":github_url: {git_url}\""));
    }

    #[test]
    fn test_template_configure_load_matches_direct_generation() {
        let template = BuildConfig::template(LanguageDomain::C).to_conf_py().unwrap();
        let configured = substitute(&template, &mylib());
        assert!(configured.is_complete());

        let ns = PythonConfigParser::new().load_str(&configured.text).unwrap();
        let loaded = BuildConfig::from_namespace(&ns).unwrap();
        assert_eq!(loaded, BuildConfig::for_domain(&mylib(), LanguageDomain::C));
    }

    #[test]
    fn test_overridden_derived_value_is_written_literally() {
        let mut config = BuildConfig::for_domain(&mylib(), LanguageDomain::Cpp);
        config.html_short_title = "Handbook".to_string();
        let source = config.to_conf_py().unwrap();
        assert!(source.contains("html_short_title = \"Handbook\"\n"));

        let ns = PythonConfigParser::new().load_str(&source).unwrap();
        assert_eq!(BuildConfig::from_namespace(&ns).unwrap(), config);
    }

    #[test]
    fn test_from_namespace_errors() {
        let mut ns = BuildConfig::for_domain(&mylib(), LanguageDomain::C).to_namespace();
        ns.shift_remove("project");
        assert!(matches!(
            BuildConfig::from_namespace(&ns),
            Err(ConfigError::MissingKey(key)) if key == "project"
        ));

        let mut ns = BuildConfig::for_domain(&mylib(), LanguageDomain::C).to_namespace();
        ns.insert("html_use_index".to_string(), ConfigValue::str("no"));
        assert!(matches!(
            BuildConfig::from_namespace(&ns),
            Err(ConfigError::TypeMismatch { key, .. }) if key == "html_use_index"
        ));
    }
}
