//! Reading and writing `conf.py`
//!
//! A documentation configuration is a Python module the renderer executes
//! for its top-level bindings. [`PythonConfigParser`] runs the file in an
//! embedded interpreter, the same way the renderer does, and converts the
//! resulting globals into a [`Namespace`]. Modules, functions, classes and
//! dunder names are left out, as are values with no [`ConfigValue`]
//! counterpart. [`ConfPy`] writes the literal assignments this crate
//! generates.

use minijinja::{context, Environment};
use pyo3::exceptions::PySyntaxError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList, PyModule, PyTuple};
use pythonize::depythonize;
use serde::Serialize;
use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::value::{ConfigValue, Namespace};

/// Part of a string expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrPart {
    Literal(String),
    /// `{name}` inside an f-string
    Name(String),
}

/// Expression on the right-hand side of an assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Str(Vec<StrPart>),
    Int(i64),
    Bool(bool),
    None,
    Name(String),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
}

impl Expr {
    pub fn literal(s: impl Into<String>) -> Self {
        Expr::Str(vec![StrPart::Literal(s.into())])
    }

    pub fn name(name: impl Into<String>) -> Self {
        Expr::Name(name.into())
    }

    /// Expression producing `value`
    pub fn from_value(value: &ConfigValue) -> Self {
        match value {
            ConfigValue::Str(s) => Expr::literal(s.clone()),
            ConfigValue::Bool(b) => Expr::Bool(*b),
            ConfigValue::Int(i) => Expr::Int(*i),
            ConfigValue::None => Expr::None,
            ConfigValue::List(items) => Expr::List(items.iter().map(Expr::from_value).collect()),
            ConfigValue::Tuple(items) => Expr::Tuple(items.iter().map(Expr::from_value).collect()),
            ConfigValue::Dict(map) => Expr::Dict(
                map.iter()
                    .map(|(k, v)| (Expr::literal(k.clone()), Expr::from_value(v)))
                    .collect(),
            ),
        }
    }

    /// Python source for this expression
    pub fn to_python(&self) -> String {
        match self {
            Expr::Str(parts) => {
                let is_fstring = parts.iter().any(|p| matches!(p, StrPart::Name(_)));
                let mut out = String::from(if is_fstring { "f\"" } else { "\"" });
                for part in parts {
                    match part {
                        StrPart::Literal(s) if is_fstring => {
                            out.push_str(&escape_python(s).replace('{', "{{").replace('}', "}}"))
                        }
                        StrPart::Literal(s) => out.push_str(&escape_python(s)),
                        StrPart::Name(name) => {
                            out.push('{');
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                }
                out.push('"');
                out
            }
            Expr::Int(i) => i.to_string(),
            Expr::Bool(true) => "True".to_string(),
            Expr::Bool(false) => "False".to_string(),
            Expr::None => "None".to_string(),
            Expr::Name(name) => name.clone(),
            Expr::List(items) => format!("[{}]", join_exprs(items)),
            Expr::Tuple(items) if items.len() == 1 => format!("({},)", items[0].to_python()),
            Expr::Tuple(items) => format!("({})", join_exprs(items)),
            Expr::Dict(entries) => {
                let entries: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.to_python(), v.to_python()))
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
        }
    }
}

fn join_exprs(items: &[Expr]) -> String {
    items
        .iter()
        .map(Expr::to_python)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `target = value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub target: String,
    pub value: Expr,
}

impl Statement {
    pub fn new(target: impl Into<String>, value: Expr) -> Self {
        Self {
            target: target.into(),
            value,
        }
    }
}

/// A group of statements introduced by a comment header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub statements: Vec<Statement>,
}

/// A configuration module to be written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfPy {
    /// Comment lines written at the top of the file
    pub header: Vec<String>,
    pub sections: Vec<Section>,
}

impl ConfPy {
    /// Render as Python source
    pub fn render(&self) -> Result<String> {
        #[derive(Serialize)]
        struct StatementView {
            target: String,
            source: String,
        }

        #[derive(Serialize)]
        struct SectionView {
            title: String,
            statements: Vec<StatementView>,
        }

        let sections: Vec<SectionView> = self
            .sections
            .iter()
            .map(|section| SectionView {
                title: section.title.clone(),
                statements: section
                    .statements
                    .iter()
                    .map(|stmt| StatementView {
                        target: stmt.target.clone(),
                        source: stmt.value.to_python(),
                    })
                    .collect(),
            })
            .collect();

        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template("conf.py", CONF_PY_TEMPLATE)?;
        let rendered = env
            .get_template("conf.py")?
            .render(context! { header => &self.header, sections => sections })?;
        Ok(rendered)
    }
}

const CONF_PY_TEMPLATE: &str = r#"{% for line in header %}
# {{ line }}
{% endfor %}
{% if header %}

{% endif %}
{% for section in sections %}
{% if not loop.first %}

{% endif %}
# {{ section.title }}

{% for stmt in section.statements %}
{{ stmt.target }} = {{ stmt.source }}
{% endfor %}
{% endfor %}
"#;

/// Escapes text for the body of a double-quoted Python string.
fn escape_python(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// Loads `conf.py` files through the embedded Python interpreter
#[derive(Debug, Default)]
pub struct PythonConfigParser;

impl PythonConfigParser {
    pub fn new() -> Self {
        Self
    }

    /// Execute source text and collect its namespace. `filename` shows up
    /// in tracebacks and as `__file__`.
    pub fn load_source(&self, source: &str, filename: &str) -> Result<Namespace> {
        Python::attach(|py| {
            let globals = PyDict::new(py);
            globals
                .set_item("__file__", filename)
                .map_err(|e| python_error(py, e, filename))?;

            let builtins =
                PyModule::import(py, "builtins").map_err(|e| python_error(py, e, filename))?;
            let code = builtins
                .getattr("compile")
                .and_then(|compile| compile.call1((source, filename, "exec")))
                .map_err(|e| python_error(py, e, filename))?;
            builtins
                .getattr("exec")
                .and_then(|exec| exec.call1((code, &globals)))
                .map_err(|e| python_error(py, e, filename))?;

            Ok(collect_namespace(&globals))
        })
    }

    /// Execute source text
    pub fn load_str(&self, source: &str) -> Result<Namespace> {
        self.load_source(source, "conf.py")
    }

    /// Execute a file
    pub fn load_file(&self, path: &Path) -> Result<Namespace> {
        let source = std::fs::read_to_string(path)?;
        log::debug!("Loading configuration from {}", path.display());
        self.load_source(&source, &path.display().to_string())
    }
}

/// Configuration bindings among the module globals, in definition order
fn collect_namespace(globals: &Bound<'_, PyDict>) -> Namespace {
    let mut namespace = Namespace::new();
    for (key, value) in globals.iter() {
        let Ok(name) = key.extract::<String>() else {
            continue;
        };
        if name.starts_with("__") || value.is_instance_of::<PyModule>() || value.is_callable() {
            continue;
        }
        match to_config_value(&value) {
            Ok(value) => {
                namespace.insert(name, value);
            }
            Err(e) => log::warn!("Skipping '{}': {}", name, e),
        }
    }
    namespace
}

/// Containers are walked here so tuples stay tuples; scalars go through
/// pythonize.
fn to_config_value(obj: &Bound<'_, PyAny>) -> std::result::Result<ConfigValue, String> {
    if let Ok(tuple) = obj.downcast::<PyTuple>() {
        let items = tuple
            .iter()
            .map(|item| to_config_value(&item))
            .collect::<std::result::Result<_, _>>()?;
        return Ok(ConfigValue::Tuple(items));
    }
    if let Ok(list) = obj.downcast::<PyList>() {
        let items = list
            .iter()
            .map(|item| to_config_value(&item))
            .collect::<std::result::Result<_, _>>()?;
        return Ok(ConfigValue::List(items));
    }
    if let Ok(dict) = obj.downcast::<PyDict>() {
        let mut map = indexmap::IndexMap::new();
        for (key, value) in dict.iter() {
            let key = key
                .extract::<String>()
                .map_err(|_| format!("dict key {} is not a string", key))?;
            map.insert(key, to_config_value(&value)?);
        }
        return Ok(ConfigValue::Dict(map));
    }
    depythonize::<ConfigValue>(obj).map_err(|e| e.to_string())
}

/// Python exception as a [`ConfigError`], with the line in `filename`
/// where it was raised when known.
fn python_error(py: Python<'_>, err: PyErr, filename: &str) -> ConfigError {
    let line = if err.is_instance_of::<PySyntaxError>(py) {
        err.value(py)
            .getattr("lineno")
            .and_then(|line| line.extract::<usize>())
            .ok()
    } else {
        err.traceback(py)
            .and_then(|tb| traceback_line(tb.as_any(), filename))
    };
    let message = err.to_string();
    match line {
        Some(line) => ConfigError::Parse { line, message },
        None => ConfigError::Python(message),
    }
}

/// Line of the innermost traceback entry executing `filename`
fn traceback_line(tb: &Bound<'_, PyAny>, filename: &str) -> Option<usize> {
    let mut line = None;
    let mut current = tb.clone();
    while !current.is_none() {
        let in_file = current
            .getattr("tb_frame")
            .and_then(|frame| frame.getattr("f_code"))
            .and_then(|code| code.getattr("co_filename"))
            .and_then(|name| name.extract::<String>())
            .is_ok_and(|name| name == filename);
        if in_file {
            line = current.getattr("tb_lineno").ok()?.extract().ok();
        }
        current = current.getattr("tb_next").ok()?;
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(source: &str) -> Namespace {
        PythonConfigParser::new().load_str(source).unwrap()
    }

    fn load_err(source: &str) -> ConfigError {
        PythonConfigParser::new().load_str(source).unwrap_err()
    }

    #[test]
    fn test_literals() {
        let ns = load(
            r#"
a = "double"
b = 'single'
c = True
d = None
e = -3
f = ["x", 'y']
g = ("members", "undocmembers")
h = ("one",)
j = {"logo_only": False, "depth": 4}
k = []
"#,
        );
        assert_eq!(ns["a"], ConfigValue::str("double"));
        assert_eq!(ns["b"], ConfigValue::str("single"));
        assert_eq!(ns["c"], ConfigValue::Bool(true));
        assert_eq!(ns["d"], ConfigValue::None);
        assert_eq!(ns["e"], ConfigValue::Int(-3));
        assert_eq!(ns["f"], ConfigValue::str_list(&["x", "y"]));
        assert_eq!(ns["g"], ConfigValue::str_tuple(&["members", "undocmembers"]));
        assert_eq!(ns["h"], ConfigValue::str_tuple(&["one"]));
        let j = ns["j"].as_dict().unwrap();
        assert_eq!(j["logo_only"], ConfigValue::Bool(false));
        assert_eq!(j["depth"], ConfigValue::Int(4));
        assert_eq!(ns["k"], ConfigValue::List(vec![]));
        assert_eq!(ns.keys().next().map(String::as_str), Some("a"));
    }

    #[test]
    fn test_expressions_and_imports() {
        let ns = load(
            r#"
import os
from os import path

project = "MyLib"
html_short_title = project + " docs"
version = os.environ.get("ULIB_DOCS_UNSET_FOR_TEST", "0.0.0")
extensions = ["breathe"]
summary = f"{extensions} {None} {True}"

def helper():
    return 1

class Local:
    pass

_private = helper()
"#,
        );
        assert_eq!(ns["html_short_title"], ConfigValue::str("MyLib docs"));
        assert_eq!(ns["version"], ConfigValue::str("0.0.0"));
        assert_eq!(ns["summary"], ConfigValue::str("['breathe'] None True"));
        assert_eq!(ns["_private"], ConfigValue::Int(1));
        for hidden in ["os", "path", "helper", "Local", "__builtins__", "__file__"] {
            assert!(!ns.contains_key(hidden), "{} should be filtered", hidden);
        }
    }

    #[test]
    fn test_unrepresentable_values_are_skipped() {
        let ns = load("ratio = 1.5\nsentinel = object()\nproject = 'x'\n");
        assert!(!ns.contains_key("ratio"));
        assert!(!ns.contains_key("sentinel"));
        assert_eq!(ns["project"], ConfigValue::str("x"));
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        assert!(matches!(
            load_err("a = 1\nb = = 2\n"),
            ConfigError::Parse { line: 2, .. }
        ));
        match load_err("a = 1\ntitle = f\"{project} docs\"\n") {
            ConfigError::Parse { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("NameError"), "{}", message);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_load_file_sets_dunder_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("conf.py");
        std::fs::write(&path, "import os\nhere = os.path.dirname(__file__)\n").unwrap();

        let ns = PythonConfigParser::new().load_file(&path).unwrap();
        assert_eq!(
            ns["here"],
            ConfigValue::str(dir.path().display().to_string())
        );
    }

    #[test]
    fn test_expr_rendering() {
        assert_eq!(Expr::literal("a\"b\n").to_python(), r#""a\"b\n""#);
        assert_eq!(Expr::Bool(false).to_python(), "False");
        assert_eq!(
            Expr::from_value(&ConfigValue::str_tuple(&["members", "undocmembers"])).to_python(),
            r#"("members", "undocmembers")"#
        );
        assert_eq!(
            Expr::from_value(&ConfigValue::str_tuple(&["members"])).to_python(),
            r#"("members",)"#
        );

        let mut map = indexmap::IndexMap::new();
        map.insert("h".to_string(), "c".to_string());
        assert_eq!(
            Expr::from_value(&ConfigValue::str_dict(&map)).to_python(),
            r#"{"h": "c"}"#
        );
    }

    #[test]
    fn test_render_then_load() {
        let conf = ConfPy {
            header: vec!["Generated configuration".to_string()],
            sections: vec![
                Section {
                    title: "Project metadata".to_string(),
                    statements: vec![
                        Statement::new("project", Expr::literal("My \"Lib\"")),
                        Statement::new(
                            "html_short_title",
                            Expr::Str(vec![
                                StrPart::Name("project".to_string()),
                                StrPart::Literal(" docs {x}".to_string()),
                            ]),
                        ),
                    ],
                },
                Section {
                    title: "Breathe".to_string(),
                    statements: vec![Statement::new(
                        "breathe_projects",
                        Expr::Dict(vec![(Expr::name("project"), Expr::literal("/xml"))]),
                    )],
                },
            ],
        };

        let source = conf.render().unwrap();
        assert!(source.starts_with("# Generated configuration\n\n# Project metadata\n\n"));
        assert!(source.contains("html_short_title = f\"{project} docs {{x}}\"\n"));
        assert!(source.contains("\n\n# Breathe\n\nbreathe_projects = {project: \"/xml\"}\n"));

        let ns = load(&source);
        assert_eq!(ns["project"], ConfigValue::str("My \"Lib\""));
        assert_eq!(ns["html_short_title"], ConfigValue::str("My \"Lib\" docs {x}"));
        assert!(ns["breathe_projects"]
            .as_dict()
            .unwrap()
            .contains_key("My \"Lib\""));
    }
}
