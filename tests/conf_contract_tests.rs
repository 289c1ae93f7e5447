//! Integration tests for the generated conf.py contract.

use std::fs;
use tempfile::TempDir;

use ulib_docs::alias::filter_str;
use ulib_docs::config::BuildConfig;
use ulib_docs::placeholders::{self, find_tokens, substitute, Placeholders};
use ulib_docs::python_config::PythonConfigParser;
use ulib_docs::validation::{validate, ValidationOptions, ValidationSeverity, REQUIRED_KEYS};
use ulib_docs::value::ConfigValue;
use ulib_docs::LanguageDomain;

fn mylib() -> Placeholders {
    let mut values = Placeholders::new();
    values.define(placeholders::PROJECT_NAME, "MyLib");
    values.define(placeholders::COPYRIGHT_YEAR, "2024");
    values.define(placeholders::AUTHOR, "Jane Doe");
    values.define(placeholders::PROJECT_VERSION, "1.2.3");
    values.define(placeholders::GIT_URL, "https://example.com/repo");
    values.define(placeholders::SPHINX_INPUT_DIRECTORY, "/src/docs");
    values.define(placeholders::DOXYGEN_XML_OUTPUT_DIRECTORY, "/build/xml");
    values
}

/// Template rendered, configured and written to a temporary conf.py
fn configured_conf(domain: LanguageDomain) -> (TempDir, std::path::PathBuf) {
    let template = BuildConfig::template(domain).to_conf_py().unwrap();
    let configured = substitute(&template, &mylib());
    assert!(configured.is_complete());

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf.py");
    fs::write(&path, configured.text).unwrap();
    (dir, path)
}

#[test]
fn test_required_keys_have_expected_types() {
    for domain in [LanguageDomain::C, LanguageDomain::Cpp] {
        let (_dir, path) = configured_conf(domain);
        let ns = PythonConfigParser::new().load_file(&path).unwrap();

        for (key, expected) in REQUIRED_KEYS {
            let value = ns.get(*key).unwrap_or_else(|| panic!("{} missing", key));
            assert!(expected.matches(value), "{} has kind {}", key, value.kind());
        }
    }
}

#[test]
fn test_loading_twice_is_identical() {
    let (_dir, path) = configured_conf(LanguageDomain::C);
    let parser = PythonConfigParser::new();

    let first = parser.load_file(&path).unwrap();
    let second = parser.load_file(&path).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_derived_values_after_configure() {
    let (_dir, path) = configured_conf(LanguageDomain::C);
    let ns = PythonConfigParser::new().load_file(&path).unwrap();

    assert_eq!(ns["html_short_title"].as_str(), Some("MyLib docs"));

    let prolog = ns["rst_prolog"].as_str().unwrap();
    assert!(prolog.contains("github_url:"));
    assert!(prolog.contains("https://example.com/repo"));

    let epilog = ns["rst_epilog"].as_str().unwrap();
    assert!(epilog.contains(".. _git_url: https://example.com/repo\n"));
    assert!(epilog.contains("replace:: https://example.com/repo.git"));
}

#[test]
fn test_default_project_is_a_breathe_project() {
    let (_dir, path) = configured_conf(LanguageDomain::Cpp);
    let ns = PythonConfigParser::new().load_file(&path).unwrap();

    let default = ns["breathe_default_project"].as_str().unwrap();
    assert_eq!(default, "MyLib");
    let projects = ns["breathe_projects"].as_dict().unwrap();
    assert_eq!(projects[default], ConfigValue::str("/build/xml"));
}

#[test]
fn test_no_tokens_left_after_substitution() {
    for domain in [LanguageDomain::C, LanguageDomain::Cpp] {
        let (_dir, path) = configured_conf(domain);
        let text = fs::read_to_string(&path).unwrap();
        assert!(find_tokens(&text).is_empty());

        let ns = PythonConfigParser::new().load_file(&path).unwrap();
        let report = validate(&ns, ValidationOptions::default());
        assert!(!report.has_errors(), "{:?}", report.diagnostics);
        assert!(!report.has_warnings(), "{:?}", report.diagnostics);
    }
}

#[test]
fn test_unconfigured_template_warns_about_tokens() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf.py");
    fs::write(&path, BuildConfig::template(LanguageDomain::C).to_conf_py().unwrap()).unwrap();

    let ns = PythonConfigParser::new().load_file(&path).unwrap();
    let report = validate(&ns, ValidationOptions::default());
    assert!(!report.has_errors(), "{:?}", report.diagnostics);
    assert!(report.for_key("project").any(|d| d.severity == ValidationSeverity::Warning));
}

#[test]
fn test_domain_variants_differ_only_where_expected() {
    let (_c_dir, c_path) = configured_conf(LanguageDomain::C);
    let (_cpp_dir, cpp_path) = configured_conf(LanguageDomain::Cpp);
    let parser = PythonConfigParser::new();
    let c = parser.load_file(&c_path).unwrap();
    let cpp = parser.load_file(&cpp_path).unwrap();

    assert_eq!(c["primary_domain"].as_str(), Some("c"));
    assert_eq!(cpp["primary_domain"].as_str(), Some("cpp"));
    assert_eq!(c["toc_object_entries"].as_bool(), Some(false));
    assert!(!cpp.contains_key("toc_object_entries"));
    assert!(c.contains_key("html_css_files"));
    assert!(!cpp.contains_key("html_css_files"));

    for key in ["project", "copyright", "html_short_title", "breathe_projects"] {
        assert_eq!(c[key], cpp[key], "{} differs", key);
    }
}

#[test]
fn test_check_paths_against_build_tree() {
    let dir = TempDir::new().unwrap();
    let xml = dir.path().join("xml");
    let static_dir = dir.path().join("_static");
    fs::create_dir_all(&xml).unwrap();
    fs::create_dir_all(&static_dir).unwrap();
    fs::write(static_dir.join("style.css"), "body {}\n").unwrap();

    let mut values = mylib();
    values.define(placeholders::SPHINX_INPUT_DIRECTORY, dir.path().to_string_lossy());
    values.define(placeholders::DOXYGEN_XML_OUTPUT_DIRECTORY, xml.to_string_lossy());
    let source = BuildConfig::for_domain(&values, LanguageDomain::C)
        .to_conf_py()
        .unwrap();
    let ns = PythonConfigParser::new().load_str(&source).unwrap();

    let options = ValidationOptions {
        check_paths: true,
        base_dir: Some(dir.path().to_path_buf()),
    };

    // Doxygen has not run yet
    let report = validate(&ns, options.clone());
    assert!(report.for_key("breathe_projects").next().is_some());

    fs::write(xml.join("index.xml"), "<doxygenindex/>\n").unwrap();
    let report = validate(&ns, options);
    assert!(report.for_key("breathe_projects").next().is_none());
    assert!(!report.has_errors(), "{:?}", report.diagnostics);
}

#[test]
fn test_alias_filter_on_header() {
    let header = "\
#ifndef ULIB_MAX_H
#define ULIB_MAX_H

/**
 * Returns the maximum between a and b.
 * @alias T ulib_max(T a, T b);
 */
#define ulib_max(a, b) (((a) > (b)) ? (a) : (b))

#endif
";
    let filtered = filter_str(header);
    assert!(filtered.contains("T ulib_max(T a, T b);\n"));
    assert!(!filtered.contains("@alias"));
    assert!(!filtered.contains("#define ulib_max"));
    assert!(filtered.starts_with("#ifndef ULIB_MAX_H\n#define ULIB_MAX_H\n"));
}
