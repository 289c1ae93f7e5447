//! Sphinx language domains and roles
//!
//! The renderer rejects a configuration whose `primary_domain` or
//! `default_role` it does not know. This module carries the table of
//! domains and roles a stock Sphinx installation provides, and the
//! [`LanguageDomain`] option selecting between the C and C++ variants of
//! the generated configuration.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Language domain a generated configuration targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LanguageDomain {
    #[default]
    C,
    Cpp,
}

impl LanguageDomain {
    /// Sphinx domain name
    pub fn name(self) -> &'static str {
        match self {
            LanguageDomain::C => "c",
            LanguageDomain::Cpp => "cpp",
        }
    }

    /// Header extensions Breathe should route into this domain
    pub fn header_extensions(self) -> &'static [&'static str] {
        &["h"]
    }
}

impl fmt::Display for LanguageDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LanguageDomain {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "c" => Ok(LanguageDomain::C),
            "cpp" | "c++" => Ok(LanguageDomain::Cpp),
            _ => Err(ConfigError::UnknownDomain(s.to_string())),
        }
    }
}

/// Domain-independent roles of the standard domain and docutils
const STANDARD_ROLES: &[&str] = &[
    "any", "ref", "doc", "term", "option", "envvar", "token", "keyword", "numref", "download",
    "abbr", "command", "dfn", "file", "guilabel", "kbd", "mailheader", "makevar", "manpage",
    "menuselection", "mimetype", "newsgroup", "program", "regexp", "samp", "pep", "rfc", "math",
    "eq", "emphasis", "literal", "strong", "title-reference", "code", "sub", "sup",
];

/// (domain, roles) pairs
const DOMAIN_ROLES: &[(&str, &[&str])] = &[
    (
        "c",
        &[
            "member", "data", "var", "func", "macro", "struct", "union", "enum", "enumerator",
            "type", "expr", "texpr",
        ],
    ),
    (
        "cpp",
        &[
            "any", "class", "struct", "union", "func", "member", "var", "type", "concept", "enum",
            "enumerator", "expr", "texpr",
        ],
    ),
    (
        "py",
        &[
            "data", "exc", "func", "class", "const", "attr", "meth", "mod", "obj", "type",
        ],
    ),
    ("js", &["func", "meth", "class", "data", "attr", "mod"]),
    ("rst", &["dir", "role"]),
    ("math", &["numref"]),
    ("std", STANDARD_ROLES),
];

/// Whether `name` is a domain known to the renderer
pub fn is_known_domain(name: &str) -> bool {
    DOMAIN_ROLES.iter().any(|(domain, _)| *domain == name)
}

/// Names of every known domain
pub fn known_domains() -> Vec<&'static str> {
    DOMAIN_ROLES.iter().map(|(domain, _)| *domain).collect()
}

fn domain_roles(domain: &str) -> Option<&'static [&'static str]> {
    DOMAIN_ROLES
        .iter()
        .find(|(name, _)| *name == domain)
        .map(|(_, roles)| *roles)
}

/// Whether `role` resolves to a known role.
///
/// Qualified roles (`c:func`) must exist in the named domain. Unqualified
/// roles resolve against the standard roles first, then the primary domain.
pub fn is_known_role(role: &str, primary_domain: Option<&str>) -> bool {
    if let Some((domain, name)) = role.split_once(':') {
        return domain_roles(domain).is_some_and(|roles| roles.contains(&name));
    }

    if STANDARD_ROLES.contains(&role) {
        return true;
    }

    primary_domain
        .and_then(domain_roles)
        .is_some_and(|roles| roles.contains(&role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_domain_parsing() {
        assert_eq!("c".parse::<LanguageDomain>().unwrap(), LanguageDomain::C);
        assert_eq!("CPP".parse::<LanguageDomain>().unwrap(), LanguageDomain::Cpp);
        assert_eq!("c++".parse::<LanguageDomain>().unwrap(), LanguageDomain::Cpp);
        assert!(matches!(
            "rust".parse::<LanguageDomain>(),
            Err(ConfigError::UnknownDomain(_))
        ));
    }

    #[test]
    fn test_known_domains() {
        assert!(is_known_domain("c"));
        assert!(is_known_domain("cpp"));
        assert!(is_known_domain("py"));
        assert!(!is_known_domain("rust"));
        assert!(known_domains().contains(&"js"));
    }

    #[test]
    fn test_role_resolution() {
        assert!(is_known_role("any", Some("c")));
        assert!(is_known_role("c:macro", None));
        assert!(!is_known_role("c:class", None));
        assert!(is_known_role("macro", Some("c")));
        assert!(!is_known_role("macro", Some("cpp")));
        assert!(!is_known_role("nonsense", Some("c")));
        assert!(!is_known_role("rust:fn", Some("c")));
    }
}
