//! Glob matching with the renderer's semantics.
//!
//! `exclude_patterns` entries are shell-style globs matched against
//! source paths relative to the documentation root, using `/` as the
//! separator:
//! - `**` matches any files and zero or more directories
//! - `*` matches everything except a directory separator
//! - `?` matches any single character except a directory separator
//! - `[seq]` / `[!seq]` match a character in / not in seq

use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use walkdir::WalkDir;

use crate::error::Result;

lazy_static::lazy_static! {
    /// Cache for compiled regex patterns
    static ref PATTERN_CACHE: Mutex<HashMap<String, Regex>> = Mutex::new(HashMap::new());
}

/// Translates a glob pattern into an anchored regex pattern.
pub fn translate_pattern(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:[^/]+/)*");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    push_class(&mut out, &chars[i + 1..end]);
                    i = end + 1;
                }
                None => {
                    out.push_str("\\[");
                    i += 1;
                }
            },
            c => {
                if matches!(
                    c,
                    '\\' | '.' | '^' | '$' | '+' | '{' | '}' | '|' | '(' | ')' | ']'
                ) {
                    out.push('\\');
                }
                out.push(c);
                i += 1;
            }
        }
    }

    out.push('$');
    out
}

/// Index of the `]` closing the class opened at `start`, if any.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if j < chars.len() && chars[j] == '!' {
        j += 1;
    }
    // A leading ']' is part of the class
    if j < chars.len() && chars[j] == ']' {
        j += 1;
    }
    while j < chars.len() && chars[j] != ']' {
        j += 1;
    }
    (j < chars.len()).then_some(j)
}

/// Writes a glob class body as a regex class. A leading `!` negates the
/// class, and a negated class never matches `/`. Every other character is
/// literal apart from `-` between two characters, so `[`, `^`, `\` and the
/// regex class-set operators are escaped.
fn push_class(out: &mut String, body: &[char]) {
    let (negated, body) = match body.split_first() {
        Some(('!', rest)) => (true, rest),
        _ => (false, body),
    };
    out.push_str(if negated { "[^/" } else { "[" });
    for (k, &c) in body.iter().enumerate() {
        let is_range = c == '-' && k > 0 && k + 1 < body.len();
        if !is_range && matches!(c, '\\' | '[' | ']' | '^' | '&' | '~' | '-') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push(']');
}

/// Compiles a pattern into a regex, using cache for performance.
pub fn compile_pattern(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    let mut cache = PATTERN_CACHE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(regex) = cache.get(pattern) {
        return Ok(regex.clone());
    }

    let regex = Regex::new(&translate_pattern(pattern))?;
    cache.insert(pattern.to_string(), regex.clone());
    Ok(regex)
}

/// Normalizes a path to use forward slashes for pattern matching.
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Files below `dir` matching any include pattern and no exclude pattern.
///
/// Paths are returned relative to `dir`, `/`-separated and sorted. An empty
/// include list means `**`. A missing or unreadable directory is an error.
pub fn get_matching_files(
    dir: &Path,
    include_patterns: &[&str],
    exclude_patterns: &[&str],
) -> Result<Vec<String>> {
    let include = if include_patterns.is_empty() {
        vec![compile_pattern("**")?]
    } else {
        include_patterns
            .iter()
            .map(|p| compile_pattern(p))
            .collect::<Result<Vec<_>, _>>()?
    };
    let exclude = exclude_patterns
        .iter()
        .map(|p| compile_pattern(p))
        .collect::<Result<Vec<_>, _>>()?;

    let mut matched = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let name = normalize_path(relative);
        if include.iter().any(|re| re.is_match(&name))
            && !exclude.iter().any(|re| re.is_match(&name))
        {
            matched.push(name);
        }
    }

    matched.sort();
    Ok(matched)
}
