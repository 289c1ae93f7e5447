//! Doxygen input filter for `@alias` docstrings
//!
//! Function-like macros read better in the API reference when documented as
//! the function they behave like. A docstring containing
//! `@alias <declaration>` has the command removed, and the entity right
//! after the docstring is replaced by the declaration:
//!
//! ```text
//! /**                                      /**
//!  * Returns the maximum of a and b.        * Returns the maximum of a and b.
//!  * @alias T max(T a, T b);          =>     */
//!  */                                      T max(T a, T b);
//! #define max(a, b) ((a) > (b) ? (a) : (b))
//! ```
//!
//! The declaration may continue over the following docstring lines, up to
//! the next command or the end of the block. Everything after the replaced
//! entity is dropped until the next docstring starts.

use std::borrow::Cow;
use std::io::{self, BufRead, Write};

const COMMAND_PREFIXES: [char; 2] = ['@', '\\'];
const ALIAS_COMMANDS: [&str; 2] = ["@alias ", "\\alias "];
const DOC_LINE_START: &str = "///";
const DOC_BLOCK_START: &str = "/**";
const DOC_BLOCK_END: &str = "*/";
const DOC_BLOCK_STRIP: &[char] = &[' ', '\t', '*'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Copying code, waiting for a docstring block to open
    WritingUntilDocBlock,
    /// Inside a docstring block
    LookingForAlias,
    /// Collecting the lines of an alias declaration
    AliasContinuation,
    /// Alias collected, waiting for the block to close
    LookingForInsertion,
    /// Block closed, the next line is the entity to replace
    FoundInsertion,
    /// Dropping the rest of the replaced entity
    DiscardingUntilDocstring,
}

/// Line-oriented `@alias` rewriter
#[derive(Debug)]
pub struct AliasFilter {
    state: State,
    alias: String,
}

impl Default for AliasFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl AliasFilter {
    pub fn new() -> Self {
        Self {
            state: State::LookingForAlias,
            alias: String::new(),
        }
    }

    /// Feed one line, newline included. Returns what to emit for it, if
    /// anything.
    pub fn filter_line<'a>(&mut self, line: &'a str) -> Option<Cow<'a, str>> {
        let trimmed = line.trim();

        match self.state {
            State::WritingUntilDocBlock => {
                if trimmed.starts_with(DOC_BLOCK_START) && !trimmed.ends_with(DOC_BLOCK_END) {
                    self.state = State::LookingForAlias;
                }
                Some(Cow::Borrowed(line))
            }
            State::LookingForAlias => {
                if trimmed.starts_with(DOC_BLOCK_END) {
                    self.state = State::WritingUntilDocBlock;
                    Some(Cow::Borrowed(line))
                } else if let Some(alias) = find_alias(trimmed) {
                    self.alias = alias.to_string();
                    self.state = State::AliasContinuation;
                    None
                } else {
                    Some(Cow::Borrowed(line))
                }
            }
            State::AliasContinuation => {
                if trimmed.starts_with(DOC_BLOCK_END) {
                    self.state = State::FoundInsertion;
                    Some(Cow::Borrowed(line))
                } else if self.continue_alias(trimmed) {
                    None
                } else {
                    self.state = State::LookingForInsertion;
                    Some(Cow::Borrowed(line))
                }
            }
            State::LookingForInsertion => {
                if trimmed.starts_with(DOC_BLOCK_END) {
                    self.state = State::FoundInsertion;
                }
                Some(Cow::Borrowed(line))
            }
            State::FoundInsertion => {
                self.state = State::DiscardingUntilDocstring;
                let mut alias = std::mem::take(&mut self.alias);
                alias.push('\n');
                Some(Cow::Owned(alias))
            }
            State::DiscardingUntilDocstring => {
                if trimmed.starts_with(DOC_BLOCK_START) {
                    self.state = if trimmed.ends_with(DOC_BLOCK_END) {
                        State::WritingUntilDocBlock
                    } else {
                        State::LookingForAlias
                    };
                    Some(Cow::Borrowed(line))
                } else if trimmed.starts_with(DOC_LINE_START) {
                    self.state = State::WritingUntilDocBlock;
                    Some(Cow::Borrowed(line))
                } else {
                    None
                }
            }
        }
    }

    /// Appends a docstring line to the alias. Returns false when the line
    /// starts a new command and so ends the alias.
    fn continue_alias(&mut self, trimmed: &str) -> bool {
        let text = trimmed.trim_start_matches(DOC_BLOCK_STRIP);
        if text.starts_with(COMMAND_PREFIXES) {
            return false;
        }
        if !text.is_empty() {
            self.alias.push(' ');
            self.alias.push_str(text);
        }
        true
    }

    /// Filter a whole stream
    pub fn filter<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> io::Result<()> {
        let mut line = String::new();
        loop {
            line.clear();
            if input.read_line(&mut line)? == 0 {
                break;
            }
            if let Some(out) = self.filter_line(&line) {
                output.write_all(out.as_bytes())?;
            }
        }
        output.flush()
    }
}

fn find_alias(line: &str) -> Option<&str> {
    ALIAS_COMMANDS
        .iter()
        .find_map(|cmd| line.find(cmd).map(|idx| &line[idx + cmd.len()..]))
}

/// Filter `input` into a string
pub fn filter_str(input: &str) -> String {
    let mut filter = AliasFilter::new();
    input
        .split_inclusive('\n')
        .filter_map(|line| filter.filter_line(line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macro_documented_as_function() {
        let input = "\
/**
 * Returns the maximum between a and b.
 * @param a First number.
 * @param b Second number.
 * @return Maximum between a and b.
 * @alias T max(T a, T b);
 */
#define max(a, b) (((a) > (b)) ? (a) : (b))
";
        let expected = "\
/**
 * Returns the maximum between a and b.
 * @param a First number.
 * @param b Second number.
 * @return Maximum between a and b.
 */
T max(T a, T b);
";
        assert_eq!(filter_str(input), expected);
    }

    #[test]
    fn test_multiline_alias_and_macro_body() {
        let input = "\
/**
 * Swaps two values.
 * \\alias void swap(T a,
 *                   T b);
 * @note Evaluates its arguments twice.
 */
#define swap(a, b) do { \\
    T tmp = a; a = b; b = tmp; \\
} while (0)

/// Plain function.
int plain(void);
";
        let expected = "\
/**
 * Swaps two values.
 * @note Evaluates its arguments twice.
 */
void swap(T a, T b);
/// Plain function.
int plain(void);
";
        assert_eq!(filter_str(input), expected);
    }

    #[test]
    fn test_single_line_docstring_after_alias() {
        let input = "\
/**
 * @alias int one(void);
 */
#define one() 1
/** Two. */
int two(void);
/**
 * Three.
 */
int three(void);
";
        let expected = "\
/**
 */
int one(void);
/** Two. */
int two(void);
/**
 * Three.
 */
int three(void);
";
        assert_eq!(filter_str(input), expected);
    }

    #[test]
    fn test_code_without_alias_passes_through() {
        let input = "#include <stdio.h>\n\n/**\n * Doc.\n */\nint f(void);\n";
        assert_eq!(filter_str(input), input);
    }

    #[test]
    fn test_stream_filter() {
        let input = "/**\n * @alias int g(void);\n */\n#define g() 0\n";
        let mut output = Vec::new();
        AliasFilter::new()
            .filter(input.as_bytes(), &mut output)
            .unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "/**\n */\nint g(void);\n");
    }
}
