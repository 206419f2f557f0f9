use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::error::MarkcheckSyntaxError;
use crate::locator::LocatorScanner;

/// A regex substitution written as `/search/replace/flags`.
///
/// Replacement is always global. `i` makes matching case-insensitive, `y`
/// only replaces matches that start exactly where the previous one ended
/// (the first one at the start of the line).
#[derive(Debug, Clone)]
pub struct SearchAndReplaceSpec {
    search: Regex,
    search_source: String,
    replace: String,
    /// `replace` rewritten into the regex crate's expansion syntax.
    expansion: String,
    flags: String,
}

impl SearchAndReplaceSpec {
    pub fn parse(attr_key: &str, text: &str) -> Result<Self, MarkcheckSyntaxError> {
        let mut scanner = LocatorScanner::new(attr_key, text);
        if !scanner.eat("/") {
            return Err(scanner.error("Expected `/search/replace/flags`"));
        }
        let search_source = read_segment(&mut scanner)?;
        let replace = read_segment(&mut scanner)?;

        let mut flags = String::new();
        while let Some(c) = scanner.peek() {
            if !matches!(c, 'g' | 'i' | 'y') {
                return Err(scanner.error(format!(
                    "Unsupported flag {:?} (supported: g, i, y)",
                    c
                )));
            }
            scanner.bump();
            flags.push(c);
        }

        let search = RegexBuilder::new(&search_source)
            .case_insensitive(flags.contains('i'))
            .build()
            .map_err(|e| {
                MarkcheckSyntaxError::new(format!(
                    "Invalid regular expression in `{}`: {}",
                    scanner.attr_key(),
                    e
                ))
            })?;

        Ok(SearchAndReplaceSpec {
            search,
            expansion: to_expansion(&replace),
            search_source,
            replace,
            flags,
        })
    }

    pub fn replace_all(&self, line: &str) -> String {
        if self.flags.contains('y') {
            return self.replace_sticky(line);
        }
        self.search
            .replace_all(line, self.expansion.as_str())
            .into_owned()
    }

    fn replace_sticky(&self, line: &str) -> String {
        let mut result = String::new();
        let mut pos = 0;
        while let Some(captures) = self.search.captures_at(line, pos) {
            let Some(whole) = captures.get(0) else {
                break;
            };
            if whole.start() != pos || whole.end() == pos {
                break;
            }
            captures.expand(&self.expansion, &mut result);
            pos = whole.end();
        }
        result.push_str(&line[pos..]);
        result
    }
}

impl fmt::Display for SearchAndReplaceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/{}/{}/{}",
            escape_slashes(&self.search_source),
            escape_slashes(&self.replace),
            self.flags
        )
    }
}

/// Reads up to the next unescaped `/`. `\/` becomes `/`; other backslash
/// sequences are kept for the regex engine.
fn read_segment(scanner: &mut LocatorScanner<'_>) -> Result<String, MarkcheckSyntaxError> {
    let start = scanner.pos();
    let mut segment = String::new();
    loop {
        match scanner.bump() {
            None => return Err(scanner.error_at("Missing closing `/`", start)),
            Some('/') => return Ok(segment),
            Some('\\') => {
                if scanner.eat("/") {
                    segment.push('/');
                } else if scanner.eat("\\") {
                    segment.push_str("\\\\");
                } else {
                    segment.push('\\');
                }
            }
            Some(c) => segment.push(c),
        }
    }
}

fn escape_slashes(text: &str) -> String {
    text.replace('/', "\\/")
}

/// `$&` is the whole match and `$1` a group, as in JavaScript replacement
/// strings; a lone `$` is literal.
fn to_expansion(replace: &str) -> String {
    let mut expansion = String::new();
    let mut chars = replace.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            expansion.push(c);
            continue;
        }
        match chars.peek() {
            Some('&') => {
                chars.next();
                expansion.push_str("${0}");
            }
            Some('$') => {
                chars.next();
                expansion.push_str("$$");
            }
            Some(d) if d.is_ascii_digit() => {
                let mut group = String::new();
                while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                    group.push(d);
                    chars.next();
                }
                expansion.push_str(&format!("${{{}}}", group));
            }
            _ => expansion.push_str("$$"),
        }
    }
    expansion
}
