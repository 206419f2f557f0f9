pub mod insertion;
pub mod search_and_replace;

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{MarkcheckSyntaxError, caret_note};

pub use insertion::{InsertionCondition, InsertionPosition, InsertionRule, InsertionRules};
pub use search_and_replace::SearchAndReplaceSpec;

/// A single line: a 1-based number (negative counts from the end) or the
/// first line containing a text fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineLoc {
    Number(i64),
    Text(String),
}

impl LineLoc {
    /// Resolve to a 1-based line number within `lines`.
    pub fn resolve(&self, lines: &[String]) -> Result<usize, MarkcheckSyntaxError> {
        let count = lines.len();
        match self {
            LineLoc::Number(n) if *n > 0 => match usize::try_from(*n) {
                Ok(n) if n <= count => Ok(n),
                _ => Err(out_of_range(self, count)),
            },
            LineLoc::Number(n) => match usize::try_from(n.unsigned_abs()) {
                Ok(from_end) if from_end <= count => Ok(count - from_end + 1),
                _ => Err(out_of_range(self, count)),
            },
            LineLoc::Text(fragment) => lines
                .iter()
                .position(|line| line.contains(fragment.as_str()))
                .map(|index| index + 1)
                .ok_or_else(|| {
                    MarkcheckSyntaxError::new(format!(
                        "No line contains the text fragment {}",
                        self
                    ))
                }),
        }
    }
}

fn out_of_range(loc: &LineLoc, count: usize) -> MarkcheckSyntaxError {
    MarkcheckSyntaxError::new(format!(
        "Line {} does not exist (there are {} lines)",
        loc, count
    ))
}

impl fmt::Display for LineLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineLoc::Number(n) => write!(f, "{}", n),
            LineLoc::Text(text) => {
                let escaped = text.replace('\\', "\\\\").replace('\'', "\\'");
                write!(f, "'{}'", escaped)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineLocItem {
    Single(LineLoc),
    Range { start: LineLoc, end: LineLoc },
}

impl fmt::Display for LineLocItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineLocItem::Single(loc) => write!(f, "{}", loc),
            LineLocItem::Range { start, end } => write!(f, "{}..{}", start, end),
        }
    }
}

/// An ordered list of lines and line ranges, e.g.
/// `ignoreLines="1, -1, 'start'..'end'"`. Parse errors carry the attribute
/// name and a caret under the offending position. Resolution errors carry no
/// location; callers attach the line of the snippet being assembled.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineLocSet {
    items: Vec<LineLocItem>,
}

impl LineLocSet {
    pub fn parse(attr_key: &str, text: &str) -> Result<Self, MarkcheckSyntaxError> {
        let mut scanner = LocatorScanner::new(attr_key, text);
        let mut items = Vec::new();
        scanner.skip_whitespace();
        if scanner.at_end() {
            return Ok(LineLocSet { items });
        }
        loop {
            let start = scanner.line_loc()?;
            scanner.skip_whitespace();
            let item = if scanner.eat("..") {
                let end = scanner.line_loc()?;
                LineLocItem::Range { start, end }
            } else {
                LineLocItem::Single(start)
            };
            items.push(item);
            scanner.skip_whitespace();
            if scanner.at_end() {
                break;
            }
            if !scanner.eat(",") {
                return Err(scanner.error("Expected `,` or `..`"));
            }
        }
        Ok(LineLocSet { items })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[LineLocItem] {
        &self.items
    }

    /// The set of 1-based line numbers this set addresses within `lines`.
    pub fn resolve(&self, lines: &[String]) -> Result<BTreeSet<usize>, MarkcheckSyntaxError> {
        let mut numbers = BTreeSet::new();
        for item in &self.items {
            match item {
                LineLocItem::Single(loc) => {
                    numbers.insert(loc.resolve(lines)?);
                }
                LineLocItem::Range { start, end } => {
                    let first = start.resolve(lines)?;
                    let last = end.resolve(lines)?;
                    if first > last {
                        return Err(MarkcheckSyntaxError::new(format!(
                            "Range {} starts at line {} but ends at line {}",
                            item, first, last
                        )));
                    }
                    numbers.extend(first..=last);
                }
            }
        }
        Ok(numbers)
    }
}

impl fmt::Display for LineLocSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scanner shared by the locator grammars
// ---------------------------------------------------------------------------

pub(crate) struct LocatorScanner<'a> {
    attr_key: &'a str,
    input: &'a str,
    pos: usize,
}

impl<'a> LocatorScanner<'a> {
    pub(crate) fn new(attr_key: &'a str, input: &'a str) -> Self {
        LocatorScanner {
            attr_key,
            input,
            pos: 0,
        }
    }

    pub(crate) fn attr_key(&self) -> &'a str {
        self.attr_key
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub(crate) fn eat(&mut self, expected: &str) -> bool {
        if self.input[self.pos..].starts_with(expected) {
            self.pos += expected.len();
            true
        } else {
            false
        }
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub(crate) fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> MarkcheckSyntaxError {
        self.error_at(message, self.pos)
    }

    pub(crate) fn error_at(&self, message: impl Into<String>, pos: usize) -> MarkcheckSyntaxError {
        MarkcheckSyntaxError::new(message).with_note(caret_note(self.attr_key, self.input, pos))
    }

    /// A signed line number or a single-quoted text fragment.
    pub(crate) fn line_loc(&mut self) -> Result<LineLoc, MarkcheckSyntaxError> {
        self.skip_whitespace();
        let start = self.pos;
        match self.peek() {
            Some('\'') => {
                self.bump();
                let mut text = String::new();
                loop {
                    match self.bump() {
                        None => return Err(self.error_at("Unterminated text fragment", start)),
                        Some('\'') => break,
                        Some('\\') => match self.peek() {
                            Some(c @ ('\'' | '\\')) => {
                                self.bump();
                                text.push(c);
                            }
                            _ => text.push('\\'),
                        },
                        Some(c) => text.push(c),
                    }
                }
                Ok(LineLoc::Text(text))
            }
            Some(c) if c == '-' || c.is_ascii_digit() => {
                if c == '-' {
                    self.bump();
                }
                let digits_start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
                if self.pos == digits_start {
                    return Err(self.error("Expected digits after `-`"));
                }
                let number: i64 = self.input[start..self.pos]
                    .parse()
                    .map_err(|_| self.error_at("Line number is too large", start))?;
                if number == 0 {
                    return Err(self.error_at(
                        "Line numbers start at 1 (use -1 for the last line)",
                        start,
                    ));
                }
                Ok(LineLoc::Number(number))
            }
            _ => Err(self.error("Expected a line number or a quoted text fragment")),
        }
    }
}
