use std::collections::BTreeMap;
use std::fmt;

use crate::error::{MarkcheckSyntaxError, caret_note};

/// Word that turns an HTML comment into a directive: `<!--markcheck ...-->`.
pub const DIRECTIVE_PREFIX: &str = "markcheck";

/// Separates the line groups of `around:` and `insert:` bodies.
pub const BODY_SEPARATOR: &str = "•••";

// ---------------------------------------------------------------------------
// Attribute keys
// ---------------------------------------------------------------------------

pub const ATTR_ID: &str = "id";
pub const ATTR_SEQUENCE: &str = "sequence";
pub const ATTR_INCLUDE: &str = "include";
pub const ATTR_LANG: &str = "lang";
pub const ATTR_SKIP: &str = "skip";
pub const ATTR_ONLY: &str = "only";
pub const ATTR_ALWAYS_RUN: &str = "alwaysRun";
pub const ATTR_APPLY_TO_BODY: &str = "applyToBody";
pub const ATTR_APPLY_TO_OUTER: &str = "applyToOuter";
pub const ATTR_RUN_LOCAL_LINES: &str = "runLocalLines";
pub const ATTR_RUN_FILE_NAME: &str = "runFileName";
pub const ATTR_IGNORE_LINES: &str = "ignoreLines";
pub const ATTR_SEARCH_AND_REPLACE: &str = "searchAndReplace";
pub const ATTR_AT: &str = "at";
pub const ATTR_SAME_AS_ID: &str = "sameAsId";
pub const ATTR_CONTAINED_IN_FILE: &str = "containedInFile";
pub const ATTR_WRITE: &str = "write";
pub const ATTR_WRITE_LOCAL: &str = "writeLocal";
pub const ATTR_EXTERNAL: &str = "external";
pub const ATTR_EXTERNAL_LOCAL: &str = "externalLocal";
pub const ATTR_EXIT_STATUS: &str = "exitStatus";
pub const ATTR_STDOUT: &str = "stdout";
pub const ATTR_STDERR: &str = "stderr";
pub const ATTR_EACH: &str = "each";
pub const ATTR_LINE_MOD_ID: &str = "lineModId";

/// Label that ends the attribute line and starts the directive body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLabel {
    Config,
    Body,
    Before,
    After,
    Around,
    Insert,
}

impl BodyLabel {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "config" => Some(BodyLabel::Config),
            "body" => Some(BodyLabel::Body),
            "before" => Some(BodyLabel::Before),
            "after" => Some(BodyLabel::After),
            "around" => Some(BodyLabel::Around),
            "insert" => Some(BodyLabel::Insert),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BodyLabel::Config => "config",
            BodyLabel::Body => "body",
            BodyLabel::Before => "before",
            BodyLabel::After => "after",
            BodyLabel::Around => "around",
            BodyLabel::Insert => "insert",
        }
    }
}

impl fmt::Display for BodyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.name())
    }
}

/// The parsed content of one `<!--markcheck ...-->` comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub line_number: usize,
    /// Valueless attributes map to `None`.
    attributes: BTreeMap<String, Option<String>>,
    pub body_label: Option<BodyLabel>,
    pub body: Vec<String>,
}

impl Directive {
    pub fn has(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// The value of a string attribute. A valueless occurrence is an error.
    pub fn string(&self, key: &str) -> Result<Option<&str>, MarkcheckSyntaxError> {
        match self.attributes.get(key) {
            None => Ok(None),
            Some(Some(value)) => Ok(Some(value.as_str())),
            Some(None) => Err(self.error(format!(
                "Attribute `{}` needs a value: {}=\"...\"",
                key, key
            ))),
        }
    }

    /// Whether a valueless attribute is present. Giving it a value is an error.
    pub fn flag(&self, key: &str) -> Result<bool, MarkcheckSyntaxError> {
        match self.attributes.get(key) {
            None => Ok(false),
            Some(None) => Ok(true),
            Some(Some(_)) => Err(self.error(format!("Attribute `{}` must not have a value", key))),
        }
    }

    /// Rejects every attribute that is not in `allowed`, naming all offenders.
    pub fn check_attributes(&self, kind: &str, allowed: &[&str]) -> Result<(), MarkcheckSyntaxError> {
        let illegal: Vec<String> = self
            .keys()
            .filter(|key| !allowed.contains(key))
            .map(|key| format!("`{}`", key))
            .collect();
        if illegal.is_empty() {
            Ok(())
        } else {
            Err(self.error(format!(
                "Attributes not allowed for {}: {}",
                kind,
                illegal.join(", ")
            )))
        }
    }

    /// The body split at separator lines (`•••`). Always at least one group.
    pub fn body_groups(&self) -> Vec<Vec<String>> {
        let mut groups: Vec<Vec<String>> = vec![Vec::new()];
        for line in &self.body {
            if line.trim() == BODY_SEPARATOR {
                groups.push(Vec::new());
            } else if let Some(group) = groups.last_mut() {
                group.push(line.clone());
            }
        }
        groups
    }

    pub fn error(&self, message: impl Into<String>) -> MarkcheckSyntaxError {
        MarkcheckSyntaxError::at_line(self.line_number, message)
    }
}

/// Parse the text between `<!--` and `-->`.
///
/// Returns `Ok(None)` for ordinary comments, i.e. comments that do not start
/// with the word `markcheck`.
pub fn parse_directive(
    line_number: usize,
    text: &str,
) -> Result<Option<Directive>, MarkcheckSyntaxError> {
    let Some(rest) = text.trim_start().strip_prefix(DIRECTIVE_PREFIX) else {
        return Ok(None);
    };
    if rest.chars().next().is_some_and(|c| !c.is_whitespace()) {
        return Ok(None);
    }

    let (header, remainder) = match rest.split_once('\n') {
        Some((header, remainder)) => (header.trim_end_matches('\r'), Some(remainder)),
        None => (rest, None),
    };

    let mut scanner = HeaderScanner::new(line_number, header);
    let (attributes, body_label) = scanner.scan()?;

    let body = match (body_label, remainder) {
        (Some(_), Some(remainder)) => body_lines(remainder),
        (None, Some(remainder)) if !remainder.trim().is_empty() => {
            return Err(MarkcheckSyntaxError::at_line(
                line_number,
                "Text after the first line of a directive requires a body label such as `body:`",
            ));
        }
        _ => Vec::new(),
    };

    Ok(Some(Directive {
        line_number,
        attributes,
        body_label,
        body,
    }))
}

/// Body lines up to the closing marker. An indented closing marker leaves a
/// whitespace-only last line, which is not part of the body.
fn body_lines(remainder: &str) -> Vec<String> {
    let mut lines: Vec<String> = remainder.lines().map(str::to_string).collect();
    if !remainder.ends_with('\n') && lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    lines
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

// ---------------------------------------------------------------------------
// Attribute line scanner
// ---------------------------------------------------------------------------

type Attributes = BTreeMap<String, Option<String>>;

struct HeaderScanner<'a> {
    line_number: usize,
    input: &'a str,
    pos: usize,
}

impl<'a> HeaderScanner<'a> {
    fn new(line_number: usize, input: &'a str) -> Self {
        HeaderScanner {
            line_number,
            input,
            pos: 0,
        }
    }

    fn scan(&mut self) -> Result<(Attributes, Option<BodyLabel>), MarkcheckSyntaxError> {
        let mut attributes = Attributes::new();
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let Some(c) = self.peek() else {
                return Ok((attributes, None));
            };
            if !is_key_char(c) {
                return Err(self.error(
                    format!("Unexpected character {:?}, expected an attribute", c),
                    start,
                ));
            }
            let key = self.take_while(is_key_char).to_string();

            match self.peek() {
                Some(':') => {
                    self.bump();
                    let Some(label) = BodyLabel::from_name(&key) else {
                        return Err(self.error(format!("Unknown body label `{}:`", key), start));
                    };
                    self.skip_whitespace();
                    if self.peek().is_some() {
                        return Err(self.error(
                            "A body label must be the last item on the first line",
                            self.pos,
                        ));
                    }
                    return Ok((attributes, Some(label)));
                }
                Some('=') => {
                    self.bump();
                    if self.peek() != Some('"') {
                        return Err(self.error(
                            format!("Expected a double-quoted value after `{}=`", key),
                            self.pos,
                        ));
                    }
                    let quote_pos = self.pos;
                    self.bump();
                    let value = self.quoted_value(quote_pos)?;
                    if self.peek().is_some_and(|c| !c.is_whitespace()) {
                        return Err(self.error(
                            format!("Expected whitespace after the value of `{}`", key),
                            self.pos,
                        ));
                    }
                    self.insert(&mut attributes, key, Some(value), start)?;
                }
                Some(c) if !c.is_whitespace() => {
                    return Err(self.error(
                        format!("Unexpected character {:?} after `{}`", c, key),
                        self.pos,
                    ));
                }
                _ => self.insert(&mut attributes, key, None, start)?,
            }
        }
    }

    /// Reads up to the closing quote. Only `\"` and `\\` are escapes; any
    /// other backslash is kept so regexes reach their own parsers intact.
    fn quoted_value(&mut self, quote_pos: usize) -> Result<String, MarkcheckSyntaxError> {
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("Unterminated quoted value", quote_pos)),
                Some('"') => return Ok(value),
                Some('\\') => match self.peek() {
                    Some(c @ ('"' | '\\')) => {
                        self.bump();
                        value.push(c);
                    }
                    _ => value.push('\\'),
                },
                Some(c) => value.push(c),
            }
        }
    }

    fn insert(
        &self,
        attributes: &mut Attributes,
        key: String,
        value: Option<String>,
        start: usize,
    ) -> Result<(), MarkcheckSyntaxError> {
        if attributes.contains_key(&key) {
            return Err(self.error(format!("Duplicate attribute `{}`", key), start));
        }
        attributes.insert(key, value);
        Ok(())
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let input = self.input;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &input[start..self.pos]
    }

    fn error(&self, message: impl Into<String>, pos: usize) -> MarkcheckSyntaxError {
        MarkcheckSyntaxError::at_line(self.line_number, message)
            .with_note(caret_note("directive", self.input, pos))
    }
}
