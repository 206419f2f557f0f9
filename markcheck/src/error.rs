use std::fmt;

use codespan_reporting::diagnostic::{Diagnostic, Label};

use crate::source::LineIndex;

/// Where an error originated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityContext {
    /// A 1-based line in the Markdown document.
    Line(usize),
    /// Anything that is not part of the document, e.g. the external config file.
    Description(String),
}

impl fmt::Display for EntityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityContext::Line(line) => write!(f, "line {}", line),
            EntityContext::Description(description) => write!(f, "{}", description),
        }
    }
}

/// A malformed directive, an illegal attribute combination, a bad ID
/// reference or an invalid configuration. Recoverable per entity.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkcheckSyntaxError {
    pub message: String,
    pub context: Option<EntityContext>,
    pub notes: Vec<String>,
}

impl MarkcheckSyntaxError {
    pub fn new(message: impl Into<String>) -> Self {
        MarkcheckSyntaxError {
            message: message.into(),
            context: None,
            notes: Vec::new(),
        }
    }

    pub fn at_line(line_number: usize, message: impl Into<String>) -> Self {
        MarkcheckSyntaxError::new(message).with_context(EntityContext::Line(line_number))
    }

    pub fn described(description: impl Into<String>, message: impl Into<String>) -> Self {
        MarkcheckSyntaxError::new(message)
            .with_context(EntityContext::Description(description.into()))
    }

    pub fn with_context(mut self, context: EntityContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Attaches `line_number` unless the error already knows where it came from.
    /// Locator and config errors are raised without a location and get the
    /// line of the snippet that triggered them.
    pub fn or_at_line(mut self, line_number: usize) -> Self {
        if self.context.is_none() {
            self.context = Some(EntityContext::Line(line_number));
        }
        self
    }

    pub fn line_number(&self) -> Option<usize> {
        match self.context {
            Some(EntityContext::Line(line)) => Some(line),
            _ => None,
        }
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self, file_id: usize, source: &str) -> Diagnostic<usize> {
        let mut notes = Vec::new();
        let mut labels = Vec::new();
        match &self.context {
            Some(EntityContext::Line(line)) => {
                let span = LineIndex::new(source).line_span(source, *line);
                labels.push(Label::primary(file_id, span));
            }
            Some(EntityContext::Description(description)) => {
                notes.push(format!("in {}", description));
            }
            None => {}
        }
        notes.extend(self.notes.iter().cloned());
        Diagnostic::error()
            .with_message(&self.message)
            .with_labels(labels)
            .with_notes(notes)
    }
}

impl fmt::Display for MarkcheckSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(context) => write!(f, "{} ({})", self.message, context),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for MarkcheckSyntaxError {}

/// Renders `input` prefixed by `label` with a caret under byte offset `pos`.
pub(crate) fn caret_note(label: &str, input: &str, pos: usize) -> String {
    let column = input.char_indices().take_while(|(i, _)| *i < pos).count();
    format!(
        "{}: {}\n{}^",
        label,
        input,
        " ".repeat(label.chars().count() + 2 + column)
    )
}
