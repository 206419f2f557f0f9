use std::fmt;
use std::ops::AddAssign;

use markcheck::MarkcheckSyntaxError;
use markcheck::entity::Heading;

use crate::error::TestFailure;

/// A declaration nobody refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub line_number: usize,
    pub message: String,
}

/// One entry of a document's run log.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    /// The heading above the snippets that follow.
    Heading(Heading),
    Success {
        line_number: usize,
        /// What was done, e.g. `ran main.mjs` or `wrote data.txt`.
        summary: String,
    },
    TestFailure(TestFailure),
    SyntaxError(MarkcheckSyntaxError),
    Warning(Warning),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub successes: usize,
    pub test_failures: usize,
    pub syntax_errors: usize,
    pub warnings: usize,
}

impl StatusCounts {
    pub fn record(&mut self, event: &LogEvent) {
        match event {
            LogEvent::Heading(_) => {}
            LogEvent::Success { .. } => self.successes += 1,
            LogEvent::TestFailure(_) => self.test_failures += 1,
            LogEvent::SyntaxError(_) => self.syntax_errors += 1,
            LogEvent::Warning(_) => self.warnings += 1,
        }
    }

    /// Test failures and syntax errors fail a run; warnings don't.
    pub fn has_failures(&self) -> bool {
        self.test_failures > 0 || self.syntax_errors > 0
    }
}

impl AddAssign for StatusCounts {
    fn add_assign(&mut self, other: StatusCounts) {
        self.successes += other.successes;
        self.test_failures += other.test_failures;
        self.syntax_errors += other.syntax_errors;
        self.warnings += other.warnings;
    }
}

impl fmt::Display for StatusCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "successes: {}, test failures: {}, syntax errors: {}, warnings: {}",
            self.successes, self.test_failures, self.syntax_errors, self.warnings
        )
    }
}

/// The log of one document and its tally.
#[derive(Debug, Clone, Default)]
pub struct DocumentReport {
    pub events: Vec<LogEvent>,
    pub counts: StatusCounts,
}

impl DocumentReport {
    pub fn record(&mut self, event: LogEvent) {
        self.counts.record(&event);
        self.events.push(event);
    }

    /// A document that failed to parse: only its syntax errors.
    pub fn from_parse_errors(errors: Vec<MarkcheckSyntaxError>) -> Self {
        let mut report = DocumentReport::default();
        for error in errors {
            report.record(LogEvent::SyntaxError(error));
        }
        report
    }
}
