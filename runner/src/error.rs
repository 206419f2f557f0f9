use std::fmt;

use markcheck::MarkcheckSyntaxError;

/// A snippet ran (or was checked) and did not behave as declared.
#[derive(Debug, Clone, PartialEq)]
pub struct TestFailure {
    pub message: String,
    pub line_number: usize,
    /// Expected and actual content, for a diff.
    pub expected: Option<Vec<String>>,
    pub actual: Option<Vec<String>>,
    /// Captured output of the failing command.
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl TestFailure {
    pub fn new(line_number: usize, message: impl Into<String>) -> Self {
        TestFailure {
            message: message.into(),
            line_number,
            expected: None,
            actual: None,
            stdout: None,
            stderr: None,
        }
    }

    pub fn with_diff(mut self, expected: Vec<String>, actual: Vec<String>) -> Self {
        self.expected = Some(expected);
        self.actual = Some(actual);
        self
    }

    pub fn with_output(mut self, stdout: &str, stderr: &str) -> Self {
        self.stdout = Some(stdout.to_string());
        self.stderr = Some(stderr.to_string());
        self
    }
}

impl fmt::Display for TestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {})", self.message, self.line_number)
    }
}

impl std::error::Error for TestFailure {}

/// A recoverable error while processing one entity. The run pass records
/// it and moves on to the next entity.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityError {
    Syntax(MarkcheckSyntaxError),
    Test(TestFailure),
}

impl From<MarkcheckSyntaxError> for EntityError {
    fn from(error: MarkcheckSyntaxError) -> Self {
        EntityError::Syntax(error)
    }
}

impl From<TestFailure> for EntityError {
    fn from(error: TestFailure) -> Self {
        EntityError::Test(error)
    }
}

impl fmt::Display for EntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityError::Syntax(error) => error.fmt(f),
            EntityError::Test(failure) => failure.fmt(f),
        }
    }
}

impl std::error::Error for EntityError {}

/// Anything that is neither bad input nor a failing test, e.g. an output
/// file that can't be written. Aborts the whole run.
#[derive(Debug)]
pub struct InternalError {
    /// The entity being processed, e.g. `snippet at line 12`.
    pub context: String,
    pub message: String,
}

impl InternalError {
    pub fn new(context: impl Into<String>, message: impl Into<String>) -> Self {
        InternalError {
            context: context.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "internal error ({}): {}", self.context, self.message)
    }
}

impl std::error::Error for InternalError {}
