use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use similar::{ChangeTag, TextDiff};

use markcheck::MarkcheckSyntaxError;
use markcheck::source::LineIndex;
use runner::{DocumentReport, LogEvent, StatusCounts, TestFailure, Warning};

/// Prints run logs: status lines on stdout, diagnostics on stderr.
pub struct Reporter {
    files: SimpleFiles<String, String>,
    writer: StandardStream,
    config: term::Config,
    no_color: bool,
}

impl Reporter {
    pub fn new(no_color: bool) -> Self {
        let color_choice = if no_color {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        };
        Reporter {
            files: SimpleFiles::new(),
            writer: StandardStream::stderr(color_choice),
            config: term::Config::default(),
            no_color,
        }
    }

    /// Register a document; the returned id is passed to the other methods.
    pub fn add_file(&mut self, name: String, source: String) -> usize {
        self.files.add(name, source)
    }

    pub fn document_header(&self, name: &str) {
        println!("{}", bold(&format!("===== {} =====", name), self.no_color));
    }

    pub fn report(&self, file_id: usize, report: &DocumentReport) {
        for event in &report.events {
            match event {
                LogEvent::Heading(heading) => {
                    println!("{}", bold(&heading.content, self.no_color));
                }
                LogEvent::Success {
                    line_number,
                    summary,
                } => {
                    println!(
                        "{} L{} {}",
                        pass_label(self.no_color),
                        line_number,
                        summary
                    );
                }
                LogEvent::TestFailure(failure) => self.test_failure(failure),
                LogEvent::SyntaxError(error) => self.syntax_error(file_id, error),
                LogEvent::Warning(warning) => self.warning(file_id, warning),
            }
        }
        self.counts("Status", &report.counts);
    }

    pub fn syntax_error(&self, file_id: usize, error: &MarkcheckSyntaxError) {
        let diagnostic = match self.files.get(file_id) {
            Ok(file) => error.to_diagnostic(file_id, file.source()),
            Err(_) => Diagnostic::error().with_message(error.to_string()),
        };
        self.emit(&diagnostic);
    }

    fn warning(&self, file_id: usize, warning: &Warning) {
        let mut diagnostic = Diagnostic::warning().with_message(&warning.message);
        if let Ok(file) = self.files.get(file_id) {
            let source = file.source();
            let span = LineIndex::new(source).line_span(source, warning.line_number);
            diagnostic = diagnostic.with_labels(vec![Label::primary(file_id, span)]);
        }
        self.emit(&diagnostic);
    }

    fn test_failure(&self, failure: &TestFailure) {
        println!(
            "{} L{} {}",
            fail_label(self.no_color),
            failure.line_number,
            failure.message
        );
        if let (Some(expected), Some(actual)) = (&failure.expected, &failure.actual) {
            println!("  (- expected, + actual)");
            self.diff(expected, actual);
        }
        for (name, captured) in [("stdout", &failure.stdout), ("stderr", &failure.stderr)] {
            let Some(captured) = captured.as_deref().filter(|s| !s.trim().is_empty()) else {
                continue;
            };
            println!("  {}:", name);
            for line in captured.lines() {
                println!("  | {}", line);
            }
        }
    }

    fn diff(&self, expected: &[String], actual: &[String]) {
        let expected = expected.join("\n") + "\n";
        let actual = actual.join("\n") + "\n";
        let diff = TextDiff::from_lines(&expected, &actual);
        for change in diff.iter_all_changes() {
            let line = change.value().trim_end_matches('\n');
            let (sign, color) = match change.tag() {
                ChangeTag::Equal => (" ", None),
                ChangeTag::Delete => ("-", Some("31")),
                ChangeTag::Insert => ("+", Some("32")),
            };
            match color {
                Some(code) if !self.no_color => {
                    println!("  \x1b[{}m{}{}\x1b[0m", code, sign, line)
                }
                _ => println!("  {}{}", sign, line),
            }
        }
    }

    pub fn counts(&self, title: &str, counts: &StatusCounts) {
        let label = if counts.has_failures() {
            fail_label(self.no_color)
        } else {
            pass_label(self.no_color)
        };
        println!("{} {}: {}", label, bold(title, self.no_color), counts);
    }

    fn emit(&self, diagnostic: &Diagnostic<usize>) {
        let _ = term::emit_to_write_style(&mut self.writer.lock(), &self.config, &self.files, diagnostic);
    }
}

fn pass_label(no_color: bool) -> &'static str {
    if no_color { "PASS" } else { "\x1b[32mPASS\x1b[0m" }
}

fn fail_label(no_color: bool) -> &'static str {
    if no_color { "FAIL" } else { "\x1b[31mFAIL\x1b[0m" }
}

fn bold(s: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[1m{}\x1b[0m", s)
    }
}
