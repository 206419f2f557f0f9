use markcheck::config::fill_in_commands;
use markcheck::directive::{ATTR_EXTERNAL, ATTR_SAME_AS_ID, ATTR_STDERR, ATTR_STDOUT};
use markcheck::entity::{Heading, MarkcheckEntity, Snippet, StdStreamSpec};
use markcheck::{CommandDef, Config, LangDef, MarkcheckSyntaxError, ParsedDocument};

use crate::assembly::{AssemblyContext, LanguageLineMods};
use crate::driver::{CommandOutput, ExecutionDriver};
use crate::error::{EntityError, InternalError, TestFailure};
use crate::status::{DocumentReport, LogEvent};
use crate::unused::find_unused_ids;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Visit the entities of `document` in order, starting from `base_config`.
///
/// Syntax errors and test failures are recorded per entity and the run
/// continues. Only an [`InternalError`] stops it.
pub fn run_document(
    document: &ParsedDocument,
    base_config: &Config,
    driver: &mut dyn ExecutionDriver,
) -> Result<DocumentReport, InternalError> {
    let mut run = DocumentRun {
        document,
        config: base_config.clone(),
        language_line_mods: LanguageLineMods::default(),
        pending_heading: None,
        report: DocumentReport::default(),
        driver,
    };

    for error in &document.index_errors {
        run.report.record(LogEvent::SyntaxError(error.clone()));
    }
    for entity in &document.entities {
        run.visit(entity)?;
    }
    for warning in find_unused_ids(document) {
        run.report.record(LogEvent::Warning(warning));
    }

    Ok(run.report)
}

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

struct DocumentRun<'a> {
    document: &'a ParsedDocument,
    config: Config,
    language_line_mods: LanguageLineMods,
    /// Logged right before the next snippet that does something.
    pending_heading: Option<&'a Heading>,
    report: DocumentReport,
    driver: &'a mut dyn ExecutionDriver,
}

/// What handling a snippet amounted to.
enum SnippetOutcome {
    /// Nothing to do, e.g. a `[skip]` or `[neverRun]` language.
    Idle,
    Done(String),
}

enum Failure {
    Entity(EntityError),
    Internal(InternalError),
}

impl From<MarkcheckSyntaxError> for Failure {
    fn from(error: MarkcheckSyntaxError) -> Self {
        Failure::Entity(EntityError::Syntax(error))
    }
}

impl From<TestFailure> for Failure {
    fn from(failure: TestFailure) -> Self {
        Failure::Entity(EntityError::Test(failure))
    }
}

impl From<InternalError> for Failure {
    fn from(error: InternalError) -> Self {
        Failure::Internal(error)
    }
}

impl<'a> DocumentRun<'a> {
    fn visit(&mut self, entity: &'a MarkcheckEntity) -> Result<(), InternalError> {
        match entity {
            MarkcheckEntity::Heading(heading) => self.pending_heading = Some(heading),

            MarkcheckEntity::ConfigMod(config_mod) => {
                self.config = self.config.apply_patch(&config_mod.patch);
                if let Some(dir) = &config_mod.patch.markcheck_directory {
                    if let Err(e) = self.driver.set_markcheck_directory(dir) {
                        self.report.record(LogEvent::SyntaxError(MarkcheckSyntaxError::at_line(
                            config_mod.line_number,
                            format!("Can't use markcheck directory `{}`: {}", dir, e),
                        )));
                    }
                }
            }

            MarkcheckEntity::LineMod(line_mod) => {
                if line_mod.target_lang().is_some() {
                    self.language_line_mods.register(line_mod.clone());
                }
            }

            MarkcheckEntity::Snippet(snippet) => {
                if !snippet.is_run(self.document.has_only()) {
                    return Ok(());
                }
                let line_number = snippet.line_number();
                let mut runner = SnippetRunner {
                    assembly: AssemblyContext::new(
                        self.document,
                        &self.config,
                        &self.language_line_mods,
                    ),
                    driver: &mut *self.driver,
                };
                match runner.run(snippet) {
                    Ok(SnippetOutcome::Idle) => {}
                    Ok(SnippetOutcome::Done(summary)) => {
                        self.flush_heading();
                        self.report.record(LogEvent::Success {
                            line_number,
                            summary,
                        });
                    }
                    Err(Failure::Entity(EntityError::Syntax(error))) => {
                        self.flush_heading();
                        self.report
                            .record(LogEvent::SyntaxError(error.or_at_line(line_number)));
                    }
                    Err(Failure::Entity(EntityError::Test(failure))) => {
                        self.flush_heading();
                        self.report.record(LogEvent::TestFailure(failure));
                    }
                    Err(Failure::Internal(error)) => return Err(error),
                }
            }
        }
        Ok(())
    }

    fn flush_heading(&mut self) {
        if let Some(heading) = self.pending_heading.take() {
            self.report.record(LogEvent::Heading(heading.clone()));
        }
    }
}

/// Runs or checks one snippet with the configuration currently in effect.
struct SnippetRunner<'r> {
    assembly: AssemblyContext<'r>,
    driver: &'r mut dyn ExecutionDriver,
}

impl SnippetRunner<'_> {
    fn run(&mut self, snippet: &Snippet) -> Result<SnippetOutcome, Failure> {
        let assembly = self.assembly;
        let props = snippet.props();
        let line_number = props.line_number;

        if let Some(id) = &props.same_as_id {
            let other = assembly.snippet_ref(line_number, ATTR_SAME_AS_ID, id)?;
            let expected = assembly.assemble_inner_lines(other)?;
            let actual = assembly.assemble_inner_lines(snippet)?;
            if !lines_equal(&expected, &actual) {
                return Err(TestFailure::new(
                    line_number,
                    format!("Content is not the same as snippet `{}`", id),
                )
                .with_diff(expected, actual)
                .into());
            }
            return Ok(SnippetOutcome::Done(format!("same as `{}`", id)));
        }

        if let Some(path) = &props.contained_in_file {
            let content = self.driver.read_file(path).map_err(|e| {
                MarkcheckSyntaxError::at_line(line_number, format!("Can't read file `{}`: {}", path, e))
            })?;
            let file_lines: Vec<String> = content.lines().map(str::to_string).collect();
            let own = assembly.assemble_inner_lines(snippet)?;
            if !contains_run(&file_lines, &own) {
                return Err(TestFailure::new(
                    line_number,
                    format!("Content is not contained in file `{}`", path),
                )
                .with_diff(own, file_lines)
                .into());
            }
            return Ok(SnippetOutcome::Done(format!("contained in `{}`", path)));
        }

        let lang_def = assembly
            .config
            .get_lang(&props.lang)
            .map_err(|e| e.or_at_line(line_number))?
            .ok_or_else(|| {
                MarkcheckSyntaxError::at_line(
                    line_number,
                    format!("Unknown language `{}`: no definition in the configuration", props.lang),
                )
            })?;
        if lang_def == LangDef::Skip {
            return Ok(SnippetOutcome::Idle);
        }

        let mut written = Vec::new();
        if let Some(file_name) = &props.write_local {
            let lines = assembly.assemble_inner_lines(snippet)?;
            self.write_file(line_number, file_name, &lines)?;
            written.push(file_name.as_str());
        }
        if let Some(file_name) = &props.write {
            let lines = assembly.assemble_outer_lines(snippet)?;
            self.write_file(line_number, file_name, &lines)?;
            written.push(file_name.as_str());
        }
        if !written.is_empty() {
            return Ok(SnippetOutcome::Done(format!("wrote {}", written.join(", "))));
        }

        match lang_def {
            LangDef::Command(command) => self.run_commands(snippet, &command),
            LangDef::NeverRun | LangDef::Skip => {
                // Assembled only to check its references.
                assembly.assemble_outer_lines(snippet)?;
                Ok(SnippetOutcome::Idle)
            }
        }
    }

    fn run_commands(
        &mut self,
        snippet: &Snippet,
        command: &CommandDef,
    ) -> Result<SnippetOutcome, Failure> {
        let assembly = self.assembly;
        let props = snippet.props();
        let line_number = props.line_number;

        let file_name = snippet.internal_file_name(command).ok_or_else(|| {
            MarkcheckSyntaxError::at_line(
                line_number,
                format!(
                    "Language `{}` defines neither `defaultFileName` nor `runFileName`",
                    props.lang
                ),
            )
        })?;
        let lines = assembly.assemble_outer_lines(snippet)?;
        self.write_file(line_number, &file_name, &lines)?;

        for external in &props.externals {
            let lines = match &external.id {
                None => Vec::new(),
                Some(id) => {
                    let other = assembly.snippet_ref(line_number, ATTR_EXTERNAL, id)?;
                    if external.local_lines {
                        assembly.assemble_inner_lines(other)?
                    } else {
                        assembly.assemble_outer_lines(other)?
                    }
                }
            };
            self.write_file(line_number, &external.file_name, &lines)?;
        }

        let templates = command.commands.as_deref().unwrap_or_default();
        let commands = fill_in_commands(templates, &file_name, &snippet.all_file_names(&file_name));
        let Some((last, init)) = commands.split_last() else {
            return Ok(SnippetOutcome::Done(format!("wrote {}", file_name)));
        };

        for argv in init {
            let output = self.run_command(line_number, argv)?;
            if !output.succeeded() {
                return Err(TestFailure::new(
                    line_number,
                    format!("Command failed: {}", describe_exit(&output)),
                )
                .with_output(&output.stdout, &output.stderr)
                .into());
            }
        }

        let output = self.run_command(line_number, last)?;
        self.check_last_output(snippet, &output)?;
        Ok(SnippetOutcome::Done(format!("ran {}", file_name)))
    }

    fn check_last_output(
        &self,
        snippet: &Snippet,
        output: &CommandOutput,
    ) -> Result<(), Failure> {
        let props = snippet.props();
        let line_number = props.line_number;
        let failure = |message: String| {
            TestFailure::new(line_number, message).with_output(&output.stdout, &output.stderr)
        };

        if output.signal.is_some() {
            return Err(failure(format!("Command failed: {}", describe_exit(output))).into());
        }
        let expected = props.exit_status.unwrap_or_default();
        match output.exit_status {
            Some(code) if expected.matches(code) => {}
            Some(code) => {
                return Err(failure(format!(
                    "Expected exit status {}, got {}",
                    expected, code
                ))
                .into());
            }
            None => return Err(failure("Command ended without an exit status".to_string()).into()),
        }

        if let Some(spec) = &props.stdout {
            check_stream(&self.assembly, line_number, ATTR_STDOUT, spec, &output.stdout)?;
        }
        if let Some(spec) = &props.stderr {
            check_stream(&self.assembly, line_number, ATTR_STDERR, spec, &output.stderr)?;
        }
        Ok(())
    }

    fn write_file(&mut self, line_number: usize, file_name: &str, lines: &[String]) -> Result<(), InternalError> {
        self.driver.write_file(file_name, lines).map_err(|e| {
            InternalError::new(
                format!("snippet at line {}", line_number),
                format!("can't write `{}`: {}", file_name, e),
            )
        })
    }

    /// A command that can't be started fails the snippet, not the run.
    fn run_command(&mut self, line_number: usize, argv: &[String]) -> Result<CommandOutput, TestFailure> {
        self.driver.run_command(argv).map_err(|e| {
            TestFailure::new(
                line_number,
                format!("Could not run `{}`: {}", argv.join(" "), e),
            )
        })
    }
}

fn check_stream(
    assembly: &AssemblyContext<'_>,
    line_number: usize,
    attr_key: &str,
    spec: &StdStreamSpec,
    captured: &str,
) -> Result<(), Failure> {
    let expected_snippet = assembly.snippet_ref(line_number, attr_key, &spec.snippet_id)?;
    let expected = assembly.assemble_inner_lines(expected_snippet)?;

    let mut actual: Vec<String> = captured.lines().map(str::to_string).collect();
    if let Some(id) = &spec.line_mod_id {
        let line_mod = assembly.line_mod_ref(line_number, attr_key, id)?;
        actual = line_mod
            .edit_lines(&actual)
            .map_err(|e| e.or_at_line(line_number))?;
    }

    if lines_equal(&expected, &actual) {
        Ok(())
    } else {
        Err(TestFailure::new(
            line_number,
            format!("Output of `{}` differs from snippet `{}`", attr_key, spec.snippet_id),
        )
        .with_diff(expected, actual)
        .into())
    }
}

fn describe_exit(output: &CommandOutput) -> String {
    match (output.signal, output.exit_status) {
        (Some(signal), _) => format!("terminated by signal {}", signal),
        (None, Some(code)) => format!("exit status {}", code),
        (None, None) => "no exit status".to_string(),
    }
}

/// Equality that ignores trailing empty lines on both sides.
pub fn lines_equal(expected: &[String], actual: &[String]) -> bool {
    trim_trailing_empty(expected) == trim_trailing_empty(actual)
}

fn trim_trailing_empty(lines: &[String]) -> &[String] {
    let end = lines
        .iter()
        .rposition(|line| !line.is_empty())
        .map_or(0, |i| i + 1);
    &lines[..end]
}

/// Whether `needle` occurs as a contiguous run of lines in `haystack`.
pub fn contains_run(haystack: &[String], needle: &[String]) -> bool {
    let needle = trim_trailing_empty(needle);
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}
