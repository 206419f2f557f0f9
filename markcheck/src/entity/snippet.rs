use std::fmt;

use crate::config::CommandDef;
use crate::directive::{
    ATTR_ALWAYS_RUN, ATTR_APPLY_TO_BODY, ATTR_APPLY_TO_OUTER, ATTR_AT, ATTR_CONTAINED_IN_FILE,
    ATTR_EXIT_STATUS, ATTR_EXTERNAL, ATTR_EXTERNAL_LOCAL, ATTR_ID, ATTR_IGNORE_LINES,
    ATTR_INCLUDE, ATTR_LANG, ATTR_ONLY, ATTR_RUN_FILE_NAME, ATTR_RUN_LOCAL_LINES,
    ATTR_SAME_AS_ID, ATTR_SEARCH_AND_REPLACE, ATTR_SEQUENCE, ATTR_SKIP, ATTR_STDERR,
    ATTR_STDOUT, ATTR_WRITE, ATTR_WRITE_LOCAL, BodyLabel, Directive,
};
use crate::entity::line_mod::{LineMod, LineModKind};
use crate::error::MarkcheckSyntaxError;

/// Placeholder in `include` that marks where the snippet's own body goes.
pub const INCLUDE_THIS: &str = "$THIS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningMode {
    Normal,
    Skip,
    Only,
    AlwaysRun,
}

impl RunningMode {
    /// `has_only`: whether the document contains at least one `only` snippet.
    pub fn is_run(self, has_only: bool) -> bool {
        match self {
            RunningMode::Normal => !has_only,
            RunningMode::Only | RunningMode::AlwaysRun => true,
            RunningMode::Skip => false,
        }
    }
}

/// Position of a snippet within a sequence: `pos/total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceNumber {
    pub pos: usize,
    pub total: usize,
}

impl SequenceNumber {
    pub fn parse(text: &str) -> Result<Self, MarkcheckSyntaxError> {
        let invalid = || {
            MarkcheckSyntaxError::new(format!(
                "Invalid `{}` value {:?}, expected `pos/total` such as `1/3`",
                ATTR_SEQUENCE, text
            ))
        };
        let (pos, total) = text.trim().split_once('/').ok_or_else(invalid)?;
        let pos: usize = pos.trim().parse().map_err(|_| invalid())?;
        let total: usize = total.trim().parse().map_err(|_| invalid())?;
        if pos == 0 || pos > total {
            return Err(MarkcheckSyntaxError::new(format!(
                "Sequence position {} is outside 1..={}",
                pos, total
            )));
        }
        Ok(SequenceNumber { pos, total })
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pos, self.total)
    }
}

/// An auxiliary file written next to the main file: `id>fileName` takes the
/// lines of snippet `id`, `>fileName` writes an empty file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalSpec {
    pub id: Option<String>,
    pub file_name: String,
    /// From `externalLocal`: inner lines only, without the outer scope.
    pub local_lines: bool,
}

impl ExternalSpec {
    pub fn parse_list(
        attr_key: &str,
        text: &str,
        local_lines: bool,
    ) -> Result<Vec<Self>, MarkcheckSyntaxError> {
        let mut specs = Vec::new();
        for item in text.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let Some((id, file_name)) = item.split_once('>') else {
                return Err(MarkcheckSyntaxError::new(format!(
                    "Invalid item {:?} in `{}`, expected `id>fileName` or `>fileName`",
                    item, attr_key
                )));
            };
            let (id, file_name) = (id.trim(), file_name.trim());
            if file_name.is_empty() {
                return Err(MarkcheckSyntaxError::new(format!(
                    "Missing file name in item {:?} of `{}`",
                    item, attr_key
                )));
            }
            specs.push(ExternalSpec {
                id: (!id.is_empty()).then(|| id.to_string()),
                file_name: file_name.to_string(),
                local_lines,
            });
        }
        Ok(specs)
    }
}

/// Expected exit status of the last command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatusSpec {
    Code(i32),
    NonZero,
}

impl ExitStatusSpec {
    pub fn parse(text: &str) -> Result<Self, MarkcheckSyntaxError> {
        let text = text.trim();
        if text == "nonzero" {
            return Ok(ExitStatusSpec::NonZero);
        }
        text.parse().map(ExitStatusSpec::Code).map_err(|_| {
            MarkcheckSyntaxError::new(format!(
                "Invalid `{}` value {:?}, expected an integer or `nonzero`",
                ATTR_EXIT_STATUS, text
            ))
        })
    }

    pub fn matches(self, code: i32) -> bool {
        match self {
            ExitStatusSpec::Code(expected) => code == expected,
            ExitStatusSpec::NonZero => code != 0,
        }
    }
}

impl Default for ExitStatusSpec {
    fn default() -> Self {
        ExitStatusSpec::Code(0)
    }
}

impl fmt::Display for ExitStatusSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatusSpec::Code(code) => write!(f, "{}", code),
            ExitStatusSpec::NonZero => write!(f, "nonzero"),
        }
    }
}

/// Expected content of stdout or stderr: `snippetId` or `|lineModId=snippetId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdStreamSpec {
    /// Edits the captured output before it is compared.
    pub line_mod_id: Option<String>,
    pub snippet_id: String,
}

impl StdStreamSpec {
    pub fn parse(attr_key: &str, text: &str) -> Result<Self, MarkcheckSyntaxError> {
        let text = text.trim();
        let (line_mod_id, snippet_id) = match text.strip_prefix('|') {
            Some(rest) => match rest.split_once('=') {
                Some((line_mod_id, snippet_id)) => {
                    (Some(line_mod_id.trim().to_string()), snippet_id.trim())
                }
                None => {
                    return Err(MarkcheckSyntaxError::new(format!(
                        "Invalid `{}` value {:?}, expected `|lineModId=snippetId`",
                        attr_key, text
                    )));
                }
            },
            None => (None, text),
        };
        if snippet_id.is_empty() || line_mod_id.as_deref() == Some("") {
            return Err(MarkcheckSyntaxError::new(format!(
                "Empty ID in `{}` value {:?}",
                attr_key, text
            )));
        }
        Ok(StdStreamSpec {
            line_mod_id,
            snippet_id: snippet_id.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Snippet properties
// ---------------------------------------------------------------------------

/// Everything a snippet directive declares, shared by single snippets and
/// (through their first element) sequences.
#[derive(Debug, Clone)]
pub struct SnippetProps {
    pub line_number: usize,
    /// Language key; the `lang` attribute wins over the code block's tag.
    pub lang: String,
    pub id: Option<String>,
    pub sequence_number: Option<SequenceNumber>,
    pub running_mode: RunningMode,
    pub include_ids: Vec<String>,
    pub apply_to_body: Option<String>,
    pub apply_to_outer: Option<String>,
    pub run_local_lines: bool,
    pub run_file_name: Option<String>,
    pub internal_line_mod: Option<LineMod>,
    pub same_as_id: Option<String>,
    pub contained_in_file: Option<String>,
    pub write: Option<String>,
    pub write_local: Option<String>,
    pub externals: Vec<ExternalSpec>,
    pub exit_status: Option<ExitStatusSpec>,
    pub stdout: Option<StdStreamSpec>,
    pub stderr: Option<StdStreamSpec>,
}

impl SnippetProps {
    /// Properties of a code block without a directive.
    pub fn bare(line_number: usize, lang: impl Into<String>) -> Self {
        SnippetProps {
            line_number,
            lang: lang.into(),
            id: None,
            sequence_number: None,
            running_mode: RunningMode::Normal,
            include_ids: Vec::new(),
            apply_to_body: None,
            apply_to_outer: None,
            run_local_lines: false,
            run_file_name: None,
            internal_line_mod: None,
            same_as_id: None,
            contained_in_file: None,
            write: None,
            write_local: None,
            externals: Vec::new(),
            exit_status: None,
            stdout: None,
            stderr: None,
        }
    }

    /// Reads the snippet attributes of `directive`. The language is left
    /// empty; it is settled when the snippet is closed.
    pub fn from_directive(directive: &Directive) -> Result<Self, MarkcheckSyntaxError> {
        let line_number = directive.line_number;
        let at_line = |e: MarkcheckSyntaxError| e.or_at_line(line_number);
        let owned = |value: Option<&str>| value.map(str::to_string);

        let id = owned(directive.string(ATTR_ID)?);
        let running_mode = running_mode(directive, id.is_some())?;

        let sequence_number = directive
            .string(ATTR_SEQUENCE)?
            .map(SequenceNumber::parse)
            .transpose()
            .map_err(at_line)?;

        let include_ids = directive
            .string(ATTR_INCLUDE)?
            .map(|text| {
                text.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let mut externals = Vec::new();
        if let Some(text) = directive.string(ATTR_EXTERNAL)? {
            externals.extend(ExternalSpec::parse_list(ATTR_EXTERNAL, text, false).map_err(at_line)?);
        }
        if let Some(text) = directive.string(ATTR_EXTERNAL_LOCAL)? {
            externals.extend(
                ExternalSpec::parse_list(ATTR_EXTERNAL_LOCAL, text, true).map_err(at_line)?,
            );
        }

        let exit_status = directive
            .string(ATTR_EXIT_STATUS)?
            .map(ExitStatusSpec::parse)
            .transpose()
            .map_err(at_line)?;
        let stdout = directive
            .string(ATTR_STDOUT)?
            .map(|text| StdStreamSpec::parse(ATTR_STDOUT, text))
            .transpose()
            .map_err(at_line)?;
        let stderr = directive
            .string(ATTR_STDERR)?
            .map(|text| StdStreamSpec::parse(ATTR_STDERR, text))
            .transpose()
            .map_err(at_line)?;

        let apply_to_body = owned(directive.string(ATTR_APPLY_TO_BODY)?);
        let internal_line_mod = internal_line_mod(directive, apply_to_body.is_some())?;

        Ok(SnippetProps {
            line_number,
            lang: String::new(),
            id,
            sequence_number,
            running_mode,
            include_ids,
            apply_to_body,
            apply_to_outer: owned(directive.string(ATTR_APPLY_TO_OUTER)?),
            run_local_lines: directive.flag(ATTR_RUN_LOCAL_LINES)?,
            run_file_name: owned(directive.string(ATTR_RUN_FILE_NAME)?),
            internal_line_mod,
            same_as_id: owned(directive.string(ATTR_SAME_AS_ID)?),
            contained_in_file: owned(directive.string(ATTR_CONTAINED_IN_FILE)?),
            write: owned(directive.string(ATTR_WRITE)?),
            write_local: owned(directive.string(ATTR_WRITE_LOCAL)?),
            externals,
            exit_status,
            stdout,
            stderr,
        })
    }
}

/// An `id` defaults the mode to `Skip`; an explicit mode attribute overrides it.
fn running_mode(directive: &Directive, has_id: bool) -> Result<RunningMode, MarkcheckSyntaxError> {
    let mut explicit = Vec::new();
    for (key, mode) in [
        (ATTR_SKIP, RunningMode::Skip),
        (ATTR_ONLY, RunningMode::Only),
        (ATTR_ALWAYS_RUN, RunningMode::AlwaysRun),
    ] {
        if directive.flag(key)? {
            explicit.push((key, mode));
        }
    }
    match explicit.as_slice() {
        [] if has_id => Ok(RunningMode::Skip),
        [] => Ok(RunningMode::Normal),
        [(_, mode)] => Ok(*mode),
        _ => {
            let keys: Vec<String> = explicit.iter().map(|(key, _)| format!("`{}`", key)).collect();
            Err(directive.error(format!(
                "At most one running mode attribute is allowed, found {}",
                keys.join(", ")
            )))
        }
    }
}

fn internal_line_mod(
    directive: &Directive,
    has_apply_to_body: bool,
) -> Result<Option<LineMod>, MarkcheckSyntaxError> {
    let mut sources: Vec<String> = [ATTR_IGNORE_LINES, ATTR_SEARCH_AND_REPLACE, ATTR_AT]
        .into_iter()
        .filter(|key| directive.has(key))
        .map(|key| format!("`{}`", key))
        .collect();
    if let Some(
        label @ (BodyLabel::Before | BodyLabel::After | BodyLabel::Around | BodyLabel::Insert),
    ) = directive.body_label
    {
        sources.push(format!("`{}`", label));
    }
    if sources.is_empty() {
        return Ok(None);
    }
    if has_apply_to_body {
        return Err(directive.error(format!(
            "`{}` can't be combined with {}",
            ATTR_APPLY_TO_BODY,
            sources.join(", ")
        )));
    }
    LineMod::from_directive(directive, LineModKind::Internal).map(Some)
}

// ---------------------------------------------------------------------------
// Snippets
// ---------------------------------------------------------------------------

/// A snippet directive still waiting for its code block.
#[derive(Debug, Clone)]
pub struct OpenSnippet {
    props: SnippetProps,
    lang_attr: Option<String>,
}

impl OpenSnippet {
    pub fn from_directive(directive: &Directive) -> Result<Self, MarkcheckSyntaxError> {
        Ok(OpenSnippet {
            props: SnippetProps::from_directive(directive)?,
            lang_attr: directive.string(ATTR_LANG)?.map(str::to_string),
        })
    }

    pub fn line_number(&self) -> usize {
        self.props.line_number
    }

    /// `fence_lang` is used unless the directive set `lang`.
    pub fn close(self, fence_lang: &str, body: Vec<String>) -> SingleSnippet {
        let mut props = self.props;
        props.lang = self.lang_attr.unwrap_or_else(|| fence_lang.to_string());
        SingleSnippet { props, body }
    }
}

#[derive(Debug, Clone)]
pub struct SingleSnippet {
    pub props: SnippetProps,
    pub body: Vec<String>,
}

impl SingleSnippet {
    /// A code block that no directive precedes.
    pub fn from_code_block(line_number: usize, lang: &str, body: Vec<String>) -> Self {
        SingleSnippet {
            props: SnippetProps::bare(line_number, lang),
            body,
        }
    }
}

/// The elements of a `sequence`, in position order, sharing one total.
#[derive(Debug, Clone)]
pub struct SequenceSnippet {
    elements: Vec<SingleSnippet>,
    total: usize,
}

impl SequenceSnippet {
    pub fn start(first: SingleSnippet) -> Result<Self, MarkcheckSyntaxError> {
        let line_number = first.props.line_number;
        match first.props.sequence_number {
            Some(SequenceNumber { pos: 1, total }) => Ok(SequenceSnippet {
                elements: vec![first],
                total,
            }),
            Some(number) => Err(MarkcheckSyntaxError::at_line(
                line_number,
                format!(
                    "Expected sequence position 1, found {} (no sequence is open)",
                    number
                ),
            )),
            None => Err(MarkcheckSyntaxError::at_line(
                line_number,
                "A sequence must start with a snippet that has a `sequence` attribute",
            )),
        }
    }

    pub fn push(&mut self, element: SingleSnippet) -> Result<(), MarkcheckSyntaxError> {
        let line_number = element.props.line_number;
        let expected = SequenceNumber {
            pos: self.elements.len() + 1,
            total: self.total,
        };
        match element.props.sequence_number {
            Some(number) if number == expected => {
                self.elements.push(element);
                Ok(())
            }
            Some(number) => Err(MarkcheckSyntaxError::at_line(
                line_number,
                format!("Expected sequence number {}, found {}", expected, number),
            )
            .with_note(format!("sequence started at line {}", self.first().props.line_number))),
            None => Err(MarkcheckSyntaxError::at_line(
                line_number,
                format!(
                    "Expected sequence number {}, found a snippet without `sequence`",
                    expected
                ),
            )
            .with_note(format!("sequence started at line {}", self.first().props.line_number))),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.elements.len() == self.total
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn first(&self) -> &SingleSnippet {
        &self.elements[0]
    }

    pub fn elements(&self) -> &[SingleSnippet] {
        &self.elements
    }
}

#[derive(Debug, Clone)]
pub enum Snippet {
    Single(SingleSnippet),
    Sequence(SequenceSnippet),
}

impl Snippet {
    /// The effective properties; a sequence forwards to its first element.
    pub fn props(&self) -> &SnippetProps {
        match self {
            Snippet::Single(single) => &single.props,
            Snippet::Sequence(sequence) => &sequence.first().props,
        }
    }

    /// The single snippets whose inner lines make up this snippet, in order.
    pub fn elements(&self) -> &[SingleSnippet] {
        match self {
            Snippet::Single(single) => std::slice::from_ref(single),
            Snippet::Sequence(sequence) => sequence.elements(),
        }
    }

    pub fn line_number(&self) -> usize {
        self.props().line_number
    }

    pub fn id(&self) -> Option<&str> {
        self.props().id.as_deref()
    }

    pub fn lang(&self) -> &str {
        &self.props().lang
    }

    pub fn running_mode(&self) -> RunningMode {
        self.props().running_mode
    }

    pub fn is_run(&self, has_only: bool) -> bool {
        self.running_mode().is_run(has_only)
    }

    /// The main file name: `runFileName`, else the language's file name.
    pub fn internal_file_name(&self, command: &CommandDef) -> Option<String> {
        self.props()
            .run_file_name
            .clone()
            .or_else(|| command.file_name().map(str::to_string))
    }

    /// `file_name` followed by the external file names in declared order.
    pub fn all_file_names(&self, file_name: &str) -> Vec<String> {
        std::iter::once(file_name.to_string())
            .chain(self.props().externals.iter().map(|e| e.file_name.clone()))
            .collect()
    }
}
