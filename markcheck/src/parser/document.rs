use std::collections::BTreeMap;

use crate::directive::parse_directive;
use crate::entity::{
    ClassifiedDirective, Heading, LineMod, MarkcheckEntity, OpenSnippet, RunningMode,
    SequenceSnippet, SingleSnippet, Snippet, directive_to_entity,
};
use crate::error::MarkcheckSyntaxError;
use crate::parser::structural::MarkdownToken;

/// The entities of one document plus the ID indices built over them.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub entities: Vec<MarkcheckEntity>,
    /// Snippet ID → index into `entities`.
    snippet_by_id: BTreeMap<String, usize>,
    /// `lineModId` → index into `entities`.
    line_mod_by_id: BTreeMap<String, usize>,
    has_only: bool,
    /// Duplicate IDs. The first declaration stays in the index.
    pub index_errors: Vec<MarkcheckSyntaxError>,
}

impl ParsedDocument {
    pub fn new(entities: Vec<MarkcheckEntity>) -> Self {
        let mut snippet_by_id: BTreeMap<String, usize> = BTreeMap::new();
        let mut line_mod_by_id: BTreeMap<String, usize> = BTreeMap::new();
        let mut index_errors = Vec::new();
        let mut has_only = false;

        for (index, entity) in entities.iter().enumerate() {
            match entity {
                MarkcheckEntity::Snippet(snippet) => {
                    has_only |= snippet.running_mode() == RunningMode::Only;
                    let Some(id) = snippet.id() else { continue };
                    if let Some(&first) = snippet_by_id.get(id) {
                        index_errors.push(duplicate_id(
                            "snippet ID",
                            id,
                            entities[first].line_number(),
                            snippet.line_number(),
                        ));
                    } else {
                        snippet_by_id.insert(id.to_string(), index);
                    }
                }
                MarkcheckEntity::LineMod(line_mod) => {
                    let Some(id) = line_mod.line_mod_id() else { continue };
                    if let Some(&first) = line_mod_by_id.get(id) {
                        index_errors.push(duplicate_id(
                            "`lineModId`",
                            id,
                            entities[first].line_number(),
                            line_mod.line_number,
                        ));
                    } else {
                        line_mod_by_id.insert(id.to_string(), index);
                    }
                }
                MarkcheckEntity::ConfigMod(_) | MarkcheckEntity::Heading(_) => {}
            }
        }

        ParsedDocument {
            entities,
            snippet_by_id,
            line_mod_by_id,
            has_only,
            index_errors,
        }
    }

    pub fn snippet(&self, id: &str) -> Option<&Snippet> {
        match self.entities.get(*self.snippet_by_id.get(id)?)? {
            MarkcheckEntity::Snippet(snippet) => Some(snippet),
            _ => None,
        }
    }

    pub fn line_mod(&self, id: &str) -> Option<&LineMod> {
        match self.entities.get(*self.line_mod_by_id.get(id)?)? {
            MarkcheckEntity::LineMod(line_mod) => Some(line_mod),
            _ => None,
        }
    }

    pub fn snippet_ids(&self) -> impl Iterator<Item = &str> {
        self.snippet_by_id.keys().map(String::as_str)
    }

    pub fn line_mod_ids(&self) -> impl Iterator<Item = &str> {
        self.line_mod_by_id.keys().map(String::as_str)
    }

    /// Whether any snippet is marked `only`.
    pub fn has_only(&self) -> bool {
        self.has_only
    }

    pub fn snippets(&self) -> impl Iterator<Item = &Snippet> {
        self.entities.iter().filter_map(|entity| match entity {
            MarkcheckEntity::Snippet(snippet) => Some(snippet),
            _ => None,
        })
    }
}

fn duplicate_id(kind: &str, id: &str, first: usize, second: usize) -> MarkcheckSyntaxError {
    MarkcheckSyntaxError::at_line(
        second,
        format!("Duplicate {} `{}`: lines {} and {}", kind, id, first, second),
    )
    .with_note(format!("first declared at line {}", first))
}

// ---------------------------------------------------------------------------
// Parse state
// ---------------------------------------------------------------------------

/// Turn the token stream into entities. All errors are collected.
pub fn parse_tokens(tokens: Vec<MarkdownToken>) -> Result<Vec<MarkcheckEntity>, Vec<MarkcheckSyntaxError>> {
    let mut state = DocumentState::default();
    for token in tokens {
        state.process_token(token);
    }
    state.finalize()
}

#[derive(Default)]
struct DocumentState {
    entities: Vec<MarkcheckEntity>,
    /// A snippet directive waiting for its code block.
    open_snippet: Option<OpenSnippet>,
    open_sequence: Option<SequenceSnippet>,
    /// The most recent heading not yet emitted.
    prev_heading: Option<Heading>,
    errors: Vec<MarkcheckSyntaxError>,
}

impl DocumentState {
    fn process_token(&mut self, token: MarkdownToken) {
        match token {
            MarkdownToken::Comment { line_number, text } => {
                let directive = match parse_directive(line_number, &text) {
                    Ok(Some(directive)) => directive,
                    Ok(None) => return,
                    Err(err) => {
                        self.errors.push(err);
                        return;
                    }
                };
                if let Some(open) = self.open_snippet.take() {
                    self.errors.push(unclosed_snippet(&open));
                }
                match directive_to_entity(&directive) {
                    Ok(ClassifiedDirective::ConfigMod(config_mod)) => {
                        self.entities.push(MarkcheckEntity::ConfigMod(config_mod));
                    }
                    Ok(ClassifiedDirective::LineMod(line_mod)) => {
                        self.entities.push(MarkcheckEntity::LineMod(line_mod));
                    }
                    Ok(ClassifiedDirective::OpenSnippet(open)) => self.open_snippet = Some(open),
                    Ok(ClassifiedDirective::ClosedSnippet(single)) => self.push_snippet(single),
                    Err(err) => self.errors.push(err),
                }
            }

            MarkdownToken::CodeBlock {
                line_number,
                lang,
                lines,
            } => {
                let single = match self.open_snippet.take() {
                    Some(open) => open.close(&lang, lines),
                    None => SingleSnippet::from_code_block(line_number, &lang, lines),
                };
                self.push_snippet(single);
            }

            MarkdownToken::Heading {
                line_number,
                content,
            } => {
                self.prev_heading = Some(Heading {
                    line_number,
                    content,
                });
            }
        }
    }

    fn push_snippet(&mut self, single: SingleSnippet) {
        if let Some(heading) = self.prev_heading.take() {
            self.entities.push(MarkcheckEntity::Heading(heading));
        }

        let sequence = match self.open_sequence.take() {
            Some(mut sequence) => match sequence.push(single) {
                Ok(()) => sequence,
                Err(err) => {
                    self.errors.push(err);
                    return;
                }
            },
            None if single.props.sequence_number.is_none() => {
                self.entities
                    .push(MarkcheckEntity::Snippet(Snippet::Single(single)));
                return;
            }
            None => match SequenceSnippet::start(single) {
                Ok(sequence) => sequence,
                Err(err) => {
                    self.errors.push(err);
                    return;
                }
            },
        };

        if sequence.is_complete() {
            self.entities
                .push(MarkcheckEntity::Snippet(Snippet::Sequence(sequence)));
        } else {
            self.open_sequence = Some(sequence);
        }
    }

    fn finalize(mut self) -> Result<Vec<MarkcheckEntity>, Vec<MarkcheckSyntaxError>> {
        if let Some(open) = self.open_snippet.take() {
            self.errors.push(unclosed_snippet(&open));
        }
        if let Some(sequence) = self.open_sequence.take() {
            let lines: Vec<String> = sequence
                .elements()
                .iter()
                .map(|element| element.props.line_number.to_string())
                .collect();
            self.errors.push(
                MarkcheckSyntaxError::at_line(
                    sequence.first().props.line_number,
                    format!(
                        "Incomplete sequence: found {} of {} elements",
                        sequence.elements().len(),
                        sequence.total()
                    ),
                )
                .with_note(format!("elements at lines {}", lines.join(", "))),
            );
        }

        if self.errors.is_empty() {
            Ok(self.entities)
        } else {
            Err(self.errors)
        }
    }
}

fn unclosed_snippet(open: &OpenSnippet) -> MarkcheckSyntaxError {
    MarkcheckSyntaxError::at_line(
        open.line_number(),
        "Snippet directive is not followed by a code block",
    )
}
