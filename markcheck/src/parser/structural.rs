use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser as CmarkParser, Tag, TagEnd};

use crate::directive::DIRECTIVE_PREFIX;
use crate::error::MarkcheckSyntaxError;
use crate::source::LineIndex;

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";

/// The parts of a Markdown document the document parser cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkdownToken {
    /// Text between `<!--` and `-->`.
    Comment { line_number: usize, text: String },
    /// A fenced code block. `lang` is the first word of the info string.
    CodeBlock {
        line_number: usize,
        lang: String,
        lines: Vec<String>,
    },
    Heading { line_number: usize, content: String },
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Split Markdown source into comments, fenced code blocks and headings, in
/// document order.
pub fn tokenize_markdown(source: &str) -> Result<Vec<MarkdownToken>, Vec<MarkcheckSyntaxError>> {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
    let parser = CmarkParser::new_ext(source, options);
    let events: Vec<(Event<'_>, Range<usize>)> = parser.into_offset_iter().collect();

    let mut state = TokenizeState::new(source);
    state.process_events(&events);
    state.finalize()
}

// ---------------------------------------------------------------------------
// Tokenize state
// ---------------------------------------------------------------------------

struct TokenizeState<'a> {
    source: &'a str,
    line_index: LineIndex,
    tokens: Vec<MarkdownToken>,
    errors: Vec<MarkcheckSyntaxError>,
    /// End of the last comment found. Inline HTML of a multi-line comment
    /// arrives in pieces; the pieces after the first are skipped.
    consumed: usize,
}

impl<'a> TokenizeState<'a> {
    fn new(source: &'a str) -> Self {
        TokenizeState {
            source,
            line_index: LineIndex::new(source),
            tokens: Vec::new(),
            errors: Vec::new(),
            consumed: 0,
        }
    }

    fn process_events(&mut self, events: &[(Event<'_>, Range<usize>)]) {
        let mut i = 0;

        while i < events.len() {
            let (ref ev, ref range) = events[i];

            match ev {
                Event::Start(Tag::HtmlBlock) => {
                    self.scan_comments(range.clone());
                    i += 1;
                    skip_until(events, &mut i, |e| matches!(e, TagEnd::HtmlBlock));
                }

                Event::InlineHtml(_) => {
                    self.scan_comments(range.clone());
                    i += 1;
                }

                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                    let lang = info.split_whitespace().next().unwrap_or_default().to_string();
                    let line_number = self.line_index.line_number(range.start);
                    i += 1;
                    let content = collect_text_until(events, &mut i, |e| {
                        matches!(e, TagEnd::CodeBlock)
                    });
                    self.tokens.push(MarkdownToken::CodeBlock {
                        line_number,
                        lang,
                        lines: content.lines().map(str::to_string).collect(),
                    });
                }

                Event::Start(Tag::Heading { .. }) => {
                    let line_number = self.line_index.line_number(range.start);
                    i += 1;
                    let content = collect_text_until(events, &mut i, |e| {
                        matches!(e, TagEnd::Heading(_))
                    });
                    self.tokens.push(MarkdownToken::Heading {
                        line_number,
                        content: normalize_heading(&content),
                    });
                }

                _ => {
                    i += 1;
                }
            }
        }
    }

    /// Finds every comment that starts in `range`. An HTML block may hold
    /// several comments; a comment may run past the end of `range`.
    fn scan_comments(&mut self, range: Range<usize>) {
        let end = range.end.min(self.source.len());
        let mut offset = range.start.max(self.consumed);

        while offset < end {
            let Some(found) = self.source[offset..end].find(COMMENT_START) else {
                return;
            };
            let start = offset + found;
            let text_start = start + COMMENT_START.len();
            let line_number = self.line_index.line_number(start);

            match self.source[text_start..].find(COMMENT_END) {
                Some(len) => {
                    self.tokens.push(MarkdownToken::Comment {
                        line_number,
                        text: self.source[text_start..text_start + len].to_string(),
                    });
                    offset = text_start + len + COMMENT_END.len();
                    self.consumed = offset;
                }
                None => {
                    if self.source[text_start..]
                        .trim_start()
                        .starts_with(DIRECTIVE_PREFIX)
                    {
                        self.errors.push(MarkcheckSyntaxError::at_line(
                            line_number,
                            format!("Unterminated directive: missing `{}`", COMMENT_END),
                        ));
                    }
                    self.consumed = self.source.len();
                    return;
                }
            }
        }
    }

    fn finalize(self) -> Result<Vec<MarkdownToken>, Vec<MarkcheckSyntaxError>> {
        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn skip_until(
    events: &[(Event<'_>, Range<usize>)],
    i: &mut usize,
    is_end: impl Fn(&TagEnd) -> bool,
) {
    while *i < events.len() {
        let (ref ev, _) = events[*i];
        *i += 1;
        if let Event::End(tag_end) = ev {
            if is_end(tag_end) {
                break;
            }
        }
    }
}

/// Collect all text content until a matching End tag.
fn collect_text_until(
    events: &[(Event<'_>, Range<usize>)],
    i: &mut usize,
    is_end: impl Fn(&TagEnd) -> bool,
) -> String {
    let mut text = String::new();
    while *i < events.len() {
        let (ref ev, _) = events[*i];
        match ev {
            Event::End(tag_end) if is_end(tag_end) => {
                *i += 1;
                break;
            }
            Event::Text(s) | Event::Code(s) => {
                text.push_str(s);
                *i += 1;
            }
            _ => {
                *i += 1;
            }
        }
    }
    text
}

/// Strip leading/trailing whitespace, collapse interior whitespace.
fn normalize_heading(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}
