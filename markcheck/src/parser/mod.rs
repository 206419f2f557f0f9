pub mod document;
mod structural;

pub use document::{ParsedDocument, parse_tokens};
pub use structural::{MarkdownToken, tokenize_markdown};

use crate::error::MarkcheckSyntaxError;

/// Parser entry point.
pub struct Parser {
    source: String,
}

impl Parser {
    pub fn new(source: String) -> Self {
        Parser { source }
    }

    /// Parse the source Markdown into entities and their ID indices.
    pub fn parse(&self) -> Result<ParsedDocument, Vec<MarkcheckSyntaxError>> {
        let tokens = structural::tokenize_markdown(&self.source)?;
        let entities = document::parse_tokens(tokens)?;
        Ok(ParsedDocument::new(entities))
    }
}
