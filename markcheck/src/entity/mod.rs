pub mod classify;
pub mod line_mod;
pub mod snippet;

use crate::config::ConfigPatch;

pub use classify::{ClassifiedDirective, directive_to_entity};
pub use line_mod::{LineMod, LineModKind};
pub use snippet::{
    ExitStatusSpec, ExternalSpec, OpenSnippet, RunningMode, SequenceNumber, SequenceSnippet,
    SingleSnippet, Snippet, SnippetProps, StdStreamSpec,
};

/// Everything a document parses into.
#[derive(Debug, Clone)]
pub enum MarkcheckEntity {
    ConfigMod(ConfigMod),
    Snippet(Snippet),
    LineMod(LineMod),
    Heading(Heading),
}

impl MarkcheckEntity {
    pub fn line_number(&self) -> usize {
        match self {
            MarkcheckEntity::ConfigMod(config_mod) => config_mod.line_number,
            MarkcheckEntity::Snippet(snippet) => snippet.line_number(),
            MarkcheckEntity::LineMod(line_mod) => line_mod.line_number,
            MarkcheckEntity::Heading(heading) => heading.line_number,
        }
    }
}

/// A configuration patch from a `config:` directive.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigMod {
    pub line_number: usize,
    pub patch: ConfigPatch,
}

/// The most recent heading before a snippet, reprinted when that snippet runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub line_number: usize,
    pub content: String,
}
