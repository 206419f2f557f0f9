use crate::directive::{ATTR_AT, ATTR_IGNORE_LINES, ATTR_SEARCH_AND_REPLACE, BODY_SEPARATOR, BodyLabel, Directive};
use crate::error::MarkcheckSyntaxError;
use crate::locator::{InsertionCondition, InsertionRules, LineLocSet, SearchAndReplaceSpec};

/// How a LineMod is attached to the snippets it modifies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineModKind {
    /// Declared on the directive that opens a snippet.
    Internal,
    /// Declared with `lineModId`; used through `applyToBody`, `applyToOuter`
    /// or a `stdout`/`stderr` spec.
    Appliable { line_mod_id: String },
    /// Declared with `each`; wraps every snippet of that language.
    Language { target_lang: String },
    /// Synthesized from the `beforeLines` of a language definition.
    Config,
}

/// A bundle of line-level edits plus lines that wrap the result.
#[derive(Debug, Clone)]
pub struct LineMod {
    pub line_number: usize,
    pub kind: LineModKind,
    pub ignore_lines: LineLocSet,
    pub search_and_replace: Option<SearchAndReplaceSpec>,
    pub insertion_rules: InsertionRules,
    pub before_lines: Vec<String>,
    pub after_lines: Vec<String>,
}

impl LineMod {
    /// Build a LineMod from the line-editing attributes and the body of `directive`.
    pub fn from_directive(directive: &Directive, kind: LineModKind) -> Result<Self, MarkcheckSyntaxError> {
        let line_number = directive.line_number;

        let ignore_lines = match directive.string(ATTR_IGNORE_LINES)? {
            Some(text) => LineLocSet::parse(ATTR_IGNORE_LINES, text)
                .map_err(|e| e.or_at_line(line_number))?,
            None => LineLocSet::default(),
        };
        let search_and_replace = match directive.string(ATTR_SEARCH_AND_REPLACE)? {
            Some(text) => Some(
                SearchAndReplaceSpec::parse(ATTR_SEARCH_AND_REPLACE, text)
                    .map_err(|e| e.or_at_line(line_number))?,
            ),
            None => None,
        };
        let at = directive.string(ATTR_AT)?;

        if at.is_some() && directive.body_label != Some(BodyLabel::Insert) {
            return Err(directive.error(format!(
                "Attribute `{}` is only allowed with the body label `insert:`",
                ATTR_AT
            )));
        }

        let mut line_mod = LineMod {
            line_number,
            kind,
            ignore_lines,
            search_and_replace,
            insertion_rules: InsertionRules::default(),
            before_lines: Vec::new(),
            after_lines: Vec::new(),
        };

        match directive.body_label {
            Some(BodyLabel::Before) => line_mod.before_lines = directive.body.clone(),
            Some(BodyLabel::After) => line_mod.after_lines = directive.body.clone(),
            Some(BodyLabel::Around) => {
                let groups = directive.body_groups();
                let separators = groups.len() - 1;
                let [before, after] = <[Vec<String>; 2]>::try_from(groups).map_err(|_| {
                    directive.error(format!(
                        "Body of `around:` needs exactly one `{}` line, found {}",
                        BODY_SEPARATOR, separators
                    ))
                })?;
                line_mod.before_lines = before;
                line_mod.after_lines = after;
            }
            Some(BodyLabel::Insert) => {
                if matches!(line_mod.kind, LineModKind::Language { .. } | LineModKind::Config) {
                    return Err(directive.error(
                        "`insert:` is only allowed for snippets and for line mods with `lineModId`",
                    ));
                }
                let Some(at) = at else {
                    return Err(directive.error(format!(
                        "Body label `insert:` requires the attribute `{}`",
                        ATTR_AT
                    )));
                };
                let conditions = InsertionCondition::parse_list(ATTR_AT, at)
                    .map_err(|e| e.or_at_line(line_number))?;
                line_mod.insertion_rules = InsertionRules::new(conditions, directive.body_groups())
                    .map_err(|e| e.or_at_line(line_number))?;
            }
            Some(BodyLabel::Config) | Some(BodyLabel::Body) | None => {}
        }

        Ok(line_mod)
    }

    pub fn config(line_number: usize, before_lines: Vec<String>) -> Self {
        LineMod {
            line_number,
            kind: LineModKind::Config,
            ignore_lines: LineLocSet::default(),
            search_and_replace: None,
            insertion_rules: InsertionRules::default(),
            before_lines,
            after_lines: Vec::new(),
        }
    }

    pub fn line_mod_id(&self) -> Option<&str> {
        match &self.kind {
            LineModKind::Appliable { line_mod_id } => Some(line_mod_id),
            _ => None,
        }
    }

    pub fn target_lang(&self) -> Option<&str> {
        match &self.kind {
            LineModKind::Language { target_lang } => Some(target_lang),
            _ => None,
        }
    }

    pub fn push_before_lines(&self, lines: &mut Vec<String>) {
        lines.extend(self.before_lines.iter().cloned());
    }

    pub fn push_after_lines(&self, lines: &mut Vec<String>) {
        lines.extend(self.after_lines.iter().cloned());
    }

    /// Ignore lines, search and replace, then insert, in that order.
    ///
    /// Ignored lines are resolved against `lines`; insertion locators are
    /// resolved against what remains, before anything is inserted.
    pub fn edit_lines(&self, lines: &[String]) -> Result<Vec<String>, MarkcheckSyntaxError> {
        let ignored = self.ignore_lines.resolve(lines)?;
        let kept: Vec<String> = lines
            .iter()
            .enumerate()
            .filter(|(index, _)| !ignored.contains(&(index + 1)))
            .map(|(_, line)| match &self.search_and_replace {
                Some(spec) => spec.replace_all(line),
                None => line.clone(),
            })
            .collect();
        self.insertion_rules.apply(&kept)
    }
}
