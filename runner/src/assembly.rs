use std::collections::BTreeMap;

use markcheck::directive::{ATTR_APPLY_TO_BODY, ATTR_APPLY_TO_OUTER, ATTR_INCLUDE};
use markcheck::entity::snippet::INCLUDE_THIS;
use markcheck::entity::{LineMod, SingleSnippet, Snippet, SnippetProps};
use markcheck::{Config, LangDef, MarkcheckSyntaxError, ParsedDocument};

use crate::translator::lookup_translator;

/// Language LineMods seen so far in the run pass, by target language.
#[derive(Debug, Clone, Default)]
pub struct LanguageLineMods {
    by_lang: BTreeMap<String, Vec<LineMod>>,
}

impl LanguageLineMods {
    /// Ignores LineMods without a target language.
    pub fn register(&mut self, line_mod: LineMod) {
        if let Some(lang) = line_mod.target_lang() {
            self.by_lang.entry(lang.to_string()).or_default().push(line_mod);
        }
    }

    pub fn for_lang(&self, lang: &str) -> &[LineMod] {
        self.by_lang.get(lang).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Everything assembly reads: the document's ID indices, the configuration
/// in effect and the language LineMods registered so far.
#[derive(Clone, Copy)]
pub struct AssemblyContext<'a> {
    pub document: &'a ParsedDocument,
    pub config: &'a Config,
    pub language_line_mods: &'a LanguageLineMods,
}

impl<'a> AssemblyContext<'a> {
    pub fn new(
        document: &'a ParsedDocument,
        config: &'a Config,
        language_line_mods: &'a LanguageLineMods,
    ) -> Self {
        AssemblyContext {
            document,
            config,
            language_line_mods,
        }
    }

    /// The complete file for `snippet`: outer scope around inner lines.
    ///
    /// The outer scope adds, in this order, the language's `beforeLines`,
    /// the language LineMods (`each`) in declaration order, and the
    /// snippet's `applyToOuter` LineMod. `runLocalLines` leaves out the
    /// first two. After the inner lines the same LineMods add their
    /// after-lines in reverse order.
    pub fn assemble_outer_lines(&self, snippet: &Snippet) -> Result<Vec<String>, MarkcheckSyntaxError> {
        let props = snippet.props();

        let config_line_mod = if props.run_local_lines {
            None
        } else {
            self.config_line_mod(props)?
        };

        let mut outer: Vec<&LineMod> = Vec::new();
        outer.extend(config_line_mod.as_ref());
        if !props.run_local_lines {
            outer.extend(self.language_line_mods.for_lang(&props.lang));
        }
        if let Some(id) = &props.apply_to_outer {
            outer.push(self.line_mod_ref(props.line_number, ATTR_APPLY_TO_OUTER, id)?);
        }

        let inner = self.assemble_inner_lines(snippet)?;

        let mut lines = Vec::new();
        for line_mod in &outer {
            line_mod.push_before_lines(&mut lines);
        }
        lines.extend(inner);
        for line_mod in outer.iter().rev() {
            line_mod.push_after_lines(&mut lines);
        }
        Ok(lines)
    }

    /// The snippet's own content: includes and body, no outer scope. The
    /// body goes at `$THIS`, or last. It is edited by its governing LineMod
    /// (ignore, search and replace, insert), translated, then wrapped by that
    /// LineMod. A sequence concatenates its elements.
    pub fn assemble_inner_lines(&self, snippet: &Snippet) -> Result<Vec<String>, MarkcheckSyntaxError> {
        let mut path: Vec<String> = snippet.id().map(str::to_string).into_iter().collect();
        self.inner_lines(snippet, &mut path)
    }

    fn inner_lines(
        &self,
        snippet: &Snippet,
        path: &mut Vec<String>,
    ) -> Result<Vec<String>, MarkcheckSyntaxError> {
        let mut lines = Vec::new();
        for element in snippet.elements() {
            lines.extend(self.single_inner_lines(element, path)?);
        }
        Ok(lines)
    }

    fn single_inner_lines(
        &self,
        single: &SingleSnippet,
        path: &mut Vec<String>,
    ) -> Result<Vec<String>, MarkcheckSyntaxError> {
        let props = &single.props;
        let body = self.body_lines(single)?;
        if props.include_ids.is_empty() {
            return Ok(body);
        }

        let mut lines = Vec::new();
        let mut body = Some(body);
        for id in &props.include_ids {
            if id == INCLUDE_THIS {
                lines.extend(body.take().unwrap_or_default());
                continue;
            }
            if path.contains(id) {
                let mut cycle = path.clone();
                cycle.push(id.clone());
                return Err(MarkcheckSyntaxError::at_line(
                    props.line_number,
                    format!("Cycle in includes: {}", cycle.join(" → ")),
                ));
            }
            let included = self.snippet_ref(props.line_number, ATTR_INCLUDE, id)?;

            path.push(id.clone());
            let result = self.inner_lines(included, path);
            path.pop();
            lines.extend(result?);
        }
        if let Some(body) = body {
            lines.extend(body);
        }
        Ok(lines)
    }

    /// The body after editing, translation and wrapping.
    fn body_lines(&self, single: &SingleSnippet) -> Result<Vec<String>, MarkcheckSyntaxError> {
        let props = &single.props;
        let governing = match &props.apply_to_body {
            Some(id) => Some(self.line_mod_ref(props.line_number, ATTR_APPLY_TO_BODY, id)?),
            None => props.internal_line_mod.as_ref(),
        };

        let edited = match governing {
            Some(line_mod) => line_mod
                .edit_lines(&single.body)
                .map_err(|e| e.or_at_line(props.line_number))?,
            None => single.body.clone(),
        };
        let translated = self.translate(props, edited)?;

        let Some(line_mod) = governing else {
            return Ok(translated);
        };
        let mut lines = Vec::new();
        line_mod.push_before_lines(&mut lines);
        lines.extend(translated);
        line_mod.push_after_lines(&mut lines);
        Ok(lines)
    }

    fn translate(
        &self,
        props: &SnippetProps,
        lines: Vec<String>,
    ) -> Result<Vec<String>, MarkcheckSyntaxError> {
        let Some(LangDef::Command(command)) = self.lang_def(props)? else {
            return Ok(lines);
        };
        let Some(key) = &command.translator else {
            return Ok(lines);
        };
        let translator = lookup_translator(key).ok_or_else(|| {
            MarkcheckSyntaxError::at_line(
                props.line_number,
                format!("Unknown translator `{}` (language `{}`)", key, props.lang),
            )
        })?;
        translator
            .translate(props.line_number, &lines)
            .map_err(|e| e.or_at_line(props.line_number))
    }

    fn config_line_mod(&self, props: &SnippetProps) -> Result<Option<LineMod>, MarkcheckSyntaxError> {
        match self.lang_def(props)? {
            Some(LangDef::Command(command)) => Ok(command
                .before_lines
                .filter(|lines| !lines.is_empty())
                .map(|lines| LineMod::config(props.line_number, lines))),
            _ => Ok(None),
        }
    }

    fn lang_def(&self, props: &SnippetProps) -> Result<Option<LangDef>, MarkcheckSyntaxError> {
        self.config
            .get_lang(&props.lang)
            .map_err(|e| e.or_at_line(props.line_number))
    }

    /// Resolve a snippet ID referenced by attribute `attr_key` at `line_number`.
    pub fn snippet_ref(
        &self,
        line_number: usize,
        attr_key: &str,
        id: &str,
    ) -> Result<&'a Snippet, MarkcheckSyntaxError> {
        if let Some(snippet) = self.document.snippet(id) {
            return Ok(snippet);
        }
        let message = if self.document.line_mod(id).is_some() {
            format!("`{}` refers to a line mod, expected a snippet ID: `{}`", attr_key, id)
        } else {
            format!("Unknown snippet ID `{}` in `{}`", id, attr_key)
        };
        Err(MarkcheckSyntaxError::at_line(line_number, message))
    }

    /// Resolve a `lineModId` referenced by attribute `attr_key` at `line_number`.
    pub fn line_mod_ref(
        &self,
        line_number: usize,
        attr_key: &str,
        id: &str,
    ) -> Result<&'a LineMod, MarkcheckSyntaxError> {
        if let Some(line_mod) = self.document.line_mod(id) {
            return Ok(line_mod);
        }
        let message = if self.document.snippet(id).is_some() {
            format!("`{}` refers to a snippet, expected a `lineModId`: `{}`", attr_key, id)
        } else {
            format!("Unknown `lineModId` `{}` in `{}`", id, attr_key)
        };
        Err(MarkcheckSyntaxError::at_line(line_number, message))
    }
}
