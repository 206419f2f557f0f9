use crate::config::parse_config_patch;
use crate::directive::{
    ATTR_ALWAYS_RUN, ATTR_APPLY_TO_BODY, ATTR_APPLY_TO_OUTER, ATTR_AT, ATTR_CONTAINED_IN_FILE,
    ATTR_EACH, ATTR_EXIT_STATUS, ATTR_EXTERNAL, ATTR_EXTERNAL_LOCAL, ATTR_ID, ATTR_IGNORE_LINES,
    ATTR_INCLUDE, ATTR_LANG, ATTR_LINE_MOD_ID, ATTR_ONLY, ATTR_RUN_FILE_NAME,
    ATTR_RUN_LOCAL_LINES, ATTR_SAME_AS_ID, ATTR_SEARCH_AND_REPLACE, ATTR_SEQUENCE, ATTR_SKIP,
    ATTR_STDERR, ATTR_STDOUT, ATTR_WRITE, ATTR_WRITE_LOCAL, BodyLabel, Directive,
};
use crate::entity::ConfigMod;
use crate::entity::line_mod::{LineMod, LineModKind};
use crate::entity::snippet::{OpenSnippet, SingleSnippet};
use crate::error::MarkcheckSyntaxError;

const LANGUAGE_LINE_MOD_ATTRIBUTES: &[&str] = &[ATTR_EACH];

const APPLIABLE_LINE_MOD_ATTRIBUTES: &[&str] =
    &[ATTR_LINE_MOD_ID, ATTR_IGNORE_LINES, ATTR_SEARCH_AND_REPLACE, ATTR_AT];

const SNIPPET_ATTRIBUTES: &[&str] = &[
    ATTR_ID,
    ATTR_SEQUENCE,
    ATTR_INCLUDE,
    ATTR_LANG,
    ATTR_SKIP,
    ATTR_ONLY,
    ATTR_ALWAYS_RUN,
    ATTR_APPLY_TO_BODY,
    ATTR_APPLY_TO_OUTER,
    ATTR_RUN_LOCAL_LINES,
    ATTR_RUN_FILE_NAME,
    ATTR_IGNORE_LINES,
    ATTR_SEARCH_AND_REPLACE,
    ATTR_AT,
    ATTR_SAME_AS_ID,
    ATTR_CONTAINED_IN_FILE,
    ATTR_WRITE,
    ATTR_WRITE_LOCAL,
    ATTR_EXTERNAL,
    ATTR_EXTERNAL_LOCAL,
    ATTR_EXIT_STATUS,
    ATTR_STDOUT,
    ATTR_STDERR,
];

#[derive(Debug, Clone)]
pub enum ClassifiedDirective {
    ConfigMod(ConfigMod),
    LineMod(LineMod),
    /// Waits for the next code block.
    OpenSnippet(OpenSnippet),
    /// Carries its own `body:`.
    ClosedSnippet(SingleSnippet),
}

/// Turns a [`Directive`] into the entity it declares.
///
/// | body label                      | `each` | `lineModId` | result               |
/// |---------------------------------|--------|-------------|----------------------|
/// | `config`                        |        |             | ConfigMod            |
/// | not `config`, `body`, `insert`  | yes    |             | language LineMod     |
/// | not `config`, `body`            |        | yes         | appliable LineMod    |
/// | `body`                          |        |             | closed snippet       |
/// | none, `before`, `after`, …      |        |             | open snippet         |
pub fn directive_to_entity(directive: &Directive) -> Result<ClassifiedDirective, MarkcheckSyntaxError> {
    let has_each = directive.has(ATTR_EACH);
    let has_line_mod_id = directive.has(ATTR_LINE_MOD_ID);

    match (directive.body_label, has_each, has_line_mod_id) {
        (_, true, true) => Err(directive.error(format!(
            "`{}` and `{}` can't be used together",
            ATTR_EACH, ATTR_LINE_MOD_ID
        ))),
        (Some(BodyLabel::Config), _, _) => config_mod(directive),
        (Some(label @ (BodyLabel::Body | BodyLabel::Insert)), true, false) => Err(directive.error(
            format!("Body label `{}` is not allowed together with `{}`", label, ATTR_EACH),
        )),
        (_, true, false) => language_line_mod(directive),
        (Some(BodyLabel::Body), false, true) => Err(directive.error(format!(
            "Body label `{}` is not allowed together with `{}`",
            BodyLabel::Body,
            ATTR_LINE_MOD_ID
        ))),
        (_, false, true) => appliable_line_mod(directive),
        (Some(BodyLabel::Body), false, false) => {
            directive.check_attributes("snippets", SNIPPET_ATTRIBUTES)?;
            // Without `lang`, a `body:` snippet has the empty language key.
            let open = OpenSnippet::from_directive(directive)?;
            Ok(ClassifiedDirective::ClosedSnippet(open.close("", directive.body.clone())))
        }
        (_, false, false) => {
            directive.check_attributes("snippets", SNIPPET_ATTRIBUTES)?;
            Ok(ClassifiedDirective::OpenSnippet(OpenSnippet::from_directive(directive)?))
        }
    }
}

fn config_mod(directive: &Directive) -> Result<ClassifiedDirective, MarkcheckSyntaxError> {
    directive.check_attributes("`config:` directives", &[])?;
    let patch = parse_config_patch(&directive.body.join("\n"))
        .map_err(|e| e.or_at_line(directive.line_number))?;
    Ok(ClassifiedDirective::ConfigMod(ConfigMod {
        line_number: directive.line_number,
        patch,
    }))
}

fn language_line_mod(directive: &Directive) -> Result<ClassifiedDirective, MarkcheckSyntaxError> {
    directive.check_attributes("language line mods (`each`)", LANGUAGE_LINE_MOD_ATTRIBUTES)?;
    let target_lang = directive.string(ATTR_EACH)?.unwrap_or_default().to_string();
    let line_mod = LineMod::from_directive(directive, LineModKind::Language { target_lang })?;
    Ok(ClassifiedDirective::LineMod(line_mod))
}

fn appliable_line_mod(directive: &Directive) -> Result<ClassifiedDirective, MarkcheckSyntaxError> {
    directive.check_attributes("line mods with `lineModId`", APPLIABLE_LINE_MOD_ATTRIBUTES)?;
    let line_mod_id = directive.string(ATTR_LINE_MOD_ID)?.unwrap_or_default().to_string();
    if line_mod_id.is_empty() {
        return Err(directive.error(format!("`{}` must not be empty", ATTR_LINE_MOD_ID)));
    }
    let line_mod = LineMod::from_directive(directive, LineModKind::Appliable { line_mod_id })?;
    Ok(ClassifiedDirective::LineMod(line_mod))
}
