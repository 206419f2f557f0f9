use std::collections::BTreeSet;

use markcheck::ParsedDocument;
use markcheck::entity::snippet::INCLUDE_THIS;

use crate::status::Warning;

/// Every snippet ID and `lineModId` that no attribute refers to.
pub fn find_unused_ids(document: &ParsedDocument) -> Vec<Warning> {
    let mut used_snippet_ids: BTreeSet<&str> = BTreeSet::new();
    let mut used_line_mod_ids: BTreeSet<&str> = BTreeSet::new();

    for snippet in document.snippets() {
        for element in snippet.elements() {
            let props = &element.props;
            used_snippet_ids.extend(
                props
                    .include_ids
                    .iter()
                    .map(String::as_str)
                    .filter(|id| *id != INCLUDE_THIS),
            );
            used_snippet_ids.extend(props.same_as_id.as_deref());
            used_snippet_ids.extend(props.externals.iter().filter_map(|e| e.id.as_deref()));
            used_line_mod_ids.extend(props.apply_to_body.as_deref());
            used_line_mod_ids.extend(props.apply_to_outer.as_deref());
            for spec in [&props.stdout, &props.stderr].into_iter().flatten() {
                used_snippet_ids.insert(&spec.snippet_id);
                used_line_mod_ids.extend(spec.line_mod_id.as_deref());
            }
        }
    }

    let mut warnings = Vec::new();
    for id in document.snippet_ids() {
        if !used_snippet_ids.contains(id) {
            if let Some(snippet) = document.snippet(id) {
                warnings.push(Warning {
                    line_number: snippet.line_number(),
                    message: format!("Unused snippet ID `{}`", id),
                });
            }
        }
    }
    for id in document.line_mod_ids() {
        if !used_line_mod_ids.contains(id) {
            if let Some(line_mod) = document.line_mod(id) {
                warnings.push(Warning {
                    line_number: line_mod.line_number,
                    message: format!("Unused `lineModId` `{}`", id),
                });
            }
        }
    }
    warnings.sort_by_key(|w| w.line_number);
    warnings
}
