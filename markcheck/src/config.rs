use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MarkcheckSyntaxError;

/// Replaced by the snippet's file name in command templates.
pub const FILE_NAME_PLACEHOLDER: &str = "$FILE_NAME";
/// Replaced by the snippet's file name followed by its external file names.
pub const ALL_FILE_NAMES_PLACEHOLDER: &str = "$ALL_FILE_NAMES";

const NEVER_RUN_MARKER: &str = "[neverRun]";
const SKIP_MARKER: &str = "[skip]";

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ConfigPatch {
    /// Directory (relative to the Markdown file) used instead of the
    /// discovered `markcheck-data` directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markcheck_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<BTreeMap<String, LangDef>>,
}

/// How snippets of one language are handled.
#[derive(Debug, Clone, PartialEq)]
pub enum LangDef {
    Command(CommandDef),
    /// Snippets are checked (IDs, includes, sameAsId, …) but never executed.
    NeverRun,
    /// Snippets are ignored entirely.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CommandDef {
    /// Key of a language whose fields this definition inherits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_lines: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translator: Option<String>,
}

impl CommandDef {
    /// The child (`self`) wins on every field it sets.
    fn merged_over(&self, parent: &CommandDef) -> CommandDef {
        CommandDef {
            extends: None,
            default_file_name: self
                .default_file_name
                .clone()
                .or_else(|| parent.default_file_name.clone()),
            run_file_name: self
                .run_file_name
                .clone()
                .or_else(|| parent.run_file_name.clone()),
            commands: self.commands.clone().or_else(|| parent.commands.clone()),
            before_lines: self
                .before_lines
                .clone()
                .or_else(|| parent.before_lines.clone()),
            translator: self.translator.clone().or_else(|| parent.translator.clone()),
        }
    }

    /// The file a snippet is written to when it does not name one itself.
    pub fn file_name(&self) -> Option<&str> {
        self.run_file_name
            .as_deref()
            .or(self.default_file_name.as_deref())
    }
}

impl<'de> Deserialize<'de> for LangDef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LangDefVisitor;

        impl<'de> Visitor<'de> for LangDefVisitor {
            type Value = LangDef;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    "a command definition, \"{}\" or \"{}\"",
                    NEVER_RUN_MARKER, SKIP_MARKER
                )
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<LangDef, E> {
                match value {
                    NEVER_RUN_MARKER => Ok(LangDef::NeverRun),
                    SKIP_MARKER => Ok(LangDef::Skip),
                    other => Err(E::invalid_value(Unexpected::Str(other), &self)),
                }
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<LangDef, A::Error> {
                CommandDef::deserialize(de::value::MapAccessDeserializer::new(map))
                    .map(LangDef::Command)
            }
        }

        deserializer.deserialize_any(LangDefVisitor)
    }
}

impl Serialize for LangDef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LangDef::Command(command) => command.serialize(serializer),
            LangDef::NeverRun => serializer.serialize_str(NEVER_RUN_MARKER),
            LangDef::Skip => serializer.serialize_str(SKIP_MARKER),
        }
    }
}

/// Parse a relaxed-JSON configuration patch: JSON plus unquoted keys,
/// single-quoted strings, trailing commas, and `#` or `//` line comments.
/// Apart from `//` comments that is the flow subset of YAML, so the text is
/// read with `serde_yaml` once they are removed. Schema violations name the
/// offending path, e.g. `lang.js: unknown field ...`.
pub fn parse_config_patch(text: &str) -> Result<ConfigPatch, MarkcheckSyntaxError> {
    let text = strip_line_comments(text);
    if text.trim().is_empty() {
        return Ok(ConfigPatch::default());
    }
    serde_yaml::from_str(&text)
        .map_err(|e| MarkcheckSyntaxError::new(format!("Invalid configuration: {}", e)))
}

/// Remove `//` comments that start a line or follow whitespace or `,{[`.
/// Quoted strings are left alone, so `'http://example.com'` survives.
fn strip_line_comments(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for (index, line) in text.lines().enumerate() {
        if index > 0 {
            result.push('\n');
        }
        result.push_str(&line[..comment_start(line).unwrap_or(line.len())]);
    }
    result
}

fn comment_start(line: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut previous: Option<char> = None;
    for (index, c) in line.char_indices() {
        match quote {
            Some('"') if escaped => escaped = false,
            Some('"') if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '/' && line[index..].starts_with("//") => {
                let separated =
                    previous.is_none_or(|p| p.is_whitespace() || matches!(p, ',' | '{' | '['));
                if separated {
                    return Some(index);
                }
            }
            None => {}
        }
        previous = Some(c);
    }
    None
}

// ---------------------------------------------------------------------------
// Config snapshot
// ---------------------------------------------------------------------------

/// An immutable configuration snapshot. Patches from `config:` directives
/// and from the external config file are applied with
/// [`Config::apply_patch`], which returns a new snapshot, so the
/// configuration in effect for an entity is whatever the run pass has
/// applied up to that point.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    lang: BTreeMap<String, LangDef>,
    markcheck_directory: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config::builtin()
    }
}

impl Config {
    /// The defaults every run starts from.
    pub fn builtin() -> Self {
        let mut lang = BTreeMap::new();
        lang.insert(String::new(), LangDef::NeverRun);
        lang.insert("txt".to_string(), LangDef::NeverRun);
        lang.insert(
            "js".to_string(),
            LangDef::Command(CommandDef {
                default_file_name: Some("main.mjs".to_string()),
                commands: Some(vec![command(&["node", FILE_NAME_PLACEHOLDER])]),
                before_lines: Some(vec![
                    "import assert from 'node:assert/strict';".to_string(),
                ]),
                ..CommandDef::default()
            }),
        );
        lang.insert(
            "node-repl".to_string(),
            LangDef::Command(CommandDef {
                extends: Some("js".to_string()),
                translator: Some("node-repl".to_string()),
                ..CommandDef::default()
            }),
        );
        let shell = LangDef::Command(CommandDef {
            default_file_name: Some("main.sh".to_string()),
            commands: Some(vec![command(&["bash", FILE_NAME_PLACEHOLDER])]),
            ..CommandDef::default()
        });
        lang.insert("sh".to_string(), shell.clone());
        lang.insert("bash".to_string(), shell);
        lang.insert(
            "python".to_string(),
            LangDef::Command(CommandDef {
                default_file_name: Some("main.py".to_string()),
                commands: Some(vec![command(&["python3", FILE_NAME_PLACEHOLDER])]),
                ..CommandDef::default()
            }),
        );
        Config {
            lang,
            markcheck_directory: None,
        }
    }

    /// A new snapshot in which every language named by `patch` is replaced.
    /// `extends` is kept as written and only followed by [`Config::get_lang`].
    pub fn apply_patch(&self, patch: &ConfigPatch) -> Config {
        let mut next = self.clone();
        if let Some(dir) = &patch.markcheck_directory {
            next.markcheck_directory = Some(dir.clone());
        }
        if let Some(lang) = &patch.lang {
            for (key, def) in lang {
                next.lang.insert(key.clone(), def.clone());
            }
        }
        next
    }

    pub fn markcheck_directory(&self) -> Option<&str> {
        self.markcheck_directory.as_deref()
    }

    /// Look up a language and follow its `extends` chain. `Ok(None)` means
    /// the language is unknown.
    pub fn get_lang(&self, key: &str) -> Result<Option<LangDef>, MarkcheckSyntaxError> {
        let mut chain = Vec::new();
        self.resolve_lang(key, &mut chain)
    }

    fn resolve_lang(
        &self,
        key: &str,
        chain: &mut Vec<String>,
    ) -> Result<Option<LangDef>, MarkcheckSyntaxError> {
        if chain.iter().any(|k| k == key) {
            chain.push(key.to_string());
            return Err(MarkcheckSyntaxError::new(format!(
                "Cycle in `extends` of language definitions: {}",
                chain.join(" → ")
            )));
        }
        let Some(def) = self.lang.get(key) else {
            return Ok(None);
        };
        let LangDef::Command(command) = def else {
            return Ok(Some(def.clone()));
        };
        let Some(parent_key) = &command.extends else {
            return Ok(Some(def.clone()));
        };

        chain.push(key.to_string());
        let parent = self.resolve_lang(parent_key, chain)?;
        chain.pop();

        match parent {
            Some(LangDef::Command(parent)) => Ok(Some(LangDef::Command(command.merged_over(&parent)))),
            Some(_) => Err(MarkcheckSyntaxError::new(format!(
                "Language `{}` extends `{}`, which does not define commands",
                key, parent_key
            ))),
            None => Err(MarkcheckSyntaxError::new(format!(
                "Language `{}` extends unknown language `{}`",
                key, parent_key
            ))),
        }
    }

    /// The snapshot as a patch, e.g. for printing the defaults.
    pub fn to_patch(&self) -> ConfigPatch {
        ConfigPatch {
            markcheck_directory: self.markcheck_directory.clone(),
            lang: Some(self.lang.clone()),
        }
    }
}

fn command(argv: &[&str]) -> Vec<String> {
    argv.iter().map(|arg| arg.to_string()).collect()
}

/// Expand the placeholders in command templates. Every argument equal to
/// [`ALL_FILE_NAMES_PLACEHOLDER`] becomes all file names; occurrences of
/// [`FILE_NAME_PLACEHOLDER`] inside an argument become the file name.
pub fn fill_in_commands(
    commands: &[Vec<String>],
    file_name: &str,
    all_file_names: &[String],
) -> Vec<Vec<String>> {
    commands
        .iter()
        .map(|template| {
            let mut argv = Vec::new();
            for arg in template {
                if arg == ALL_FILE_NAMES_PLACEHOLDER {
                    argv.extend(all_file_names.iter().cloned());
                } else {
                    argv.push(arg.replace(FILE_NAME_PLACEHOLDER, file_name));
                }
            }
            argv
        })
        .collect()
}
