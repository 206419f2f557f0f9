use markcheck::MarkcheckSyntaxError;

/// Rewrites a snippet body from one convention into runnable code. The last
/// edit applied to a body before it is wrapped.
pub trait Translator: Sync {
    /// The value of `translator` in a language definition.
    fn key(&self) -> &'static str;

    fn translate(
        &self,
        line_number: usize,
        lines: &[String],
    ) -> Result<Vec<String>, MarkcheckSyntaxError>;
}

static NODE_REPL: NodeReplTranslator = NodeReplTranslator;

static TRANSLATORS: &[&dyn Translator] = &[&NODE_REPL];

pub fn lookup_translator(key: &str) -> Option<&'static dyn Translator> {
    TRANSLATORS.iter().copied().find(|t| t.key() == key)
}

// ---------------------------------------------------------------------------
// node-repl
// ---------------------------------------------------------------------------

const INPUT_PREFIX: &str = "> ";
const CONTINUATION_PREFIX: &str = "... ";
const UNCAUGHT_PREFIX: &str = "Uncaught ";

/// Turns a Node.js REPL transcript into assertions:
///
/// ```text
/// > 2 + 3                    assert.deepEqual(
/// 5                    →       2 + 3
///                              ,
///                              5
///                            );
/// ```
///
/// Inputs without output (or with `undefined`) are kept as they are;
/// `Uncaught Name: message` becomes an `assert.throws()`.
pub struct NodeReplTranslator;

impl Translator for NodeReplTranslator {
    fn key(&self) -> &'static str {
        "node-repl"
    }

    fn translate(
        &self,
        _line_number: usize,
        lines: &[String],
    ) -> Result<Vec<String>, MarkcheckSyntaxError> {
        let mut result = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let Some(first) = input_line(&lines[i]) else {
                result.push(lines[i].clone());
                i += 1;
                continue;
            };
            i += 1;

            let mut input = vec![first.to_string()];
            while let Some(cont) = lines.get(i).and_then(|l| l.strip_prefix(CONTINUATION_PREFIX)) {
                input.push(cont.to_string());
                i += 1;
            }

            let mut output = Vec::new();
            while let Some(line) = lines.get(i).filter(|l| input_line(l).is_none()) {
                output.push(line.clone());
                i += 1;
            }
            while output.last().is_some_and(|l| l.trim().is_empty()) {
                output.pop();
            }

            emit_interaction(&input, &output, &mut result);
        }

        Ok(result)
    }
}

fn input_line(line: &str) -> Option<&str> {
    if line == ">" {
        return Some("");
    }
    line.strip_prefix(INPUT_PREFIX)
}

fn emit_interaction(input: &[String], output: &[String], result: &mut Vec<String>) {
    match output {
        [] => result.extend(input.iter().cloned()),
        [only] if only.trim() == "undefined" => result.extend(input.iter().cloned()),
        [first, ..] if first.starts_with(UNCAUGHT_PREFIX) => {
            let exception = &first[UNCAUGHT_PREFIX.len()..];
            result.push("assert.throws(".to_string());
            result.push("  () => {".to_string());
            result.extend(input.iter().map(|line| format!("    {}", line)));
            match exception.split_once(": ") {
                Some((name, message)) if is_identifier(name) => {
                    result.push("  },".to_string());
                    result.push(format!(
                        "  {{name: {}, message: {}}}",
                        js_string(name),
                        js_string(message)
                    ));
                }
                _ if is_identifier(exception.trim()) => {
                    result.push("  },".to_string());
                    result.push(format!("  {{name: {}}}", js_string(exception.trim())));
                }
                _ => result.push("  }".to_string()),
            }
            result.push(");".to_string());
        }
        _ => {
            result.push("assert.deepEqual(".to_string());
            let last = input.len().saturating_sub(1);
            for (index, line) in input.iter().enumerate() {
                let line = if index == last {
                    line.trim_end().trim_end_matches(';')
                } else {
                    line.as_str()
                };
                result.push(format!("  {}", line));
            }
            result.push("  ,".to_string());
            result.extend(output.iter().map(|line| format!("  {}", line)));
            result.push(");".to_string());
        }
    }
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn js_string(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

