use runner::translator::{NodeReplTranslator, Translator, lookup_translator};

fn translate(lines: &[&str]) -> Vec<String> {
    let lines: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    NodeReplTranslator.translate(1, &lines).unwrap()
}

#[test]
fn output_becomes_deep_equal() {
    assert_eq!(
        translate(&["> 2 + 3;", "5"]),
        vec!["assert.deepEqual(", "  2 + 3", "  ,", "  5", ");"]
    );
}

#[test]
fn input_without_output_is_kept() {
    assert_eq!(
        translate(&["> const x = 1;", "> x", "1"]),
        vec!["const x = 1;", "assert.deepEqual(", "  x", "  ,", "  1", ");"]
    );
    assert_eq!(translate(&["> let y;", "undefined"]), vec!["let y;"]);
}

#[test]
fn uncaught_becomes_assert_throws() {
    assert_eq!(
        translate(&["> null.prop", "Uncaught TypeError: Cannot read properties of null"]),
        vec![
            "assert.throws(",
            "  () => {",
            "    null.prop",
            "  },",
            "  {name: \"TypeError\", message: \"Cannot read properties of null\"}",
            ");",
        ]
    );
}

#[test]
fn continuation_lines_belong_to_the_input() {
    assert_eq!(
        translate(&["> [", "... 1,", "... ]", "[ 1 ]"]),
        vec!["assert.deepEqual(", "  [", "  1,", "  ]", "  ,", "  [ 1 ]", ");"]
    );
}

#[test]
fn registry_lookup() {
    assert!(lookup_translator("node-repl").is_some());
    assert!(lookup_translator("python-repl").is_none());
}
