use markcheck::config::{fill_in_commands, parse_config_patch};
use markcheck::{CommandDef, Config, LangDef};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn command_def(config: &Config, key: &str) -> CommandDef {
    match config.get_lang(key).expect("lookup failed") {
        Some(LangDef::Command(command)) => command,
        other => panic!("expected a command definition for {key}, got {other:?}"),
    }
}

#[test]
fn builtin_languages() {
    let config = Config::builtin();
    let js = command_def(&config, "js");
    assert_eq!(js.file_name(), Some("main.mjs"));
    assert_eq!(js.commands, Some(vec![strings(&["node", "$FILE_NAME"])]));
    assert_eq!(config.get_lang("").unwrap(), Some(LangDef::NeverRun));
    assert_eq!(config.get_lang("txt").unwrap(), Some(LangDef::NeverRun));
    assert_eq!(config.get_lang("cobol").unwrap(), None);
}

#[test]
fn node_repl_inherits_from_js() {
    let repl = command_def(&Config::builtin(), "node-repl");
    assert_eq!(repl.extends, None);
    assert_eq!(repl.translator.as_deref(), Some("node-repl"));
    assert_eq!(repl.file_name(), Some("main.mjs"));
    assert!(repl.before_lines.is_some());
}

#[test]
fn relaxed_json_patch() {
    let patch = parse_config_patch(
        "{\n  # comment\n  lang: {\n    rust: '[skip]',\n    txt: \"[neverRun]\",\n    ts: { extends: 'js', defaultFileName: 'main.ts' },\n  },\n}",
    )
    .unwrap();
    let config = Config::builtin().apply_patch(&patch);
    assert_eq!(config.get_lang("rust").unwrap(), Some(LangDef::Skip));
    assert_eq!(config.get_lang("txt").unwrap(), Some(LangDef::NeverRun));
    let ts = command_def(&config, "ts");
    assert_eq!(ts.file_name(), Some("main.ts"));
    assert_eq!(ts.commands, Some(vec![strings(&["node", "$FILE_NAME"])]));
}

#[test]
fn run_file_name_wins_over_default() {
    let command = CommandDef {
        default_file_name: Some("main.mjs".to_string()),
        run_file_name: Some("run.mjs".to_string()),
        ..CommandDef::default()
    };
    assert_eq!(command.file_name(), Some("run.mjs"));
}

#[test]
fn extends_is_followed_at_lookup_time() {
    let child = parse_config_patch("{ lang: { ts: { extends: 'js' } } }").unwrap();
    let parent = parse_config_patch(
        "{ lang: { js: { defaultFileName: 'x.mjs', commands: [['deno', 'run', '$FILE_NAME']] } } }",
    )
    .unwrap();
    let config = Config::builtin().apply_patch(&child).apply_patch(&parent);
    let ts = command_def(&config, "ts");
    assert_eq!(ts.file_name(), Some("x.mjs"));
    assert_eq!(ts.commands, Some(vec![strings(&["deno", "run", "$FILE_NAME"])]));
}

#[test]
fn applying_a_patch_keeps_the_old_snapshot() {
    let base = Config::builtin();
    let patch = parse_config_patch("{ lang: { js: '[skip]' } }").unwrap();
    let next = base.apply_patch(&patch);
    assert_eq!(next.get_lang("js").unwrap(), Some(LangDef::Skip));
    assert!(matches!(base.get_lang("js").unwrap(), Some(LangDef::Command(_))));
}

#[test]
fn extends_errors() {
    let cycle = parse_config_patch("{ lang: { a: { extends: 'b' }, b: { extends: 'a' } } }").unwrap();
    let error = Config::builtin().apply_patch(&cycle).get_lang("a").unwrap_err();
    assert!(error.message.contains("a → b → a"));

    let unknown = parse_config_patch("{ lang: { a: { extends: 'nope' } } }").unwrap();
    let error = Config::builtin().apply_patch(&unknown).get_lang("a").unwrap_err();
    assert!(error.message.contains("unknown language `nope`"));

    let not_command = parse_config_patch("{ lang: { a: { extends: 'txt' } } }").unwrap();
    assert!(Config::builtin().apply_patch(&not_command).get_lang("a").is_err());
}

#[test]
fn invalid_patches() {
    assert!(parse_config_patch("{ langs: {} }").is_err());
    assert!(parse_config_patch("{ lang: { js: { command: [] } } }").is_err());
    assert!(parse_config_patch("{ lang: { js: '[sometimes]' } }").is_err());
    assert_eq!(parse_config_patch("  ").unwrap(), Default::default());
}

#[test]
fn slash_comments_are_ignored_outside_strings() {
    let patch = parse_config_patch(
        "// leading comment\n{\n  lang: { // languages\n    js: { beforeLines: ['// keep', \"http://x.org\"] }, // trailing\n  },\n}",
    )
    .unwrap();
    let config = Config::builtin().apply_patch(&patch);
    assert_eq!(
        command_def(&config, "js").before_lines,
        Some(strings(&["// keep", "http://x.org"]))
    );
}

#[test]
fn markcheck_directory_is_carried() {
    let patch = parse_config_patch("{ markcheckDirectory: 'checks' }").unwrap();
    let config = Config::builtin().apply_patch(&patch);
    assert_eq!(config.markcheck_directory(), Some("checks"));
    assert_eq!(Config::builtin().markcheck_directory(), None);
}

#[test]
fn printed_defaults_parse_back() {
    let yaml = serde_yaml::to_string(&Config::builtin().to_patch()).unwrap();
    let patch = parse_config_patch(&yaml).unwrap();
    assert_eq!(Config::builtin().apply_patch(&patch), Config::builtin());
}

#[test]
fn command_placeholders() {
    let templates = vec![
        strings(&["tsc", "$ALL_FILE_NAMES"]),
        strings(&["node", "--input=$FILE_NAME"]),
    ];
    let filled = fill_in_commands(&templates, "main.ts", &strings(&["main.ts", "util.ts"]));
    assert_eq!(
        filled,
        vec![
            strings(&["tsc", "main.ts", "util.ts"]),
            strings(&["node", "--input=main.ts"]),
        ]
    );
}
