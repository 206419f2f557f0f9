mod common;

use std::io;

use common::{RecordingDriver, exited, parse, run};
use markcheck::Config;
use runner::executor::{contains_run, lines_equal};
use runner::{CommandOutput, LogEvent, StatusCounts};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn summaries(events: &[LogEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            LogEvent::Success { summary, .. } => Some(summary.clone()),
            _ => None,
        })
        .collect()
}

fn failure_messages(events: &[LogEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            LogEvent::TestFailure(failure) => Some(failure.message.clone()),
            LogEvent::SyntaxError(error) => Some(error.message.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn runs_a_snippet() {
    let mut driver = RecordingDriver::default();
    let report = run("```js\nconsole.log('hi');\n```\n", &mut driver);

    assert_eq!(
        driver.written["main.mjs"],
        strings(&["import assert from 'node:assert/strict';", "console.log('hi');"])
    );
    assert_eq!(driver.commands, vec![strings(&["node", "main.mjs"])]);
    assert_eq!(summaries(&report.events), vec!["ran main.mjs"]);
    assert_eq!(
        report.counts,
        StatusCounts {
            successes: 1,
            ..StatusCounts::default()
        }
    );
}

#[test]
fn unexpected_exit_status_fails() {
    let mut driver = RecordingDriver::default();
    driver.respond(CommandOutput {
        exit_status: Some(1),
        stderr: "boom\n".to_string(),
        ..CommandOutput::default()
    });
    let report = run("```js\nthrow new Error('boom');\n```\n", &mut driver);

    assert_eq!(report.counts.test_failures, 1);
    let LogEvent::TestFailure(failure) = &report.events[0] else {
        panic!("expected a test failure, got {:?}", report.events);
    };
    assert_eq!(failure.message, "Expected exit status 0, got 1");
    assert_eq!(failure.line_number, 1);
    assert_eq!(failure.stderr.as_deref(), Some("boom\n"));
}

#[test]
fn expected_exit_status() {
    let source = "\
<!--markcheck exitStatus=\"nonzero\"-->
```sh
exit 2
```

<!--markcheck exitStatus=\"3\"-->
```sh
exit 3
```
";
    let mut driver = RecordingDriver::default();
    driver.respond(exited(2, ""));
    driver.respond(exited(3, ""));
    let report = run(source, &mut driver);
    assert_eq!(report.counts.successes, 2);
    assert!(!report.counts.has_failures());
    assert_eq!(driver.commands[0], strings(&["bash", "main.sh"]));
}

#[test]
fn killed_by_signal_fails() {
    let mut driver = RecordingDriver::default();
    driver.respond(CommandOutput {
        signal: Some(9),
        ..CommandOutput::default()
    });
    let report = run("```sh\nkill -9 $$\n```\n", &mut driver);
    assert_eq!(failure_messages(&report.events), vec!["Command failed: terminated by signal 9"]);
}

#[test]
fn command_that_cannot_start_fails_the_snippet() {
    let mut driver = RecordingDriver::default();
    driver.respond_with_error(io::ErrorKind::NotFound);
    let report = run("```python\nprint(1)\n```\n\n```python\nprint(2)\n```\n", &mut driver);
    assert_eq!(report.counts.test_failures, 1);
    assert_eq!(report.counts.successes, 1);
    assert!(failure_messages(&report.events)[0].starts_with("Could not run `python3 main.py`"));
}

const STDOUT_SOURCE: &str = "\
<!--markcheck lineModId=\"numbers\" searchAndReplace=\"/[0-9]+/N/\"-->

<!--markcheck stdout=\"expected\"-->
```js
console.log('hello');
```

<!--markcheck stdout=\"|numbers=timing\"-->
```js
console.log(`took ${Date.now()}ms`);
```

<!--markcheck id=\"expected\" body:
hello
-->

<!--markcheck id=\"timing\" body:
took Nms
-->
";

#[test]
fn stdout_is_compared_with_a_snippet() {
    let mut driver = RecordingDriver::default();
    driver.respond(exited(0, "hello\n\n"));
    driver.respond(exited(0, "took 1234ms\n"));
    let report = run(STDOUT_SOURCE, &mut driver);
    assert_eq!(report.counts.successes, 2, "{:?}", report.events);
    assert_eq!(report.counts.warnings, 0);
}

#[test]
fn stdout_mismatch_carries_a_diff() {
    let mut driver = RecordingDriver::default();
    driver.respond(exited(0, "goodbye\n"));
    driver.respond(exited(0, "took 5ms\n"));
    let report = run(STDOUT_SOURCE, &mut driver);

    assert_eq!(report.counts.test_failures, 1);
    let failure = report
        .events
        .iter()
        .find_map(|event| match event {
            LogEvent::TestFailure(failure) => Some(failure),
            _ => None,
        })
        .unwrap();
    assert_eq!(failure.line_number, 3);
    assert_eq!(failure.expected, Some(strings(&["hello"])));
    assert_eq!(failure.actual, Some(strings(&["goodbye"])));
}

#[test]
fn only_restricts_what_runs() {
    let source = "\
```js
skipped();
```

<!--markcheck only-->
```js
chosen();
```

<!--markcheck alwaysRun-->
```js
always();
```
";
    let mut driver = RecordingDriver::default();
    let report = run(source, &mut driver);
    assert_eq!(report.counts.successes, 2);
    assert_eq!(driver.commands.len(), 2);
    assert_eq!(driver.written["main.mjs"].last().unwrap(), "always();");
}

#[test]
fn skipped_snippets_do_nothing() {
    let source = "<!--markcheck skip-->\n```js\nnot run\n```\n\n<!--markcheck id=\"lib\"-->\n```js\nlib();\n```\n";
    let mut driver = RecordingDriver::default();
    let report = run(source, &mut driver);
    assert!(driver.commands.is_empty());
    assert!(driver.written.is_empty());
    assert_eq!(report.counts.successes, 0);
    assert_eq!(report.counts.warnings, 1);
}

#[test]
fn unused_ids_are_warnings() {
    let source = "\
<!--markcheck lineModId=\"unusedMod\" before:
x
-->

<!--markcheck id=\"used\"-->
```js
used();
```

<!--markcheck id=\"unused\"-->
```js
unused();
```

<!--markcheck include=\"used\"-->
```js
main();
```
";
    let mut driver = RecordingDriver::default();
    let report = run(source, &mut driver);
    let warnings: Vec<&str> = report
        .events
        .iter()
        .filter_map(|event| match event {
            LogEvent::Warning(warning) => Some(warning.message.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(warnings, vec!["Unused `lineModId` `unusedMod`", "Unused snippet ID `unused`"]);
    assert!(!report.counts.has_failures());
}

#[test]
fn duplicate_ids_are_tallied() {
    let source = "\
<!--markcheck id=\"x\"-->
```js
1
```

<!--markcheck id=\"x\"-->
```js
2
```

<!--markcheck include=\"x\"-->
```js
3
```
";
    let mut driver = RecordingDriver::default();
    let report = run(source, &mut driver);
    assert_eq!(report.counts.syntax_errors, 1);
    assert_eq!(report.counts.successes, 1);
    assert_eq!(driver.written["main.mjs"][1..], strings(&["1", "3"]));
}

#[test]
fn write_does_not_run() {
    let source = "\
<!--markcheck write=\"data.txt\"-->
```txt
some data
```

<!--markcheck writeLocal=\"inner.mjs\"-->
```js
local();
```
";
    let mut driver = RecordingDriver::default();
    let report = run(source, &mut driver);
    assert!(driver.commands.is_empty());
    assert_eq!(driver.written["data.txt"], strings(&["some data"]));
    assert_eq!(driver.written["inner.mjs"], strings(&["local();"]));
    assert_eq!(summaries(&report.events), vec!["wrote data.txt", "wrote inner.mjs"]);
}

#[test]
fn externals_are_written_next_to_the_main_file() {
    let source = "\
<!--markcheck id=\"lib\"-->
```js
export const a = 1;
```

<!--markcheck external=\"lib>lib.mjs, >empty.txt\" externalLocal=\"lib>raw.mjs\"-->
```js
import {a} from './lib.mjs';
```
";
    let mut driver = RecordingDriver::default();
    run(source, &mut driver);
    assert_eq!(
        driver.written["lib.mjs"],
        strings(&["import assert from 'node:assert/strict';", "export const a = 1;"])
    );
    assert_eq!(driver.written["raw.mjs"], strings(&["export const a = 1;"]));
    assert!(driver.written["empty.txt"].is_empty());
}

#[test]
fn all_file_names_reach_the_command() {
    let source = "\
<!--markcheck config:
{ lang: { ts: { defaultFileName: 'main.ts', commands: [['tsc', '$ALL_FILE_NAMES'], ['node', '$FILE_NAME']] } } }
-->

<!--markcheck external=\">types.d.ts\"-->
```ts
let x: number = 1;
```
";
    let mut driver = RecordingDriver::default();
    let report = run(source, &mut driver);
    assert_eq!(
        driver.commands,
        vec![
            strings(&["tsc", "main.ts", "types.d.ts"]),
            strings(&["node", "main.ts"]),
        ]
    );
    assert_eq!(report.counts.successes, 1);
}

#[test]
fn failing_intermediate_command_stops_the_snippet() {
    let source = "\
<!--markcheck config:
{ lang: { ts: { defaultFileName: 'main.ts', commands: [['tsc', '$FILE_NAME'], ['node', '$FILE_NAME']] } } }
-->

```ts
let x: number = 'one';
```
";
    let mut driver = RecordingDriver::default();
    driver.respond(exited(2, "type error"));
    let report = run(source, &mut driver);
    assert_eq!(driver.commands.len(), 1);
    assert_eq!(failure_messages(&report.events), vec!["Command failed: exit status 2"]);
}

#[test]
fn same_as_id() {
    let source = "\
<!--markcheck id=\"original\"-->
```js
const x = 1;
```

<!--markcheck sameAsId=\"original\"-->
```js
const x = 1;
```

<!--markcheck sameAsId=\"original\"-->
```js
const x = 2;
```
";
    let mut driver = RecordingDriver::default();
    let report = run(source, &mut driver);
    assert!(driver.commands.is_empty());
    assert_eq!(summaries(&report.events), vec!["same as `original`"]);
    assert_eq!(
        failure_messages(&report.events),
        vec!["Content is not the same as snippet `original`"]
    );
}

#[test]
fn contained_in_file() {
    let source = "\
<!--markcheck containedInFile=\"src/lib.js\"-->
```js
b();
c();
```

<!--markcheck containedInFile=\"src/lib.js\"-->
```js
c();
b();
```

<!--markcheck containedInFile=\"missing.js\"-->
```js
b();
```
";
    let mut driver = RecordingDriver::default();
    driver
        .readable
        .insert("src/lib.js".to_string(), "a();\nb();\nc();\n".to_string());
    let report = run(source, &mut driver);
    assert_eq!(report.counts.successes, 1);
    assert_eq!(report.counts.test_failures, 1);
    assert_eq!(report.counts.syntax_errors, 1);
}

#[test]
fn config_directive_changes_later_snippets() {
    let source = "\
```js
before();
```

<!--markcheck config:
{ lang: { js: '[skip]' } }
-->

```js
after();
```
";
    let mut driver = RecordingDriver::default();
    let report = run(source, &mut driver);
    assert_eq!(driver.commands.len(), 1);
    assert_eq!(report.counts.successes, 1);
}

#[test]
fn markcheck_directory_is_forwarded() {
    let source = "<!--markcheck config:\n{ markcheckDirectory: 'checks' }\n-->\n";
    let mut driver = RecordingDriver::default();
    run(source, &mut driver);
    assert_eq!(driver.markcheck_directories, vec!["checks"]);
}

#[test]
fn missing_markcheck_directory_is_a_syntax_error() {
    let source = "\
```js
first();
```

<!--markcheck config:
{ markcheckDirectory: 'typo-dir' }
-->

```js
second();
```
";
    let mut driver = RecordingDriver {
        fail_markcheck_directory: true,
        ..RecordingDriver::default()
    };
    let report = run(source, &mut driver);
    assert_eq!(driver.commands.len(), 2);
    assert_eq!(report.counts.successes, 2);
    assert_eq!(report.counts.syntax_errors, 1);
    let error = report
        .events
        .iter()
        .find_map(|event| match event {
            LogEvent::SyntaxError(error) => Some(error),
            _ => None,
        })
        .unwrap();
    assert_eq!(error.line_number(), Some(5));
    assert!(error.message.contains("`typo-dir`"));
}

#[test]
fn never_run_languages_are_only_checked() {
    let source = "\
```txt
plain text
```

<!--markcheck include=\"nope\"-->
```txt
broken reference
```
";
    let mut driver = RecordingDriver::default();
    let report = run(source, &mut driver);
    assert!(driver.commands.is_empty());
    assert_eq!(report.counts.successes, 0);
    assert_eq!(report.counts.syntax_errors, 1);
}

#[test]
fn unknown_language_is_a_syntax_error() {
    let mut driver = RecordingDriver::default();
    let report = run("```cobol\nDISPLAY 'HI'.\n```\n", &mut driver);
    assert_eq!(report.counts.syntax_errors, 1);
    let LogEvent::SyntaxError(error) = &report.events[0] else {
        panic!("expected a syntax error");
    };
    assert_eq!(error.line_number(), Some(1));
    assert!(error.message.contains("Unknown language `cobol`"));
}

#[test]
fn write_failure_aborts_the_run() {
    let document = parse("```js\n1\n```\n");
    let mut driver = RecordingDriver {
        fail_writes: true,
        ..RecordingDriver::default()
    };
    let error = runner::run_document(&document, &Config::builtin(), &mut driver).unwrap_err();
    assert!(error.message.contains("main.mjs"));
    assert_eq!(error.context, "snippet at line 1");
}

#[test]
fn headings_are_logged_before_active_snippets() {
    let source = "\
# Skipped section

<!--markcheck skip-->
```js
no();
```

# Active section

```js
yes();
```
";
    let mut driver = RecordingDriver::default();
    let report = run(source, &mut driver);
    assert!(matches!(
        &report.events[0],
        LogEvent::Heading(heading) if heading.content == "Active section"
    ));
    assert_eq!(report.events.len(), 2);
}

#[test]
fn errors_do_not_stop_the_run() {
    let source = "\
<!--markcheck include=\"nope\"-->
```js
broken();
```

```js
fine();
```
";
    let mut driver = RecordingDriver::default();
    let report = run(source, &mut driver);
    assert_eq!(report.counts.syntax_errors, 1);
    assert_eq!(report.counts.successes, 1);
    assert!(report.counts.has_failures());
}

#[test]
fn only_empty_trailing_lines_are_ignored() {
    assert!(lines_equal(&strings(&["a"]), &strings(&["a", "", ""])));
    assert!(!lines_equal(&strings(&["a"]), &strings(&["a", "  "])));
    assert!(contains_run(&strings(&["x", "a", "y"]), &strings(&["a", ""])));
    assert!(!contains_run(&strings(&["x", "a", "y"]), &strings(&["a", " "])));
}
