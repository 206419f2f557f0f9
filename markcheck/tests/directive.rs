use markcheck::directive::{BodyLabel, Directive, parse_directive};

fn parse(text: &str) -> Directive {
    parse_directive(7, text)
        .expect("parse failed")
        .expect("not a directive")
}

fn parse_err(text: &str) -> String {
    parse_directive(7, text)
        .expect_err("expected an error")
        .message
}

#[test]
fn ordinary_comments_are_ignored() {
    assert_eq!(parse_directive(1, " just a note ").unwrap(), None);
    assert_eq!(parse_directive(1, "markchecks id=\"x\"").unwrap(), None);
    assert_eq!(parse_directive(1, "").unwrap(), None);
}

#[test]
fn valued_and_valueless_attributes() {
    let d = parse("markcheck id=\"first\" skip lang=\"js\"");
    assert_eq!(d.line_number, 7);
    assert_eq!(d.string("id").unwrap(), Some("first"));
    assert_eq!(d.string("lang").unwrap(), Some("js"));
    assert!(d.flag("skip").unwrap());
    assert!(!d.flag("only").unwrap());
    assert_eq!(d.body_label, None);
    assert!(d.body.is_empty());
}

#[test]
fn flag_and_string_kinds_are_checked() {
    let d = parse("markcheck id skip=\"yes\"");
    assert!(d.string("id").is_err());
    assert!(d.flag("skip").is_err());
}

#[test]
fn quoted_values_keep_unknown_escapes() {
    let d = parse(r#"markcheck searchAndReplace="/\d+/N/" stdout="say \"hi\" \\ ok""#);
    assert_eq!(d.string("searchAndReplace").unwrap(), Some(r"/\d+/N/"));
    assert_eq!(d.string("stdout").unwrap(), Some(r#"say "hi" \ ok"#));
}

#[test]
fn body_follows_the_label() {
    let d = parse("markcheck id=\"data\" body:\nline one\n  line two\n");
    assert_eq!(d.body_label, Some(BodyLabel::Body));
    assert_eq!(d.body, vec!["line one", "  line two"]);
}

#[test]
fn indented_closing_marker_is_not_a_body_line() {
    let d = parse("markcheck before:\nimport x;\n  ");
    assert_eq!(d.body_label, Some(BodyLabel::Before));
    assert_eq!(d.body, vec!["import x;"]);
}

#[test]
fn body_groups_split_at_separator() {
    let d = parse("markcheck around:\nbefore\n•••\nafter\n");
    assert_eq!(
        d.body_groups(),
        vec![vec!["before".to_string()], vec!["after".to_string()]]
    );
}

#[test]
fn header_errors() {
    assert!(parse_err("markcheck id=\"x").contains("Unterminated"));
    assert!(parse_err("markcheck id=x").contains("double-quoted"));
    assert!(parse_err("markcheck id=\"a\" id=\"b\"").contains("Duplicate attribute `id`"));
    assert!(parse_err("markcheck bodyx:\nline\n").contains("Unknown body label"));
    assert!(parse_err("markcheck body: id=\"x\"\nline\n").contains("last item"));
    assert!(parse_err("markcheck id=\"x\"\nstray text\n").contains("body label"));
}

#[test]
fn errors_point_at_the_directive_line() {
    let error = parse_directive(12, "markcheck skip skip").unwrap_err();
    assert_eq!(error.line_number(), Some(12));
    assert!(!error.notes.is_empty());
}

#[test]
fn check_attributes_names_every_offender() {
    let d = parse("markcheck each=\"js\" id=\"x\" skip");
    let error = d.check_attributes("language line mods", &["each"]).unwrap_err();
    assert!(error.message.contains("`id`"));
    assert!(error.message.contains("`skip`"));
    assert_eq!(error.line_number(), Some(7));
}
