//! Whole-plan tests against the fixture plans in `tests/fixtures/valid/`.
//!
//! Every fixture must parse without a single diagnostic, both with the
//! default options and with every declaration check turned on.

use plexil_core::ast::BlockVariant;
use plexil_core::{
    parse, parse_with_options, parse_with_session, BindingKind, Node, NodeKind, ParseOptions,
    Session,
};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/valid")
}

fn read_fixture(name: &str) -> String {
    let path = fixtures_dir().join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e))
}

fn fixture_names() -> Vec<String> {
    let dir = fixtures_dir();
    let mut names: Vec<String> = std::fs::read_dir(&dir)
        .unwrap_or_else(|e| panic!("failed to list {}: {}", dir.display(), e))
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".ple"))
        .collect();
    names.sort();
    names
}

#[test]
fn fixture_directory_is_not_empty() {
    assert_eq!(
        fixture_names(),
        vec!["concurrent_monitor.ple", "drive_to_target.ple"]
    );
}

#[test]
fn every_fixture_parses_without_diagnostics() {
    for name in fixture_names() {
        let out = parse(&read_fixture(&name));
        assert!(out.diagnostics.is_empty(), "{}: {:?}", name, out.diagnostics);
        assert!(!out.aborted, "{} aborted", name);
        assert!(!out.plan.contains_error(), "{} has error nodes", name);
    }
}

#[test]
fn every_fixture_passes_strict_checks() {
    for name in fixture_names() {
        let out = parse_with_options(&read_fixture(&name), ParseOptions::strict());
        assert!(out.diagnostics.is_empty(), "{}: {:?}", name, out.diagnostics);
    }
}

#[test]
fn declared_command_invoked_from_an_implicit_block() {
    let out = parse("Command Foo(Integer); Integer x = 3; Foo(x);");
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    assert_eq!(
        out.plan.to_sexpr(),
        "(Plan \
         (GlobalDeclarations (CommandDeclaration Name:Foo (Parameters (Parameter TypeName(Integer))))) \
         (Action (Block(Plain) \
         (VariableDeclarations (VariableDeclaration TypeName(Integer) Name:x IntegerLiteral:3)) \
         (Action (CommandInvocation Name:Foo (ArgumentList Variable:x))))))"
    );
}

#[test]
fn declarator_shape_follows_the_tokens_after_the_name() {
    let cases = [
        (
            "Integer x[10];",
            "(VariableDeclarations (ArrayVariableDeclaration TypeName(Integer) Name:x IntegerLiteral:10))",
        ),
        (
            "Integer x;",
            "(VariableDeclarations (VariableDeclaration TypeName(Integer) Name:x))",
        ),
        (
            "Integer x = 5;",
            "(VariableDeclarations (VariableDeclaration TypeName(Integer) Name:x IntegerLiteral:5))",
        ),
    ];
    for (src, expected) in cases {
        let out = parse(src);
        assert!(out.diagnostics.is_empty(), "{}: {:?}", src, out.diagnostics);
        let block = out
            .plan
            .child(0)
            .and_then(|action| action.child(0))
            .expect("implicit block");
        assert_eq!(block.kind(), NodeKind::Block(BlockVariant::Plain));
        assert_eq!(block.children().len(), 1, "{}", src);
        assert_eq!(block.children()[0].to_sexpr(), expected, "{}", src);
    }
}

#[test]
fn drive_to_target_structure() {
    let out = parse(&read_fixture("drive_to_target.ple"));
    let declarations = out.plan.child(0).expect("global declarations");
    assert_eq!(declarations.kind(), NodeKind::GlobalDeclarations);
    let kinds: Vec<NodeKind> = declarations.children().iter().map(Node::kind).collect();
    assert_eq!(
        kinds,
        vec![
            NodeKind::CommandDeclaration,
            NodeKind::CommandDeclaration,
            NodeKind::CommandDeclaration,
            NodeKind::LookupDeclaration,
            NodeKind::LookupDeclaration,
            NodeKind::LibraryActionDeclaration,
        ]
    );

    let root = out.plan.child(1).expect("root action");
    assert_eq!(root.kind(), NodeKind::Action);
    assert_eq!(root.child(0).and_then(Node::text), Some("DriveToTarget"));
    assert_eq!(
        root.child(1).map(Node::kind),
        Some(NodeKind::Block(BlockVariant::Sequence))
    );

    let node_ids: Vec<&str> = out
        .scopes
        .bindings()
        .iter()
        .filter(|b| b.kind == BindingKind::NodeId)
        .map(|b| b.name.as_str())
        .collect();
    assert_eq!(
        node_ids,
        vec!["DriveToTarget", "Setup", "Calibration", "Move", "Picture"]
    );
}

#[test]
fn concurrent_monitor_bindings() {
    let out = parse(&read_fixture("concurrent_monitor.ple"));
    let kinds_of = |name: &str| -> Vec<BindingKind> {
        out.scopes
            .bindings()
            .iter()
            .filter(|b| b.name == name)
            .map(|b| b.kind)
            .collect()
    };
    assert_eq!(
        kinds_of("count"),
        vec![
            BindingKind::Variable,
            BindingKind::InOutInterface,
            BindingKind::InInterface,
        ]
    );
    assert_eq!(kinds_of("level"), vec![BindingKind::Variable]);
    assert_eq!(kinds_of("history"), vec![BindingKind::ArrayVariable]);
    assert_eq!(kinds_of("Alarm"), vec![BindingKind::Lookup]);

    let walked: Vec<NodeKind> = out.plan.walk().map(Node::kind).collect();
    for kind in [
        NodeKind::OnCommand,
        NodeKind::OnMessage,
        NodeKind::SynchronousCommand,
        NodeKind::NodeTimepointValue,
        NodeKind::DurationLiteral,
        NodeKind::ArrayLiteral,
    ] {
        assert!(walked.contains(&kind), "no {:?} in plan", kind);
    }
}

#[test]
fn parsing_is_deterministic() {
    let sources = [
        read_fixture("concurrent_monitor.ple"),
        "{ x = 1 y = ; Wait 1 }".to_owned(),
    ];
    for src in &sources {
        let first = parse_with_options(src, ParseOptions::strict());
        let second = parse_with_options(src, ParseOptions::strict());
        assert_eq!(first.to_json_value(), second.to_json_value());
    }
}

#[test]
fn paraphrase_stack_is_balanced_after_every_parse() {
    let sources = [
        read_fixture("drive_to_target.ple"),
        "{ if x Wait 1; ".to_owned(),
        "Command ; Foo(".to_owned(),
    ];
    for src in &sources {
        let mut session = Session::new(ParseOptions::default());
        let _ = parse_with_session(src, &mut session);
        assert!(
            session.paraphrases().is_balanced(),
            "{:?}: {:?}",
            src,
            session.paraphrases()
        );
        assert!(session.paraphrases().pushes() > 0);
    }
}

#[test]
fn json_view_of_a_fixture() {
    let out = parse(&read_fixture("drive_to_target.ple"));
    let v = out.to_json_value();
    assert_eq!(v["plan"]["kind"], "Plan");
    assert_eq!(v["plan"]["children"][1]["kind"], "Action");
    assert_eq!(v["diagnostics"], serde_json::json!([]));
    assert_eq!(v["aborted"], false);
}
