//! Tests for the command layer over the JSON table fixtures.
//!
//! Commands that print are thin wrappers; these tests drive the functions underneath them.

use miette::SourceSpan;
use retrace::ParseError;
use retrace::cli::ExitCode;
use retrace::cli::commands::{self, InputSource, ParseRequest, load_table, parse_source, summarize};
use retrace_core::InMemoryTable;
use retrace_engine::{Engine, ParseOptions};

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn table(name: &str) -> InMemoryTable {
    load_table(&fixture(name)).unwrap()
}

// =============================================================================
// Table files
// =============================================================================

#[test]
fn summarizes_statement_table() {
    let table = table("statements.json");
    assert_eq!(
        summarize(&table),
        "  terminals:        5\n\
         \x20 nonterminals:     3\n\
         \x20 rules:            5\n\
         \x20 states:           6\n\
         \x20 lookahead states: 0\n\
         \x20 conflict entries: 0\n"
    );
}

#[test]
fn summary_counts_conflicts_and_lookahead() {
    let ambiguous = summarize(&table("ambiguous.json"));
    assert!(ambiguous.contains("conflict entries: 1\n"));
    assert!(ambiguous.contains("lookahead states: 0\n"));

    let lookahead = summarize(&table("lookahead.json"));
    assert!(lookahead.contains("lookahead states: 2\n"));
    assert!(lookahead.contains("states:           9\n"));
}

#[test]
fn rejects_table_with_dangling_state() {
    let err = load_table(&fixture("unknown_state.json")).unwrap_err();
    assert_eq!(err.exit_code, ExitCode::FAILURE);
    assert!(err.message.contains("unknown state 7"), "{}", err.message);
}

#[test]
fn reports_missing_table_file() {
    let err = load_table(&fixture("missing.json")).unwrap_err();
    assert!(err.message.starts_with("Cannot access file"), "{}", err.message);
}

#[test]
fn check_accepts_fixture_tables() {
    for name in ["statements.json", "ambiguous.json", "lookahead.json"] {
        assert_eq!(commands::check_table(&fixture(name)).unwrap(), ExitCode::SUCCESS);
    }
}

// =============================================================================
// Parsing
// =============================================================================

#[test]
fn prints_derivation_of_statement_list() {
    let table = table("statements.json");
    let engine = Engine::new(&table).unwrap();
    let summary = parse_source(&engine, "a ; a ;", "input").unwrap();

    assert!(summary.repairs.is_empty());
    insta::assert_snapshot!(summary.derivation, @r"
    St ::= a ;    a ;
    Ss ::= St     a ;
    St ::= a ;    a ;
    Ss ::= Ss St  a ; a ;
    P ::= Ss      a ; a ;
    ");
}

#[test]
fn repaired_input_reports_skipped_tokens() {
    let table = table("statements.json");
    let engine = Engine::new(&table)
        .unwrap()
        .with_options(ParseOptions::new().with_repairs(1));
    let summary = parse_source(&engine, "a ; b a ;", "input").unwrap();

    insta::assert_snapshot!(summary.derivation, @r"
    St ::= a ;        a ;
    Ss ::= St         a ;
    St ::= error a ;  b a ;
    Ss ::= Ss St      a ; b a ;
    P ::= Ss          a ; b a ;
    ");
    assert_eq!(summary.repairs.len(), 1);
    let repair = &summary.repairs[0];
    assert_eq!(repair.to_string(), "recovered from unexpected `b` by skipping 1 token");
    assert_eq!(repair.help.as_deref(), Some("parsing resumed at `a`"));
    assert_eq!(repair.span, SourceSpan::from(4..5));
    assert_eq!(summary.stats.repairs, 1);
}

#[test]
fn wide_acceptance_distance_merges_repairs() {
    let table = table("statements.json");
    let options = ParseOptions::new().with_repairs(1).with_acceptance_distance(4);
    let engine = Engine::new(&table).unwrap().with_options(options);
    let summary = parse_source(&engine, "a ; b a ; b a ;", "input").unwrap();

    assert_eq!(summary.repairs.len(), 1);
    assert_eq!(summary.repairs[0].skipped, 4);
    assert_eq!(summary.repairs[0].span, SourceSpan::from(4..11));
}

#[test]
fn unrepaired_error_lists_expected_terminals() {
    let table = table("statements.json");
    let engine = Engine::new(&table).unwrap();
    let failure = parse_source(&engine, "a ; b", "input").unwrap_err();

    let diagnostic = match failure.error {
        ParseError::Syntax(diagnostic) => diagnostic,
        other => panic!("expected a syntax error, got {other:?}"),
    };
    assert_eq!(diagnostic.to_string(), "unexpected `b`");
    assert_eq!(diagnostic.expected, vec!["$eof", "a"]);
    assert_eq!(diagnostic.help.as_deref(), Some("expected one of `$eof`, `a`"));
    assert_eq!(diagnostic.span, SourceSpan::from(4..5));
    assert!(failure.stats.is_some());
}

#[test]
fn truncated_input_fails_at_end_of_input() {
    let table = table("statements.json");
    let engine = Engine::new(&table).unwrap();
    let failure = parse_source(&engine, "a ; a", "input").unwrap_err();

    let diagnostic = match failure.error {
        ParseError::Syntax(diagnostic) => diagnostic,
        other => panic!("expected a syntax error, got {other:?}"),
    };
    assert_eq!(diagnostic.found, "end of input");
    assert_eq!(diagnostic.expected, vec![";"]);
}

#[test]
fn unknown_word_never_reaches_engine() {
    let table = table("statements.json");
    let engine = Engine::new(&table).unwrap();
    let failure = parse_source(&engine, "a ; z", "input").unwrap_err();

    assert!(matches!(failure.error, ParseError::UnknownTerminal(ref e) if e.name == "z"));
    assert!(failure.stats.is_none());
}

#[test]
fn ambiguous_table_backtracks_to_second_reduction() {
    let table = table("ambiguous.json");
    let engine = Engine::new(&table).unwrap();
    let summary = parse_source(&engine, "a c y", "input").unwrap();

    insta::assert_snapshot!(summary.derivation, @r"
    B ::= a      a
    S ::= B c y  a c y
    ");
    assert_eq!(summary.stats.backtracks, 1);
}

#[test]
fn lookahead_table_decides_without_backtracking() {
    let table = table("lookahead.json");
    let engine = Engine::new(&table).unwrap();
    let summary = parse_source(&engine, "a c c x", "input").unwrap();

    insta::assert_snapshot!(summary.derivation, @r"
    A ::= a        a
    S ::= A c c x  a c c x
    ");
    assert_eq!(summary.stats.max_lookahead, 2);
    assert_eq!(summary.stats.backtracks, 0);
}

#[test]
fn parse_input_exits_with_syntax_error_code() {
    let request = ParseRequest {
        table: fixture("statements.json"),
        source: InputSource::Inline("a ; b a ;".to_string()),
        repairs: 0,
        distance: None,
        stats: false,
    };
    let err = commands::parse_input(&request).unwrap_err();
    assert_eq!(err.exit_code, ExitCode::SYNTAX_ERROR);
    assert!(err.message.contains("unexpected"), "{}", err.message);

    let repaired = ParseRequest {
        repairs: -1,
        ..request
    };
    assert_eq!(commands::parse_input(&repaired).unwrap(), ExitCode::SUCCESS);
}
