//! Call hierarchy: preparing items, incoming and outgoing calls.

use gonav::ide::{CallKind, IncomingCall};

use crate::helpers::fixtures::CALLS;
use crate::helpers::workspace::{TestWorkspace, lines};

const RUNNER: &str = "package calls

type Runner struct{}

func (r Runner) Run() {
	r.step()
	defer r.step()
}

func (Runner) step() {}
";

fn workspace() -> TestWorkspace {
    TestWorkspace::new(&[("calls/calls.go", CALLS), ("calls/runner.go", RUNNER)])
}

fn callers(calls: &[IncomingCall]) -> Vec<(String, CallKind, usize)> {
    calls
        .iter()
        .map(|c| (c.from.name.to_string(), c.from.kind, c.from_ranges.len()))
        .collect()
}

// ===== PREPARE =====

#[test]
fn test_prepare_reports_declaration_and_package() {
    let mut ws = workspace();
    let file = ws.file("calls/calls.go");
    let pos = ws.position("calls/calls.go", "helper() int");
    let analysis = ws.analysis();

    let items = analysis.prepare_call_hierarchy(file, pos).expect("prepare");
    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.name, "helper");
    assert_eq!(item.kind, CallKind::Function);
    assert_eq!(item.detail, "example.com/m/calls");
    assert_eq!(item.selection.span.start, pos);
    assert!(item.range.range.contains_range(item.selection.range));
}

#[test]
fn test_prepare_on_a_method_call() {
    let mut ws = workspace();
    let file = ws.file("calls/runner.go");
    let pos = ws.position("calls/runner.go", "step()\n\tdefer");
    let analysis = ws.analysis();

    let items = analysis.prepare_call_hierarchy(file, pos).expect("prepare");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind, CallKind::Method);
    assert_eq!(items[0].selection.span.start, ws.position("calls/runner.go", "step() {}"));
}

// ===== INCOMING =====

#[test]
fn test_incoming_through_literal_names_the_enclosing_function() {
    let mut ws = workspace();
    let file = ws.file("calls/calls.go");
    let pos = ws.position("calls/calls.go", "leaf() int");
    let analysis = ws.analysis();

    let calls = analysis.incoming_calls(file, pos).expect("incoming");
    assert_eq!(
        callers(&calls),
        vec![
            ("helper".to_string(), CallKind::Function, 2),
            ("outer".to_string(), CallKind::Function, 1),
        ]
    );
}

#[test]
fn test_incoming_from_package_initializer() {
    let mut ws = workspace();
    let file = ws.file("calls/calls.go");
    let pos = ws.position("calls/calls.go", "helper() int");
    let analysis = ws.analysis();

    let calls = analysis.incoming_calls(file, pos).expect("incoming");
    assert_eq!(
        callers(&calls),
        vec![
            ("outer".to_string(), CallKind::Function, 1),
            ("init".to_string(), CallKind::Init, 1),
        ]
    );
    let init = &calls[1];
    assert_eq!(init.from.selection.span.start, ws.position("calls/calls.go", "initial"));
}

#[test]
fn test_incoming_method_calls_group_by_caller() {
    let mut ws = workspace();
    let file = ws.file("calls/runner.go");
    let pos = ws.position("calls/runner.go", "step() {}");
    let analysis = ws.analysis();

    let calls = analysis.incoming_calls(file, pos).expect("incoming");
    assert_eq!(callers(&calls), vec![("Run".to_string(), CallKind::Method, 2)]);
    assert_eq!(lines(&calls[0].from_ranges), vec![5, 6]);
}

#[test]
fn test_incoming_on_a_variable_is_empty() {
    let mut ws = workspace();
    let file = ws.file("calls/calls.go");
    let pos = ws.position("calls/calls.go", "run :=");
    let analysis = ws.analysis();
    assert!(analysis.incoming_calls(file, pos).expect("incoming").is_empty());
}

// ===== OUTGOING =====

#[test]
fn test_outgoing_folds_nested_literals() {
    let mut ws = workspace();
    let file = ws.file("calls/calls.go");
    let pos = ws.position("calls/calls.go", "outer()");
    let analysis = ws.analysis();

    let calls = analysis.outgoing_calls(file, pos).expect("outgoing");
    let names: Vec<&str> = calls.iter().map(|c| c.to.name.as_str()).collect();
    // `run()` calls a local variable and is not reported.
    assert_eq!(names, vec!["helper", "leaf"]);
    assert!(calls.iter().all(|c| c.from_ranges.len() == 1));
    assert!(calls.iter().all(|c| c.from_ranges[0].file == file));
}

#[test]
fn test_outgoing_groups_repeated_callees() {
    let mut ws = workspace();
    let file = ws.file("calls/calls.go");
    let pos = ws.position("calls/calls.go", "helper() int");
    let analysis = ws.analysis();

    let calls = analysis.outgoing_calls(file, pos).expect("outgoing");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].to.name, "leaf");
    assert_eq!(calls[0].from_ranges.len(), 2);
}

#[test]
fn test_outgoing_of_a_leaf_is_empty() {
    let mut ws = workspace();
    let file = ws.file("calls/calls.go");
    let pos = ws.position("calls/calls.go", "leaf() int");
    let analysis = ws.analysis();
    assert!(analysis.outgoing_calls(file, pos).expect("outgoing").is_empty());
}
