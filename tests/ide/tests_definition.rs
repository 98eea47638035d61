//! Go-to-definition and go-to-type-definition across packages.

use gonav::Position;

use crate::helpers::workspace::{TestWorkspace, position_of, problems, text_at};

const BASE: &str = "package a

// B is embedded by other packages.
type B struct {
	F int
}

func NewB() B { return B{} }
";

const USER: &str = "package b

import \"example.com/m/a\"

type A struct {
	a.B
	name string
}

func use(x A) int {
	made := a.NewB()
	return x.F + x.B.F + made.F
}
";

const LINKED: &str = "/* Copyright 2024 The Authors.
 * Use of this source code is governed by a license.
 */

package c

import \"example.com/m/a\"

//go:linkname makeB example.com/m/a.NewB
func makeB() a.B { return a.B{} }
";

fn workspace() -> TestWorkspace {
    TestWorkspace::new(&[("a/a.go", BASE), ("b/b.go", USER), ("c/c.go", LINKED)])
}

// ===== IDENTIFIERS =====

#[test]
fn test_promoted_field_jumps_to_embedded_declaration() {
    let mut ws = workspace();
    let file = ws.file("b/b.go");
    let pos = ws.position("b/b.go", "F + x.B");
    let analysis = ws.analysis();

    let result = analysis.goto_definition(file, pos).expect("definition");
    assert_eq!(result.targets.len(), 1);
    let target = &result.targets[0];
    assert_eq!(target.file, ws.file("a/a.go"));
    assert_eq!(target.span.start, position_of(BASE, "F int"));
    assert_eq!(text_at(&analysis, target), "F");
}

#[test]
fn test_embedded_path_element_jumps_to_type() {
    let mut ws = workspace();
    let file = ws.file("b/b.go");
    let pos = ws.position("b/b.go", "B.F");
    let analysis = ws.analysis();

    let result = analysis.goto_definition(file, pos).expect("definition");
    assert_eq!(result.targets.len(), 1);
    assert_eq!(result.targets[0].file, ws.file("a/a.go"));
    assert_eq!(result.targets[0].span.start, position_of(BASE, "B struct"));
}

#[test]
fn test_qualified_function() {
    let mut ws = workspace();
    let file = ws.file("b/b.go");
    let pos = ws.position("b/b.go", "NewB()");
    let analysis = ws.analysis();

    let result = analysis.goto_definition(file, pos).expect("definition");
    assert_eq!(result.targets[0].span.start, position_of(BASE, "NewB() B"));
}

#[test]
fn test_resolution_is_idempotent() {
    let mut ws = workspace();
    let file = ws.file("b/b.go");
    let pos = ws.position("b/b.go", "F + made");
    let analysis = ws.analysis();

    let first = analysis.goto_definition(file, pos).expect("definition");
    let second = analysis.goto_definition(file, pos).expect("definition");
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_whitespace_has_no_definition() {
    let mut ws = workspace();
    let file = ws.file("b/b.go");
    let analysis = ws.analysis();
    let result = analysis.goto_definition(file, Position::new(1, 0)).expect("definition");
    assert!(result.is_empty());
}

// ===== TYPE DEFINITION =====

#[test]
fn test_type_definition_of_local_variable() {
    let mut ws = workspace();
    let file = ws.file("b/b.go");
    let pos = ws.position("b/b.go", "made :=");
    let analysis = ws.analysis();

    let targets = analysis.goto_type_definition(file, pos).expect("type definition");
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].file, ws.file("a/a.go"));
    assert_eq!(text_at(&analysis, &targets[0]), "B");
}

// ===== COMMENTS AND DIRECTIVES =====

#[test]
fn test_block_comment_header_checks_cleanly() {
    let mut ws = workspace();
    let file = ws.file("c/c.go");
    let analysis = ws.analysis();
    assert!(problems(&analysis, file).is_empty(), "{:?}", problems(&analysis, file));

    let pos = ws.position("c/c.go", "B { return");
    let result = analysis.goto_definition(file, pos).expect("definition");
    assert_eq!(result.targets[0].span.start, position_of(BASE, "B struct"));
}

#[test]
fn test_linkname_target_jumps_to_imported_function() {
    let mut ws = workspace();
    let file = ws.file("c/c.go");
    let pos = ws.position("c/c.go", "example.com/m/a.NewB");
    let analysis = ws.analysis();

    let result = analysis.goto_definition(file, pos).expect("definition");
    assert_eq!(result.targets.len(), 1);
    assert_eq!(result.targets[0].file, ws.file("a/a.go"));
    assert_eq!(result.targets[0].span.start, position_of(BASE, "NewB() B"));
}

#[test]
fn test_linkname_local_name_jumps_to_declaration() {
    let mut ws = workspace();
    let file = ws.file("c/c.go");
    let pos = ws.position("c/c.go", "makeB example.com");
    let analysis = ws.analysis();

    let result = analysis.goto_definition(file, pos).expect("definition");
    assert_eq!(result.targets.len(), 1);
    assert_eq!(result.targets[0].file, file);
    assert_eq!(result.targets[0].span.start, ws.position("c/c.go", "makeB() a.B"));
    assert_eq!(text_at(&analysis, &result.targets[0]), "makeB");
}
