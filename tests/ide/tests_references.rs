//! Find references across importing packages and test variants.

use std::path::PathBuf;

use gonav::Position;

use crate::helpers::workspace::{TestWorkspace, texts};

const A: &str = "package a

type Point struct{ X int }

func (p Point) Norm() int { return p.X }

func shift(p Point) Point { return Point{X: p.X + 1} }
";

const A_TEST: &str = "package a

func helper() int { return Point{X: 1}.Norm() }
";

const B: &str = "package b

import \"example.com/m/a\"

func Origin() a.Point { return a.Point{X: 0} }
";

const C: &str = "package c

import (
	\"example.com/m/a\"
	\"example.com/m/b\"
)

func Use() int {
	var p a.Point = b.Origin()
	return p.X + p.Norm()
}
";

fn workspace() -> TestWorkspace {
    TestWorkspace::new(&[("a/a.go", A), ("a/a_test.go", A_TEST), ("b/b.go", B), ("c/c.go", C)])
}

fn paths(locs: &[gonav::ide::Location]) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = locs.iter().map(|l| l.path.clone()).collect();
    out.dedup();
    out
}

#[test]
fn test_exported_type_is_found_in_every_importer() {
    let mut ws = workspace();
    let file = ws.file("a/a.go");
    let pos = ws.position("a/a.go", "Point struct");
    let analysis = ws.analysis();

    let refs = analysis.references(file, pos, true).expect("references");
    assert_eq!(
        paths(&refs),
        vec![
            PathBuf::from("/ws/a/a.go"),
            PathBuf::from("/ws/a/a_test.go"),
            PathBuf::from("/ws/b/b.go"),
            PathBuf::from("/ws/c/c.go"),
        ]
    );
    assert!(texts(&analysis, &refs).iter().all(|t| t == "Point"));
    // Declaration, four uses in a.go, one in the test, two in b, one in c.
    assert_eq!(refs.len(), 9);
}

#[test]
fn test_declaration_is_optional() {
    let mut ws = workspace();
    let file = ws.file("a/a.go");
    let pos = ws.position("a/a.go", "Point struct");
    let analysis = ws.analysis();

    let with = analysis.references(file, pos, true).expect("references");
    let without = analysis.references(file, pos, false).expect("references");
    assert_eq!(with.len(), without.len() + 1);
    assert!(!without.iter().any(|l| l.span.start == pos));
}

#[test]
fn test_query_from_a_use_matches_query_from_declaration() {
    let mut ws = workspace();
    let decl = ws.position("a/a.go", "Norm()");
    let use_site = ws.position("c/c.go", "Norm()");
    let (a, c) = (ws.file("a/a.go"), ws.file("c/c.go"));
    let analysis = ws.analysis();

    let from_decl = analysis.references(a, decl, true).expect("references");
    let from_use = analysis.references(c, use_site, true).expect("references");
    assert_eq!(from_decl, from_use);
    assert_eq!(from_decl.len(), 3);
}

#[test]
fn test_field_references_include_composite_keys() {
    let mut ws = workspace();
    let file = ws.file("a/a.go");
    let pos = ws.position("a/a.go", "X int");
    let analysis = ws.analysis();

    let refs = analysis.references(file, pos, false).expect("references");
    let files = paths(&refs);
    assert!(files.contains(&PathBuf::from("/ws/b/b.go")));
    assert!(files.contains(&PathBuf::from("/ws/c/c.go")));
    assert!(texts(&analysis, &refs).iter().all(|t| t == "X"));
}

#[test]
fn test_local_variable_stays_in_function() {
    let mut ws = workspace();
    let file = ws.file("c/c.go");
    let pos = ws.position("c/c.go", "p a.Point");
    let analysis = ws.analysis();

    let refs = analysis.references(file, pos, true).expect("references");
    assert_eq!(refs.len(), 3);
    assert!(refs.iter().all(|l| l.file == file));
}

#[test]
fn test_blank_line_has_no_references() {
    let mut ws = workspace();
    let file = ws.file("c/c.go");
    let analysis = ws.analysis();
    let refs = analysis.references(file, Position::new(1, 0), true).expect("references");
    assert!(refs.is_empty());
}
