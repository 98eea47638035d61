//! Type hierarchy over the shapes fixture and an importing package.

use gonav::ide::{TypeHierarchyItem, TypeKind};

use crate::helpers::fixtures::SHAPES;
use crate::helpers::workspace::TestWorkspace;

const MORE: &str = "package more

import \"example.com/m/shapes\"

type Oval struct{ shapes.Circle }

type Resizer interface {
	Scale(f float64)
}
";

fn workspace() -> TestWorkspace {
    TestWorkspace::new(&[("shapes/shapes.go", SHAPES), ("more/more.go", MORE)])
}

fn sorted_names(items: &[TypeHierarchyItem]) -> Vec<String> {
    let mut names: Vec<String> = items.iter().map(|i| i.name.to_string()).collect();
    names.sort();
    names
}

fn prepare(ws: &mut TestWorkspace, rel: &str, needle: &str) -> TypeHierarchyItem {
    let file = ws.file(rel);
    let pos = ws.position(rel, needle);
    let mut items = ws.analysis().prepare_type_hierarchy(file, pos).expect("prepare");
    assert_eq!(items.len(), 1, "{needle}");
    items.remove(0)
}

#[test]
fn test_prepare_classifies_kinds() {
    let mut ws = workspace();
    assert_eq!(prepare(&mut ws, "shapes/shapes.go", "Shape interface").kind, TypeKind::Interface);
    assert_eq!(prepare(&mut ws, "shapes/shapes.go", "Square struct").kind, TypeKind::Struct);
    let celsius = prepare(&mut ws, "shapes/shapes.go", "Celsius float64");
    assert_eq!(celsius.kind, TypeKind::Other);
    assert_eq!(celsius.detail, "example.com/m/shapes");
}

#[test]
fn test_supertypes_span_packages() {
    let mut ws = workspace();
    let circle = prepare(&mut ws, "shapes/shapes.go", "Circle struct");
    let analysis = ws.analysis();
    assert_eq!(
        sorted_names(&analysis.supertypes(&circle).expect("supertypes")),
        vec!["Named", "NamedShape", "Resizer", "Scaler", "Shape"]
    );
}

#[test]
fn test_subtypes_include_interfaces_and_embedders() {
    let mut ws = workspace();
    let named = prepare(&mut ws, "shapes/shapes.go", "Named interface");
    let analysis = ws.analysis();
    assert_eq!(
        sorted_names(&analysis.subtypes(&named).expect("subtypes")),
        vec!["Box", "Celsius", "Circle", "Labeled", "NamedShape", "Oval"]
    );
}

#[test]
fn test_hierarchy_is_navigable_in_both_directions() {
    let mut ws = workspace();
    let scaler = prepare(&mut ws, "shapes/shapes.go", "Scaler interface");
    let analysis = ws.analysis();
    let subs = analysis.subtypes(&scaler).expect("subtypes");
    let oval = subs.iter().find(|i| i.name == "Oval").expect("Oval embeds *Circle's methods");
    let supers = analysis.supertypes(oval).expect("supertypes");
    assert!(supers.iter().any(|i| i.name == "Scaler"));
}

#[test]
fn test_prepare_on_a_function_is_empty() {
    let src = "package p\n\nfunc run() {}\n";
    let mut ws = TestWorkspace::single(src);
    let file = ws.file("p/p.go");
    let pos = ws.position("p/p.go", "run");
    assert!(ws.analysis().prepare_type_hierarchy(file, pos).expect("prepare").is_empty());
}
