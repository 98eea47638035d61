//! Field and method lookup, method sets and interface satisfaction on
//! checked packages.

use gonav::hir::types::{interface_of, pointer};
use gonav::hir::{
    Package, Ty, concrete_implements, implements, lookup_field_or_method, method_set, missing_method,
};
use rstest::rstest;

use crate::helpers::fixtures::SHAPES;
use crate::helpers::workspace::{CHECKED_PATH, check_source};

fn type_of(pkg: &Package, name: &str) -> Ty {
    pkg.lookup(name)
        .and_then(|obj| obj.ty())
        .unwrap_or_else(|| panic!("no type {name}"))
}

fn method_names(ty: &Ty) -> Vec<String> {
    method_set(ty).iter().map(|m| m.obj.name().to_string()).collect()
}

// ===== METHOD SETS =====

#[test]
fn test_fixture_checks_cleanly() {
    let pkg = check_source(SHAPES);
    assert!(pkg.errors().is_empty(), "{:?}", pkg.errors());
}

#[test]
fn test_value_method_set_excludes_pointer_methods() {
    let pkg = check_source(SHAPES);
    let circle = type_of(&pkg, "Circle");
    assert!(method_names(&circle).is_empty());
    assert_eq!(method_names(&pointer(circle)), vec!["Area", "Name", "Perimeter", "Scale"]);
}

#[test]
fn test_embedding_promotes_methods() {
    let pkg = check_source(SHAPES);
    let labeled = type_of(&pkg, "Labeled");
    assert_eq!(method_names(&labeled), vec!["Area", "Name", "Perimeter"]);
}

#[test]
fn test_interface_method_set_includes_embedded() {
    let pkg = check_source(SHAPES);
    let named_shape = type_of(&pkg, "NamedShape");
    assert_eq!(method_names(&named_shape), vec!["Area", "Name", "Perimeter"]);
}

// ===== FIELD LOOKUP =====

#[test]
fn test_promoted_field_lookup() {
    let pkg = check_source(SHAPES);
    let labeled = type_of(&pkg, "Labeled");

    let side = lookup_field_or_method(&labeled, Some(CHECKED_PATH), "side").expect("side");
    assert!(side.is_promoted());
    assert!(!side.is_method());
    assert_eq!(side.index, vec![0, 0]);

    let label = lookup_field_or_method(&labeled, Some(CHECKED_PATH), "label").expect("label");
    assert!(!label.is_promoted());

    let area = lookup_field_or_method(&labeled, Some(CHECKED_PATH), "Area").expect("Area");
    assert!(area.is_method() && area.is_promoted());
}

#[test]
fn test_unexported_lookup_needs_the_package() {
    let pkg = check_source(SHAPES);
    let square = type_of(&pkg, "Square");
    assert!(lookup_field_or_method(&square, Some("other.org/q"), "side").is_none());
    assert!(lookup_field_or_method(&square, Some(CHECKED_PATH), "side").is_some());
    assert!(lookup_field_or_method(&square, Some(CHECKED_PATH), "_").is_none());
}

#[test]
fn test_generic_receiver_methods_are_found() {
    let pkg = check_source(SHAPES);
    let boxed = type_of(&pkg, "Box");
    let found = lookup_field_or_method(&pointer(boxed), Some(CHECKED_PATH), "Scale").expect("Scale");
    assert!(found.is_method());
}

// ===== SATISFACTION =====

#[rstest]
#[case("Square", "Shape", true)]
#[case("Circle", "Shape", false)]
#[case("Labeled", "NamedShape", true)]
#[case("Celsius", "Named", true)]
#[case("Square", "Named", false)]
#[case("Empty", "Scaler", false)]
fn test_value_implements(#[case] concrete: &str, #[case] iface: &str, #[case] expected: bool) {
    let pkg = check_source(SHAPES);
    assert_eq!(implements(&type_of(&pkg, concrete), &type_of(&pkg, iface)), expected);
}

#[rstest]
#[case("Circle", "Shape")]
#[case("Circle", "NamedShape")]
#[case("Circle", "Scaler")]
#[case("Square", "Shape")]
fn test_pointer_or_value_implements(#[case] concrete: &str, #[case] iface: &str) {
    let pkg = check_source(SHAPES);
    assert!(concrete_implements(&type_of(&pkg, concrete), &type_of(&pkg, iface)));
}

#[test]
fn test_interface_implements_its_embedded_parts() {
    let pkg = check_source(SHAPES);
    let named_shape = type_of(&pkg, "NamedShape");
    assert!(implements(&named_shape, &type_of(&pkg, "Shape")));
    assert!(implements(&named_shape, &type_of(&pkg, "Named")));
    assert!(!implements(&type_of(&pkg, "Shape"), &named_shape));
}

#[test]
fn test_missing_method_reports_the_first_gap() {
    let pkg = check_source(SHAPES);
    let scaler = interface_of(&type_of(&pkg, "Scaler")).expect("interface");
    let missing = missing_method(&type_of(&pkg, "Square"), &scaler).expect("Square lacks Scale");
    assert_eq!(missing.method.name(), "Scale");
    assert!(!missing.wrong_type);
}

#[test]
fn test_wrong_signature_is_flagged() {
    let pkg = check_source(
        "package p
type Sizer interface{ Size() int }
type File struct{}
func (File) Size() int64 { return 0 }
",
    );
    let sizer = interface_of(&type_of(&pkg, "Sizer")).expect("interface");
    let missing = missing_method(&type_of(&pkg, "File"), &sizer).expect("signature differs");
    assert!(missing.wrong_type);
}
