//! Types the checker assigns to package-level declarations.

use gonav::hir::types::relative_to;
use gonav::hir::{identical, type_string};
use rstest::rstest;

use crate::helpers::workspace::{CHECKED_PATH, check_source};

const SRC: &str = "package p

type List[T any] struct {
	next *List[T]
	val  T
}

var ints List[int]
var more List[int]
var words List[string]

var pairs = map[string][]int{}
var handler = func(a int, b ...string) (bool, error) { return false, nil }
var sink chan<- int
var shifted = 1 << 3
var ratio = 2.5
var head = &ints
var tail = ints.next
var first = ints.val
var size = len(words.val)
";

fn var_type(name: &str) -> String {
    let pkg = check_source(SRC);
    assert!(pkg.errors().is_empty(), "{:?}", pkg.errors());
    let ty = pkg
        .lookup(name)
        .and_then(|obj| obj.ty())
        .unwrap_or_else(|| panic!("no variable {name}"));
    type_string(&ty, &relative_to(CHECKED_PATH))
}

#[rstest]
#[case("ints", "List[int]")]
#[case("pairs", "map[string][]int")]
#[case("handler", "func(a int, b ...string) (bool, error)")]
#[case("sink", "chan<- int")]
#[case("shifted", "int")]
#[case("ratio", "float64")]
#[case("head", "*List[int]")]
#[case("tail", "*List[int]")]
#[case("first", "int")]
#[case("size", "int")]
fn test_variable_types(#[case] name: &str, #[case] expected: &str) {
    assert_eq!(var_type(name), expected);
}

#[test]
fn test_instantiations_are_identical_by_arguments() {
    let pkg = check_source(SRC);
    let ty = |name: &str| pkg.lookup(name).and_then(|o| o.ty()).expect(name);
    assert!(identical(&ty("ints"), &ty("more")));
    assert!(!identical(&ty("ints"), &ty("words")));
    assert!(identical(&ty("head"), &ty("tail")));
}

#[test]
fn test_qualifier_controls_package_prefix() {
    let pkg = check_source(SRC);
    let ty = pkg.lookup("head").and_then(|o| o.ty()).expect("head");
    assert_eq!(type_string(&ty, &relative_to("other.org/q")), "*p.List[int]");
    assert_eq!(ty.to_string(), "*p.List[int]");
}
