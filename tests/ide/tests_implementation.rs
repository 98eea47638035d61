//! Implementation queries: local search in the declaring package, the
//! method-set index across packages, and the built-in `error` interface.

use gonav::hir::types::{is_interface, pointer};
use gonav::hir::{ObjKind, concrete_implements, implements, universe};
use gonav::ide::methodsets::{MethodSetIndex, Relation, key_of};
use gonav::ide::{AnalysisHost, IdeOptions, ImplementationOptions};

use crate::helpers::fixtures::{ERRORS, SHAPES};
use crate::helpers::workspace::{TestWorkspace, check_source, lines, position_of, texts};

const CONSUMER: &str = "package use

import \"example.com/m/shapes\"

type Hexagon struct{}

func (Hexagon) Area() float64      { return 0 }
func (Hexagon) Perimeter() float64 { return 0 }

type Sized interface {
	Area() float64
}

var _ shapes.Shape = Hexagon{}
";

fn workspace() -> TestWorkspace {
    TestWorkspace::new(&[("shapes/shapes.go", SHAPES), ("use/use.go", CONSUMER)])
}

// ===== ACROSS PACKAGES =====

#[test]
fn test_interface_finds_implementations_in_other_packages() {
    let mut ws = workspace();
    let file = ws.file("shapes/shapes.go");
    let pos = ws.position("shapes/shapes.go", "Shape interface");
    let analysis = ws.analysis();

    let locs = analysis.implementation(file, pos).expect("implementations");
    let names = texts(&analysis, &locs);
    for expected in ["Square", "Circle", "Labeled", "Hexagon"] {
        assert!(names.contains(&expected.to_string()), "{expected} missing from {names:?}");
    }
    assert!(!names.contains(&"Celsius".to_string()));
    assert!(!names.contains(&"Sized".to_string()));
}

#[test]
fn test_concrete_type_finds_interfaces_everywhere() {
    let mut ws = workspace();
    let file = ws.file("use/use.go");
    let pos = ws.position("use/use.go", "Hexagon struct");
    let analysis = ws.analysis();

    let mut names = texts(&analysis, &analysis.implementation(file, pos).expect("implementations"));
    names.sort();
    assert_eq!(names, vec!["Shape", "Sized"]);
}

#[test]
fn test_method_query_lists_concrete_methods() {
    let mut ws = workspace();
    let file = ws.file("use/use.go");
    let pos = ws.position("use/use.go", "Area() float64\n}");
    let analysis = ws.analysis();

    let locs = analysis.implementation(file, pos).expect("implementations");
    let names = texts(&analysis, &locs);
    assert!(names.iter().all(|n| n == "Area"));
    // Hexagon, Square, Circle, and Labeled through its embedded Square.
    assert!(locs.iter().any(|l| l.file == ws.file("use/use.go")));
    assert!(locs.iter().any(|l| l.file == ws.file("shapes/shapes.go")));
}

#[test]
fn test_results_are_sorted_and_unique() {
    let mut ws = workspace();
    let file = ws.file("shapes/shapes.go");
    let pos = ws.position("shapes/shapes.go", "Named interface");
    let analysis = ws.analysis();

    let locs = analysis.implementation(file, pos).expect("implementations");
    let mut sorted = locs.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(locs, sorted);
}

#[test]
fn test_interface_pairs_need_the_option() {
    let mut ws = workspace();
    let file = ws.file("shapes/shapes.go");
    let pos = ws.position("shapes/shapes.go", "Named interface");

    let analysis = ws.analysis();
    let without = texts(&analysis, &analysis.implementation(file, pos).expect("implementations"));
    assert!(!without.contains(&"NamedShape".to_string()));

    ws.host.set_options(IdeOptions {
        implementation: ImplementationOptions {
            include_interface_pairs: true,
            ..Default::default()
        },
        ..Default::default()
    });
    let analysis = ws.analysis();
    let with = texts(&analysis, &analysis.implementation(file, pos).expect("implementations"));
    assert!(with.contains(&"NamedShape".to_string()));
}

#[test]
fn test_type_declared_in_function_body_is_found_locally() {
    let src = "package p

type I interface{ M() }

type T struct{}

func (T) M() {}

func build() I {
	type L struct{ T }
	return L{}
}
";
    let mut ws = TestWorkspace::single(src);
    let file = ws.file("p/p.go");
    let pos = ws.position("p/p.go", "I interface");
    let analysis = ws.analysis();

    let locs = analysis.implementation(file, pos).expect("implementations");
    assert_eq!(texts(&analysis, &locs), vec!["T", "L"]);
    assert_eq!(locs[1].span.start, position_of(src, "L struct"));
}

#[test]
fn test_empty_struct_has_no_implementations() {
    let mut ws = workspace();
    let file = ws.file("shapes/shapes.go");
    let pos = ws.position("shapes/shapes.go", "Empty struct");
    let analysis = ws.analysis();
    assert!(analysis.implementation(file, pos).expect("implementations").is_empty());
}

// ===== FINGERPRINTS =====

/// Every structurally satisfied (concrete, interface) pair in the corpus
/// survives the method-set pre-filter.
#[test]
fn test_fingerprint_has_no_false_negatives() {
    let pkg = check_source(SHAPES);
    let index = MethodSetIndex::build(&pkg);
    let types: Vec<_> = pkg
        .members()
        .filter(|o| o.kind() == ObjKind::TypeName)
        .filter_map(|o| Some((o.name().to_string(), o.ty()?)))
        .collect();

    let mut checked = 0;
    for (cname, concrete) in &types {
        let Some(ckey) = key_of(&pointer(concrete.clone())) else {
            continue;
        };
        let hits: Vec<String> = index
            .search(&ckey, false, Relation::Supertype, None, false)
            .into_iter()
            .map(|h| h.name.to_string())
            .collect();
        for (iname, iface) in &types {
            if is_interface(concrete) || !is_interface(iface) {
                continue;
            }
            if concrete_implements(concrete, iface) {
                checked += 1;
                assert!(hits.contains(iname), "{cname} implements {iname} but the index missed it");
            }
        }
    }
    assert!(checked >= 6, "corpus too small: {checked} pairs");
}

// ===== BUILT-IN ERROR =====

#[test]
fn test_error_implementer_reports_builtin_once() {
    let mut host = AnalysisHost::new();
    host.add_module("/ws", "example.com/m", true);
    let errs = host.set_file_content("/ws/errs/errs.go", ERRORS);
    host.set_file_content(
        "/ws/other/other.go",
        "package other\n\ntype Failure interface{ Error() string }\n",
    );
    let analysis = host.analysis();

    let pos = position_of(ERRORS, "NotFound struct");
    let locs = analysis.implementation(errs, pos).expect("implementations");
    let builtin: Vec<_> = locs.iter().filter(|l| universe::is_synthetic_file(l.file)).collect();
    assert_eq!(builtin.len(), 1, "{locs:?}");
    let names = texts(&analysis, &locs);
    assert!(names.contains(&"Failure".to_string()));
    assert!(names.contains(&"error".to_string()));
}

#[test]
fn test_error_implements_checks_pointer_receiver() {
    let pkg = check_source(ERRORS);
    let not_found = pkg.lookup("NotFound").and_then(|o| o.ty()).expect("NotFound");
    let error = universe::error_type();
    assert!(!implements(&not_found, &error));
    assert!(implements(&pointer(not_found), &error));
}

#[test]
fn test_function_type_query_matches_signatures() {
    let src = "package p

type Handler func(int) string

func show(n int) string { return \"\" }
func skip(s string)     {}
";
    let mut ws = TestWorkspace::single(src);
    let file = ws.file("p/p.go");
    let pos = ws.position("p/p.go", "func(int)");
    let analysis = ws.analysis();
    let locs = analysis.implementation(file, pos).expect("implementations");
    assert_eq!(lines(&locs), vec![4]);
}
