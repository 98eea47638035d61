//! Extract refactorings applied end to end: the edited sources are fed back
//! into the host and must still check cleanly.

use std::path::PathBuf;

use gonav::ide::{ExtractKind, IdeError};
use rstest::rstest;

use crate::helpers::workspace::{
    TestWorkspace, apply_change, created_files, problems, span_between, span_of,
};

const PATH: &str = "p/p.go";

/// Applies `kind` to the selection and re-checks the result.
fn extract_and_recheck(src: &str, kind: ExtractKind, selection: gonav::Span) -> String {
    let mut ws = TestWorkspace::single(src);
    let file = ws.file(PATH);
    let analysis = ws.analysis();
    assert!(problems(&analysis, file).is_empty(), "fixture has errors");

    let change = analysis.extract(kind, file, selection).expect("extraction succeeds");
    let edited = apply_change(&analysis, &change, file);

    ws.update(PATH, &edited);
    let analysis = ws.analysis();
    let found = problems(&analysis, file);
    assert!(found.is_empty(), "edited source has errors {found:?}:\n{edited}");
    edited
}

// ===== VARIABLES AND CONSTANTS =====

#[test]
fn test_extract_variable_round_trip() {
    let src = "package p

func f(a int) int {
	return a * (1 + 2)
}
";
    let out = extract_and_recheck(src, ExtractKind::Variable, span_of(src, "1 + 2"));
    assert_eq!(
        out,
        "package p

func f(a int) int {
	x := 1 + 2
	return a * (x)
}
"
    );
}

#[test]
fn test_extract_all_occurrences_round_trip() {
    let src = "package p

func area(w, h int) int {
	if w*h > 100 {
		return w*h - 100
	}
	return w*h
}
";
    let out = extract_and_recheck(src, ExtractKind::VariableAll, span_of(src, "w*h"));
    assert_eq!(out.matches("w*h").count(), 1, "{out}");
    assert!(out.contains("\tx := w*h\n\tif x > 100 {"), "{out}");
}

#[test]
fn test_extract_constant_at_package_level() {
    let src = "package p

// Limit is used below.
var Limit = 60 * 60

func f() int { return 1 }
";
    let out = extract_and_recheck(src, ExtractKind::Constant, span_of(src, "60 * 60"));
    assert!(out.contains("const x = 60 * 60\n\n// Limit is used below.\nvar Limit = x\n"), "{out}");
}

// ===== FUNCTIONS AND METHODS =====

#[test]
fn test_extract_function_round_trip() {
    let src = "package p

func sum(xs []int) int {
	total := 0
	for _, x := range xs {
		total += x
	}
	return total
}
";
    let selection = span_between(src, "for _, x", "total += x\n\t}");
    let out = extract_and_recheck(src, ExtractKind::Function, selection);
    assert!(out.contains("\ttotal = newFunction(xs, total)\n"), "{out}");
    assert!(out.contains("func newFunction(xs []int, total int) int {\n\tfor _, x := range xs {"), "{out}");
}

#[test]
fn test_extract_function_with_early_return_round_trip() {
    let src = "package p

func find(xs []string, want string) int {
	for i, x := range xs {
		if x == want {
			return i
		}
	}
	return -1
}
";
    let selection = span_between(src, "if x == want", "return i\n\t\t}");
    let out = extract_and_recheck(src, ExtractKind::Function, selection);
    assert!(out.contains("ctrl == 1"), "{out}");
    assert!(out.contains("func newFunction("), "{out}");
}

#[test]
fn test_extract_method_round_trip() {
    let src = "package p

type Counter struct{ n int }

func (c *Counter) Add(d int) {
	next := c.n + d
	c.n = next
}
";
    let selection = span_between(src, "next :=", "c.n = next");
    let out = extract_and_recheck(src, ExtractKind::Method, selection);
    assert!(out.contains("\tc.newMethod(d)\n"), "{out}");
    assert!(out.contains("func (c *Counter) newMethod(d int) {"), "{out}");
}

// ===== NEW FILE =====

#[test]
fn test_extract_to_new_file_round_trip() {
    let src = "package p

import \"example.com/m/text\"

func keep() {}

// Title upper-cases its input.
func Title(s string) string { return text.Upper(s) }
";
    let mut ws = TestWorkspace::new(&[
        (PATH, src),
        ("text/text.go", "package text\n\nfunc Upper(s string) string { return s }\n"),
    ]);
    let file = ws.file(PATH);
    let analysis = ws.analysis();
    let selection = span_between(src, "// Title", "Upper(s) }");
    let change = analysis.extract(ExtractKind::ToNewFile, file, selection).expect("extraction succeeds");

    let edited = apply_change(&analysis, &change, file);
    assert_eq!(edited.trim_end(), "package p\n\nfunc keep() {}");

    let created = created_files(&change);
    assert_eq!(created.len(), 1);
    let (path, text) = &created[0];
    assert_eq!(path, &PathBuf::from("/ws/p/title.go"));
    assert!(text.starts_with("package p\n"), "{text}");
    assert!(text.contains("\"example.com/m/text\""), "{text}");
    assert!(text.contains("// Title upper-cases its input.\nfunc Title"), "{text}");

    // Both halves check cleanly once the editor applies the change.
    ws.update(PATH, &edited);
    ws.update("p/title.go", text);
    let analysis = ws.analysis();
    assert!(problems(&analysis, file).is_empty());
}

// ===== AVAILABILITY =====

#[rstest]
#[case("a + 1", &[ExtractKind::Variable, ExtractKind::Constant])]
#[case("total = a + 1", &[ExtractKind::Function])]
#[case("func g", &[])]
fn test_available_actions(#[case] needle: &str, #[case] expected: &[ExtractKind]) {
    let src = "package p

const a = 1

func g() int {
	total := 0
	total = a + 1
	return total
}
";
    let mut ws = TestWorkspace::single(src);
    let file = ws.file(PATH);
    let analysis = ws.analysis();
    let kinds = analysis.extract_actions(file, span_of(src, needle)).expect("actions");
    for kind in expected {
        assert!(kinds.contains(kind), "{kind:?} missing for {needle:?}: {kinds:?}");
    }
    if expected.is_empty() {
        assert!(!kinds.contains(&ExtractKind::Variable));
        assert!(!kinds.contains(&ExtractKind::Function));
    }
}

#[test]
fn test_unavailable_extraction_is_an_error() {
    let src = "package p

func g(n int) int {
	return n * 2
}
";
    let mut ws = TestWorkspace::single(src);
    let file = ws.file(PATH);
    let analysis = ws.analysis();
    let err = analysis
        .extract(ExtractKind::Constant, file, span_of(src, "n * 2"))
        .expect_err("the expression uses a parameter");
    assert!(matches!(err, IdeError::Extract(_)), "{err}");
}
