//! Lexical scopes produced by the checker.

use gonav::hir::{ObjKind, Package, ScopeId, ScopeKind, VarKind};
use gonav::{FileId, TextSize};

use crate::helpers::workspace::check_source;

const SRC: &str = "package p

var top = 1

func f(n int) {
	a := top
	{
		b := a + n
		_ = b
	}
	top := 2
	_ = top
}
";

fn offset(needle: &str) -> TextSize {
    TextSize::new(SRC.find(needle).unwrap_or_else(|| panic!("{needle:?} not found")) as u32)
}

fn innermost(pkg: &Package, needle: &str) -> ScopeId {
    pkg.scopes()
        .innermost(FileId::new(0), offset(needle))
        .expect("position is inside the file")
}

#[test]
fn test_nested_block_scope() {
    let pkg = check_source(SRC);
    let scopes = pkg.scopes();
    let block = innermost(&pkg, "b := a");
    assert_eq!(scopes.scope(block).kind, ScopeKind::Block);

    let kinds: Vec<ScopeKind> = scopes.ancestors(block).map(|s| scopes.scope(s).kind).collect();
    assert_eq!(kinds.first(), Some(&ScopeKind::Block));
    assert!(kinds.contains(&ScopeKind::Func));
    assert_eq!(kinds.last(), Some(&ScopeKind::Package));
}

#[test]
fn test_locals_are_visible_after_their_statement() {
    let pkg = check_source(SRC);
    let scopes = pkg.scopes();
    let block = innermost(&pkg, "b := a");

    // `b` is not in scope on its own right-hand side.
    assert!(scopes.lookup_parent(block, "b", Some(offset("a + n"))).is_none());
    assert!(scopes.lookup_parent(block, "b", Some(offset("_ = b"))).is_some());

    let (_, n) = scopes.lookup_parent(block, "n", Some(offset("a + n"))).expect("param");
    assert_eq!(n.kind(), ObjKind::Var(VarKind::Param));
}

#[test]
fn test_later_local_does_not_shadow_earlier_use() {
    let pkg = check_source(SRC);
    let scopes = pkg.scopes();
    let func = innermost(&pkg, "a := top");

    let (found_in, early) = scopes.lookup_parent(func, "top", Some(offset("a := top"))).expect("top");
    assert_eq!(found_in, ScopeId::PACKAGE);
    assert!(early.is_package_level());

    let (_, late) = scopes.lookup_parent(func, "top", Some(offset("_ = top"))).expect("top");
    assert_eq!(late.kind(), ObjKind::Var(VarKind::Local));
}

#[test]
fn test_universe_is_consulted_last() {
    let pkg = check_source(SRC);
    let scopes = pkg.scopes();
    let func = innermost(&pkg, "a := top");
    assert!(scopes.lookup_parent(func, "len", None).is_none());
    let len = scopes.resolve(func, "len", None).expect("builtin");
    assert_eq!(len.kind(), ObjKind::Builtin);
}

#[test]
fn test_package_scope_lists_members() {
    let pkg = check_source(SRC);
    let mut names: Vec<&str> = pkg.scopes().scope(ScopeId::PACKAGE).names().collect();
    names.sort_unstable();
    assert_eq!(names, vec!["f", "top"]);
}
