//! Unification on types produced by the checker.

use gonav::hir::types::slice;
use gonav::hir::{ObjKind, Package, Ty, Type};
use gonav::ide::unify::{Bindings, unify, unify_signatures};

use crate::helpers::workspace::check_source;

const SRC: &str = "package p

type List[T any] struct {
	next *List[T]
	val  T
}

type Tree struct {
	left, right *Tree
	kids        map[string][]*Tree
}

type Pair[K comparable, V any] struct {
	key K
	val V
}

func First[T any](xs []T) T { return xs[0] }

func FirstInt(xs []int) int { return xs[0] }

func Swap[A, B any](a A, b B) (B, A) { return b, a }

func Flip(s string, n int) (int, string) { return n, s }

var ints List[int]
var pairs []Pair[string, *Tree]
";

fn checked() -> Package {
    let pkg = check_source(SRC);
    assert!(pkg.errors().is_empty(), "{:?}", pkg.errors());
    pkg
}

fn ty(pkg: &Package, name: &str) -> Ty {
    pkg.lookup(name).and_then(|o| o.ty()).expect(name)
}

/// The type parameters of a generic function, in declaration order.
fn type_params(pkg: &Package, func: &str) -> Vec<Ty> {
    let sig = pkg.lookup(func).and_then(|o| o.signature()).expect(func);
    sig.type_params
        .iter()
        .map(|tp| std::sync::Arc::new(Type::TypeParam(tp.clone())))
        .collect()
}

#[test]
fn test_every_declared_type_unifies_with_itself() {
    let pkg = checked();
    let mut count = 0;
    for obj in pkg.members() {
        let Some(t) = obj.ty() else {
            continue;
        };
        if matches!(obj.kind(), ObjKind::TypeName | ObjKind::Var(_) | ObjKind::Func) {
            assert!(unify(&t, &t, None), "{} does not unify with itself", obj.name());
            let mut bindings = Bindings::new();
            assert!(unify(&t, &t, Some(&mut bindings)), "{}", obj.name());
            count += 1;
        }
    }
    assert!(count >= 8);
}

#[test]
fn test_generic_signature_binds_parameter() {
    let pkg = checked();
    let generic = pkg.lookup("First").and_then(|o| o.signature()).expect("First");
    let concrete = pkg.lookup("FirstInt").and_then(|o| o.signature()).expect("FirstInt");

    assert!(!unify_signatures(&generic, &concrete, None));

    let mut bindings = Bindings::new();
    assert!(unify_signatures(&generic, &concrete, Some(&mut bindings)));
    let t = &generic.type_params[0];
    assert_eq!(bindings.get(t).map(|b| b.to_string()).as_deref(), Some("int"));
}

#[test]
fn test_crossed_parameters_bind_independently() {
    let pkg = checked();
    let swap = pkg.lookup("Swap").and_then(|o| o.signature()).expect("Swap");
    let flip = pkg.lookup("Flip").and_then(|o| o.signature()).expect("Flip");

    let mut bindings = Bindings::new();
    assert!(unify_signatures(&swap, &flip, Some(&mut bindings)));
    let bound: Vec<String> = swap
        .type_params
        .iter()
        .map(|tp| bindings.get(tp).map(|t| t.to_string()).unwrap_or_default())
        .collect();
    assert_eq!(bound, vec!["string", "int"]);
}

#[test]
fn test_failed_unification_leaves_bindings_untouched() {
    let pkg = checked();
    let params = type_params(&pkg, "First");
    let t = params[0].clone();
    let tp = match t.as_ref() {
        Type::TypeParam(tp) => tp.clone(),
        _ => unreachable!(),
    };

    let mut bindings = Bindings::new();
    // T against []T can only succeed by building an infinite type.
    assert!(!unify(&t, &slice(t.clone()), Some(&mut bindings)));
    assert!(bindings.is_empty());

    bindings.bind(&tp, ty(&pkg, "ints"));
    let before = bindings.clone();
    assert!(!unify(&slice(t.clone()), &slice(ty(&pkg, "Tree")), Some(&mut bindings)));
    assert_eq!(bindings.len(), before.len());
    assert_eq!(bindings.get(&tp).map(|b| b.to_string()), before.get(&tp).map(|b| b.to_string()));
}

#[test]
fn test_instantiations_unify_by_arguments() {
    let pkg = checked();
    let ints = ty(&pkg, "ints");
    let pairs = ty(&pkg, "pairs");
    assert!(unify(&ints, &ints.clone(), None));
    assert!(!unify(&ints, &pairs, None));
    assert!(!unify(&ty(&pkg, "Tree"), &ty(&pkg, "List"), None));
}
