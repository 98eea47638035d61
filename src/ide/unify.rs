//! Structural type unification with type-parameter binding.
//!
//! Used to match method and function signatures that may mention type
//! parameters, e.g. `func (List[T]) Push(T)` against `Push(int)`.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::hir::types::{any_type_param, same_origin};
use crate::hir::{ObjKey, Signature, Ty, Type, TypeParam};

/// Types nest this deep only if something is wrong with them.
const MAX_DEPTH: usize = 100;

/// Type-parameter bindings threaded through [`unify`].
///
/// Parameters are identified by declaring position. Each one points at a
/// cell; parameters unified with each other share a cell, so binding one
/// binds all.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    cells: Vec<Option<Ty>>,
    index: FxHashMap<ObjKey, usize>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// The type `tp` is bound to, if any.
    pub fn get(&self, tp: &TypeParam) -> Option<&Ty> {
        let cell = *self.index.get(&tp.key()?)?;
        self.cells[cell].as_ref()
    }

    /// Pre-bind `tp` to `ty`, constraining later unifications.
    pub fn bind(&mut self, tp: &TypeParam, ty: Ty) {
        if let Some(cell) = self.cell(tp) {
            self.cells[cell] = Some(ty);
        }
    }

    /// Number of parameters seen so far, bound or not.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn cell(&mut self, tp: &TypeParam) -> Option<usize> {
        let key = tp.key()?;
        let next = self.cells.len();
        let cell = *self.index.entry(key).or_insert(next);
        if cell == next {
            self.cells.push(None);
        }
        Some(cell)
    }

    fn existing_cell(&self, tp: &TypeParam) -> Option<usize> {
        self.index.get(&tp.key()?).copied()
    }

    /// Point every parameter of cell `from` at cell `to`.
    fn merge(&mut self, from: usize, to: usize) {
        for cell in self.index.values_mut() {
            if *cell == from {
                *cell = to;
            }
        }
    }
}

/// Whether `x` and `y` are identical modulo a consistent substitution of
/// type parameters.
///
/// Without `bindings`, type parameters only unify with themselves. With
/// them, any type parameter may be bound; on failure the bindings are left
/// exactly as they were.
///
/// # Panics
///
/// When the types nest more than 100 levels deep, which indicates a
/// malformed type rather than a legitimately deep one.
pub fn unify(x: &Ty, y: &Ty, bindings: Option<&mut Bindings>) -> bool {
    match bindings {
        None => Unifier { bindings: None }.unify(x, y, 0),
        Some(bindings) => {
            let saved = bindings.clone();
            let ok = Unifier {
                bindings: Some(&mut *bindings),
            }
            .unify(x, y, 0);
            if !ok {
                *bindings = saved;
            }
            ok
        }
    }
}

/// [`unify`] on two signatures, ignoring receivers.
pub fn unify_signatures(x: &Signature, y: &Signature, bindings: Option<&mut Bindings>) -> bool {
    let sig = |s: &Signature| {
        Arc::new(Type::Signature(Signature {
            recv: None,
            ..s.clone()
        }))
    };
    unify(&sig(x), &sig(y), bindings)
}

struct Unifier<'a> {
    bindings: Option<&'a mut Bindings>,
}

impl Unifier<'_> {
    fn unify(&mut self, x: &Ty, y: &Ty, depth: usize) -> bool {
        if depth > MAX_DEPTH {
            panic!("unify: types nest deeper than {MAX_DEPTH} levels: {x} vs {y}");
        }
        if Arc::ptr_eq(x, y) {
            return true;
        }
        let d = depth + 1;

        if self.bindings.is_some() {
            match (x.as_ref(), y.as_ref()) {
                (Type::TypeParam(a), Type::TypeParam(b)) => return self.unify_params(a, b, d),
                (Type::TypeParam(a), _) => return self.bind(a, y, d),
                (_, Type::TypeParam(b)) => return self.bind(b, x, d),
                _ => {}
            }
        }

        match (x.as_ref(), y.as_ref()) {
            (Type::Basic(a), Type::Basic(b)) => a == b,
            (Type::TypeParam(a), Type::TypeParam(b)) => a.same(b),
            (Type::Named(a), Type::Named(b)) => {
                same_origin(a, b)
                    && a.targs().len() == b.targs().len()
                    && a.targs()
                        .iter()
                        .zip(b.targs())
                        .all(|(p, q)| self.unify(p, q, d))
            }
            (Type::Pointer(a), Type::Pointer(b)) | (Type::Slice(a), Type::Slice(b)) => self.unify(a, b, d),
            (Type::Array(n, a), Type::Array(m, b)) => n == m && self.unify(a, b, d),
            (Type::Map(k1, v1), Type::Map(k2, v2)) => self.unify(k1, k2, d) && self.unify(v1, v2, d),
            (Type::Chan(d1, a), Type::Chan(d2, b)) => d1 == d2 && self.unify(a, b, d),
            (Type::Tuple(a), Type::Tuple(b)) => self.unify_all(a, b, d),
            (Type::Signature(a), Type::Signature(b)) => {
                a.variadic == b.variadic
                    && self.unify_all(&a.param_types(), &b.param_types(), d)
                    && self.unify_all(&a.result_types(), &b.result_types(), d)
            }
            (Type::Struct(a), Type::Struct(b)) => {
                a.fields.len() == b.fields.len()
                    && a.fields.iter().zip(&b.fields).all(|(f, g)| {
                        f.name() == g.name()
                            && f.embedded == g.embedded
                            && f.tag == g.tag
                            && (f.obj.is_exported() || f.obj.pkg_path() == g.obj.pkg_path())
                            && self.unify(&f.ty, &g.ty, d)
                    })
            }
            // Interface literals are compared by method count only.
            (Type::Interface(a), Type::Interface(b)) => a.all_methods().len() == b.all_methods().len(),
            _ => false,
        }
    }

    fn unify_all(&mut self, xs: &[Ty], ys: &[Ty], depth: usize) -> bool {
        xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| self.unify(x, y, depth))
    }

    fn unify_params(&mut self, a: &TypeParam, b: &TypeParam, depth: usize) -> bool {
        if a.same(b) {
            return true;
        }
        let Some(bindings) = self.bindings.as_deref_mut() else {
            return false;
        };
        let (Some(ca), Some(cb)) = (bindings.cell(a), bindings.cell(b)) else {
            return false;
        };
        if ca == cb {
            return true;
        }
        match (bindings.cells[ca].clone(), bindings.cells[cb].clone()) {
            (None, None) => {
                self.merge(cb, ca);
                true
            }
            (Some(bound), None) => {
                if self.occurs(cb, &bound, depth) {
                    return false;
                }
                self.merge(cb, ca);
                true
            }
            (None, Some(bound)) => {
                if self.occurs(ca, &bound, depth) {
                    return false;
                }
                self.merge(ca, cb);
                true
            }
            (Some(x), Some(y)) => {
                if !self.unify(&x, &y, depth) {
                    return false;
                }
                self.merge(cb, ca);
                true
            }
        }
    }

    fn merge(&mut self, from: usize, to: usize) {
        if let Some(bindings) = self.bindings.as_deref_mut() {
            bindings.merge(from, to);
        }
    }

    fn bind(&mut self, tp: &TypeParam, ty: &Ty, depth: usize) -> bool {
        let Some(bindings) = self.bindings.as_deref_mut() else {
            return false;
        };
        let Some(cell) = bindings.cell(tp) else {
            return false;
        };
        if let Some(bound) = bindings.cells[cell].clone() {
            return self.unify(&bound, ty, depth);
        }
        if self.occurs(cell, ty, depth) {
            return false;
        }
        if let Some(bindings) = self.bindings.as_deref_mut() {
            bindings.cells[cell] = Some(ty.clone());
        }
        true
    }

    /// Whether a parameter of `cell` appears in `ty`, looking through
    /// bound parameters.
    fn occurs(&self, cell: usize, ty: &Ty, depth: usize) -> bool {
        if depth > MAX_DEPTH {
            panic!("unify: binding chain deeper than {MAX_DEPTH} levels");
        }
        let Some(bindings) = self.bindings.as_deref() else {
            return false;
        };
        any_type_param(ty, &mut |tp| match bindings.existing_cell(tp) {
            Some(c) if c == cell => true,
            Some(c) => bindings.cells[c]
                .as_ref()
                .is_some_and(|bound| self.occurs(cell, bound, depth + 1)),
            None => false,
        })
    }
}
