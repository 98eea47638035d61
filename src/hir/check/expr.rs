//! Expressions, calls and builtins.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::parser::{BinaryOp, LitKind, NodeId, NodeKind, UnaryOp};

use super::super::lookup::lookup_field_or_method;
use super::super::objects::{ObjKey, ObjKind, ObjRef};
use super::super::types::{
    BasicKind, Param, Signature, Ty, Type, basic, default_type, deref, instantiate, invalid,
    pointer, slice, subst, tuple, under,
};
use super::super::universe;
use super::{Checker, Instance, Selection, SelectionKind, ValueMode};

/// The result of evaluating an expression.
#[derive(Debug, Clone)]
pub(super) struct Operand {
    pub mode: ValueMode,
    pub ty: Ty,
}

impl Operand {
    fn new(mode: ValueMode, ty: Ty) -> Self {
        Self { mode, ty }
    }

    fn invalid() -> Self {
        Self::new(ValueMode::NoValue, invalid())
    }

    fn value(ty: Ty) -> Self {
        Self::new(ValueMode::Value, ty)
    }
}

impl Checker<'_> {
    pub(super) fn expr(&mut self, node: NodeId) -> Operand {
        self.expr_hint(node, None)
    }

    /// Evaluate `node`; `hint` is the type expected by the context, used
    /// for composite literals with elided types.
    pub(super) fn expr_hint(&mut self, node: NodeId, hint: Option<&Ty>) -> Operand {
        let op = self.expr_inner(node, hint);
        self.record_type(node, op.mode, op.ty.clone());
        op
    }

    fn expr_inner(&mut self, node: NodeId, hint: Option<&Ty>) -> Operand {
        let file = self.file();
        match file.kind(node).clone() {
            NodeKind::Bad => Operand::invalid(),
            NodeKind::Ident(name) => {
                if name == "_" {
                    self.error(node, "cannot use _ as value");
                    return Operand::invalid();
                }
                match self.lookup(node) {
                    Some(obj) => {
                        self.record_use(node, &obj);
                        self.object_operand(node, &obj)
                    }
                    None => {
                        self.error(node, format!("undefined: {name}"));
                        Operand::invalid()
                    }
                }
            }
            NodeKind::BasicLit { kind, .. } => Operand::new(
                ValueMode::Constant,
                basic(match kind {
                    LitKind::Int => BasicKind::UntypedInt,
                    LitKind::Float => BasicKind::UntypedFloat,
                    LitKind::Imag => BasicKind::UntypedComplex,
                    LitKind::Char => BasicKind::UntypedRune,
                    LitKind::String => BasicKind::UntypedString,
                }),
            ),
            NodeKind::CompositeLit { ty, elts } => self.composite_lit(node, ty, &elts, hint),
            NodeKind::FuncLit { ty, body } => Operand::value(self.func_lit(node, ty, body)),
            NodeKind::Paren(x) => self.expr_hint(x, hint),
            NodeKind::Selector { x, sel } => self.selector(node, x, sel),
            NodeKind::Index { x, indices } => self.index_expr(node, x, &indices),
            NodeKind::Slice { x, low, high, max } => {
                let xo = self.expr(x);
                for part in [low, high, max].into_iter().flatten() {
                    self.expr(part);
                }
                let (base, _) = deref(&under(&xo.ty));
                match under(&base).as_ref() {
                    Type::Basic(kind) if kind.is_string() => Operand::value(basic(BasicKind::String)),
                    Type::Slice(_) => Operand::value(xo.ty.clone()),
                    Type::Array(_, elem) => Operand::value(slice(elem.clone())),
                    _ => {
                        if !xo.ty.is_invalid() {
                            self.error(node, format!("cannot slice {}", file.source(x)));
                        }
                        Operand::invalid()
                    }
                }
            }
            NodeKind::TypeAssert { x, ty } => {
                let xo = self.expr(x);
                match ty {
                    Some(ty) => Operand::value(self.type_expr(ty)),
                    None => {
                        self.error(node, "use of .(type) outside type switch");
                        xo
                    }
                }
            }
            NodeKind::Call { fun, args, ellipsis } => self.call(node, fun, &args, ellipsis),
            NodeKind::Star(x) => {
                let xo = self.expr(x);
                match xo.mode {
                    ValueMode::TypeExpr => Operand::new(ValueMode::TypeExpr, pointer(xo.ty)),
                    _ => match under(&xo.ty).as_ref() {
                        Type::Pointer(elem) => Operand::new(ValueMode::Variable, elem.clone()),
                        _ => {
                            if !xo.ty.is_invalid() {
                                self.error(node, format!("invalid indirect of {}", file.source(x)));
                            }
                            Operand::invalid()
                        }
                    },
                }
            }
            NodeKind::Unary { op, x } => self.unary(node, op, x, hint),
            NodeKind::Binary { op, x, y } => self.binary(op, x, y),
            NodeKind::KeyValue { key, value } => {
                self.expr(key);
                self.expr(value);
                self.error(node, "unexpected key:value expression");
                Operand::invalid()
            }
            NodeKind::ArrayType { .. }
            | NodeKind::Ellipsis(_)
            | NodeKind::StructType { .. }
            | NodeKind::InterfaceType { .. }
            | NodeKind::FuncType { .. }
            | NodeKind::MapType { .. }
            | NodeKind::ChanType { .. } => Operand::new(ValueMode::TypeExpr, self.type_expr(node)),
            _ => {
                self.error(node, format!("{} is not an expression", file.kind(node).describe()));
                Operand::invalid()
            }
        }
    }

    /// The operand an identifier denotes once resolved to `obj`.
    fn object_operand(&mut self, node: NodeId, obj: &ObjRef) -> Operand {
        self.ensure(obj);
        let ty = obj.ty();
        let mode = match obj.kind() {
            ObjKind::PkgName => return Operand::new(ValueMode::PkgName, invalid()),
            ObjKind::Builtin => return Operand::new(ValueMode::Builtin, invalid()),
            ObjKind::Nil => return Operand::value(basic(BasicKind::UntypedNil)),
            ObjKind::Label => {
                self.error(node, format!("use of label {} as value", obj.name()));
                return Operand::invalid();
            }
            ObjKind::TypeName => ValueMode::TypeExpr,
            ObjKind::Var(_) => ValueMode::Variable,
            ObjKind::Const => ValueMode::Constant,
            ObjKind::Func => ValueMode::Value,
        };
        match ty {
            Some(ty) => Operand::new(mode, ty),
            None => {
                self.error(node, format!("invalid use of {} in its own declaration", obj.name()));
                Operand::new(mode, invalid())
            }
        }
    }

    fn composite_lit(&mut self, node: NodeId, ty: Option<NodeId>, elts: &[NodeId], hint: Option<&Ty>) -> Operand {
        let file = self.file();
        let lit_ty = match ty {
            Some(t) => match file.kind(t) {
                NodeKind::ArrayType {
                    len: Some(len),
                    elem,
                } if matches!(file.kind(*len), NodeKind::Ellipsis(None)) => {
                    let elem = self.type_expr(*elem);
                    let arr = Arc::new(Type::Array(Some(elts.len() as u64), elem));
                    self.record_type(t, ValueMode::TypeExpr, arr.clone());
                    arr
                }
                _ => self.type_expr(t),
            },
            None => match hint {
                Some(h) => match under(h).as_ref() {
                    Type::Pointer(elem) => elem.clone(),
                    _ => h.clone(),
                },
                None => {
                    self.error(node, "invalid composite literal type: missing type");
                    invalid()
                }
            },
        };

        match under(&lit_ty).as_ref() {
            Type::Struct(st) => {
                let fields = st.fields.clone();
                for (i, &elt) in elts.iter().enumerate() {
                    match file.kind(elt) {
                        NodeKind::KeyValue { key, value } => {
                            let name = file.ident_name(*key).unwrap_or("");
                            match fields.iter().find(|f| f.name() == name) {
                                Some(field) => {
                                    self.record_use(*key, &field.obj);
                                    self.expr_hint(*value, Some(&field.ty));
                                }
                                None => {
                                    self.error(*key, format!("unknown field {name} in struct literal"));
                                    self.expr(*value);
                                }
                            }
                        }
                        _ => {
                            let hint = fields.get(i).map(|f| f.ty.clone());
                            self.expr_hint(elt, hint.as_ref());
                        }
                    }
                }
            }
            Type::Array(_, elem) | Type::Slice(elem) => {
                let elem = elem.clone();
                for &elt in elts {
                    match file.kind(elt) {
                        NodeKind::KeyValue { key, value } => {
                            self.expr(*key);
                            self.expr_hint(*value, Some(&elem));
                        }
                        _ => {
                            self.expr_hint(elt, Some(&elem));
                        }
                    }
                }
            }
            Type::Map(k, v) => {
                let (k, v) = (k.clone(), v.clone());
                for &elt in elts {
                    match file.kind(elt) {
                        NodeKind::KeyValue { key, value } => {
                            self.expr_hint(*key, Some(&k));
                            self.expr_hint(*value, Some(&v));
                        }
                        _ => {
                            self.error(elt, "missing key in map literal");
                            self.expr(elt);
                        }
                    }
                }
            }
            _ => {
                if !lit_ty.is_invalid() {
                    self.error(node, format!("invalid composite literal type {lit_ty}"));
                }
                for &elt in elts {
                    match file.kind(elt) {
                        NodeKind::KeyValue { value, .. } => {
                            self.expr(*value);
                        }
                        _ => {
                            self.expr(elt);
                        }
                    }
                }
            }
        }
        Operand::value(lit_ty)
    }

    fn selector(&mut self, node: NodeId, x: NodeId, sel: NodeId) -> Operand {
        let file = self.file();
        let name = file.ident_name(sel).unwrap_or("_").to_string();

        // Qualified identifier.
        if matches!(file.kind(x), NodeKind::Ident(_))
            && let Some(pkg_obj) = self.lookup(x).filter(|o| o.kind() == ObjKind::PkgName)
        {
            self.record_use(x, &pkg_obj);
            self.record_type(x, ValueMode::PkgName, invalid());
            let Some(imported) = pkg_obj.imported().cloned() else {
                return Operand::invalid();
            };
            return match self.package_member(&imported, &name) {
                Some(member) => {
                    self.record_use(sel, &member);
                    self.object_operand(sel, &member)
                }
                None => {
                    if self.imported.contains_key(imported.path.as_str()) || imported.path == "unsafe" {
                        self.error(sel, format!("undefined: {}.{}", imported.name, name));
                    }
                    Operand::invalid()
                }
            };
        }

        let xo = self.expr(x);
        if xo.ty.is_invalid() {
            return Operand::invalid();
        }
        let found = lookup_field_or_method(&xo.ty, Some(&self.pkg.path), &name);
        let Some(found) = found else {
            self.error(sel, format!("{}.{} undefined (type {} has no field or method {})", file.source(x), name, xo.ty, name));
            return Operand::invalid();
        };
        self.record_use(sel, &found.obj);

        let (kind, mode, ty) = if xo.mode == ValueMode::TypeExpr {
            if !found.is_method() {
                self.error(sel, format!("{}.{} undefined (type {} has no method {})", file.source(x), name, xo.ty, name));
                return Operand::invalid();
            }
            let sig = found.ty.as_signature().cloned().unwrap_or_default();
            let mut params = vec![Param::new("", xo.ty.clone())];
            params.extend(sig.params.iter().cloned());
            let ty = Arc::new(Type::Signature(Signature {
                recv: None,
                params,
                ..sig
            }));
            (SelectionKind::MethodExpr, ValueMode::Value, ty)
        } else if found.is_method() {
            let sig = found.ty.as_signature().cloned().unwrap_or_default();
            let ty = Arc::new(Type::Signature(Signature { recv: None, ..sig }));
            (SelectionKind::MethodVal, ValueMode::Value, ty)
        } else {
            (SelectionKind::FieldVal, ValueMode::Variable, found.ty.clone())
        };

        self.info().selections.insert(
            node,
            Selection {
                kind,
                recv: xo.ty,
                obj: found.obj,
                index: found.index,
                indirect: found.indirect,
                ty: ty.clone(),
            },
        );
        Operand::new(mode, ty)
    }

    fn index_expr(&mut self, node: NodeId, x: NodeId, indices: &[NodeId]) -> Operand {
        let xo = self.expr(x);
        if xo.mode == ValueMode::TypeExpr {
            // `x` was recorded as a type expression already; evaluate the
            // instantiation without re-resolving it.
            let targs: Vec<Ty> = indices.iter().map(|i| self.type_expr(*i)).collect();
            let Some(generic) = xo.ty.as_named().filter(|n| n.is_generic()).cloned() else {
                self.error(x, format!("{} is not a generic type", xo.ty));
                return Operand::invalid();
            };
            let inst = instantiate(&generic, targs.clone());
            if let Some(ident) = self.naming_ident(x) {
                self.info().instances.insert(
                    ident,
                    Instance {
                        targs,
                        ty: inst.clone(),
                    },
                );
            }
            return Operand::new(ValueMode::TypeExpr, inst);
        }

        if let Type::Signature(sig) = xo.ty.as_ref()
            && !sig.type_params.is_empty()
        {
            let targs: Vec<Ty> = indices.iter().map(|i| self.type_expr(*i)).collect();
            let inst = self.instantiate_signature(x, sig, targs);
            return Operand::value(inst);
        }

        let Some(&index) = indices.first() else {
            return Operand::invalid();
        };
        let (base, _) = deref(&under(&xo.ty));
        match under(&base).as_ref() {
            Type::Basic(kind) if kind.is_string() => {
                self.expr(index);
                Operand::value(basic(BasicKind::Uint8))
            }
            Type::Slice(elem) | Type::Array(_, elem) => {
                self.expr(index);
                Operand::new(ValueMode::Variable, elem.clone())
            }
            Type::Map(k, v) => {
                let (k, v) = (k.clone(), v.clone());
                self.expr_hint(index, Some(&k));
                Operand::new(ValueMode::Value, v)
            }
            _ => {
                self.expr(index);
                if !xo.ty.is_invalid() {
                    let file = self.file();
                    self.error(node, format!("cannot index {}", file.source(x)));
                }
                Operand::invalid()
            }
        }
    }

    /// Substitute explicit type arguments into a generic signature and
    /// record the instance on the function's identifier.
    fn instantiate_signature(&mut self, fun: NodeId, sig: &Signature, targs: Vec<Ty>) -> Ty {
        let mut map: FxHashMap<ObjKey, Ty> = FxHashMap::default();
        for (tp, targ) in sig.type_params.iter().zip(&targs) {
            if let Some(key) = tp.key() {
                map.insert(key, targ.clone());
            }
        }
        let generic = Arc::new(Type::Signature(sig.clone()));
        let inst = subst(&generic, &map);
        if let Some(ident) = self.naming_ident(fun) {
            self.info().instances.insert(
                ident,
                Instance {
                    targs,
                    ty: inst.clone(),
                },
            );
        }
        inst
    }

    fn unary(&mut self, node: NodeId, op: UnaryOp, x: NodeId, hint: Option<&Ty>) -> Operand {
        match op {
            UnaryOp::Addr => {
                let inner_hint = hint.and_then(|h| match under(h).as_ref() {
                    Type::Pointer(elem) => Some(elem.clone()),
                    _ => None,
                });
                let xo = self.expr_hint(x, inner_hint.as_ref());
                Operand::value(pointer(xo.ty))
            }
            UnaryOp::Recv => {
                let xo = self.expr(x);
                match under(&xo.ty).as_ref() {
                    Type::Chan(_, elem) => Operand::value(elem.clone()),
                    _ => {
                        if !xo.ty.is_invalid() {
                            self.error(node, "receive from non-channel");
                        }
                        Operand::invalid()
                    }
                }
            }
            UnaryOp::Tilde => {
                self.error(node, "cannot use ~ outside of interface or type constraint");
                self.expr(x);
                Operand::invalid()
            }
            _ => {
                let xo = self.expr(x);
                let mode = if xo.mode == ValueMode::Constant {
                    ValueMode::Constant
                } else {
                    ValueMode::Value
                };
                Operand::new(mode, xo.ty)
            }
        }
    }

    fn binary(&mut self, op: BinaryOp, x: NodeId, y: NodeId) -> Operand {
        let xo = self.expr(x);
        let yo = self.expr(y);
        let mode = if xo.mode == ValueMode::Constant && yo.mode == ValueMode::Constant {
            ValueMode::Constant
        } else {
            ValueMode::Value
        };
        if op.is_comparison() {
            return Operand::new(mode, basic(BasicKind::UntypedBool));
        }
        if op.is_shift() {
            return Operand::new(mode, xo.ty);
        }
        let ty = match (xo.ty.as_ref(), yo.ty.as_ref()) {
            (Type::Basic(a), Type::Basic(b)) if a.is_untyped() && b.is_untyped() => {
                basic(if untyped_rank(*b) > untyped_rank(*a) { *b } else { *a })
            }
            (Type::Basic(a), _) if a.is_untyped() => yo.ty.clone(),
            _ => xo.ty.clone(),
        };
        Operand::new(mode, ty)
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    fn call(&mut self, node: NodeId, fun: NodeId, args: &[NodeId], ellipsis: bool) -> Operand {
        let fo = self.expr(fun);
        match fo.mode {
            ValueMode::TypeExpr => {
                let hint = Some(fo.ty.clone());
                for &arg in args {
                    self.expr_hint(arg, hint.as_ref());
                }
                if args.len() != 1 {
                    self.error(node, format!("wrong argument count in conversion to {}", fo.ty));
                }
                Operand::value(fo.ty)
            }
            ValueMode::Builtin => {
                let Some(obj) = self.naming_ident(fun).and_then(|i| self.infos[self.cur].uses.get(&i).cloned()) else {
                    return Operand::invalid();
                };
                self.builtin_call(fun, &obj, args)
            }
            ValueMode::NoValue | ValueMode::PkgName => {
                for &arg in args {
                    self.expr(arg);
                }
                Operand::invalid()
            }
            _ => {
                let Some(sig) = under(&fo.ty).as_signature().cloned() else {
                    for &arg in args {
                        self.expr(arg);
                    }
                    if !fo.ty.is_invalid() {
                        let file = self.file();
                        self.error(node, format!("invalid operation: cannot call non-function {}", file.source(fun)));
                    }
                    return Operand::invalid();
                };
                let arg_types = self.call_args(&sig, args, ellipsis);
                let sig = if sig.type_params.is_empty() {
                    sig
                } else {
                    let targs = infer(&sig, &arg_types);
                    match self.instantiate_signature(fun, &sig, targs).as_ref() {
                        Type::Signature(inst) => inst.clone(),
                        _ => sig,
                    }
                };
                match sig.results.len() {
                    0 => Operand::new(ValueMode::NoValue, tuple(Vec::new())),
                    _ => Operand::value(sig.result_type()),
                }
            }
        }
    }

    /// Check call arguments against `sig`, spreading a multi-valued
    /// single argument.
    fn call_args(&mut self, sig: &Signature, args: &[NodeId], ellipsis: bool) -> Vec<Ty> {
        if let [single] = args
            && sig.params.len() > 1
        {
            return self.multi_expr(*single, sig.params.len());
        }
        let mut out = Vec::with_capacity(args.len());
        for (i, &arg) in args.iter().enumerate() {
            let hint = param_type(sig, i, ellipsis);
            let op = self.expr_hint(arg, hint.as_ref());
            out.push(op.ty);
        }
        out
    }

    fn builtin_call(&mut self, fun: NodeId, obj: &ObjRef, args: &[NodeId]) -> Operand {
        let name = obj.name();
        let in_unsafe = obj.pkg_path() == Some("unsafe");
        let mut arg_types = Vec::new();

        let result: Option<Operand> = match (in_unsafe, name) {
            (false, "make" | "new") => {
                let ty = match args.first() {
                    Some(&a) => self.type_expr(a),
                    None => invalid(),
                };
                arg_types.push(ty.clone());
                for &a in args.iter().skip(1) {
                    arg_types.push(self.expr(a).ty);
                }
                Some(Operand::value(if name == "new" { pointer(ty) } else { ty }))
            }
            _ => {
                for (i, &a) in args.iter().enumerate() {
                    let hint = match arg_types.first() {
                        Some(first) if name == "append" && i > 0 => match under(first).as_ref() {
                            Type::Slice(elem) => Some(elem.clone()),
                            _ => None,
                        },
                        _ => None,
                    };
                    arg_types.push(self.expr_hint(a, hint.as_ref()).ty);
                }
                let first = arg_types.first().cloned().unwrap_or_else(invalid);
                let int = || Operand::value(basic(BasicKind::Int));
                match (in_unsafe, name) {
                    (false, "append") => Some(Operand::value(first)),
                    (false, "len" | "cap" | "copy") => Some(int()),
                    (false, "complex") => Some(Operand::value(basic(BasicKind::Complex128))),
                    (false, "real" | "imag") => Some(Operand::value(basic(BasicKind::Float64))),
                    (false, "min" | "max") => {
                        let typed = arg_types.iter().find(|t| !t.is_untyped()).cloned();
                        Some(Operand::value(typed.unwrap_or(first)))
                    }
                    (false, "recover") => Some(Operand::value(universe::any_type())),
                    (true, "Sizeof" | "Offsetof" | "Alignof") => {
                        Some(Operand::new(ValueMode::Constant, basic(BasicKind::Uintptr)))
                    }
                    (true, "Add") => Some(Operand::value(basic(BasicKind::UnsafePointer))),
                    (true, "Slice") => Some(Operand::value(match under(&first).as_ref() {
                        Type::Pointer(elem) => slice(elem.clone()),
                        _ => invalid(),
                    })),
                    (true, "SliceData") => Some(Operand::value(match under(&first).as_ref() {
                        Type::Slice(elem) => pointer(elem.clone()),
                        _ => invalid(),
                    })),
                    (true, "String") => Some(Operand::value(basic(BasicKind::String))),
                    (true, "StringData") => Some(Operand::value(pointer(basic(BasicKind::Uint8)))),
                    _ => None,
                }
            }
        };

        let result_ty = result.as_ref().map(|r| r.ty.clone());
        let sig = Signature {
            params: arg_types.into_iter().map(|t| Param::new("", t)).collect(),
            results: result_ty.into_iter().map(|t| Param::new("", t)).collect(),
            ..Default::default()
        };
        self.record_type(fun, ValueMode::Builtin, Arc::new(Type::Signature(sig)));
        result.unwrap_or_else(|| Operand::new(ValueMode::NoValue, tuple(Vec::new())))
    }
}

/// The parameter type expected at argument `i`.
fn param_type(sig: &Signature, i: usize, ellipsis: bool) -> Option<Ty> {
    let n = sig.params.len();
    if sig.variadic && i + 1 >= n {
        let last = sig.params.last()?;
        if ellipsis {
            return Some(last.ty.clone());
        }
        return match last.ty.as_ref() {
            Type::Slice(elem) => Some(elem.clone()),
            _ => Some(last.ty.clone()),
        };
    }
    sig.params.get(i).map(|p| p.ty.clone())
}

/// Infer type arguments of a generic signature from argument types.
fn infer(sig: &Signature, args: &[Ty]) -> Vec<Ty> {
    let mut map: FxHashMap<ObjKey, Ty> = FxHashMap::default();
    for (i, arg) in args.iter().enumerate() {
        if let Some(param) = param_type(sig, i, false) {
            bind(&param, &default_type(arg), &mut map, 0);
        }
    }
    sig.type_params
        .iter()
        .map(|tp| tp.key().and_then(|k| map.get(&k).cloned()).unwrap_or_else(invalid))
        .collect()
}

fn bind(param: &Ty, arg: &Ty, map: &mut FxHashMap<ObjKey, Ty>, depth: usize) {
    if depth > 32 || arg.is_invalid() {
        return;
    }
    let d = depth + 1;
    match (param.as_ref(), arg.as_ref()) {
        (Type::TypeParam(tp), _) => {
            if let Some(key) = tp.key() {
                map.entry(key).or_insert_with(|| arg.clone());
            }
        }
        (Type::Named(p), Type::Named(a)) if !p.targs().is_empty() => {
            for (pt, at) in p.targs().iter().zip(a.targs()) {
                bind(pt, at, map, d);
            }
        }
        (Type::Named(_), _) => {}
        (_, Type::Named(_)) => bind(param, &under(arg), map, d),
        (Type::Pointer(p), Type::Pointer(a))
        | (Type::Slice(p), Type::Slice(a))
        | (Type::Array(_, p), Type::Array(_, a))
        | (Type::Chan(_, p), Type::Chan(_, a)) => bind(p, a, map, d),
        (Type::Map(pk, pv), Type::Map(ak, av)) => {
            bind(pk, ak, map, d);
            bind(pv, av, map, d);
        }
        (Type::Signature(p), Type::Signature(a)) => {
            for (pp, ap) in p.params.iter().zip(&a.params) {
                bind(&pp.ty, &ap.ty, map, d);
            }
            for (pr, ar) in p.results.iter().zip(&a.results) {
                bind(&pr.ty, &ar.ty, map, d);
            }
        }
        _ => {}
    }
}

/// Ordering of untyped numeric kinds for mixed constant expressions.
fn untyped_rank(kind: BasicKind) -> u8 {
    match kind {
        BasicKind::UntypedInt => 1,
        BasicKind::UntypedRune => 2,
        BasicKind::UntypedFloat => 3,
        BasicKind::UntypedComplex => 4,
        _ => 0,
    }
}
