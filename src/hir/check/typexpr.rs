//! Type expressions.

use std::sync::Arc;

use crate::parser::{BinaryOp, LitKind, NodeId, NodeKind, UnaryOp};

use super::super::objects::{ObjKind, ObjRef, VarKind};
use super::super::scope::ScopeKind;
use super::super::types::{
    Field, Interface, Method, Param, Signature, Struct, Term, Ty, Type, instantiate, invalid,
    is_interface, pointer, slice,
};
use super::{Checker, Instance, ValueMode};

impl Checker<'_> {
    /// Evaluate `node` as a type and record it.
    pub(super) fn type_expr(&mut self, node: NodeId) -> Ty {
        let ty = self.type_expr_inner(node);
        self.record_type(node, ValueMode::TypeExpr, ty.clone());
        ty
    }

    fn type_expr_inner(&mut self, node: NodeId) -> Ty {
        let file = self.file();
        match file.kind(node).clone() {
            NodeKind::Ident(_) | NodeKind::Selector { .. } => match self.type_name(node) {
                Some(obj) => obj.ty().unwrap_or_else(invalid),
                None => invalid(),
            },
            NodeKind::Paren(x) => self.type_expr(x),
            NodeKind::Star(x) => pointer(self.type_expr(x)),
            NodeKind::ArrayType { len: None, elem } => slice(self.type_expr(elem)),
            NodeKind::ArrayType { len: Some(len), elem } => {
                let n = self.array_length(len);
                Arc::new(Type::Array(n, self.type_expr(elem)))
            }
            NodeKind::Ellipsis(Some(elem)) => slice(self.type_expr(elem)),
            NodeKind::MapType { key, value } => {
                let k = self.type_expr(key);
                let v = self.type_expr(value);
                Arc::new(Type::Map(k, v))
            }
            NodeKind::ChanType { dir, value } => Arc::new(Type::Chan(dir, self.type_expr(value))),
            NodeKind::FuncType { .. } => {
                let range = file.range(node);
                let scope = self.open_scope(ScopeKind::Func, node, range);
                let outer = std::mem::replace(&mut self.scope, scope);
                let sig = self.signature(node, None);
                self.scope = outer;
                Arc::new(Type::Signature(sig))
            }
            NodeKind::StructType { fields } => self.struct_type(&fields),
            NodeKind::InterfaceType { elems } => self.interface_type(&elems),
            NodeKind::Index { x, indices } => self.instantiate_type(x, &indices),
            NodeKind::Binary { op: BinaryOp::Or, .. } | NodeKind::Unary { op: UnaryOp::Tilde, .. } => {
                let mut terms = Vec::new();
                self.union_terms(node, &mut terms);
                Arc::new(Type::Interface(Interface {
                    terms,
                    ..Default::default()
                }))
            }
            NodeKind::Bad => invalid(),
            _ => {
                self.error(node, format!("{} is not a type", file.source(node)));
                invalid()
            }
        }
    }

    /// Resolve an identifier or qualified identifier that must name a type.
    fn type_name(&mut self, node: NodeId) -> Option<ObjRef> {
        let file = self.file();
        let (ident, obj) = match file.kind(node) {
            NodeKind::Ident(name) => {
                let Some(obj) = self.lookup(node) else {
                    self.error(node, format!("undefined: {name}"));
                    return None;
                };
                (node, obj)
            }
            NodeKind::Selector { x, sel } => {
                let pkg_obj = self.lookup(*x).filter(|o| o.kind() == ObjKind::PkgName);
                let Some(pkg_obj) = pkg_obj else {
                    self.error(node, format!("{} is not a type", file.source(node)));
                    return None;
                };
                self.record_use(*x, &pkg_obj);
                let imported = pkg_obj.imported()?.clone();
                let name = file.ident_name(*sel).unwrap_or("_");
                let Some(obj) = self.package_member(&imported, name) else {
                    self.error(*sel, format!("undefined: {}.{}", imported.name, name));
                    return None;
                };
                (*sel, obj)
            }
            _ => return None,
        };
        self.record_use(ident, &obj);
        if obj.kind() != ObjKind::TypeName {
            self.error(node, format!("{} is not a type", obj.name()));
            return None;
        }
        self.ensure(&obj);
        if obj.ty().is_none() {
            self.error(node, format!("invalid recursive type {}", obj.name()));
            return None;
        }
        Some(obj)
    }

    fn array_length(&mut self, len: NodeId) -> Option<u64> {
        let file = self.file();
        match file.kind(len) {
            NodeKind::Ellipsis(None) => None,
            NodeKind::BasicLit {
                kind: LitKind::Int,
                value,
            } => {
                self.expr(len);
                parse_int(value)
            }
            _ => {
                self.expr(len);
                None
            }
        }
    }

    /// `G[A, B]` in type position.
    pub(super) fn instantiate_type(&mut self, x: NodeId, indices: &[NodeId]) -> Ty {
        let base = self.type_expr(x);
        let targs: Vec<Ty> = indices.iter().map(|i| self.type_expr(*i)).collect();
        let Some(generic) = base.as_named().filter(|n| n.is_generic()) else {
            if !base.is_invalid() {
                self.error(x, format!("{base} is not a generic type"));
            }
            return invalid();
        };
        if generic.type_params().len() != targs.len() {
            self.error(x, format!("wrong number of type arguments for {}", generic.name()));
        }
        let inst = instantiate(generic, targs.clone());
        if let Some(ident) = self.naming_ident(x) {
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

    /// The identifier that names an entity: `x` for `x` and `p.x`.
    pub(super) fn naming_ident(&self, node: NodeId) -> Option<NodeId> {
        let file = &self.files[self.cur].1;
        match file.kind(node) {
            NodeKind::Ident(_) => Some(node),
            NodeKind::Selector { sel, .. } => Some(*sel),
            NodeKind::Paren(x) => self.naming_ident(*x),
            NodeKind::Index { x, .. } => self.naming_ident(*x),
            _ => None,
        }
    }

    fn struct_type(&mut self, fields: &[NodeId]) -> Ty {
        let file = self.file();
        let mut out = Vec::new();
        for &field in fields {
            let NodeKind::Field { names, ty: Some(ty), tag } = file.kind(field).clone() else {
                continue;
            };
            let field_ty = self.type_expr(ty);
            let tag = tag.map(|t| file.source(t).into());
            if names.is_empty() {
                let Some(ident) = embedded_ident(&file, ty) else {
                    self.error(ty, "invalid embedded field type");
                    continue;
                };
                let obj = self.new_object(ObjKind::Var(VarKind::Field { embedded: true }), ident);
                obj.set_ty(field_ty.clone());
                self.record_def(ident, &obj);
                out.push(Field {
                    obj,
                    ty: field_ty,
                    embedded: true,
                    tag,
                });
                continue;
            }
            for ident in names {
                let obj = self.new_object(ObjKind::Var(VarKind::Field { embedded: false }), ident);
                obj.set_ty(field_ty.clone());
                self.record_def(ident, &obj);
                out.push(Field {
                    obj,
                    ty: field_ty.clone(),
                    embedded: false,
                    tag: tag.clone(),
                });
            }
        }
        Arc::new(Type::Struct(Struct { fields: out }))
    }

    fn interface_type(&mut self, elems: &[NodeId]) -> Ty {
        let file = self.file();
        let mut iface = Interface::default();
        for &elem in elems {
            let NodeKind::Field { names, ty: Some(ty), .. } = file.kind(elem).clone() else {
                continue;
            };
            if let Some(&name) = names.first() {
                let obj = self.new_object(ObjKind::Func, name);
                let range = file.range(ty);
                let scope = self.open_scope(ScopeKind::Func, ty, range);
                let outer = std::mem::replace(&mut self.scope, scope);
                let sig = self.signature(ty, None);
                self.scope = outer;
                let sig_ty = Arc::new(Type::Signature(sig));
                self.record_type(ty, ValueMode::TypeExpr, sig_ty.clone());
                obj.set_ty(sig_ty.clone());
                self.record_def(name, &obj);
                iface.methods.push(Method { obj, ty: sig_ty });
                continue;
            }
            match file.kind(ty) {
                NodeKind::Binary { op: BinaryOp::Or, .. } | NodeKind::Unary { op: UnaryOp::Tilde, .. } => {
                    self.union_terms(ty, &mut iface.terms);
                    self.record_type(ty, ValueMode::TypeExpr, invalid());
                }
                _ => {
                    let t = self.type_expr(ty);
                    if t.as_named().is_some_and(|n| n.name() == "comparable" && n.obj().pkg().is_none()) {
                        iface.comparable = true;
                    } else if is_interface(&t) {
                        iface.embedded.push(t);
                    } else if !t.is_invalid() {
                        iface.terms.push(Term { tilde: false, ty: t });
                    }
                }
            }
        }

        let ty = Arc::new(Type::Interface(iface.clone()));
        // Methods of an interface literal have the literal as receiver.
        for m in &iface.methods {
            if let Some(sig) = m.obj.signature() {
                m.obj.set_ty(Arc::new(Type::Signature(Signature {
                    recv: Some(Param::new("", ty.clone())),
                    ..sig
                })));
            }
        }
        ty
    }

    fn union_terms(&mut self, node: NodeId, out: &mut Vec<Term>) {
        let file = self.file();
        match file.kind(node) {
            NodeKind::Binary {
                op: BinaryOp::Or,
                x,
                y,
            } => {
                self.union_terms(*x, out);
                self.union_terms(*y, out);
            }
            NodeKind::Unary {
                op: UnaryOp::Tilde,
                x,
            } => {
                let ty = self.type_expr(*x);
                out.push(Term { tilde: true, ty });
            }
            _ => {
                let ty = self.type_expr(node);
                out.push(Term { tilde: false, ty });
            }
        }
    }

    /// The constraint of a type parameter. Non-interface constraints such
    /// as `~int | string` are wrapped in an implicit interface.
    pub(super) fn constraint_type(&mut self, node: NodeId) -> Ty {
        let ty = self.type_expr(node);
        if is_interface(&ty) || ty.is_invalid() {
            return ty;
        }
        Arc::new(Type::Interface(Interface {
            terms: vec![Term { tilde: false, ty }],
            ..Default::default()
        }))
    }
}

/// The identifier naming an embedded field's type: `T`, `*T`, `p.T`, `T[A]`.
fn embedded_ident(file: &crate::parser::File, mut ty: NodeId) -> Option<NodeId> {
    loop {
        match file.kind(ty) {
            NodeKind::Star(x) | NodeKind::Paren(x) => ty = *x,
            NodeKind::Index { x, .. } => ty = *x,
            NodeKind::Selector { sel, .. } => return Some(*sel),
            NodeKind::Ident(_) => return Some(ty),
            _ => return None,
        }
    }
}

fn parse_int(lit: &str) -> Option<u64> {
    let digits: String = lit.chars().filter(|c| *c != '_').collect();
    let lower = digits.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        u64::from_str_radix(bin, 2).ok()
    } else if let Some(oct) = lower.strip_prefix("0o") {
        u64::from_str_radix(oct, 8).ok()
    } else if lower.len() > 1 && lower.starts_with('0') {
        u64::from_str_radix(&lower[1..], 8).ok()
    } else {
        lower.parse().ok()
    }
}
