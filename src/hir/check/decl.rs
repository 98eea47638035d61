//! Package-level declarations: collection, lazy resolution, function bodies.

use std::sync::Arc;

use text_size::{TextRange, TextSize};

use crate::parser::{DeclKind, NodeId, NodeKind, walk};

use super::super::objects::{ObjKind, ObjRef, Object, PkgRef, VarKind};
use super::super::scope::{ScopeId, ScopeKind};
use super::super::types::{
    BasicKind, Param, Signature, Ty, Type, TypeParam, basic, default_type, instantiate, invalid,
    named, pointer, slice, under,
};
use super::super::universe;
use super::{CheckMode, Checker, Decl, FuncCtx, ObjKey, ValueMode};

impl Checker<'_> {
    // ------------------------------------------------------------------
    // Collection
    // ------------------------------------------------------------------

    pub(super) fn collect(&mut self) {
        for i in 0..self.files.len() {
            let (file_id, file) = self.files[i].clone();
            let range = TextRange::up_to(TextSize::of(&*file.text));
            let scope = self.scopes.push(
                ScopeKind::File,
                ScopeId::PACKAGE,
                Some(file_id),
                range,
                Some(file.root),
            );
            self.infos[i].scopes.insert(file.root, scope);
            self.file_scopes.push(scope);
        }
        for i in 0..self.files.len() {
            self.cur = i;
            self.scope = self.file_scopes[i];
            self.collect_imports();
            self.collect_decls();
        }
        for i in 0..self.files.len() {
            self.cur = i;
            self.associate_methods();
        }
        self.cur = 0;
        self.scope = ScopeId::PACKAGE;
    }

    fn collect_imports(&mut self) {
        let file = self.file();
        for &spec in &file.imports {
            let NodeKind::ImportSpec { name, path } = file.kind(spec) else {
                continue;
            };
            let Some(import_path) = file.import_path(spec) else {
                continue;
            };
            let imported = self.import(&import_path, *path);
            let local = name.and_then(|n| file.ident_name(n).map(|s| (n, s)));
            match local {
                Some((_, "_")) => {}
                Some((ident, ".")) => {
                    let obj = Object::pkg_name(".", Some(self.pos(ident)), Some(self.pkg.clone()), imported.clone());
                    self.arena.objects.push(obj.clone());
                    self.info().implicits.insert(spec, obj);
                    for member in self.exported_members(&imported) {
                        self.scopes.insert(self.scope, member, TextSize::default());
                    }
                }
                Some((ident, local)) => {
                    let obj = Object::pkg_name(local, Some(self.pos(ident)), Some(self.pkg.clone()), imported);
                    self.arena.objects.push(obj.clone());
                    self.record_def(ident, &obj);
                    self.declare(&obj, TextSize::default());
                }
                None => {
                    let obj = Object::pkg_name(
                        imported.name.clone(),
                        Some(self.pos(*path)),
                        Some(self.pkg.clone()),
                        imported,
                    );
                    self.arena.objects.push(obj.clone());
                    self.info().implicits.insert(spec, obj.clone());
                    self.declare(&obj, TextSize::default());
                }
            }
        }
    }

    /// Import a dependency, returning a reference to it even when it is missing.
    fn import(&mut self, path: &str, node: NodeId) -> Arc<PkgRef> {
        if path == "unsafe" {
            return universe::universe().unsafe_pkg.clone();
        }
        if let Some(pkg) = self.imported.get(path) {
            return pkg.pkg_ref().clone();
        }
        match self.importer.import(path) {
            Some(pkg) => {
                let pkg_ref = pkg.pkg_ref().clone();
                self.imported.insert(path.into(), pkg);
                pkg_ref
            }
            None => {
                self.error(node, format!("could not import {path}"));
                let name = path.rsplit('/').next().unwrap_or(path);
                PkgRef::new(path, name)
            }
        }
    }

    fn exported_members(&self, pkg: &PkgRef) -> Vec<ObjRef> {
        if pkg.path == "unsafe" {
            return ["Pointer", "Sizeof", "Offsetof", "Alignof", "Add", "Slice", "SliceData", "String", "StringData"]
                .into_iter()
                .filter_map(universe::lookup_unsafe)
                .collect();
        }
        match self.imported.get(pkg.path.as_str()) {
            Some(p) => p.members().filter(|o| o.is_exported()).cloned().collect(),
            None => Vec::new(),
        }
    }

    /// A member of an imported package, or of `unsafe`.
    pub(super) fn package_member(&self, pkg: &PkgRef, name: &str) -> Option<ObjRef> {
        if pkg.path == "unsafe" {
            return universe::lookup_unsafe(name);
        }
        let member = self.imported.get(pkg.path.as_str())?.lookup(name)?;
        member.is_exported().then_some(member)
    }

    fn collect_decls(&mut self) {
        let file = self.file();
        let file_idx = self.cur;
        for &decl in &file.decls {
            match file.kind(decl) {
                NodeKind::GenDecl { kind, specs, .. } => {
                    let mut source = None;
                    for &spec in specs {
                        match (kind, file.kind(spec)) {
                            (DeclKind::Const | DeclKind::Var, NodeKind::ValueSpec { names, ty, values }) => {
                                let is_const = *kind == DeclKind::Const;
                                if !is_const || ty.is_some() || !values.is_empty() {
                                    source = Some(spec);
                                }
                                let obj_kind = if is_const {
                                    ObjKind::Const
                                } else {
                                    ObjKind::Var(VarKind::PackageLevel)
                                };
                                for &name in names {
                                    let obj = self.new_object(obj_kind, name);
                                    self.record_def(name, &obj);
                                    self.declare_package(name, &obj);
                                    if let Some(key) = obj.key() {
                                        self.decls.insert(
                                            key,
                                            Decl::Value {
                                                file: file_idx,
                                                spec,
                                                source: source.unwrap_or(spec),
                                                is_const,
                                            },
                                        );
                                    }
                                }
                            }
                            (DeclKind::Type, NodeKind::TypeSpec { name, .. }) => {
                                let obj = self.declare_type_name(spec);
                                self.declare_package(*name, &obj);
                                if let Some(key) = obj.key() {
                                    self.decls.insert(key, Decl::Type { file: file_idx, spec });
                                }
                            }
                            _ => {}
                        }
                    }
                }
                NodeKind::FuncDecl { recv, name, .. } => {
                    let obj = self.new_object(ObjKind::Func, *name);
                    self.record_def(*name, &obj);
                    let is_init = recv.is_none() && obj.name() == "init";
                    if recv.is_none() && !is_init {
                        self.declare_package(*name, &obj);
                    }
                    if let Some(key) = obj.key() {
                        self.decls.insert(key, Decl::Func { file: file_idx, decl });
                    }
                }
                _ => {}
            }
        }
    }

    fn declare_package(&mut self, ident: NodeId, obj: &ObjRef) {
        if obj.name() == "_" {
            return;
        }
        if let Some(prev) = self.scopes.insert(ScopeId::PACKAGE, obj.clone(), TextSize::default()) {
            self.error(ident, format!("{} redeclared in this block", prev.name()));
        }
    }

    /// Create the object (and named type) declared by a type spec.
    pub(super) fn declare_type_name(&mut self, spec: NodeId) -> ObjRef {
        let file = self.file();
        let NodeKind::TypeSpec {
            name,
            type_params,
            assign,
            ..
        } = file.kind(spec)
        else {
            return self.new_object(ObjKind::TypeName, spec);
        };
        let obj = if *assign {
            let obj = Object::type_alias(
                file.ident_name(*name).unwrap_or("_"),
                Some(self.pos(*name)),
                Some(self.pkg.clone()),
            );
            self.arena.objects.push(obj.clone());
            obj
        } else {
            let obj = self.new_object(ObjKind::TypeName, *name);
            let mut tparams = Vec::new();
            for &field in type_params {
                if let NodeKind::Field { names, .. } = file.kind(field) {
                    for &ident in names {
                        let tp = self.new_type_param(ident, tparams.len());
                        self.record_def(ident, tp.obj());
                        tparams.push(tp);
                    }
                }
            }
            let named_ty = self.new_named(obj.clone(), tparams);
            obj.set_ty(named(named_ty));
            obj
        };
        self.record_def(*name, &obj);
        obj
    }

    fn associate_methods(&mut self) {
        let file = self.file();
        for &decl in &file.decls {
            let NodeKind::FuncDecl {
                recv: Some(recv),
                name,
                ..
            } = file.kind(decl)
            else {
                continue;
            };
            let Some(method) = self.info().defs.get(name).cloned() else {
                continue;
            };
            if method.name() == "_" {
                continue;
            }
            let Some(base) = recv
                .first()
                .and_then(|f| match file.kind(*f) {
                    NodeKind::Field { ty: Some(ty), .. } => receiver_base(&file, *ty),
                    _ => None,
                })
                .and_then(|ident| file.ident_name(ident))
            else {
                continue;
            };
            let Some(base_obj) = self.scopes.lookup(ScopeId::PACKAGE, base).cloned() else {
                continue;
            };
            if let Some(ty) = base_obj.ty()
                && let Type::Named(n) = ty.as_ref()
            {
                if n.methods().iter().any(|m| m.name() == method.name()) {
                    self.error(*name, format!("method {}.{} already declared", base, method.name()));
                    continue;
                }
                n.add_method(method);
            }
        }
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    pub(super) fn resolve_package(&mut self) {
        let keys: Vec<_> = self.decls.keys().copied().collect();
        for key in keys {
            self.resolve_decl(key);
        }
    }

    pub(super) fn resolve_decl(&mut self, key: ObjKey) {
        let Some(decl) = self.decls.get(&key).copied() else {
            return;
        };
        let site = match decl {
            Decl::Type { file, spec } => (file, spec),
            Decl::Value { file, spec, .. } => (file, spec),
            Decl::Func { file, decl } => (file, decl),
        };
        if self.resolved_specs.contains(&site) || !self.resolving.insert(site) {
            return;
        }
        self.at_file(site.0, |c| match decl {
            Decl::Type { spec, .. } => {
                let name = type_spec_name(&c.file(), spec);
                if let Some(obj) = c.info().defs.get(&name).cloned() {
                    c.type_spec(spec, &obj);
                }
            }
            Decl::Value {
                spec,
                source,
                is_const,
                ..
            } => c.value_spec(spec, source, is_const, false),
            Decl::Func { decl, .. } => c.func_decl(decl),
        });
        self.resolving.remove(&site);
        self.resolved_specs.insert(site);
    }

    /// Resolve the type declared by `spec` into `obj`.
    pub(super) fn type_spec(&mut self, spec: NodeId, obj: &ObjRef) {
        let file = self.file();
        let NodeKind::TypeSpec {
            type_params, ty, assign, ..
        } = file.kind(spec).clone()
        else {
            return;
        };
        if assign {
            let target = self.type_expr(ty);
            obj.set_ty(target);
            return;
        }
        let Some(named_ty) = obj.ty().and_then(|t| t.as_named().cloned()) else {
            return;
        };

        let scope = (!type_params.is_empty()).then(|| {
            let range = file.range(spec);
            self.open_scope(ScopeKind::Block, spec, range)
        });
        let outer = self.scope;
        if let Some(scope) = scope {
            self.scope = scope;
            for tp in named_ty.type_params() {
                self.declare(tp.obj(), file.range(spec).start());
            }
            self.type_param_constraints(&type_params, named_ty.type_params());
        }

        let rhs = self.type_expr(ty);
        let underlying = match rhs.as_ref() {
            Type::Named(n) => {
                if !n.has_underlying()
                    && let Some(key) = n.obj().key()
                {
                    self.resolve_decl(key);
                }
                if n.has_underlying() {
                    n.underlying()
                } else {
                    self.error(ty, format!("invalid recursive type {}", obj.name()));
                    invalid()
                }
            }
            Type::TypeParam(_) => {
                self.error(ty, "cannot use a type parameter as RHS in type declaration");
                invalid()
            }
            _ => rhs.clone(),
        };
        named_ty.set_underlying(underlying.clone());

        if let Type::Interface(iface) = underlying.as_ref() {
            let recv_ty = named(named_ty.clone());
            for m in &iface.methods {
                if let Some(sig) = m.obj.signature() {
                    m.obj.set_ty(Arc::new(Type::Signature(Signature {
                        recv: Some(Param::new("", recv_ty.clone())),
                        ..sig
                    })));
                }
            }
        }
        self.scope = outer;
    }

    /// Resolve the objects of a const or var spec.
    ///
    /// `local` specs declare into the current scope as they go.
    pub(super) fn value_spec(&mut self, spec: NodeId, source: NodeId, is_const: bool, local: bool) {
        let file = self.file();
        let NodeKind::ValueSpec { names, .. } = file.kind(spec).clone() else {
            return;
        };
        let NodeKind::ValueSpec { ty, values, .. } = file.kind(source).clone() else {
            return;
        };
        let declared = ty.map(|t| self.type_expr(t));
        let hint = declared.clone();
        let value_types = self.value_types(&values, names.len(), hint.as_ref());

        let end = file.range(spec).end();
        for (i, &name) in names.iter().enumerate() {
            let obj = if local {
                let kind = if is_const {
                    ObjKind::Const
                } else {
                    ObjKind::Var(VarKind::Local)
                };
                let obj = self.new_object(kind, name);
                self.record_def(name, &obj);
                obj
            } else {
                match self.info().defs.get(&name).cloned() {
                    Some(obj) => obj,
                    None => continue,
                }
            };
            let value_ty = value_types.get(i).cloned();
            let ty = match (&declared, value_ty) {
                (Some(t), _) => t.clone(),
                (None, Some(v)) if is_const => v,
                (None, Some(v)) => default_type(&v),
                (None, None) => {
                    self.error(name, "missing init expr");
                    invalid()
                }
            };
            obj.set_ty(ty);
            if local {
                self.declare(&obj, end);
            }
        }
    }

    /// Types of the values initializing `n` names.
    pub(super) fn value_types(&mut self, values: &[NodeId], n: usize, hint: Option<&Ty>) -> Vec<Ty> {
        match values {
            [] => Vec::new(),
            [single] if n > 1 => self.multi_expr(*single, n),
            _ => {
                if values.len() != n {
                    if let Some(first) = values.first() {
                        self.error(*first, format!("assignment mismatch: {n} variables but {} values", values.len()));
                    }
                }
                values.iter().map(|v| self.expr_hint(*v, hint).ty).collect()
            }
        }
    }

    /// Resolve the signature of a function declaration.
    fn func_decl(&mut self, decl: NodeId) {
        let file = self.file();
        let NodeKind::FuncDecl { recv, name, ty, .. } = file.kind(decl).clone() else {
            return;
        };
        let Some(obj) = self.info().defs.get(&name).cloned() else {
            return;
        };
        let scope = self.open_scope(ScopeKind::Func, ty, file.range(decl));
        self.func_scopes.insert((self.cur, decl), scope);
        let outer = std::mem::replace(&mut self.scope, scope);
        let recv_param = recv.and_then(|fields| self.receiver(&fields));
        let sig = self.signature(ty, recv_param);
        obj.set_ty(Arc::new(Type::Signature(sig)));
        self.scope = outer;
    }

    /// Declare the receiver, including receiver type parameters.
    fn receiver(&mut self, fields: &[NodeId]) -> Option<Param> {
        let file = self.file();
        let field = *fields.first()?;
        let NodeKind::Field { names, ty: Some(ty), .. } = file.kind(field).clone() else {
            return None;
        };
        let visible = self.scopes.scope(self.scope).range.start();

        let (inner, is_ptr) = match file.kind(ty) {
            NodeKind::Star(x) => (*x, true),
            _ => (ty, false),
        };
        let recv_ty = match file.kind(inner).clone() {
            NodeKind::Index { x, indices } => {
                let base = self.type_expr(x);
                match base.as_named() {
                    Some(n) if n.is_generic() => {
                        if let Some(key) = n.obj().key() {
                            self.resolve_decl(key);
                        }
                        let mut targs = Vec::new();
                        for (i, &ident) in indices.iter().enumerate() {
                            let tp = self.new_type_param(ident, i);
                            if let Some(c) = n.type_params().get(i).and_then(|p| p.constraint()) {
                                tp.set_constraint(c);
                            }
                            self.record_def(ident, tp.obj());
                            self.declare(tp.obj(), visible);
                            targs.push(Arc::new(Type::TypeParam(tp)));
                        }
                        let inst = instantiate(n, targs);
                        self.record_type(inner, ValueMode::TypeExpr, inst.clone());
                        inst
                    }
                    _ => {
                        self.error(inner, "receiver type is not generic");
                        invalid()
                    }
                }
            }
            _ => self.type_expr(inner),
        };
        let recv_ty = if is_ptr {
            let p = pointer(recv_ty);
            self.record_type(ty, ValueMode::TypeExpr, p.clone());
            p
        } else {
            recv_ty
        };

        match names.first() {
            Some(&ident) => {
                let obj = self.new_object(ObjKind::Var(VarKind::Receiver), ident);
                obj.set_ty(recv_ty.clone());
                self.record_def(ident, &obj);
                self.declare(&obj, visible);
                Some(Param {
                    name: obj.name().into(),
                    ty: recv_ty,
                    obj: Some(obj),
                })
            }
            None => Some(Param::new("", recv_ty)),
        }
    }

    /// Build a signature from a function type, declaring its type
    /// parameters and named parameters in the current scope.
    pub(super) fn signature(&mut self, func_type: NodeId, recv: Option<Param>) -> Signature {
        let file = self.file();
        let NodeKind::FuncType {
            type_params,
            params,
            results,
            ..
        } = file.kind(func_type).clone()
        else {
            return Signature::default();
        };
        let visible = self.scopes.scope(self.scope).range.start();

        let mut tparams = Vec::new();
        for &field in &type_params {
            if let NodeKind::Field { names, .. } = file.kind(field) {
                for &ident in names {
                    let tp = self.new_type_param(ident, tparams.len());
                    self.record_def(ident, tp.obj());
                    self.declare(tp.obj(), visible);
                    tparams.push(tp);
                }
            }
        }
        self.type_param_constraints(&type_params, &tparams);

        let (params, variadic) = self.params(&params, VarKind::Param, visible);
        let (results, _) = self.params(&results, VarKind::Result, visible);
        Signature {
            recv,
            type_params: tparams,
            params,
            results,
            variadic,
        }
    }

    fn params(&mut self, fields: &[NodeId], kind: VarKind, visible: TextSize) -> (Vec<Param>, bool) {
        let file = self.file();
        let mut out = Vec::new();
        let mut variadic = false;
        for (i, &field) in fields.iter().enumerate() {
            let NodeKind::Field { names, ty: Some(ty), .. } = file.kind(field).clone() else {
                continue;
            };
            let param_ty = match file.kind(ty) {
                NodeKind::Ellipsis(Some(elem)) => {
                    if i + 1 == fields.len() {
                        variadic = true;
                    } else {
                        self.error(ty, "can only use ... with final parameter in list");
                    }
                    let elem = self.type_expr(*elem);
                    let s = slice(elem);
                    self.record_type(ty, ValueMode::TypeExpr, s.clone());
                    s
                }
                _ => self.type_expr(ty),
            };
            if names.is_empty() {
                out.push(Param::new("", param_ty));
                continue;
            }
            for ident in names {
                let obj = self.new_object(ObjKind::Var(kind), ident);
                obj.set_ty(param_ty.clone());
                self.record_def(ident, &obj);
                self.declare(&obj, visible);
                out.push(Param {
                    name: obj.name().into(),
                    ty: param_ty.clone(),
                    obj: Some(obj),
                });
            }
        }
        (out, variadic)
    }

    /// Set the constraints of type parameters declared by `fields`.
    fn type_param_constraints(&mut self, fields: &[NodeId], tparams: &[Arc<TypeParam>]) {
        let file = self.file();
        let mut index = 0;
        for &field in fields {
            let NodeKind::Field { names, ty, .. } = file.kind(field).clone() else {
                continue;
            };
            let constraint = match ty {
                Some(ty) => self.constraint_type(ty),
                None => universe::any_type(),
            };
            for _ in &names {
                if let Some(tp) = tparams.get(index) {
                    tp.set_constraint(constraint.clone());
                }
                index += 1;
            }
        }
    }

    // ------------------------------------------------------------------
    // Bodies
    // ------------------------------------------------------------------

    pub(super) fn check_bodies(&mut self) {
        for i in 0..self.files.len() {
            let file = self.files[i].1.clone();
            for &decl in &file.decls {
                let NodeKind::FuncDecl {
                    name,
                    body: Some(body),
                    ..
                } = file.kind(decl)
                else {
                    continue;
                };
                let Some(&scope) = self.func_scopes.get(&(i, decl)) else {
                    continue;
                };
                let sig = self.infos[i]
                    .defs
                    .get(name)
                    .and_then(|o| o.signature())
                    .unwrap_or_default();
                self.at_file(i, |c| {
                    c.scope = scope;
                    c.func_body(sig, *body);
                });
            }
        }
    }

    /// Check a function body in the current (function) scope.
    pub(super) fn func_body(&mut self, sig: Signature, body: NodeId) {
        let file = self.file();
        let mut ctx = FuncCtx {
            sig,
            labels: Default::default(),
        };
        let mut labels = Vec::new();
        walk::inspect(&file, body, |n| match file.kind(n) {
            NodeKind::FuncLit { .. } => false,
            NodeKind::Labeled { label, .. } => {
                labels.push(*label);
                true
            }
            _ => true,
        });
        for label in labels {
            let obj = self.new_object(ObjKind::Label, label);
            self.record_def(label, &obj);
            if ctx.labels.insert(obj.name().into(), obj).is_some() {
                self.error(label, "label already defined");
            }
        }
        let outer = self.func.replace(ctx);
        if let NodeKind::Block(stmts) = file.kind(body) {
            self.stmt_list(stmts);
        }
        self.func = outer;
    }

    /// A function literal: its signature, and its body in full mode.
    pub(super) fn func_lit(&mut self, node: NodeId, func_type: NodeId, body: NodeId) -> Ty {
        let range = self.file().range(node);
        let scope = self.open_scope(ScopeKind::Func, func_type, range);
        let outer = std::mem::replace(&mut self.scope, scope);
        let sig = self.signature(func_type, None);
        let ty = Arc::new(Type::Signature(sig.clone()));
        self.record_type(func_type, ValueMode::TypeExpr, ty.clone());
        if self.mode == CheckMode::Full {
            self.func_body(sig, body);
        }
        self.scope = outer;
        ty
    }

    /// Declare a local type spec in the current scope.
    pub(super) fn local_type_spec(&mut self, spec: NodeId) {
        let file = self.file();
        let NodeKind::TypeSpec { name, .. } = file.kind(spec) else {
            return;
        };
        let obj = self.declare_type_name(spec);
        self.declare(&obj, file.range(*name).start());
        self.type_spec(spec, &obj);
    }

    /// Types of a multi-valued expression: call results, or the comma-ok
    /// forms of map index, type assertion and receive.
    pub(super) fn multi_expr(&mut self, node: NodeId, n: usize) -> Vec<Ty> {
        let op = self.expr(node);
        match op.ty.as_ref() {
            Type::Tuple(types) => types.clone(),
            _ if n == 2 && self.is_comma_ok(node) => {
                vec![op.ty.clone(), basic(BasicKind::UntypedBool)]
            }
            _ => vec![op.ty],
        }
    }

    fn is_comma_ok(&self, node: NodeId) -> bool {
        let file = &self.files[self.cur].1;
        let mut node = node;
        while let NodeKind::Paren(x) = file.kind(node) {
            node = *x;
        }
        match file.kind(node) {
            NodeKind::TypeAssert { ty: Some(_), .. } => true,
            NodeKind::Unary {
                op: crate::parser::UnaryOp::Recv,
                ..
            } => true,
            NodeKind::Index { x, .. } => self.infos[self.cur]
                .type_of(*x)
                .is_some_and(|t| matches!(under(t).as_ref(), Type::Map(..))),
            _ => false,
        }
    }
}

/// The identifier naming the base type of a receiver expression.
fn receiver_base(file: &crate::parser::File, mut ty: NodeId) -> Option<NodeId> {
    loop {
        match file.kind(ty) {
            NodeKind::Star(x) | NodeKind::Paren(x) => ty = *x,
            NodeKind::Index { x, .. } => ty = *x,
            NodeKind::Ident(_) => return Some(ty),
            _ => return None,
        }
    }
}

fn type_spec_name(file: &crate::parser::File, spec: NodeId) -> NodeId {
    match file.kind(spec) {
        NodeKind::TypeSpec { name, .. } => *name,
        _ => spec,
    }
}
