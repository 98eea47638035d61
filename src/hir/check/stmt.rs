//! Statements.

use crate::parser::{AssignOp, DeclKind, NodeId, NodeKind};

use super::super::objects::{ObjKind, ObjRef, VarKind};
use super::super::types::{BasicKind, Ty, Type, basic, deref, default_type, invalid, under};
use super::Checker;

impl Checker<'_> {
    pub(super) fn stmt_list(&mut self, stmts: &[NodeId]) {
        for &stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, node: NodeId) {
        let file = self.file();
        match file.kind(node).clone() {
            NodeKind::BadStmt | NodeKind::EmptyStmt => {}
            NodeKind::DeclStmt(decl) => self.decl_stmt(decl),
            NodeKind::Labeled { stmt, .. } => self.stmt(stmt),
            NodeKind::ExprStmt(x) | NodeKind::Go(x) | NodeKind::Defer(x) => {
                self.expr(x);
            }
            NodeKind::Send { chan, value } => {
                let ch = self.expr(chan);
                let elem = match under(&ch.ty).as_ref() {
                    Type::Chan(_, elem) => Some(elem.clone()),
                    _ => None,
                };
                self.expr_hint(value, elem.as_ref());
            }
            NodeKind::IncDec { x, .. } => {
                self.expr(x);
            }
            NodeKind::Assign { lhs, op, rhs } => self.assign(node, &lhs, op, &rhs),
            NodeKind::Return(results) => {
                let expected: Vec<Ty> = self
                    .func
                    .as_ref()
                    .map(|f| f.sig.result_types())
                    .unwrap_or_default();
                if let [single] = results.as_slice()
                    && expected.len() > 1
                {
                    self.multi_expr(*single, expected.len());
                    return;
                }
                for (i, &r) in results.iter().enumerate() {
                    self.expr_hint(r, expected.get(i));
                }
            }
            NodeKind::Branch { label: Some(label), .. } => {
                let name = file.ident_name(label).unwrap_or("");
                let obj = self.func.as_ref().and_then(|f| f.labels.get(name).cloned());
                match obj {
                    Some(obj) => self.record_use(label, &obj),
                    None => self.error(label, format!("label {name} not defined")),
                }
            }
            NodeKind::Branch { .. } => {}
            NodeKind::Block(stmts) => self.in_scope(node, |c| c.stmt_list(&stmts)),
            NodeKind::If {
                init,
                cond,
                body,
                else_,
            } => self.in_scope(node, |c| {
                if let Some(init) = init {
                    c.stmt(init);
                }
                c.expr(cond);
                c.stmt(body);
                if let Some(else_) = else_ {
                    c.stmt(else_);
                }
            }),
            NodeKind::Switch { init, tag, body } => self.in_scope(node, |c| {
                if let Some(init) = init {
                    c.stmt(init);
                }
                let tag_ty = tag.map(|t| c.expr(t).ty);
                let file = c.file();
                let NodeKind::Block(clauses) = file.kind(body) else {
                    return;
                };
                for &clause in clauses {
                    let NodeKind::CaseClause { list, body, .. } = file.kind(clause) else {
                        continue;
                    };
                    c.in_scope(clause, |c| {
                        for &item in list.iter().flatten() {
                            c.expr_hint(item, tag_ty.as_ref());
                        }
                        c.stmt_list(body);
                    });
                }
            }),
            NodeKind::TypeSwitch { init, assign, body } => self.type_switch(node, init, assign, body),
            NodeKind::Select { body } => {
                let NodeKind::Block(clauses) = file.kind(body) else {
                    return;
                };
                for &clause in clauses {
                    let NodeKind::CommClause { comm, body, .. } = file.kind(clause) else {
                        continue;
                    };
                    self.in_scope(clause, |c| {
                        if let Some(comm) = comm {
                            c.stmt(*comm);
                        }
                        c.stmt_list(body);
                    });
                }
            }
            NodeKind::For {
                init,
                cond,
                post,
                body,
            } => self.in_scope(node, |c| {
                if let Some(init) = init {
                    c.stmt(init);
                }
                if let Some(cond) = cond {
                    c.expr(cond);
                }
                if let Some(post) = post {
                    c.stmt(post);
                }
                c.stmt(body);
            }),
            NodeKind::Range {
                key,
                value,
                op,
                x,
                body,
            } => self.range(node, key, value, op, x, body),
            NodeKind::CaseClause { .. } | NodeKind::CommClause { .. } => {}
            _ => {
                self.expr(node);
            }
        }
    }

    fn decl_stmt(&mut self, decl: NodeId) {
        let file = self.file();
        let NodeKind::GenDecl { kind, specs, .. } = file.kind(decl).clone() else {
            return;
        };
        let mut source = None;
        for spec in specs {
            match (kind, file.kind(spec)) {
                (DeclKind::Const | DeclKind::Var, NodeKind::ValueSpec { ty, values, .. }) => {
                    let is_const = kind == DeclKind::Const;
                    if !is_const || ty.is_some() || !values.is_empty() {
                        source = Some(spec);
                    }
                    self.value_spec(spec, source.unwrap_or(spec), is_const, true);
                }
                (DeclKind::Type, NodeKind::TypeSpec { .. }) => self.local_type_spec(spec),
                _ => {}
            }
        }
    }

    fn assign(&mut self, node: NodeId, lhs: &[NodeId], op: AssignOp, rhs: &[NodeId]) {
        let file = self.file();
        match op {
            AssignOp::Define => {
                let types = self.value_types(rhs, lhs.len(), None);
                let mut new_vars: Vec<ObjRef> = Vec::new();
                for (i, &ident) in lhs.iter().enumerate() {
                    let Some(name) = file.ident_name(ident) else {
                        self.error(ident, "non-name on left side of :=");
                        self.expr(ident);
                        continue;
                    };
                    let existing = (name != "_")
                        .then(|| self.scopes.lookup(self.scope, name).cloned())
                        .flatten();
                    match existing {
                        Some(obj) => self.record_use(ident, &obj),
                        None => {
                            let obj = self.new_object(ObjKind::Var(VarKind::Local), ident);
                            let ty = types.get(i).map(default_type).unwrap_or_else(invalid);
                            obj.set_ty(ty);
                            self.record_def(ident, &obj);
                            new_vars.push(obj);
                        }
                    }
                }
                if new_vars.is_empty() {
                    self.error(node, "no new variables on left side of :=");
                }
                let end = file.range(node).end();
                for obj in &new_vars {
                    self.declare(obj, end);
                }
            }
            AssignOp::Assign | AssignOp::Op(_) => {
                let mut lhs_types = Vec::new();
                for &l in lhs {
                    if file.ident_name(l) == Some("_") {
                        lhs_types.push(None);
                        continue;
                    }
                    lhs_types.push(Some(self.expr(l).ty));
                }
                if let [single] = rhs
                    && lhs.len() > 1
                {
                    self.multi_expr(*single, lhs.len());
                    return;
                }
                for (i, &r) in rhs.iter().enumerate() {
                    let hint = lhs_types.get(i).cloned().flatten();
                    self.expr_hint(r, hint.as_ref());
                }
            }
        }
    }

    fn type_switch(&mut self, node: NodeId, init: Option<NodeId>, assign: NodeId, body: NodeId) {
        self.in_scope(node, |c| {
            if let Some(init) = init {
                c.stmt(init);
            }
            let file = c.file();
            let (lhs, guard) = match file.kind(assign) {
                NodeKind::Assign { lhs, rhs, .. } => (lhs.first().copied(), rhs.first().copied()),
                NodeKind::ExprStmt(x) => (None, Some(*x)),
                _ => (None, None),
            };
            let Some(NodeKind::TypeAssert { x, .. }) = guard.map(|g| file.kind(g)) else {
                c.error(assign, "invalid type switch guard");
                return;
            };
            let x_ty = c.expr(*x).ty;

            let NodeKind::Block(clauses) = file.kind(body) else {
                return;
            };
            for &clause in clauses {
                let NodeKind::CaseClause { list, body, colon } = file.kind(clause) else {
                    continue;
                };
                c.in_scope(clause, |c| {
                    let mut single = None;
                    let items = list.as_deref().unwrap_or_default();
                    for &item in items {
                        let ty = if file.ident_name(item) == Some("nil") {
                            c.expr(item).ty
                        } else {
                            c.type_expr(item)
                        };
                        single = Some(ty);
                    }
                    if let Some(lhs) = lhs {
                        let ty = match (items.len(), single) {
                            (1, Some(t)) if !matches!(t.as_ref(), Type::Basic(BasicKind::UntypedNil)) => t,
                            _ => x_ty.clone(),
                        };
                        let obj = c.new_object(ObjKind::Var(VarKind::Local), lhs);
                        obj.set_ty(ty);
                        c.info().implicits.insert(clause, obj.clone());
                        c.declare(&obj, *colon);
                    }
                    c.stmt_list(body);
                });
            }
        });
    }

    fn range(
        &mut self,
        node: NodeId,
        key: Option<NodeId>,
        value: Option<NodeId>,
        op: Option<AssignOp>,
        x: NodeId,
        body: NodeId,
    ) {
        self.in_scope(node, |c| {
            let xo = c.expr(x);
            let (key_ty, value_ty) = range_types(&xo.ty);
            let file = c.file();
            match op {
                Some(AssignOp::Define) => {
                    let visible = file.range(body).start();
                    for (ident, ty) in [(key, key_ty), (value, value_ty)] {
                        let Some(ident) = ident else {
                            continue;
                        };
                        let obj = c.new_object(ObjKind::Var(VarKind::Local), ident);
                        obj.set_ty(ty);
                        c.record_def(ident, &obj);
                        c.declare(&obj, visible);
                    }
                }
                _ => {
                    for e in [key, value].into_iter().flatten() {
                        if file.ident_name(e) != Some("_") {
                            c.expr(e);
                        }
                    }
                }
            }
            c.stmt(body);
        });
    }
}

/// Key and value types produced by ranging over `ty`.
fn range_types(ty: &Ty) -> (Ty, Ty) {
    let int = || basic(BasicKind::Int);
    let (base, _) = deref(&under(ty));
    match under(&base).as_ref() {
        Type::Basic(kind) if kind.is_string() => (int(), basic(BasicKind::Int32)),
        Type::Basic(kind) if kind.is_integer() => (default_type(ty), invalid()),
        Type::Slice(elem) | Type::Array(_, elem) => (int(), elem.clone()),
        Type::Map(k, v) => (k.clone(), v.clone()),
        Type::Chan(_, elem) => (elem.clone(), invalid()),
        Type::Signature(sig) => {
            // func(yield func(K, V) bool)
            let yield_params = sig
                .params
                .first()
                .and_then(|p| p.ty.as_signature().map(|s| s.param_types()))
                .unwrap_or_default();
            let mut it = yield_params.into_iter();
            (
                it.next().unwrap_or_else(invalid),
                it.next().unwrap_or_else(invalid),
            )
        }
        _ => (invalid(), invalid()),
    }
}
