//! Arena-allocated syntax tree.
//!
//! Every node lives in [`File::nodes`] and is addressed by a [`NodeId`].
//! Nodes carry their source range and a parent link, so walking up from a
//! leaf (as position resolution does) is cheap.

use std::sync::Arc;

use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use super::lexer::Comment;
use super::parser::SyntaxError;

/// Index of a node in its file's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LitKind {
    Int,
    Float,
    Imag,
    Char,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Pos,
    Neg,
    Not,
    Xor,
    Addr,
    Recv,
    Tilde,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Pos => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::Xor => "^",
            UnaryOp::Addr => "&",
            UnaryOp::Recv => "<-",
            UnaryOp::Tilde => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AndNot,
    LAnd,
    LOr,
    Eql,
    Neq,
    Lss,
    Leq,
    Gtr,
    Geq,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eql
                | BinaryOp::Neq
                | BinaryOp::Lss
                | BinaryOp::Leq
                | BinaryOp::Gtr
                | BinaryOp::Geq
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::LAnd | BinaryOp::LOr)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr)
    }
}

/// `=`, `:=` or an operator assignment such as `+=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    Define,
    Op(BinaryOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchKind {
    Break,
    Continue,
    Goto,
    Fallthrough,
}

impl BranchKind {
    pub fn keyword(self) -> &'static str {
        match self {
            BranchKind::Break => "break",
            BranchKind::Continue => "continue",
            BranchKind::Goto => "goto",
            BranchKind::Fallthrough => "fallthrough",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Import,
    Const,
    Type,
    Var,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    // Expressions and type expressions
    Bad,
    Ident(SmolStr),
    BasicLit {
        kind: LitKind,
        value: SmolStr,
    },
    CompositeLit {
        ty: Option<NodeId>,
        elts: Vec<NodeId>,
    },
    FuncLit {
        ty: NodeId,
        body: NodeId,
    },
    Paren(NodeId),
    Selector {
        x: NodeId,
        sel: NodeId,
    },
    /// `x[i]`, and also generic instantiation `F[int, string]`.
    Index {
        x: NodeId,
        indices: Vec<NodeId>,
    },
    Slice {
        x: NodeId,
        low: Option<NodeId>,
        high: Option<NodeId>,
        max: Option<NodeId>,
    },
    /// `x.(T)`; `ty` is `None` for the `x.(type)` form of a type switch.
    TypeAssert {
        x: NodeId,
        ty: Option<NodeId>,
    },
    Call {
        fun: NodeId,
        args: Vec<NodeId>,
        ellipsis: bool,
    },
    /// `*x`: a dereference or a pointer type.
    Star(NodeId),
    Unary {
        op: UnaryOp,
        x: NodeId,
    },
    Binary {
        op: BinaryOp,
        x: NodeId,
        y: NodeId,
    },
    KeyValue {
        key: NodeId,
        value: NodeId,
    },
    /// `[N]T`, `[...]T`, or `[]T` when `len` is `None`.
    ArrayType {
        len: Option<NodeId>,
        elem: NodeId,
    },
    /// `...T` in a parameter list, or `[...]` in an array length.
    Ellipsis(Option<NodeId>),
    StructType {
        fields: Vec<NodeId>,
    },
    InterfaceType {
        elems: Vec<NodeId>,
    },
    FuncType {
        func_kw: Option<TextSize>,
        type_params: Vec<NodeId>,
        params: Vec<NodeId>,
        results: Vec<NodeId>,
    },
    MapType {
        key: NodeId,
        value: NodeId,
    },
    ChanType {
        dir: ChanDir,
        value: NodeId,
    },
    /// A parameter, struct field, interface element or type parameter.
    Field {
        names: Vec<NodeId>,
        ty: Option<NodeId>,
        tag: Option<NodeId>,
    },

    // Statements
    BadStmt,
    DeclStmt(NodeId),
    EmptyStmt,
    Labeled {
        label: NodeId,
        stmt: NodeId,
    },
    ExprStmt(NodeId),
    Send {
        chan: NodeId,
        value: NodeId,
    },
    IncDec {
        x: NodeId,
        inc: bool,
    },
    Assign {
        lhs: Vec<NodeId>,
        op: AssignOp,
        rhs: Vec<NodeId>,
    },
    Go(NodeId),
    Defer(NodeId),
    Return(Vec<NodeId>),
    Branch {
        kind: BranchKind,
        label: Option<NodeId>,
    },
    Block(Vec<NodeId>),
    If {
        init: Option<NodeId>,
        cond: NodeId,
        body: NodeId,
        else_: Option<NodeId>,
    },
    /// `list` is `None` for `default:`.
    CaseClause {
        list: Option<Vec<NodeId>>,
        body: Vec<NodeId>,
        colon: TextSize,
    },
    Switch {
        init: Option<NodeId>,
        tag: Option<NodeId>,
        body: NodeId,
    },
    /// `assign` is an `ExprStmt` or `:=` whose expression is `x.(type)`.
    TypeSwitch {
        init: Option<NodeId>,
        assign: NodeId,
        body: NodeId,
    },
    CommClause {
        comm: Option<NodeId>,
        body: Vec<NodeId>,
        colon: TextSize,
    },
    Select {
        body: NodeId,
    },
    For {
        init: Option<NodeId>,
        cond: Option<NodeId>,
        post: Option<NodeId>,
        body: NodeId,
    },
    Range {
        key: Option<NodeId>,
        value: Option<NodeId>,
        op: Option<AssignOp>,
        x: NodeId,
        body: NodeId,
    },

    // Declarations
    ImportSpec {
        name: Option<NodeId>,
        path: NodeId,
    },
    ValueSpec {
        names: Vec<NodeId>,
        ty: Option<NodeId>,
        values: Vec<NodeId>,
    },
    TypeSpec {
        name: NodeId,
        type_params: Vec<NodeId>,
        assign: bool,
        ty: NodeId,
    },
    GenDecl {
        kind: DeclKind,
        specs: Vec<NodeId>,
        grouped: bool,
    },
    FuncDecl {
        recv: Option<Vec<NodeId>>,
        name: NodeId,
        ty: NodeId,
        body: Option<NodeId>,
    },
    File {
        package: NodeId,
        decls: Vec<NodeId>,
    },
}

impl NodeKind {
    pub fn is_stmt(&self) -> bool {
        matches!(
            self,
            NodeKind::BadStmt
                | NodeKind::DeclStmt(_)
                | NodeKind::EmptyStmt
                | NodeKind::Labeled { .. }
                | NodeKind::ExprStmt(_)
                | NodeKind::Send { .. }
                | NodeKind::IncDec { .. }
                | NodeKind::Assign { .. }
                | NodeKind::Go(_)
                | NodeKind::Defer(_)
                | NodeKind::Return(_)
                | NodeKind::Branch { .. }
                | NodeKind::Block(_)
                | NodeKind::If { .. }
                | NodeKind::CaseClause { .. }
                | NodeKind::Switch { .. }
                | NodeKind::TypeSwitch { .. }
                | NodeKind::CommClause { .. }
                | NodeKind::Select { .. }
                | NodeKind::For { .. }
                | NodeKind::Range { .. }
        )
    }

    pub fn is_expr(&self) -> bool {
        matches!(
            self,
            NodeKind::Bad
                | NodeKind::Ident(_)
                | NodeKind::BasicLit { .. }
                | NodeKind::CompositeLit { .. }
                | NodeKind::FuncLit { .. }
                | NodeKind::Paren(_)
                | NodeKind::Selector { .. }
                | NodeKind::Index { .. }
                | NodeKind::Slice { .. }
                | NodeKind::TypeAssert { .. }
                | NodeKind::Call { .. }
                | NodeKind::Star(_)
                | NodeKind::Unary { .. }
                | NodeKind::Binary { .. }
                | NodeKind::KeyValue { .. }
                | NodeKind::ArrayType { .. }
                | NodeKind::Ellipsis(_)
                | NodeKind::StructType { .. }
                | NodeKind::InterfaceType { .. }
                | NodeKind::FuncType { .. }
                | NodeKind::MapType { .. }
                | NodeKind::ChanType { .. }
        )
    }

    /// Short human-readable description used in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            NodeKind::Ident(_) => "identifier",
            NodeKind::BasicLit { .. } => "literal",
            NodeKind::CompositeLit { .. } => "composite literal",
            NodeKind::FuncLit { .. } => "function literal",
            NodeKind::Call { .. } => "call",
            NodeKind::Selector { .. } => "selector",
            NodeKind::FuncDecl { .. } => "function declaration",
            NodeKind::GenDecl { .. } => "declaration",
            NodeKind::ImportSpec { .. } => "import",
            NodeKind::Block(_) => "block",
            NodeKind::Field { .. } => "field",
            NodeKind::File { .. } => "file",
            k if k.is_stmt() => "statement",
            k if k.is_expr() => "expression",
            _ => "node",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub range: TextRange,
    pub parent: Option<NodeId>,
}

/// A parsed source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub text: Arc<str>,
    pub root: NodeId,
    pub package_name: NodeId,
    pub imports: Vec<NodeId>,
    pub decls: Vec<NodeId>,
    pub comments: Vec<Comment>,
    pub errors: Vec<SyntaxError>,
    pub(crate) nodes: Vec<Node>,
}

impl File {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn range(&self, id: NodeId) -> TextRange {
        self.nodes[id.index()].range
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::new)
    }

    pub fn source(&self, id: NodeId) -> &str {
        &self.text[self.range(id)]
    }

    pub fn slice(&self, range: TextRange) -> &str {
        &self.text[range]
    }

    pub fn package_name(&self) -> &str {
        self.ident_name(self.package_name).unwrap_or("")
    }

    pub fn ident_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Ident(name) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Unquoted path of an import spec.
    pub fn import_path(&self, spec: NodeId) -> Option<String> {
        match self.kind(spec) {
            NodeKind::ImportSpec { path, .. } => match self.kind(*path) {
                NodeKind::BasicLit { value, .. } => Some(unquote(value)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Children of a node in source order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let opt = |out: &mut Vec<NodeId>, n: &Option<NodeId>| out.extend(n.iter().copied());
        match self.kind(id) {
            NodeKind::Bad
            | NodeKind::Ident(_)
            | NodeKind::BasicLit { .. }
            | NodeKind::BadStmt
            | NodeKind::EmptyStmt => {}
            NodeKind::CompositeLit { ty, elts } => {
                opt(&mut out, ty);
                out.extend(elts);
            }
            NodeKind::FuncLit { ty, body } => out.extend([*ty, *body]),
            NodeKind::Paren(x)
            | NodeKind::Star(x)
            | NodeKind::DeclStmt(x)
            | NodeKind::ExprStmt(x)
            | NodeKind::Go(x)
            | NodeKind::Defer(x) => out.push(*x),
            NodeKind::Selector { x, sel } => out.extend([*x, *sel]),
            NodeKind::Index { x, indices } => {
                out.push(*x);
                out.extend(indices);
            }
            NodeKind::Slice { x, low, high, max } => {
                out.push(*x);
                opt(&mut out, low);
                opt(&mut out, high);
                opt(&mut out, max);
            }
            NodeKind::TypeAssert { x, ty } => {
                out.push(*x);
                opt(&mut out, ty);
            }
            NodeKind::Call { fun, args, .. } => {
                out.push(*fun);
                out.extend(args);
            }
            NodeKind::Unary { x, .. } => out.push(*x),
            NodeKind::Binary { x, y, .. } => out.extend([*x, *y]),
            NodeKind::KeyValue { key, value } => out.extend([*key, *value]),
            NodeKind::ArrayType { len, elem } => {
                opt(&mut out, len);
                out.push(*elem);
            }
            NodeKind::Ellipsis(elt) => opt(&mut out, elt),
            NodeKind::StructType { fields } => out.extend(fields),
            NodeKind::InterfaceType { elems } => out.extend(elems),
            NodeKind::FuncType {
                type_params,
                params,
                results,
                ..
            } => {
                out.extend(type_params);
                out.extend(params);
                out.extend(results);
            }
            NodeKind::MapType { key, value } => out.extend([*key, *value]),
            NodeKind::ChanType { value, .. } => out.push(*value),
            NodeKind::Field { names, ty, tag } => {
                out.extend(names);
                opt(&mut out, ty);
                opt(&mut out, tag);
            }
            NodeKind::Labeled { label, stmt } => out.extend([*label, *stmt]),
            NodeKind::Send { chan, value } => out.extend([*chan, *value]),
            NodeKind::IncDec { x, .. } => out.push(*x),
            NodeKind::Assign { lhs, rhs, .. } => {
                out.extend(lhs);
                out.extend(rhs);
            }
            NodeKind::Return(results) => out.extend(results),
            NodeKind::Branch { label, .. } => opt(&mut out, label),
            NodeKind::Block(stmts) => out.extend(stmts),
            NodeKind::If {
                init,
                cond,
                body,
                else_,
            } => {
                opt(&mut out, init);
                out.extend([*cond, *body]);
                opt(&mut out, else_);
            }
            NodeKind::CaseClause { list, body, .. } => {
                if let Some(list) = list {
                    out.extend(list);
                }
                out.extend(body);
            }
            NodeKind::Switch { init, tag, body } => {
                opt(&mut out, init);
                opt(&mut out, tag);
                out.push(*body);
            }
            NodeKind::TypeSwitch { init, assign, body } => {
                opt(&mut out, init);
                out.extend([*assign, *body]);
            }
            NodeKind::CommClause { comm, body, .. } => {
                opt(&mut out, comm);
                out.extend(body);
            }
            NodeKind::Select { body } => out.push(*body),
            NodeKind::For {
                init,
                cond,
                post,
                body,
            } => {
                opt(&mut out, init);
                opt(&mut out, cond);
                opt(&mut out, post);
                out.push(*body);
            }
            NodeKind::Range {
                key,
                value,
                x,
                body,
                ..
            } => {
                opt(&mut out, key);
                opt(&mut out, value);
                out.extend([*x, *body]);
            }
            NodeKind::ImportSpec { name, path } => {
                opt(&mut out, name);
                out.push(*path);
            }
            NodeKind::ValueSpec { names, ty, values } => {
                out.extend(names);
                opt(&mut out, ty);
                out.extend(values);
            }
            NodeKind::TypeSpec {
                name,
                type_params,
                ty,
                ..
            } => {
                out.push(*name);
                out.extend(type_params);
                out.push(*ty);
            }
            NodeKind::GenDecl { specs, .. } => out.extend(specs),
            NodeKind::FuncDecl {
                recv,
                name,
                ty,
                body,
            } => {
                if let Some(recv) = recv {
                    out.extend(recv);
                }
                out.extend([*name, *ty]);
                opt(&mut out, body);
            }
            NodeKind::File { package, decls } => {
                out.push(*package);
                out.extend(decls);
            }
        }
        out
    }

    /// Ancestors of `id`, starting with `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |n| self.parent(*n))
    }

    /// Comments that end on the line immediately before `pos` with no
    /// blank line in between: the doc comment of a declaration.
    pub fn doc_comments(&self, pos: TextSize) -> Vec<&Comment> {
        let mut docs: Vec<&Comment> = Vec::new();
        let mut next = pos;
        for comment in self.comments.iter().rev() {
            if comment.range.end() > next {
                continue;
            }
            let gap = &self.text[TextRange::new(comment.range.end(), next)];
            if gap.chars().filter(|c| *c == '\n').count() > 1 || !gap.trim().is_empty() {
                break;
            }
            docs.push(comment);
            next = comment.range.start();
        }
        docs.reverse();
        docs
    }
}

/// Strip quotes from a string literal, interpreting the common escapes.
pub fn unquote(lit: &str) -> String {
    if let Some(raw) = lit.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        return raw.to_string();
    }
    let inner = lit
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(lit);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
