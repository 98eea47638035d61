//! Recursive descent parser for Go source.
//!
//! Builds the arena AST in [`super::ast`] from the token stream.
//! Recovers from errors by skipping tokens, so a partially written file
//! still produces a usable tree.

use std::sync::Arc;

use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use super::ast::{
    AssignOp, BinaryOp, BranchKind, ChanDir, DeclKind, File, LitKind, Node, NodeId, NodeKind,
    UnaryOp,
};
use super::lexer::{Token, TokenKind, tokenize};

/// A syntax error with location and message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub range: TextRange,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}

/// Parse Go source code into an arena AST.
pub fn parse(input: &str) -> File {
    let lexed = tokenize(input);
    let mut parser = Parser {
        text: input,
        tokens: lexed.tokens,
        pos: 0,
        nodes: Vec::new(),
        errors: lexed.errors,
        expr_lev: 0,
        last_end: TextSize::new(0),
    };
    let (root, package_name, imports, decls) = parser.parse_source_file();

    let mut file = File {
        text: Arc::from(input),
        root,
        package_name,
        imports,
        decls,
        comments: lexed.comments,
        errors: parser.errors,
        nodes: parser.nodes,
    };
    link_parents(&mut file);
    file
}

fn link_parents(file: &mut File) {
    let mut links = Vec::with_capacity(file.nodes.len());
    for id in file.node_ids() {
        for child in file.children(id) {
            links.push((child, id));
        }
    }
    for (child, parent) in links {
        file.nodes[child.index()].parent = Some(parent);
    }
}

/// A parameter list entry before names and types are grouped.
enum Entry {
    Bare(NodeId),
    Named(NodeId, NodeId),
    Type(NodeId),
}

/// A simple statement before the caller decides how to wrap it.
enum Simple {
    Expr(NodeId),
    Stmt(NodeId),
    Range {
        start: TextSize,
        key: Option<NodeId>,
        value: Option<NodeId>,
        op: Option<AssignOp>,
        x: NodeId,
    },
}

/// The parser state
struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    nodes: Vec<Node>,
    errors: Vec<SyntaxError>,
    /// Negative while parsing control clause headers, where `T{` opens a block.
    expr_lev: i32,
    last_end: TextSize,
}

impl<'a> Parser<'a> {
    // =========================================================================
    // TOKEN ACCESS
    // =========================================================================

    fn current(&self) -> Token {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> TokenKind {
        self.current().kind
    }

    fn nth(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn at_eof(&self) -> bool {
        self.at(TokenKind::Eof)
    }

    fn start(&self) -> TextSize {
        self.current().range.start()
    }

    fn token_text(&self, token: Token) -> &'a str {
        &self.text[token.range]
    }

    fn bump(&mut self) -> Token {
        let token = self.current();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        if !token.range.is_empty() {
            self.last_end = token.range.end();
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> TextSize {
        let pos = self.start();
        if !self.eat(kind) {
            self.error(format!("expected {kind:?}, found {:?}", self.kind()));
        }
        pos
    }

    fn expect_semi(&mut self) {
        match self.kind() {
            TokenKind::Semi => {
                self.bump();
            }
            TokenKind::RParen | TokenKind::RBrace | TokenKind::Eof => {}
            other => {
                self.error(format!("expected ';', found {other:?}"));
                // Skip to the next statement boundary
                while !matches!(
                    self.kind(),
                    TokenKind::Semi | TokenKind::RBrace | TokenKind::Eof
                ) {
                    self.bump();
                }
                self.eat(TokenKind::Semi);
            }
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        let token = self.current();
        let range = if token.range.is_empty() {
            TextRange::empty(token.range.start())
        } else {
            token.range
        };
        self.errors.push(SyntaxError::new(message, range));
    }

    // =========================================================================
    // NODE ALLOCATION
    // =========================================================================

    fn alloc(&mut self, kind: NodeKind, start: TextSize) -> NodeId {
        let end = self.last_end.max(start);
        self.alloc_range(kind, TextRange::new(start, end))
    }

    fn alloc_range(&mut self, kind: NodeKind, range: TextRange) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node {
            kind,
            range,
            parent: None,
        });
        id
    }

    fn range_of(&self, id: NodeId) -> TextRange {
        self.nodes[id.index()].range
    }

    fn kind_of(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    fn cover(&self, a: NodeId, b: NodeId) -> TextRange {
        self.range_of(a).cover(self.range_of(b))
    }

    // =========================================================================
    // FILE AND DECLARATIONS
    // =========================================================================

    fn parse_source_file(&mut self) -> (NodeId, NodeId, Vec<NodeId>, Vec<NodeId>) {
        self.expect(TokenKind::Package);
        let package = self.parse_ident();
        self.expect_semi();

        let mut imports = Vec::new();
        let mut decls = Vec::new();
        while self.at(TokenKind::Import) {
            let decl = self.parse_gen_decl(DeclKind::Import);
            if let NodeKind::GenDecl { specs, .. } = self.kind_of(decl) {
                imports.extend(specs.iter().copied());
            }
            decls.push(decl);
            self.expect_semi();
        }

        while !self.at_eof() {
            let before = self.pos;
            match self.kind() {
                TokenKind::Semi => {
                    self.bump();
                    continue;
                }
                TokenKind::Const => decls.push(self.parse_gen_decl(DeclKind::Const)),
                TokenKind::Var => decls.push(self.parse_gen_decl(DeclKind::Var)),
                TokenKind::Type => decls.push(self.parse_gen_decl(DeclKind::Type)),
                TokenKind::Func => decls.push(self.parse_func_decl()),
                TokenKind::Import => {
                    self.error("imports must appear before other declarations");
                    decls.push(self.parse_gen_decl(DeclKind::Import));
                }
                other => {
                    self.error(format!("expected declaration, found {other:?}"));
                    self.bump();
                }
            }
            if self.pos == before {
                self.bump();
            }
            self.expect_semi();
        }

        let root = self.alloc_range(
            NodeKind::File {
                package,
                decls: decls.clone(),
            },
            TextRange::up_to(TextSize::of(self.text)),
        );
        (root, package, imports, decls)
    }

    fn parse_gen_decl(&mut self, kind: DeclKind) -> NodeId {
        let start = self.start();
        self.bump();
        let mut specs = Vec::new();
        let grouped = self.eat(TokenKind::LParen);
        if grouped {
            while !self.at(TokenKind::RParen) && !self.at_eof() {
                if self.eat(TokenKind::Semi) {
                    continue;
                }
                let before = self.pos;
                specs.push(self.parse_spec(kind));
                if self.pos == before {
                    self.bump();
                }
                self.expect_semi();
            }
            self.expect(TokenKind::RParen);
        } else {
            specs.push(self.parse_spec(kind));
        }
        self.alloc(
            NodeKind::GenDecl {
                kind,
                specs,
                grouped,
            },
            start,
        )
    }

    fn parse_spec(&mut self, kind: DeclKind) -> NodeId {
        let start = self.start();
        match kind {
            DeclKind::Import => {
                let name = match self.kind() {
                    TokenKind::Ident => Some(self.parse_ident()),
                    TokenKind::Period => {
                        let tok = self.bump();
                        Some(self.alloc_range(NodeKind::Ident(SmolStr::new(".")), tok.range))
                    }
                    _ => None,
                };
                let path = if self.at(TokenKind::String) {
                    self.parse_basic_lit()
                } else {
                    self.error("expected import path");
                    self.alloc(NodeKind::Bad, self.start())
                };
                self.alloc(NodeKind::ImportSpec { name, path }, start)
            }
            DeclKind::Const | DeclKind::Var => {
                let names = self.parse_ident_list();
                let ty = if !matches!(
                    self.kind(),
                    TokenKind::Assign | TokenKind::Semi | TokenKind::RParen
                ) {
                    Some(self.parse_type())
                } else {
                    None
                };
                let values = if self.eat(TokenKind::Assign) {
                    self.parse_expr_list()
                } else {
                    Vec::new()
                };
                self.alloc(NodeKind::ValueSpec { names, ty, values }, start)
            }
            DeclKind::Type => {
                let name = self.parse_ident();
                let type_params = if self.at(TokenKind::LBrack)
                    && self.nth(1) == TokenKind::Ident
                    && self.nth(2) != TokenKind::RBrack
                {
                    self.parse_type_params()
                } else {
                    Vec::new()
                };
                let assign = self.eat(TokenKind::Assign);
                let ty = self.parse_type();
                self.alloc(
                    NodeKind::TypeSpec {
                        name,
                        type_params,
                        assign,
                        ty,
                    },
                    start,
                )
            }
        }
    }

    fn parse_func_decl(&mut self) -> NodeId {
        let start = self.start();
        let func_kw = self.expect(TokenKind::Func);
        let recv = if self.at(TokenKind::LParen) {
            Some(self.parse_params(TokenKind::LParen, TokenKind::RParen))
        } else {
            None
        };
        let name = self.parse_ident();

        let ty_start = self.start();
        let type_params = if self.at(TokenKind::LBrack) {
            self.parse_type_params()
        } else {
            Vec::new()
        };
        let params = self.parse_params(TokenKind::LParen, TokenKind::RParen);
        let results = self.parse_results();
        let ty = self.alloc(
            NodeKind::FuncType {
                func_kw: Some(func_kw),
                type_params,
                params,
                results,
            },
            ty_start,
        );

        let body = if self.at(TokenKind::LBrace) {
            Some(self.parse_block())
        } else {
            None
        };
        self.alloc(
            NodeKind::FuncDecl {
                recv,
                name,
                ty,
                body,
            },
            start,
        )
    }

    fn parse_type_params(&mut self) -> Vec<NodeId> {
        self.expect(TokenKind::LBrack);
        let mut fields = Vec::new();
        while self.at(TokenKind::Ident) {
            let mut names = vec![self.parse_ident()];
            while self.at(TokenKind::Comma) && self.nth(1) == TokenKind::Ident {
                // `[K, V any]` shares one constraint
                if matches!(self.nth(2), TokenKind::Comma) || self.starts_type(self.nth(2)) {
                    self.bump();
                    names.push(self.parse_ident());
                } else {
                    break;
                }
            }
            let constraint = self.parse_constraint();
            let range = self.cover(names[0], constraint);
            fields.push(self.alloc_range(
                NodeKind::Field {
                    names,
                    ty: Some(constraint),
                    tag: None,
                },
                range,
            ));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrack);
        fields
    }

    fn parse_constraint(&mut self) -> NodeId {
        let mut x = self.parse_constraint_term();
        while self.at(TokenKind::Or) {
            self.bump();
            let y = self.parse_constraint_term();
            let range = self.cover(x, y);
            x = self.alloc_range(
                NodeKind::Binary {
                    op: BinaryOp::Or,
                    x,
                    y,
                },
                range,
            );
        }
        x
    }

    fn parse_constraint_term(&mut self) -> NodeId {
        if self.at(TokenKind::Tilde) {
            let start = self.start();
            self.bump();
            let x = self.parse_type();
            self.alloc(
                NodeKind::Unary {
                    op: UnaryOp::Tilde,
                    x,
                },
                start,
            )
        } else {
            self.parse_type()
        }
    }

    fn starts_type(&self, kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Ident
                | TokenKind::LBrack
                | TokenKind::Struct
                | TokenKind::Mul
                | TokenKind::Func
                | TokenKind::Interface
                | TokenKind::Map
                | TokenKind::Chan
                | TokenKind::LParen
                | TokenKind::Arrow
                | TokenKind::Tilde
        )
    }

    /// Parse a parenthesized parameter list, grouping names with types.
    fn parse_params(&mut self, open: TokenKind, close: TokenKind) -> Vec<NodeId> {
        self.expect(open);
        let mut entries = Vec::new();
        while !self.at(close) && !self.at_eof() {
            let before = self.pos;
            entries.push(self.parse_param_entry());
            if self.pos == before {
                self.bump();
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(close);

        let named = entries.iter().any(|e| matches!(e, Entry::Named(..)));
        let mut fields = Vec::new();
        if named {
            let mut pending: Vec<NodeId> = Vec::new();
            for entry in entries {
                match entry {
                    Entry::Bare(ident) => pending.push(ident),
                    Entry::Named(ident, ty) => {
                        pending.push(ident);
                        let names = std::mem::take(&mut pending);
                        let range = self.cover(names[0], ty);
                        fields.push(self.alloc_range(
                            NodeKind::Field {
                                names,
                                ty: Some(ty),
                                tag: None,
                            },
                            range,
                        ));
                    }
                    Entry::Type(ty) => {
                        self.errors.push(SyntaxError::new(
                            "mixed named and unnamed parameters",
                            self.range_of(ty),
                        ));
                        let names = std::mem::take(&mut pending);
                        let range = match names.first() {
                            Some(first) => self.cover(*first, ty),
                            None => self.range_of(ty),
                        };
                        fields.push(self.alloc_range(
                            NodeKind::Field {
                                names,
                                ty: Some(ty),
                                tag: None,
                            },
                            range,
                        ));
                    }
                }
            }
            if let (Some(first), Some(last)) = (pending.first().copied(), pending.last().copied())
            {
                let range = self.cover(first, last);
                self.errors
                    .push(SyntaxError::new("missing parameter type", range));
                fields.push(self.alloc_range(
                    NodeKind::Field {
                        names: pending,
                        ty: None,
                        tag: None,
                    },
                    range,
                ));
            }
        } else {
            for entry in entries {
                let ty = match entry {
                    Entry::Bare(ident) | Entry::Type(ident) => ident,
                    Entry::Named(_, ty) => ty,
                };
                let range = self.range_of(ty);
                fields.push(self.alloc_range(
                    NodeKind::Field {
                        names: Vec::new(),
                        ty: Some(ty),
                        tag: None,
                    },
                    range,
                ));
            }
        }
        fields
    }

    fn parse_param_entry(&mut self) -> Entry {
        match self.kind() {
            TokenKind::Ident => match self.nth(1) {
                TokenKind::Comma | TokenKind::RParen | TokenKind::RBrack => {
                    Entry::Bare(self.parse_ident())
                }
                TokenKind::Period => Entry::Type(self.parse_type()),
                TokenKind::LBrack => {
                    if matches!(
                        self.nth(2),
                        TokenKind::RBrack | TokenKind::Int | TokenKind::Ellipsis
                    ) {
                        let name = self.parse_ident();
                        let ty = self.parse_type();
                        Entry::Named(name, ty)
                    } else {
                        Entry::Type(self.parse_type())
                    }
                }
                TokenKind::Ellipsis => {
                    let name = self.parse_ident();
                    let ty = self.parse_variadic();
                    Entry::Named(name, ty)
                }
                next if self.starts_type(next) => {
                    let name = self.parse_ident();
                    let ty = self.parse_type();
                    Entry::Named(name, ty)
                }
                _ => Entry::Type(self.parse_type()),
            },
            TokenKind::Ellipsis => Entry::Type(self.parse_variadic()),
            _ => Entry::Type(self.parse_type()),
        }
    }

    fn parse_variadic(&mut self) -> NodeId {
        let start = self.expect(TokenKind::Ellipsis);
        let elt = self.parse_type();
        self.alloc(NodeKind::Ellipsis(Some(elt)), start)
    }

    fn parse_results(&mut self) -> Vec<NodeId> {
        if self.at(TokenKind::LParen) {
            self.parse_params(TokenKind::LParen, TokenKind::RParen)
        } else if self.starts_type(self.kind()) && !self.at(TokenKind::Tilde) {
            let ty = self.parse_type();
            let range = self.range_of(ty);
            vec![self.alloc_range(
                NodeKind::Field {
                    names: Vec::new(),
                    ty: Some(ty),
                    tag: None,
                },
                range,
            )]
        } else {
            Vec::new()
        }
    }

    // =========================================================================
    // TYPES
    // =========================================================================

    fn parse_type(&mut self) -> NodeId {
        let start = self.start();
        match self.kind() {
            TokenKind::Ident => {
                let mut x = self.parse_ident();
                if self.at(TokenKind::Period) && self.nth(1) == TokenKind::Ident {
                    self.bump();
                    let sel = self.parse_ident();
                    x = self.alloc(NodeKind::Selector { x, sel }, start);
                }
                if self.at(TokenKind::LBrack) && self.nth(1) != TokenKind::RBrack {
                    self.bump();
                    let mut indices = vec![self.parse_type()];
                    while self.eat(TokenKind::Comma) {
                        if self.at(TokenKind::RBrack) {
                            break;
                        }
                        indices.push(self.parse_type());
                    }
                    self.expect(TokenKind::RBrack);
                    x = self.alloc(NodeKind::Index { x, indices }, start);
                }
                x
            }
            TokenKind::LBrack => {
                self.bump();
                let len = if self.eat(TokenKind::RBrack) {
                    None
                } else if self.at(TokenKind::Ellipsis) && self.nth(1) == TokenKind::RBrack {
                    let tok = self.bump();
                    let len = self.alloc_range(NodeKind::Ellipsis(None), tok.range);
                    self.expect(TokenKind::RBrack);
                    Some(len)
                } else {
                    self.expr_lev += 1;
                    let len = self.parse_expr();
                    self.expr_lev -= 1;
                    self.expect(TokenKind::RBrack);
                    Some(len)
                };
                let elem = self.parse_type();
                self.alloc(NodeKind::ArrayType { len, elem }, start)
            }
            TokenKind::Mul => {
                self.bump();
                let x = self.parse_type();
                self.alloc(NodeKind::Star(x), start)
            }
            TokenKind::Arrow => {
                self.bump();
                self.expect(TokenKind::Chan);
                let value = self.parse_type();
                self.alloc(
                    NodeKind::ChanType {
                        dir: ChanDir::Recv,
                        value,
                    },
                    start,
                )
            }
            TokenKind::Chan => {
                self.bump();
                let dir = if self.eat(TokenKind::Arrow) {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                let value = self.parse_type();
                self.alloc(NodeKind::ChanType { dir, value }, start)
            }
            TokenKind::Map => {
                self.bump();
                self.expect(TokenKind::LBrack);
                let key = self.parse_type();
                self.expect(TokenKind::RBrack);
                let value = self.parse_type();
                self.alloc(NodeKind::MapType { key, value }, start)
            }
            TokenKind::Func => self.parse_func_type(),
            TokenKind::Struct => self.parse_struct_type(),
            TokenKind::Interface => self.parse_interface_type(),
            TokenKind::LParen => {
                self.bump();
                let x = self.parse_type();
                self.expect(TokenKind::RParen);
                self.alloc(NodeKind::Paren(x), start)
            }
            other => {
                self.error(format!("expected type, found {other:?}"));
                self.alloc_range(NodeKind::Bad, TextRange::empty(start))
            }
        }
    }

    fn parse_func_type(&mut self) -> NodeId {
        let start = self.start();
        let func_kw = self.expect(TokenKind::Func);
        let params = self.parse_params(TokenKind::LParen, TokenKind::RParen);
        let results = self.parse_results();
        self.alloc(
            NodeKind::FuncType {
                func_kw: Some(func_kw),
                type_params: Vec::new(),
                params,
                results,
            },
            start,
        )
    }

    fn parse_struct_type(&mut self) -> NodeId {
        let start = self.expect(TokenKind::Struct);
        self.expect(TokenKind::LBrace);
        let mut fields = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at_eof() {
            if self.eat(TokenKind::Semi) {
                continue;
            }
            let before = self.pos;
            fields.push(self.parse_struct_field());
            if self.pos == before {
                self.bump();
            }
            self.expect_semi();
        }
        self.expect(TokenKind::RBrace);
        self.alloc(NodeKind::StructType { fields }, start)
    }

    fn parse_struct_field(&mut self) -> NodeId {
        let start = self.start();
        let embedded = match self.kind() {
            TokenKind::Mul => true,
            TokenKind::Ident => match self.nth(1) {
                TokenKind::Period
                | TokenKind::Semi
                | TokenKind::RBrace
                | TokenKind::String => true,
                TokenKind::LBrack => !matches!(
                    self.nth(2),
                    TokenKind::RBrack | TokenKind::Int | TokenKind::Ellipsis
                ),
                _ => false,
            },
            _ => false,
        };
        let (names, ty) = if embedded {
            (Vec::new(), self.parse_type())
        } else {
            let names = self.parse_ident_list();
            (names, self.parse_type())
        };
        let tag = if self.at(TokenKind::String) {
            Some(self.parse_basic_lit())
        } else {
            None
        };
        self.alloc(
            NodeKind::Field {
                names,
                ty: Some(ty),
                tag,
            },
            start,
        )
    }

    fn parse_interface_type(&mut self) -> NodeId {
        let start = self.expect(TokenKind::Interface);
        self.expect(TokenKind::LBrace);
        let mut elems = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at_eof() {
            if self.eat(TokenKind::Semi) {
                continue;
            }
            let before = self.pos;
            let elem_start = self.start();
            if self.at(TokenKind::Ident) && self.nth(1) == TokenKind::LParen {
                let name = self.parse_ident();
                let ty_start = self.start();
                let params = self.parse_params(TokenKind::LParen, TokenKind::RParen);
                let results = self.parse_results();
                let ty = self.alloc(
                    NodeKind::FuncType {
                        func_kw: None,
                        type_params: Vec::new(),
                        params,
                        results,
                    },
                    ty_start,
                );
                elems.push(self.alloc(
                    NodeKind::Field {
                        names: vec![name],
                        ty: Some(ty),
                        tag: None,
                    },
                    elem_start,
                ));
            } else {
                let ty = self.parse_constraint();
                elems.push(self.alloc(
                    NodeKind::Field {
                        names: Vec::new(),
                        ty: Some(ty),
                        tag: None,
                    },
                    elem_start,
                ));
            }
            if self.pos == before {
                self.bump();
            }
            self.expect_semi();
        }
        self.expect(TokenKind::RBrace);
        self.alloc(NodeKind::InterfaceType { elems }, start)
    }

    // =========================================================================
    // EXPRESSIONS
    // =========================================================================

    fn parse_ident(&mut self) -> NodeId {
        if self.at(TokenKind::Ident) {
            let tok = self.bump();
            let name = SmolStr::new(self.token_text(tok));
            self.alloc_range(NodeKind::Ident(name), tok.range)
        } else {
            self.error(format!("expected identifier, found {:?}", self.kind()));
            let at = self.start();
            self.alloc_range(NodeKind::Ident(SmolStr::new("_")), TextRange::empty(at))
        }
    }

    fn parse_ident_list(&mut self) -> Vec<NodeId> {
        let mut names = vec![self.parse_ident()];
        while self.eat(TokenKind::Comma) {
            names.push(self.parse_ident());
        }
        names
    }

    fn parse_basic_lit(&mut self) -> NodeId {
        let tok = self.bump();
        let kind = match tok.kind {
            TokenKind::Int => LitKind::Int,
            TokenKind::Float => LitKind::Float,
            TokenKind::Imag => LitKind::Imag,
            TokenKind::Char => LitKind::Char,
            _ => LitKind::String,
        };
        let value = SmolStr::new(self.token_text(tok));
        self.alloc_range(NodeKind::BasicLit { kind, value }, tok.range)
    }

    fn parse_expr_list(&mut self) -> Vec<NodeId> {
        let mut list = vec![self.parse_expr()];
        while self.eat(TokenKind::Comma) {
            list.push(self.parse_expr());
        }
        list
    }

    fn parse_expr(&mut self) -> NodeId {
        self.parse_binary(1)
    }

    fn parse_binary(&mut self, min_prec: u8) -> NodeId {
        let mut x = self.parse_unary();
        loop {
            let prec = self.kind().precedence();
            if prec < min_prec {
                return x;
            }
            let op = binary_op(self.kind());
            self.bump();
            let y = self.parse_binary(prec + 1);
            let range = self.cover(x, y);
            x = self.alloc_range(NodeKind::Binary { op, x, y }, range);
        }
    }

    fn parse_unary(&mut self) -> NodeId {
        let start = self.start();
        let op = match self.kind() {
            TokenKind::Add => UnaryOp::Pos,
            TokenKind::Sub => UnaryOp::Neg,
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Xor => UnaryOp::Xor,
            TokenKind::And => UnaryOp::Addr,
            TokenKind::Tilde => UnaryOp::Tilde,
            TokenKind::Arrow => {
                if self.nth(1) == TokenKind::Chan {
                    let ty = self.parse_type();
                    return self.parse_primary_suffixes(ty, start);
                }
                UnaryOp::Recv
            }
            TokenKind::Mul => {
                self.bump();
                let x = self.parse_unary();
                return self.alloc(NodeKind::Star(x), start);
            }
            _ => return self.parse_primary(),
        };
        self.bump();
        let x = self.parse_unary();
        self.alloc(NodeKind::Unary { op, x }, start)
    }

    fn parse_primary(&mut self) -> NodeId {
        let start = self.start();
        let x = self.parse_operand();
        self.parse_primary_suffixes(x, start)
    }

    fn parse_operand(&mut self) -> NodeId {
        let start = self.start();
        match self.kind() {
            TokenKind::Ident => self.parse_ident(),
            kind if kind.is_literal() => self.parse_basic_lit(),
            TokenKind::LParen => {
                self.bump();
                self.expr_lev += 1;
                let x = self.parse_expr();
                self.expr_lev -= 1;
                self.expect(TokenKind::RParen);
                self.alloc(NodeKind::Paren(x), start)
            }
            TokenKind::Func => {
                let ty = self.parse_func_type();
                if self.at(TokenKind::LBrace) {
                    self.expr_lev += 1;
                    let body = self.parse_block();
                    self.expr_lev -= 1;
                    self.alloc(NodeKind::FuncLit { ty, body }, start)
                } else {
                    ty
                }
            }
            TokenKind::LBrack
            | TokenKind::Struct
            | TokenKind::Map
            | TokenKind::Chan
            | TokenKind::Interface => self.parse_type(),
            other => {
                self.error(format!("expected expression, found {other:?}"));
                if !matches!(
                    other,
                    TokenKind::Semi
                        | TokenKind::RBrace
                        | TokenKind::RParen
                        | TokenKind::RBrack
                        | TokenKind::Eof
                ) {
                    self.bump();
                }
                self.alloc(NodeKind::Bad, start)
            }
        }
    }

    fn parse_primary_suffixes(&mut self, mut x: NodeId, start: TextSize) -> NodeId {
        loop {
            match self.kind() {
                TokenKind::Period => {
                    self.bump();
                    match self.kind() {
                        TokenKind::Ident => {
                            let sel = self.parse_ident();
                            x = self.alloc(NodeKind::Selector { x, sel }, start);
                        }
                        TokenKind::LParen => {
                            self.bump();
                            let ty = if self.eat(TokenKind::Type) {
                                None
                            } else {
                                Some(self.parse_type())
                            };
                            self.expect(TokenKind::RParen);
                            x = self.alloc(NodeKind::TypeAssert { x, ty }, start);
                        }
                        other => {
                            self.error(format!("expected selector or type assertion, found {other:?}"));
                            let sel = self.parse_ident();
                            x = self.alloc(NodeKind::Selector { x, sel }, start);
                        }
                    }
                }
                TokenKind::LBrack => {
                    self.bump();
                    self.expr_lev += 1;
                    let mut low = None;
                    if !self.at(TokenKind::Colon) {
                        low = Some(self.parse_expr());
                    }
                    if self.eat(TokenKind::Colon) {
                        let high = if !self.at(TokenKind::Colon) && !self.at(TokenKind::RBrack) {
                            Some(self.parse_expr())
                        } else {
                            None
                        };
                        let max = if self.eat(TokenKind::Colon) {
                            Some(self.parse_expr())
                        } else {
                            None
                        };
                        self.expr_lev -= 1;
                        self.expect(TokenKind::RBrack);
                        x = self.alloc(NodeKind::Slice { x, low, high, max }, start);
                    } else {
                        let mut indices: Vec<NodeId> = low.into_iter().collect();
                        while self.eat(TokenKind::Comma) {
                            if self.at(TokenKind::RBrack) {
                                break;
                            }
                            indices.push(self.parse_expr());
                        }
                        self.expr_lev -= 1;
                        self.expect(TokenKind::RBrack);
                        x = self.alloc(NodeKind::Index { x, indices }, start);
                    }
                }
                TokenKind::LParen => {
                    self.bump();
                    self.expr_lev += 1;
                    let mut args = Vec::new();
                    let mut ellipsis = false;
                    while !self.at(TokenKind::RParen) && !self.at_eof() {
                        args.push(self.parse_expr());
                        if self.eat(TokenKind::Ellipsis) {
                            ellipsis = true;
                        }
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expr_lev -= 1;
                    self.expect(TokenKind::RParen);
                    x = self.alloc(
                        NodeKind::Call {
                            fun: x,
                            args,
                            ellipsis,
                        },
                        start,
                    );
                }
                TokenKind::LBrace => {
                    let literal_type = self.is_literal_type(x);
                    if literal_type && (self.expr_lev >= 0 || !self.is_type_name(x)) {
                        x = self.parse_composite_lit(Some(x), start);
                    } else {
                        return x;
                    }
                }
                _ => return x,
            }
        }
    }

    fn is_type_name(&self, x: NodeId) -> bool {
        match self.kind_of(x) {
            NodeKind::Ident(_) => true,
            NodeKind::Selector { x, .. } => matches!(self.kind_of(*x), NodeKind::Ident(_)),
            NodeKind::Index { x, .. } => self.is_type_name(*x),
            _ => false,
        }
    }

    fn is_literal_type(&self, x: NodeId) -> bool {
        match self.kind_of(x) {
            NodeKind::ArrayType { .. } | NodeKind::MapType { .. } | NodeKind::StructType { .. } => {
                true
            }
            _ => self.is_type_name(x),
        }
    }

    fn parse_composite_lit(&mut self, ty: Option<NodeId>, start: TextSize) -> NodeId {
        self.expect(TokenKind::LBrace);
        self.expr_lev += 1;
        let mut elts = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at_eof() {
            let before = self.pos;
            elts.push(self.parse_element());
            if self.pos == before {
                self.bump();
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expr_lev -= 1;
        // A missing trailing comma leaves an inserted terminator before `}`
        if self.current().is_implicit_semi() && self.nth(1) == TokenKind::RBrace {
            self.error("missing ',' before newline in composite literal");
            self.bump();
        }
        self.expect(TokenKind::RBrace);
        self.alloc(NodeKind::CompositeLit { ty, elts }, start)
    }

    fn parse_element(&mut self) -> NodeId {
        let key = self.parse_element_value();
        if self.eat(TokenKind::Colon) {
            let value = self.parse_element_value();
            let range = self.cover(key, value);
            self.alloc_range(NodeKind::KeyValue { key, value }, range)
        } else {
            key
        }
    }

    fn parse_element_value(&mut self) -> NodeId {
        if self.at(TokenKind::LBrace) {
            let start = self.start();
            self.parse_composite_lit(None, start)
        } else {
            self.parse_expr()
        }
    }

    // =========================================================================
    // STATEMENTS
    // =========================================================================

    fn parse_block(&mut self) -> NodeId {
        let start = self.expect(TokenKind::LBrace);
        let old = self.expr_lev;
        self.expr_lev = 0;
        let stmts = self.parse_stmt_list();
        self.expr_lev = old;
        self.expect(TokenKind::RBrace);
        self.alloc(NodeKind::Block(stmts), start)
    }

    fn parse_stmt_list(&mut self) -> Vec<NodeId> {
        let mut stmts = Vec::new();
        while !matches!(
            self.kind(),
            TokenKind::RBrace | TokenKind::Case | TokenKind::Default | TokenKind::Eof
        ) {
            if self.eat(TokenKind::Semi) {
                continue;
            }
            let before = self.pos;
            stmts.push(self.parse_stmt());
            if self.pos == before {
                self.bump();
            }
            if !matches!(
                self.kind(),
                TokenKind::RBrace | TokenKind::Case | TokenKind::Default
            ) {
                self.expect_semi();
            }
        }
        stmts
    }

    fn parse_stmt(&mut self) -> NodeId {
        let start = self.start();
        match self.kind() {
            TokenKind::Const | TokenKind::Var | TokenKind::Type => {
                let kind = match self.kind() {
                    TokenKind::Const => DeclKind::Const,
                    TokenKind::Var => DeclKind::Var,
                    _ => DeclKind::Type,
                };
                let decl = self.parse_gen_decl(kind);
                self.alloc(NodeKind::DeclStmt(decl), start)
            }
            TokenKind::Ident if self.nth(1) == TokenKind::Colon => {
                let label = self.parse_ident();
                self.bump();
                let stmt = if matches!(self.kind(), TokenKind::RBrace | TokenKind::Eof) {
                    self.alloc_range(NodeKind::EmptyStmt, TextRange::empty(self.start()))
                } else {
                    // A label on its own line is followed by an inserted terminator
                    if self.current().is_implicit_semi() {
                        self.bump();
                    }
                    self.parse_stmt()
                };
                self.alloc(NodeKind::Labeled { label, stmt }, start)
            }
            TokenKind::Go | TokenKind::Defer => {
                let is_go = self.at(TokenKind::Go);
                self.bump();
                let call = self.parse_expr();
                let kind = if is_go {
                    NodeKind::Go(call)
                } else {
                    NodeKind::Defer(call)
                };
                self.alloc(kind, start)
            }
            TokenKind::Return => {
                self.bump();
                let results = if matches!(self.kind(), TokenKind::Semi | TokenKind::RBrace) {
                    Vec::new()
                } else {
                    self.parse_expr_list()
                };
                self.alloc(NodeKind::Return(results), start)
            }
            TokenKind::Break | TokenKind::Continue | TokenKind::Goto | TokenKind::Fallthrough => {
                let kind = match self.kind() {
                    TokenKind::Break => BranchKind::Break,
                    TokenKind::Continue => BranchKind::Continue,
                    TokenKind::Goto => BranchKind::Goto,
                    _ => BranchKind::Fallthrough,
                };
                self.bump();
                let label = if kind != BranchKind::Fallthrough && self.at(TokenKind::Ident) {
                    Some(self.parse_ident())
                } else {
                    None
                };
                self.alloc(NodeKind::Branch { kind, label }, start)
            }
            TokenKind::LBrace => self.parse_block(),
            TokenKind::If => self.parse_if(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Select => self.parse_select(),
            TokenKind::For => self.parse_for(),
            TokenKind::Semi | TokenKind::RBrace => {
                self.alloc_range(NodeKind::EmptyStmt, TextRange::empty(start))
            }
            _ => {
                let simple = self.parse_simple_stmt(false);
                self.finish_simple(simple)
            }
        }
    }

    fn finish_simple(&mut self, simple: Simple) -> NodeId {
        match simple {
            Simple::Expr(x) => {
                let range = self.range_of(x);
                self.alloc_range(NodeKind::ExprStmt(x), range)
            }
            Simple::Stmt(s) => s,
            Simple::Range { start, x, .. } => {
                self.errors.push(SyntaxError::new(
                    "range clause outside of for statement",
                    TextRange::new(start, self.last_end.max(start)),
                ));
                let range = self.range_of(x);
                self.alloc_range(NodeKind::ExprStmt(x), range)
            }
        }
    }

    fn parse_simple_stmt(&mut self, range_ok: bool) -> Simple {
        let start = self.start();
        if range_ok && self.at(TokenKind::Range) {
            self.bump();
            let x = self.parse_expr();
            return Simple::Range {
                start,
                key: None,
                value: None,
                op: None,
                x,
            };
        }

        let lhs = self.parse_expr_list();
        let op = match self.kind() {
            TokenKind::Define => Some(AssignOp::Define),
            TokenKind::Assign => Some(AssignOp::Assign),
            TokenKind::AddAssign => Some(AssignOp::Op(BinaryOp::Add)),
            TokenKind::SubAssign => Some(AssignOp::Op(BinaryOp::Sub)),
            TokenKind::MulAssign => Some(AssignOp::Op(BinaryOp::Mul)),
            TokenKind::QuoAssign => Some(AssignOp::Op(BinaryOp::Quo)),
            TokenKind::RemAssign => Some(AssignOp::Op(BinaryOp::Rem)),
            TokenKind::AndAssign => Some(AssignOp::Op(BinaryOp::And)),
            TokenKind::OrAssign => Some(AssignOp::Op(BinaryOp::Or)),
            TokenKind::XorAssign => Some(AssignOp::Op(BinaryOp::Xor)),
            TokenKind::ShlAssign => Some(AssignOp::Op(BinaryOp::Shl)),
            TokenKind::ShrAssign => Some(AssignOp::Op(BinaryOp::Shr)),
            TokenKind::AndNotAssign => Some(AssignOp::Op(BinaryOp::AndNot)),
            _ => None,
        };

        if let Some(op) = op {
            self.bump();
            if range_ok
                && self.at(TokenKind::Range)
                && matches!(op, AssignOp::Define | AssignOp::Assign)
            {
                self.bump();
                let x = self.parse_expr();
                let mut lhs = lhs.into_iter();
                return Simple::Range {
                    start,
                    key: lhs.next(),
                    value: lhs.next(),
                    op: Some(op),
                    x,
                };
            }
            let rhs = self.parse_expr_list();
            return Simple::Stmt(self.alloc(NodeKind::Assign { lhs, op, rhs }, start));
        }

        match self.kind() {
            TokenKind::Inc | TokenKind::Dec => {
                let inc = self.at(TokenKind::Inc);
                self.bump();
                Simple::Stmt(self.alloc(NodeKind::IncDec { x: lhs[0], inc }, start))
            }
            TokenKind::Arrow => {
                self.bump();
                let value = self.parse_expr();
                Simple::Stmt(self.alloc(
                    NodeKind::Send {
                        chan: lhs[0],
                        value,
                    },
                    start,
                ))
            }
            _ => {
                if lhs.len() > 1 {
                    self.error("expected 1 expression");
                }
                Simple::Expr(lhs[0])
            }
        }
    }

    fn parse_if(&mut self) -> NodeId {
        let start = self.expect(TokenKind::If);
        let old = self.expr_lev;
        self.expr_lev = -1;

        let mut init = None;
        let cond = if self.at(TokenKind::LBrace) {
            self.error("missing condition in if statement");
            self.alloc_range(NodeKind::Bad, TextRange::empty(self.start()))
        } else {
            let first = self.parse_simple_stmt(false);
            if self.at(TokenKind::Semi) {
                self.bump();
                init = Some(self.finish_simple(first));
                if self.at(TokenKind::LBrace) {
                    self.error("missing condition in if statement");
                    self.alloc_range(NodeKind::Bad, TextRange::empty(self.start()))
                } else {
                    self.parse_expr()
                }
            } else {
                match first {
                    Simple::Expr(x) => x,
                    other => {
                        self.error("expected boolean expression");
                        self.finish_simple(other)
                    }
                }
            }
        };
        self.expr_lev = old;

        let body = self.parse_block();
        let else_ = if self.eat(TokenKind::Else) {
            match self.kind() {
                TokenKind::If => Some(self.parse_if()),
                TokenKind::LBrace => Some(self.parse_block()),
                _ => {
                    self.error("expected if statement or block after else");
                    None
                }
            }
        } else {
            None
        };
        self.alloc(
            NodeKind::If {
                init,
                cond,
                body,
                else_,
            },
            start,
        )
    }

    fn is_type_switch_guard(&self, simple: &Simple) -> bool {
        let is_guard = |x: NodeId| matches!(self.kind_of(x), NodeKind::TypeAssert { ty: None, .. });
        match simple {
            Simple::Expr(x) => is_guard(*x),
            Simple::Stmt(s) => match self.kind_of(*s) {
                NodeKind::Assign {
                    lhs,
                    op: AssignOp::Define,
                    rhs,
                } => lhs.len() == 1 && rhs.len() == 1 && is_guard(rhs[0]),
                _ => false,
            },
            Simple::Range { .. } => false,
        }
    }

    fn parse_switch(&mut self) -> NodeId {
        let start = self.expect(TokenKind::Switch);
        let old = self.expr_lev;
        self.expr_lev = -1;

        let mut first = None;
        let mut second = None;
        if !self.at(TokenKind::LBrace) {
            if !self.at(TokenKind::Semi) {
                second = Some(self.parse_simple_stmt(false));
            }
            if self.at(TokenKind::Semi) {
                self.bump();
                first = second.take();
                if !self.at(TokenKind::LBrace) {
                    second = Some(self.parse_simple_stmt(false));
                }
            }
        }
        self.expr_lev = old;

        let type_switch = second
            .as_ref()
            .is_some_and(|s| self.is_type_switch_guard(s));
        let init = first.map(|s| self.finish_simple(s));

        let body_start = self.expect(TokenKind::LBrace);
        let mut clauses = Vec::new();
        while self.at(TokenKind::Case) || self.at(TokenKind::Default) {
            clauses.push(self.parse_case_clause());
        }
        if !self.at(TokenKind::RBrace) {
            self.error("expected case or default");
        }
        self.expect(TokenKind::RBrace);
        let body = self.alloc(NodeKind::Block(clauses), body_start);

        if type_switch {
            let assign = match second {
                Some(s) => self.finish_simple(s),
                None => self.alloc_range(NodeKind::BadStmt, TextRange::empty(start)),
            };
            self.alloc(NodeKind::TypeSwitch { init, assign, body }, start)
        } else {
            let tag = match second {
                Some(Simple::Expr(x)) => Some(x),
                Some(other) => {
                    self.errors.push(SyntaxError::new(
                        "switch expression must be an expression",
                        TextRange::empty(start),
                    ));
                    Some(self.finish_simple(other))
                }
                None => None,
            };
            self.alloc(NodeKind::Switch { init, tag, body }, start)
        }
    }

    fn parse_case_clause(&mut self) -> NodeId {
        let start = self.start();
        let list = if self.eat(TokenKind::Case) {
            Some(self.parse_expr_list())
        } else {
            self.expect(TokenKind::Default);
            None
        };
        let colon = self.expect(TokenKind::Colon);
        let body = self.parse_stmt_list();
        self.alloc(NodeKind::CaseClause { list, body, colon }, start)
    }

    fn parse_select(&mut self) -> NodeId {
        let start = self.expect(TokenKind::Select);
        let body_start = self.expect(TokenKind::LBrace);
        let mut clauses = Vec::new();
        while self.at(TokenKind::Case) || self.at(TokenKind::Default) {
            let clause_start = self.start();
            let comm = if self.eat(TokenKind::Case) {
                let simple = self.parse_simple_stmt(false);
                Some(self.finish_simple(simple))
            } else {
                self.expect(TokenKind::Default);
                None
            };
            let colon = self.expect(TokenKind::Colon);
            let body = self.parse_stmt_list();
            clauses.push(self.alloc(NodeKind::CommClause { comm, body, colon }, clause_start));
        }
        self.expect(TokenKind::RBrace);
        let body = self.alloc(NodeKind::Block(clauses), body_start);
        self.alloc(NodeKind::Select { body }, start)
    }

    fn parse_for(&mut self) -> NodeId {
        let start = self.expect(TokenKind::For);
        let old = self.expr_lev;
        self.expr_lev = -1;

        let mut init = None;
        let mut cond = None;
        let mut post = None;
        let mut range = None;

        if !self.at(TokenKind::LBrace) {
            let mut first = None;
            if !self.at(TokenKind::Semi) {
                match self.parse_simple_stmt(true) {
                    Simple::Range {
                        key, value, op, x, ..
                    } => range = Some((key, value, op, x)),
                    other => first = Some(other),
                }
            }
            if range.is_none() {
                if self.at(TokenKind::Semi) {
                    self.bump();
                    init = first.map(|s| self.finish_simple(s));
                    if !self.at(TokenKind::Semi) {
                        cond = Some(self.parse_expr());
                    }
                    self.expect(TokenKind::Semi);
                    if !self.at(TokenKind::LBrace) {
                        let simple = self.parse_simple_stmt(false);
                        post = Some(self.finish_simple(simple));
                    }
                } else {
                    cond = match first {
                        Some(Simple::Expr(x)) => Some(x),
                        Some(other) => {
                            self.error("expected for loop condition");
                            Some(self.finish_simple(other))
                        }
                        None => None,
                    };
                }
            }
        }
        self.expr_lev = old;

        let body = self.parse_block();
        match range {
            Some((key, value, op, x)) => self.alloc(
                NodeKind::Range {
                    key,
                    value,
                    op,
                    x,
                    body,
                },
                start,
            ),
            None => self.alloc(
                NodeKind::For {
                    init,
                    cond,
                    post,
                    body,
                },
                start,
            ),
        }
    }
}

fn binary_op(kind: TokenKind) -> BinaryOp {
    match kind {
        TokenKind::Add => BinaryOp::Add,
        TokenKind::Sub => BinaryOp::Sub,
        TokenKind::Mul => BinaryOp::Mul,
        TokenKind::Quo => BinaryOp::Quo,
        TokenKind::Rem => BinaryOp::Rem,
        TokenKind::And => BinaryOp::And,
        TokenKind::Or => BinaryOp::Or,
        TokenKind::Xor => BinaryOp::Xor,
        TokenKind::Shl => BinaryOp::Shl,
        TokenKind::Shr => BinaryOp::Shr,
        TokenKind::AndNot => BinaryOp::AndNot,
        TokenKind::LAnd => BinaryOp::LAnd,
        TokenKind::LOr => BinaryOp::LOr,
        TokenKind::Eql => BinaryOp::Eql,
        TokenKind::Neq => BinaryOp::Neq,
        TokenKind::Lss => BinaryOp::Lss,
        TokenKind::Leq => BinaryOp::Leq,
        TokenKind::Gtr => BinaryOp::Gtr,
        _ => BinaryOp::Geq,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> File {
        let file = parse(src);
        assert!(file.errors.is_empty(), "errors: {:?}", file.errors);
        file
    }

    fn find(file: &File, pred: impl Fn(&NodeKind) -> bool) -> Vec<NodeId> {
        file.node_ids().filter(|id| pred(file.kind(*id))).collect()
    }

    #[test]
    fn test_package_and_imports() {
        let file = parse_ok("package p\n\nimport (\n\t\"fmt\"\n\tio2 \"io\"\n)\n");
        assert_eq!(file.package_name(), "p");
        assert_eq!(file.imports.len(), 2);
        assert_eq!(file.import_path(file.imports[1]).as_deref(), Some("io"));
    }

    #[test]
    fn test_block_comment_header() {
        let file = parse_ok("/* Copyright 2024 The Authors.\n * All rights reserved.\n */\n\npackage p /* p */\n\nvar x = 1 /* one */ + 2\n");
        assert_eq!(file.package_name(), "p");
        assert_eq!(file.comments.len(), 3);
        assert_eq!(find(&file, |k| matches!(k, NodeKind::Binary { .. })).len(), 1);
    }

    #[test]
    fn test_func_decl_with_receiver_and_results() {
        let file = parse_ok("package p\nfunc (t *T) M(a, b int, s ...string) (n int, err error) {\n\treturn 0, nil\n}\n");
        let decls = find(&file, |k| matches!(k, NodeKind::FuncDecl { .. }));
        assert_eq!(decls.len(), 1);
        let NodeKind::FuncDecl { recv, ty, .. } = file.kind(decls[0]) else {
            unreachable!()
        };
        assert_eq!(recv.as_ref().map(Vec::len), Some(1));
        let NodeKind::FuncType {
            params, results, ..
        } = file.kind(*ty)
        else {
            unreachable!()
        };
        assert_eq!(params.len(), 2);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_unnamed_params_are_types() {
        let file = parse_ok("package p\ntype F func(int, string) error\n");
        let fields = find(&file, |k| matches!(k, NodeKind::Field { .. }));
        assert_eq!(fields.len(), 3);
        for field in fields {
            let NodeKind::Field { names, .. } = file.kind(field) else {
                unreachable!()
            };
            assert!(names.is_empty());
        }
    }

    #[test]
    fn test_generic_type_and_func() {
        let file = parse_ok(
            "package p\ntype List[T any] struct { next *List[T]; val T }\nfunc Map[K comparable, V any](m map[K]V) []V { return nil }\n",
        );
        let specs = find(&file, |k| matches!(k, NodeKind::TypeSpec { .. }));
        let NodeKind::TypeSpec { type_params, .. } = file.kind(specs[0]) else {
            unreachable!()
        };
        assert_eq!(type_params.len(), 1);
    }

    #[test]
    fn test_composite_literal_in_if_header_needs_parens() {
        let file = parse_ok("package p\nfunc f() {\n\tif x := (T{}); x.ok {\n\t}\n\tfor _, v := range []int{1, 2} {\n\t\t_ = v\n\t}\n}\n");
        assert_eq!(
            find(&file, |k| matches!(k, NodeKind::CompositeLit { .. })).len(),
            2
        );
        assert_eq!(find(&file, |k| matches!(k, NodeKind::Range { .. })).len(), 1);
    }

    #[test]
    fn test_type_switch() {
        let file = parse_ok(
            "package p\nfunc f(y any) {\n\tswitch x := y.(type) {\n\tcase int:\n\t\t_ = x\n\tdefault:\n\t}\n}\n",
        );
        assert_eq!(
            find(&file, |k| matches!(k, NodeKind::TypeSwitch { .. })).len(),
            1
        );
        assert_eq!(
            find(&file, |k| matches!(k, NodeKind::CaseClause { .. })).len(),
            2
        );
    }

    #[test]
    fn test_labeled_break() {
        let file = parse_ok(
            "package p\nfunc f() {\nouter:\n\tfor {\n\t\tbreak outer\n\t}\n}\n",
        );
        assert_eq!(find(&file, |k| matches!(k, NodeKind::Labeled { .. })).len(), 1);
        let branches = find(&file, |k| matches!(k, NodeKind::Branch { .. }));
        let NodeKind::Branch { label, .. } = file.kind(branches[0]) else {
            unreachable!()
        };
        assert!(label.is_some());
    }

    #[test]
    fn test_parents_are_linked() {
        let file = parse_ok("package p\nfunc f() int { return 1 + 2 }\n");
        let lits = find(&file, |k| matches!(k, NodeKind::BasicLit { .. }));
        let chain: Vec<_> = file.ancestors(lits[0]).collect();
        assert_eq!(*chain.last().unwrap(), file.root);
        assert!(matches!(file.kind(chain[1]), NodeKind::Binary { .. }));
    }

    #[test]
    fn test_error_recovery_terminates() {
        let file = parse("package p\nfunc f( {\n\tx := \n}\n)))\n");
        assert!(!file.errors.is_empty());
    }
}
