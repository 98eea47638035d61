//! A navigation-oriented type checker.
//!
//! The checker resolves every identifier to its object and records the
//! facts the IDE layer needs, per file: definitions, uses, implicit objects,
//! expression types, selections, instantiations and scopes. It does not
//! evaluate constants and reports only the errors it trips over while
//! resolving.
//!
//! Two modes exist. [`CheckMode::Full`] checks function bodies;
//! [`CheckMode::Headers`] stops at declarations, which is all the
//! method-set index needs.
//!
//! ## Phases
//!
//! ```text
//! collect    objects for every top-level name, imports, methods → receivers
//!     ▼
//! resolve    package-level declarations, lazily and in dependency order
//!     ▼
//! bodies     function bodies (Full mode only)
//! ```

mod decl;
mod expr;
mod stmt;
mod typexpr;

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use crate::base::FileId;
use crate::parser::{File, NodeId};

use super::objects::{ObjKey, ObjKind, ObjRef, Object, PkgRef, Pos};
use super::package::{Arena, CheckedFile, Metadata, Package, TypeError};
use super::scope::{ScopeId, ScopeKind, ScopeTree};
use super::types::{Named, Signature, Ty, TypeParam};

/// How much of a package to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckMode {
    /// Declarations and function bodies.
    Full,
    /// Declarations only; function bodies are skipped.
    Headers,
}

/// What an expression denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueMode {
    NoValue,
    Value,
    Variable,
    Constant,
    TypeExpr,
    Builtin,
    PkgName,
}

#[derive(Debug, Clone)]
pub struct TypeAndValue {
    pub mode: ValueMode,
    pub ty: Ty,
}

impl TypeAndValue {
    pub fn is_type(&self) -> bool {
        self.mode == ValueMode::TypeExpr
    }

    pub fn is_value(&self) -> bool {
        matches!(
            self.mode,
            ValueMode::Value | ValueMode::Variable | ValueMode::Constant
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    /// `x.f` where `f` is a field.
    FieldVal,
    /// `x.m` where `m` is a method.
    MethodVal,
    /// `T.m`, a method expression.
    MethodExpr,
}

/// The resolution of a selector expression `x.f`.
#[derive(Debug, Clone)]
pub struct Selection {
    pub kind: SelectionKind,
    /// Type of `x`.
    pub recv: Ty,
    pub obj: ObjRef,
    /// Embedded field path, ending with the index of the field or method.
    pub index: Vec<usize>,
    pub indirect: bool,
    /// Type of the selector expression.
    pub ty: Ty,
}

/// Type arguments of a generic type or function use.
#[derive(Debug, Clone)]
pub struct Instance {
    pub targs: Vec<Ty>,
    pub ty: Ty,
}

/// Facts recorded for one file, keyed by syntax node.
#[derive(Debug, Clone, Default)]
pub struct TypeInfo {
    /// Identifiers that declare an object.
    pub defs: FxHashMap<NodeId, ObjRef>,
    /// Identifiers that refer to an object.
    pub uses: FxHashMap<NodeId, ObjRef>,
    /// Objects without an identifier of their own: the package name of an
    /// unnamed import (keyed by the import spec) and the per-clause
    /// variable of a type switch (keyed by the case clause).
    pub implicits: FxHashMap<NodeId, ObjRef>,
    pub types: FxHashMap<NodeId, TypeAndValue>,
    /// Keyed by the selector expression.
    pub selections: FxHashMap<NodeId, Selection>,
    /// Keyed by the identifier naming the generic type or function.
    pub instances: FxHashMap<NodeId, Instance>,
    pub scopes: FxHashMap<NodeId, ScopeId>,
}

impl TypeInfo {
    /// The object an identifier denotes, preferring uses over definitions.
    pub fn object_of(&self, ident: NodeId) -> Option<&ObjRef> {
        self.uses.get(&ident).or_else(|| self.defs.get(&ident))
    }

    pub fn type_of(&self, expr: NodeId) -> Option<&Ty> {
        self.types.get(&expr).map(|tv| &tv.ty)
    }
}

/// Supplies checked dependencies by import path.
pub trait Importer {
    fn import(&self, path: &str) -> Option<Arc<Package>>;
}

/// An importer that knows no packages.
pub struct NoImports;

impl Importer for NoImports {
    fn import(&self, _path: &str) -> Option<Arc<Package>> {
        None
    }
}

/// Type check the given files as one package.
pub fn check_package(
    metadata: Arc<Metadata>,
    files: Vec<(FileId, Arc<File>)>,
    mode: CheckMode,
    importer: &dyn Importer,
) -> Package {
    let pkg = PkgRef::new(metadata.path.clone(), metadata.name.clone());
    let mut checker = Checker::new(pkg.clone(), mode, files, importer);
    checker.collect();
    checker.resolve_package();
    if mode == CheckMode::Full {
        checker.check_bodies();
    }
    tracing::debug!(
        package = %metadata.id,
        ?mode,
        errors = checker.errors.len(),
        "type checked package"
    );

    let Checker {
        files,
        infos,
        scopes,
        errors,
        arena,
        imported,
        ..
    } = checker;
    let files = files
        .into_iter()
        .zip(infos)
        .map(|((file_id, file), info)| CheckedFile { file_id, file, info })
        .collect();
    let imports = imported.into_values().collect();
    Package::new(metadata, pkg, mode, files, scopes, errors, imports, arena)
}

/// A package-level declaration whose type is computed on demand.
#[derive(Debug, Clone, Copy)]
enum Decl {
    Type {
        file: usize,
        spec: NodeId,
    },
    /// A const or var spec. `source` is the spec supplying type and values,
    /// which differs from `spec` for implicitly repeated constants.
    Value {
        file: usize,
        spec: NodeId,
        source: NodeId,
        is_const: bool,
    },
    Func {
        file: usize,
        decl: NodeId,
    },
}

/// Per-function state while checking a body.
#[derive(Debug, Clone, Default)]
struct FuncCtx {
    sig: Signature,
    labels: FxHashMap<SmolStr, ObjRef>,
}

pub(crate) struct Checker<'a> {
    pkg: Arc<PkgRef>,
    mode: CheckMode,
    importer: &'a dyn Importer,
    files: Vec<(FileId, Arc<File>)>,
    infos: Vec<TypeInfo>,
    file_scopes: Vec<ScopeId>,
    scopes: ScopeTree,
    errors: Vec<TypeError>,
    arena: Arena,
    imported: IndexMap<SmolStr, Arc<Package>>,
    decls: IndexMap<ObjKey, Decl>,
    resolving: FxHashSet<(usize, NodeId)>,
    resolved_specs: FxHashSet<(usize, NodeId)>,
    func_scopes: FxHashMap<(usize, NodeId), ScopeId>,
    cur: usize,
    scope: ScopeId,
    func: Option<FuncCtx>,
}

impl<'a> Checker<'a> {
    fn new(
        pkg: Arc<PkgRef>,
        mode: CheckMode,
        files: Vec<(FileId, Arc<File>)>,
        importer: &'a dyn Importer,
    ) -> Self {
        let infos = files.iter().map(|_| TypeInfo::default()).collect();
        Self {
            pkg,
            mode,
            importer,
            files,
            infos,
            file_scopes: Vec::new(),
            scopes: ScopeTree::new(),
            errors: Vec::new(),
            arena: Arena::default(),
            imported: IndexMap::new(),
            decls: IndexMap::new(),
            resolving: FxHashSet::default(),
            resolved_specs: FxHashSet::default(),
            func_scopes: FxHashMap::default(),
            cur: 0,
            scope: ScopeId::PACKAGE,
            func: None,
        }
    }

    // ------------------------------------------------------------------
    // Context
    // ------------------------------------------------------------------

    fn file(&self) -> Arc<File> {
        self.files[self.cur].1.clone()
    }

    fn file_id(&self) -> FileId {
        self.files[self.cur].0
    }

    fn info(&mut self) -> &mut TypeInfo {
        &mut self.infos[self.cur]
    }

    fn pos(&self, node: NodeId) -> Pos {
        Pos::new(self.file_id(), self.files[self.cur].1.range(node).start())
    }

    /// Run `f` in the file scope of `file`, outside any function.
    fn at_file<R>(&mut self, file: usize, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = (self.cur, self.scope, self.func.take());
        self.cur = file;
        self.scope = self.file_scopes[file];
        let result = f(self);
        (self.cur, self.scope, self.func) = saved;
        result
    }

    fn open_scope(&mut self, kind: ScopeKind, node: NodeId, range: TextRange) -> ScopeId {
        let id = self
            .scopes
            .push(kind, self.scope, Some(self.file_id()), range, Some(node));
        self.info().scopes.insert(node, id);
        id
    }

    /// Run `f` in a fresh block scope opened by `node`.
    fn in_scope<R>(&mut self, node: NodeId, f: impl FnOnce(&mut Self) -> R) -> R {
        let range = self.files[self.cur].1.range(node);
        let scope = self.open_scope(ScopeKind::Block, node, range);
        let outer = std::mem::replace(&mut self.scope, scope);
        let result = f(self);
        self.scope = outer;
        result
    }

    // ------------------------------------------------------------------
    // Objects
    // ------------------------------------------------------------------

    fn new_object(&mut self, kind: ObjKind, ident: NodeId) -> ObjRef {
        let file = self.file();
        let name = file.ident_name(ident).unwrap_or("_");
        let obj = Object::new(kind, name, Some(self.pos(ident)), Some(self.pkg.clone()));
        self.arena.objects.push(obj.clone());
        obj
    }

    fn new_named(&mut self, obj: ObjRef, tparams: Vec<Arc<TypeParam>>) -> Arc<Named> {
        let named = Named::new(obj, tparams);
        self.arena.named.push(named.clone());
        named
    }

    fn new_type_param(&mut self, ident: NodeId, index: usize) -> Arc<TypeParam> {
        let obj = self.new_object(ObjKind::TypeName, ident);
        let tp = TypeParam::new(obj.clone(), index);
        obj.set_ty(Arc::new(super::types::Type::TypeParam(tp.clone())));
        self.arena.type_params.push(tp.clone());
        tp
    }

    /// Declare `obj` in the current scope, visible from `visible_from`.
    fn declare(&mut self, obj: &ObjRef, visible_from: TextSize) {
        if obj.name() == "_" {
            return;
        }
        self.scopes.insert(self.scope, obj.clone(), visible_from);
    }

    fn record_def(&mut self, ident: NodeId, obj: &ObjRef) {
        self.info().defs.insert(ident, obj.clone());
    }

    fn record_use(&mut self, ident: NodeId, obj: &ObjRef) {
        self.info().uses.insert(ident, obj.clone());
    }

    fn record_type(&mut self, node: NodeId, mode: ValueMode, ty: Ty) {
        self.info().types.insert(node, TypeAndValue { mode, ty });
    }

    fn error(&mut self, node: NodeId, message: impl Into<String>) {
        let range = self.files[self.cur].1.range(node);
        let message = message.into();
        tracing::trace!(file = %self.file_id(), ?range, %message, "type error");
        self.errors.push(TypeError {
            file: self.file_id(),
            range,
            message,
        });
    }

    /// Make sure a package-level object has its type.
    fn ensure(&mut self, obj: &ObjRef) {
        if obj.ty().is_some() {
            return;
        }
        if let Some(key) = obj.key()
            && self.decls.contains_key(&key)
        {
            self.resolve_decl(key);
        }
    }

    /// Resolve an identifier in the current scope.
    fn lookup(&self, ident: NodeId) -> Option<ObjRef> {
        let file = &self.files[self.cur].1;
        let name = file.ident_name(ident)?;
        let pos = file.range(ident).start();
        self.scopes.resolve(self.scope, name, Some(pos))
    }
}

#[cfg(test)]
mod tests;
