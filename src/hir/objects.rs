//! Semantic objects: the named entities a type checker produces.
//!
//! Objects from different checks of the same source (a package and its test
//! variant, or a header-only and a full check) are distinct allocations.
//! Compare them with [`Object::key`], never by pointer.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use smol_str::SmolStr;
use text_size::TextSize;

use crate::base::FileId;

use super::types::{Signature, Ty, Type};

/// A declaring position: the start of the object's name in its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    pub file: FileId,
    pub offset: TextSize,
}

impl Pos {
    pub fn new(file: FileId, offset: TextSize) -> Self {
        Self { file, offset }
    }
}

/// Position identity of an object, stable across type-checking passes.
pub type ObjKey = Pos;

/// The package an object belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PkgRef {
    pub path: SmolStr,
    pub name: SmolStr,
}

impl PkgRef {
    pub fn new(path: impl Into<SmolStr>, name: impl Into<SmolStr>) -> Arc<Self> {
        Arc::new(Self {
            path: path.into(),
            name: name.into(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    PackageLevel,
    Local,
    Param,
    Result,
    Receiver,
    Field { embedded: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjKind {
    Var(VarKind),
    Const,
    TypeName,
    Func,
    PkgName,
    Builtin,
    Label,
    Nil,
}

impl ObjKind {
    pub fn describe(self) -> &'static str {
        match self {
            ObjKind::Var(VarKind::Field { .. }) => "field",
            ObjKind::Var(VarKind::Param | VarKind::Result | VarKind::Receiver) => "parameter",
            ObjKind::Var(_) => "variable",
            ObjKind::Const => "constant",
            ObjKind::TypeName => "type",
            ObjKind::Func => "function",
            ObjKind::PkgName => "package",
            ObjKind::Builtin => "builtin",
            ObjKind::Label => "label",
            ObjKind::Nil => "nil",
        }
    }
}

/// Identity of a method or field name for lookup purposes.
///
/// Unexported names are qualified by their package path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjId {
    pub pkg: Option<SmolStr>,
    pub name: SmolStr,
}

impl ObjId {
    pub fn new(pkg: Option<&str>, name: &str) -> Self {
        let pkg = if is_exported(name) {
            None
        } else {
            pkg.map(SmolStr::new)
        };
        Self {
            pkg,
            name: SmolStr::new(name),
        }
    }
}

pub type ObjRef = Arc<Object>;

/// A language entity with a name, a declaring position and a type.
pub struct Object {
    kind: ObjKind,
    name: SmolStr,
    pos: Option<Pos>,
    pkg: Option<Arc<PkgRef>>,
    ty: RwLock<Option<Ty>>,
    imported: Option<Arc<PkgRef>>,
    alias: bool,
}

impl Object {
    pub fn new(kind: ObjKind, name: impl Into<SmolStr>, pos: Option<Pos>, pkg: Option<Arc<PkgRef>>) -> ObjRef {
        Arc::new(Self {
            kind,
            name: name.into(),
            pos,
            pkg,
            ty: RwLock::new(None),
            imported: None,
            alias: false,
        })
    }

    pub fn with_type(kind: ObjKind, name: impl Into<SmolStr>, pos: Option<Pos>, pkg: Option<Arc<PkgRef>>, ty: Ty) -> ObjRef {
        let obj = Self::new(kind, name, pos, pkg);
        obj.set_ty(ty);
        obj
    }

    pub fn pkg_name(name: impl Into<SmolStr>, pos: Option<Pos>, pkg: Option<Arc<PkgRef>>, imported: Arc<PkgRef>) -> ObjRef {
        Arc::new(Self {
            kind: ObjKind::PkgName,
            name: name.into(),
            pos,
            pkg,
            ty: RwLock::new(None),
            imported: Some(imported),
            alias: false,
        })
    }

    pub fn type_alias(name: impl Into<SmolStr>, pos: Option<Pos>, pkg: Option<Arc<PkgRef>>) -> ObjRef {
        Arc::new(Self {
            kind: ObjKind::TypeName,
            name: name.into(),
            pos,
            pkg,
            ty: RwLock::new(None),
            imported: None,
            alias: true,
        })
    }

    pub fn kind(&self) -> ObjKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pos(&self) -> Option<Pos> {
        self.pos
    }

    /// Position identity; `None` for objects with no declaring position.
    pub fn key(&self) -> Option<ObjKey> {
        self.pos
    }

    pub fn pkg(&self) -> Option<&Arc<PkgRef>> {
        self.pkg.as_ref()
    }

    pub fn pkg_path(&self) -> Option<&str> {
        self.pkg.as_ref().map(|p| p.path.as_str())
    }

    /// The package a package-name object refers to.
    pub fn imported(&self) -> Option<&Arc<PkgRef>> {
        self.imported.as_ref()
    }

    pub fn is_alias(&self) -> bool {
        self.alias
    }

    pub fn ty(&self) -> Option<Ty> {
        self.ty.read().clone()
    }

    pub fn set_ty(&self, ty: Ty) {
        *self.ty.write() = Some(ty);
    }

    pub(crate) fn clear_ty(&self) {
        self.ty.write().take();
    }

    pub fn is_exported(&self) -> bool {
        is_exported(&self.name)
    }

    pub fn id(&self) -> ObjId {
        ObjId::new(self.pkg_path(), &self.name)
    }

    pub fn is_field(&self) -> bool {
        matches!(self.kind, ObjKind::Var(VarKind::Field { .. }))
    }

    pub fn is_embedded_field(&self) -> bool {
        matches!(self.kind, ObjKind::Var(VarKind::Field { embedded: true }))
    }

    pub fn is_var(&self) -> bool {
        matches!(self.kind, ObjKind::Var(_))
    }

    pub fn signature(&self) -> Option<Signature> {
        match self.ty()?.as_ref() {
            Type::Signature(sig) => Some(sig.clone()),
            _ => None,
        }
    }

    /// A function with a receiver.
    pub fn is_method(&self) -> bool {
        self.kind == ObjKind::Func && self.signature().is_some_and(|s| s.recv.is_some())
    }

    /// Whether the object is declared at package level, visible from other files.
    pub fn is_package_level(&self) -> bool {
        match self.kind {
            ObjKind::Var(VarKind::PackageLevel) => true,
            ObjKind::Func => !self.is_method(),
            _ => false,
        }
    }

    /// Compare by position identity, falling back to pointer identity for
    /// objects without a position.
    pub fn same(a: &ObjRef, b: &ObjRef) -> bool {
        if Arc::ptr_eq(a, b) {
            return true;
        }
        match (a.key(), b.key()) {
            (Some(x), Some(y)) => x == y && a.name == b.name,
            _ => false,
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("pos", &self.pos)
            .field("pkg", &self.pkg_path())
            .finish()
    }
}

pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}
