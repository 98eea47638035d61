//! Type representation.
//!
//! Types are immutable `Arc` trees. Named types and type parameters are the
//! only nodes with interior mutability: their underlying type, methods and
//! constraint are filled in while the declaring package is checked.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::parser::ChanDir;

use super::objects::{ObjKey, ObjRef, Object, PkgRef};

pub type Ty = Arc<Type>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Invalid,
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    UnsafePointer,
    UntypedBool,
    UntypedInt,
    UntypedRune,
    UntypedFloat,
    UntypedComplex,
    UntypedString,
    UntypedNil,
}

impl BasicKind {
    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Invalid => "invalid type",
            BasicKind::Bool => "bool",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::Complex64 => "complex64",
            BasicKind::Complex128 => "complex128",
            BasicKind::String => "string",
            BasicKind::UnsafePointer => "unsafe.Pointer",
            BasicKind::UntypedBool => "untyped bool",
            BasicKind::UntypedInt => "untyped int",
            BasicKind::UntypedRune => "untyped rune",
            BasicKind::UntypedFloat => "untyped float",
            BasicKind::UntypedComplex => "untyped complex",
            BasicKind::UntypedString => "untyped string",
            BasicKind::UntypedNil => "untyped nil",
        }
    }

    pub fn is_untyped(self) -> bool {
        matches!(
            self,
            BasicKind::UntypedBool
                | BasicKind::UntypedInt
                | BasicKind::UntypedRune
                | BasicKind::UntypedFloat
                | BasicKind::UntypedComplex
                | BasicKind::UntypedString
                | BasicKind::UntypedNil
        )
    }

    /// The type an untyped constant takes when no other type is implied.
    pub fn default_kind(self) -> BasicKind {
        match self {
            BasicKind::UntypedBool => BasicKind::Bool,
            BasicKind::UntypedInt => BasicKind::Int,
            BasicKind::UntypedRune => BasicKind::Int32,
            BasicKind::UntypedFloat => BasicKind::Float64,
            BasicKind::UntypedComplex => BasicKind::Complex128,
            BasicKind::UntypedString => BasicKind::String,
            other => other,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            BasicKind::Int
                | BasicKind::Int8
                | BasicKind::Int16
                | BasicKind::Int32
                | BasicKind::Int64
                | BasicKind::Uint
                | BasicKind::Uint8
                | BasicKind::Uint16
                | BasicKind::Uint32
                | BasicKind::Uint64
                | BasicKind::Uintptr
                | BasicKind::UntypedInt
                | BasicKind::UntypedRune
        )
    }

    pub fn is_string(self) -> bool {
        matches!(self, BasicKind::String | BasicKind::UntypedString)
    }
}

/// A named (defined) type, or an instantiation of a generic one.
pub struct Named {
    obj: ObjRef,
    type_params: Vec<Arc<TypeParam>>,
    targs: Vec<Ty>,
    origin: Option<Arc<Named>>,
    underlying: RwLock<Option<Ty>>,
    methods: RwLock<Vec<ObjRef>>,
}

impl Named {
    pub fn new(obj: ObjRef, type_params: Vec<Arc<TypeParam>>) -> Arc<Self> {
        Arc::new(Self {
            obj,
            type_params,
            targs: Vec::new(),
            origin: None,
            underlying: RwLock::new(None),
            methods: RwLock::new(Vec::new()),
        })
    }

    pub fn obj(&self) -> &ObjRef {
        &self.obj
    }

    pub fn name(&self) -> &str {
        self.obj.name()
    }

    /// The generic type this is an instance of, if any.
    pub fn origin(&self) -> Option<&Arc<Named>> {
        self.origin.as_ref()
    }

    pub fn type_params(&self) -> &[Arc<TypeParam>] {
        match &self.origin {
            Some(origin) => origin.type_params(),
            None => &self.type_params,
        }
    }

    pub fn targs(&self) -> &[Ty] {
        &self.targs
    }

    pub fn is_generic(&self) -> bool {
        self.origin.is_none() && !self.type_params.is_empty()
    }

    pub fn underlying(&self) -> Ty {
        if let Some(ty) = self.underlying.read().clone() {
            return ty;
        }
        match &self.origin {
            Some(origin) => {
                let ty = subst(&origin.underlying(), &self.subst_map());
                *self.underlying.write() = Some(ty.clone());
                ty
            }
            None => invalid(),
        }
    }

    pub fn has_underlying(&self) -> bool {
        self.underlying.read().is_some() || self.origin.is_some()
    }

    pub fn set_underlying(&self, ty: Ty) {
        *self.underlying.write() = Some(ty);
    }

    /// Declared methods, with generic receiver types.
    pub fn methods(&self) -> Vec<ObjRef> {
        match &self.origin {
            Some(origin) => origin.methods(),
            None => self.methods.read().clone(),
        }
    }

    pub fn add_method(&self, method: ObjRef) {
        self.methods.write().push(method);
    }

    /// Signature of a declared method, with this instance's type arguments
    /// substituted for the receiver's type parameters.
    pub fn method_type(&self, method: &ObjRef) -> Option<Ty> {
        let ty = method.ty()?;
        if self.targs.is_empty() {
            return Some(ty);
        }
        // Receiver type parameters are declared per method; map them by index.
        let mut map = FxHashMap::default();
        if let Type::Signature(sig) = ty.as_ref()
            && let Some(recv) = &sig.recv
        {
            let (recv_ty, _) = deref(&recv.ty);
            if let Type::Named(named) = recv_ty.as_ref() {
                for (targ, param) in self.targs.iter().zip(named.targs()) {
                    if let Type::TypeParam(tp) = param.as_ref()
                        && let Some(key) = tp.key()
                    {
                        map.insert(key, targ.clone());
                    }
                }
            }
        }
        Some(subst(&ty, &map))
    }

    pub fn subst_map(&self) -> FxHashMap<ObjKey, Ty> {
        let mut map = FxHashMap::default();
        for (param, arg) in self.type_params().iter().zip(&self.targs) {
            if let Some(key) = param.key() {
                map.insert(key, arg.clone());
            }
        }
        map
    }

    pub(crate) fn clear(&self) {
        self.underlying.write().take();
        self.methods.write().clear();
    }
}

impl fmt::Debug for Named {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Named({}", self.obj.name())?;
        if !self.targs.is_empty() {
            write!(f, "{:?}", self.targs)?;
        }
        write!(f, ")")
    }
}

/// A type parameter of a generic type or function.
pub struct TypeParam {
    obj: ObjRef,
    index: usize,
    constraint: RwLock<Option<Ty>>,
}

impl TypeParam {
    pub fn new(obj: ObjRef, index: usize) -> Arc<Self> {
        Arc::new(Self {
            obj,
            index,
            constraint: RwLock::new(None),
        })
    }

    pub fn obj(&self) -> &ObjRef {
        &self.obj
    }

    pub fn name(&self) -> &str {
        self.obj.name()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn key(&self) -> Option<ObjKey> {
        self.obj.key()
    }

    pub fn constraint(&self) -> Option<Ty> {
        self.constraint.read().clone()
    }

    pub fn set_constraint(&self, ty: Ty) {
        *self.constraint.write() = Some(ty);
    }

    pub(crate) fn clear(&self) {
        self.constraint.write().take();
    }

    pub fn same(&self, other: &TypeParam) -> bool {
        std::ptr::eq(self, other) || (self.key().is_some() && self.key() == other.key())
    }
}

impl fmt::Debug for TypeParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeParam({})", self.obj.name())
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: SmolStr,
    pub ty: Ty,
    pub obj: Option<ObjRef>,
}

impl Param {
    pub fn new(name: impl Into<SmolStr>, ty: Ty) -> Self {
        Self {
            name: name.into(),
            ty,
            obj: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Signature {
    pub recv: Option<Param>,
    pub type_params: Vec<Arc<TypeParam>>,
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    /// The last parameter has type `[]T` and was declared `...T`.
    pub variadic: bool,
}

impl Signature {
    pub fn param_types(&self) -> Vec<Ty> {
        self.params.iter().map(|p| p.ty.clone()).collect()
    }

    pub fn result_types(&self) -> Vec<Ty> {
        self.results.iter().map(|p| p.ty.clone()).collect()
    }

    /// The value of a call: nothing, a single type, or a tuple.
    pub fn result_type(&self) -> Ty {
        match self.results.as_slice() {
            [] => Arc::new(Type::Tuple(Vec::new())),
            [single] => single.ty.clone(),
            many => Arc::new(Type::Tuple(many.iter().map(|p| p.ty.clone()).collect())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub obj: ObjRef,
    pub ty: Ty,
    pub embedded: bool,
    pub tag: Option<SmolStr>,
}

impl Field {
    pub fn name(&self) -> &str {
        self.obj.name()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Struct {
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone)]
pub struct Method {
    pub obj: ObjRef,
    pub ty: Ty,
}

/// A union term of a constraint interface: `~T` or `T`.
#[derive(Debug, Clone)]
pub struct Term {
    pub tilde: bool,
    pub ty: Ty,
}

#[derive(Debug, Clone, Default)]
pub struct Interface {
    pub methods: Vec<Method>,
    pub embedded: Vec<Ty>,
    pub terms: Vec<Term>,
    pub comparable: bool,
}

impl Interface {
    /// Explicit and embedded methods, deduplicated by name and sorted.
    pub fn all_methods(&self) -> Vec<Method> {
        let mut out: Vec<Method> = Vec::new();
        self.collect_methods(&mut out, 0);
        out.sort_by(|a, b| a.obj.id().cmp(&b.obj.id()));
        out
    }

    fn collect_methods(&self, out: &mut Vec<Method>, depth: usize) {
        if depth > 32 {
            return;
        }
        for m in &self.methods {
            if !out.iter().any(|o| o.obj.name() == m.obj.name()) {
                out.push(m.clone());
            }
        }
        for e in &self.embedded {
            if let Type::Interface(iface) = under(e).as_ref() {
                iface.collect_methods(out, depth + 1);
            }
        }
    }

    /// Whether the interface has a type-set restriction beyond its methods.
    pub fn is_constraint(&self) -> bool {
        if self.comparable || !self.terms.is_empty() {
            return true;
        }
        self.embedded.iter().any(|e| match under(e).as_ref() {
            Type::Interface(iface) => iface.is_constraint(),
            _ => true,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.all_methods().is_empty() && !self.is_constraint()
    }
}

/// A type.
#[derive(Debug)]
pub enum Type {
    Basic(BasicKind),
    Named(Arc<Named>),
    TypeParam(Arc<TypeParam>),
    Pointer(Ty),
    Slice(Ty),
    /// Length is `None` when it is not a literal constant.
    Array(Option<u64>, Ty),
    Map(Ty, Ty),
    Chan(ChanDir, Ty),
    Signature(Signature),
    Struct(Struct),
    Interface(Interface),
    Tuple(Vec<Ty>),
}

impl Type {
    pub fn basic_kind(&self) -> Option<BasicKind> {
        match self {
            Type::Basic(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn as_named(&self) -> Option<&Arc<Named>> {
        match self {
            Type::Named(named) => Some(named),
            _ => None,
        }
    }

    pub fn as_signature(&self) -> Option<&Signature> {
        match self {
            Type::Signature(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Type::Basic(BasicKind::Invalid))
    }

    pub fn is_untyped(&self) -> bool {
        matches!(self, Type::Basic(kind) if kind.is_untyped())
    }
}

pub fn basic(kind: BasicKind) -> Ty {
    Arc::new(Type::Basic(kind))
}

pub fn invalid() -> Ty {
    basic(BasicKind::Invalid)
}

pub fn pointer(elem: Ty) -> Ty {
    Arc::new(Type::Pointer(elem))
}

pub fn slice(elem: Ty) -> Ty {
    Arc::new(Type::Slice(elem))
}

pub fn named(named: Arc<Named>) -> Ty {
    Arc::new(Type::Named(named))
}

pub fn tuple(types: Vec<Ty>) -> Ty {
    Arc::new(Type::Tuple(types))
}

/// The underlying type. Type parameters are returned unchanged.
pub fn under(ty: &Ty) -> Ty {
    match ty.as_ref() {
        Type::Named(named) => named.underlying(),
        _ => ty.clone(),
    }
}

/// Strip one level of pointer; the flag reports whether one was stripped.
pub fn deref(ty: &Ty) -> (Ty, bool) {
    match ty.as_ref() {
        Type::Pointer(elem) => (elem.clone(), true),
        _ => (ty.clone(), false),
    }
}

pub fn is_interface(ty: &Ty) -> bool {
    matches!(under(ty).as_ref(), Type::Interface(_))
}

/// The interface a type parameter or interface type constrains methods by.
pub fn interface_of(ty: &Ty) -> Option<Interface> {
    match ty.as_ref() {
        Type::TypeParam(tp) => tp.constraint().and_then(|c| interface_of(&c)),
        _ => match under(ty).as_ref() {
            Type::Interface(iface) => Some(iface.clone()),
            _ => None,
        },
    }
}

/// Convert an untyped type to its default type.
pub fn default_type(ty: &Ty) -> Ty {
    match ty.as_ref() {
        Type::Basic(kind) if kind.is_untyped() && *kind != BasicKind::UntypedNil => {
            basic(kind.default_kind())
        }
        _ => ty.clone(),
    }
}

/// Instantiate a generic named type.
pub fn instantiate(origin: &Arc<Named>, targs: Vec<Ty>) -> Ty {
    let origin = match origin.origin() {
        Some(o) => o.clone(),
        None => origin.clone(),
    };
    named(Arc::new(Named {
        obj: origin.obj.clone(),
        type_params: Vec::new(),
        targs,
        origin: Some(origin),
        underlying: RwLock::new(None),
        methods: RwLock::new(Vec::new()),
    }))
}

/// Replace type parameters according to `map`, keyed by their position identity.
pub fn subst(ty: &Ty, map: &FxHashMap<ObjKey, Ty>) -> Ty {
    if map.is_empty() {
        return ty.clone();
    }
    subst_depth(ty, map, 0)
}

fn subst_depth(ty: &Ty, map: &FxHashMap<ObjKey, Ty>, depth: usize) -> Ty {
    if depth > 64 {
        return ty.clone();
    }
    let s = |t: &Ty| subst_depth(t, map, depth + 1);
    match ty.as_ref() {
        Type::Basic(_) => ty.clone(),
        Type::TypeParam(tp) => match tp.key().and_then(|k| map.get(&k)) {
            Some(replacement) => replacement.clone(),
            None => ty.clone(),
        },
        Type::Named(n) => {
            if n.targs().is_empty() {
                return ty.clone();
            }
            let targs: Vec<Ty> = n.targs().iter().map(s).collect();
            match n.origin() {
                Some(origin) => instantiate(origin, targs),
                None => ty.clone(),
            }
        }
        Type::Pointer(elem) => pointer(s(elem)),
        Type::Slice(elem) => slice(s(elem)),
        Type::Array(len, elem) => Arc::new(Type::Array(*len, s(elem))),
        Type::Map(k, v) => Arc::new(Type::Map(s(k), s(v))),
        Type::Chan(dir, elem) => Arc::new(Type::Chan(*dir, s(elem))),
        Type::Tuple(types) => tuple(types.iter().map(s).collect()),
        Type::Signature(sig) => Arc::new(Type::Signature(subst_signature(sig, map, depth))),
        Type::Struct(st) => Arc::new(Type::Struct(Struct {
            fields: st
                .fields
                .iter()
                .map(|f| Field {
                    obj: f.obj.clone(),
                    ty: s(&f.ty),
                    embedded: f.embedded,
                    tag: f.tag.clone(),
                })
                .collect(),
        })),
        Type::Interface(iface) => Arc::new(Type::Interface(Interface {
            methods: iface
                .methods
                .iter()
                .map(|m| Method {
                    obj: m.obj.clone(),
                    ty: s(&m.ty),
                })
                .collect(),
            embedded: iface.embedded.iter().map(s).collect(),
            terms: iface
                .terms
                .iter()
                .map(|t| Term {
                    tilde: t.tilde,
                    ty: s(&t.ty),
                })
                .collect(),
            comparable: iface.comparable,
        })),
    }
}

fn subst_signature(sig: &Signature, map: &FxHashMap<ObjKey, Ty>, depth: usize) -> Signature {
    let param = |p: &Param| Param {
        name: p.name.clone(),
        ty: subst_depth(&p.ty, map, depth + 1),
        obj: p.obj.clone(),
    };
    Signature {
        recv: sig.recv.as_ref().map(param),
        type_params: sig
            .type_params
            .iter()
            .filter(|tp| tp.key().is_none_or(|k| !map.contains_key(&k)))
            .cloned()
            .collect(),
        params: sig.params.iter().map(param).collect(),
        results: sig.results.iter().map(param).collect(),
        variadic: sig.variadic,
    }
}

/// Whether any type parameter inside `ty` satisfies `pred`.
pub fn any_type_param(ty: &Ty, pred: &mut dyn FnMut(&Arc<TypeParam>) -> bool) -> bool {
    fn walk(ty: &Ty, pred: &mut dyn FnMut(&Arc<TypeParam>) -> bool, depth: usize) -> bool {
        if depth > 64 {
            return false;
        }
        let mut w = |t: &Ty| walk(t, pred, depth + 1);
        match ty.as_ref() {
            Type::Basic(_) => false,
            Type::TypeParam(tp) => pred(tp),
            Type::Named(n) => n.targs().iter().any(w),
            Type::Pointer(e) | Type::Slice(e) | Type::Array(_, e) | Type::Chan(_, e) => w(e),
            Type::Map(k, v) => w(k) || w(v),
            Type::Tuple(ts) => ts.iter().any(w),
            Type::Signature(sig) => sig
                .params
                .iter()
                .chain(&sig.results)
                .any(|p| w(&p.ty)),
            Type::Struct(st) => st.fields.iter().any(|f| w(&f.ty)),
            Type::Interface(iface) => {
                iface.methods.iter().any(|m| w(&m.ty)) || iface.embedded.iter().any(w)
            }
        }
    }
    walk(ty, pred, 0)
}

// ============================================================================
// IDENTITY
// ============================================================================

/// Same named type, ignoring type arguments.
pub fn same_origin(a: &Named, b: &Named) -> bool {
    let oa = a.origin().map(|o| o.obj()).unwrap_or(a.obj());
    let ob = b.origin().map(|o| o.obj()).unwrap_or(b.obj());
    Object::same(oa, ob) || (oa.key().is_none() && ob.key().is_none() && oa.name() == ob.name())
}

/// Type identity. Named types compare by declaring position.
pub fn identical(x: &Ty, y: &Ty) -> bool {
    if Arc::ptr_eq(x, y) {
        return true;
    }
    match (x.as_ref(), y.as_ref()) {
        (Type::Basic(a), Type::Basic(b)) => a == b,
        (Type::Named(a), Type::Named(b)) => {
            same_origin(a, b)
                && a.targs().len() == b.targs().len()
                && a.targs().iter().zip(b.targs()).all(|(p, q)| identical(p, q))
        }
        (Type::TypeParam(a), Type::TypeParam(b)) => a.same(b),
        (Type::Pointer(a), Type::Pointer(b)) | (Type::Slice(a), Type::Slice(b)) => identical(a, b),
        (Type::Array(n, a), Type::Array(m, b)) => n == m && identical(a, b),
        (Type::Map(k1, v1), Type::Map(k2, v2)) => identical(k1, k2) && identical(v1, v2),
        (Type::Chan(d1, a), Type::Chan(d2, b)) => d1 == d2 && identical(a, b),
        (Type::Tuple(a), Type::Tuple(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(p, q)| identical(p, q))
        }
        (Type::Signature(a), Type::Signature(b)) => identical_signatures(a, b),
        (Type::Struct(a), Type::Struct(b)) => {
            a.fields.len() == b.fields.len()
                && a.fields.iter().zip(&b.fields).all(|(f, g)| {
                    f.name() == g.name()
                        && f.embedded == g.embedded
                        && f.tag == g.tag
                        && identical(&f.ty, &g.ty)
                })
        }
        (Type::Interface(a), Type::Interface(b)) => {
            let (ma, mb) = (a.all_methods(), b.all_methods());
            a.comparable == b.comparable
                && a.terms.len() == b.terms.len()
                && ma.len() == mb.len()
                && ma.iter().zip(&mb).all(|(p, q)| {
                    p.obj.id() == q.obj.id() && identical(&p.ty, &q.ty)
                })
        }
        _ => false,
    }
}

pub fn identical_signatures(a: &Signature, b: &Signature) -> bool {
    a.variadic == b.variadic
        && a.type_params.len() == b.type_params.len()
        && a.params.len() == b.params.len()
        && a.results.len() == b.results.len()
        && a.params.iter().zip(&b.params).all(|(p, q)| identical(&p.ty, &q.ty))
        && a.results.iter().zip(&b.results).all(|(p, q)| identical(&p.ty, &q.ty))
}

// ============================================================================
// FORMATTING
// ============================================================================

/// Decides how a package is written in front of its members: `None` omits it.
pub type Qualifier<'a> = &'a dyn Fn(&PkgRef) -> Option<String>;

/// Qualify every package by its name.
pub fn qualify_by_name(pkg: &PkgRef) -> Option<String> {
    Some(pkg.name.to_string())
}

/// Qualify every package except `path`.
pub fn relative_to(path: &str) -> impl Fn(&PkgRef) -> Option<String> + '_ {
    move |pkg: &PkgRef| {
        if pkg.path == path {
            None
        } else {
            Some(pkg.name.to_string())
        }
    }
}

pub fn type_string(ty: &Ty, qf: Qualifier<'_>) -> String {
    let mut out = String::new();
    write_type(&mut out, ty, qf, 0);
    out
}

fn write_type(out: &mut String, ty: &Ty, qf: Qualifier<'_>, depth: usize) {
    if depth > 32 {
        out.push_str("...");
        return;
    }
    let d = depth + 1;
    match ty.as_ref() {
        Type::Basic(kind) => out.push_str(kind.name()),
        Type::Named(n) => {
            if let Some(q) = n.obj().pkg().and_then(|p| qf(p)) {
                out.push_str(&q);
                out.push('.');
            }
            out.push_str(n.name());
            if !n.targs().is_empty() {
                out.push('[');
                for (i, t) in n.targs().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_type(out, t, qf, d);
                }
                out.push(']');
            }
        }
        Type::TypeParam(tp) => out.push_str(tp.name()),
        Type::Pointer(elem) => {
            out.push('*');
            write_type(out, elem, qf, d);
        }
        Type::Slice(elem) => {
            out.push_str("[]");
            write_type(out, elem, qf, d);
        }
        Type::Array(len, elem) => {
            match len {
                Some(n) => out.push_str(&format!("[{n}]")),
                None => out.push_str("[?]"),
            }
            write_type(out, elem, qf, d);
        }
        Type::Map(k, v) => {
            out.push_str("map[");
            write_type(out, k, qf, d);
            out.push(']');
            write_type(out, v, qf, d);
        }
        Type::Chan(dir, elem) => {
            out.push_str(match dir {
                ChanDir::Both => "chan ",
                ChanDir::Send => "chan<- ",
                ChanDir::Recv => "<-chan ",
            });
            write_type(out, elem, qf, d);
        }
        Type::Signature(sig) => {
            out.push_str("func");
            write_signature(out, sig, qf, d);
        }
        Type::Struct(st) => {
            out.push_str("struct{");
            for (i, f) in st.fields.iter().enumerate() {
                if i > 0 {
                    out.push_str("; ");
                }
                if !f.embedded {
                    out.push_str(f.name());
                    out.push(' ');
                }
                write_type(out, &f.ty, qf, d);
                if let Some(tag) = &f.tag {
                    out.push(' ');
                    out.push_str(tag);
                }
            }
            out.push('}');
        }
        Type::Interface(iface) => {
            if iface.methods.is_empty() && iface.embedded.is_empty() && iface.terms.is_empty() {
                out.push_str(if iface.comparable {
                    "comparable"
                } else {
                    "any"
                });
                return;
            }
            out.push_str("interface{");
            let mut first = true;
            for m in &iface.methods {
                if !first {
                    out.push_str("; ");
                }
                first = false;
                out.push_str(m.obj.name());
                if let Type::Signature(sig) = m.ty.as_ref() {
                    write_signature(out, sig, qf, d);
                }
            }
            for e in &iface.embedded {
                if !first {
                    out.push_str("; ");
                }
                first = false;
                write_type(out, e, qf, d);
            }
            if !iface.terms.is_empty() {
                if !first {
                    out.push_str("; ");
                }
                for (i, t) in iface.terms.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" | ");
                    }
                    if t.tilde {
                        out.push('~');
                    }
                    write_type(out, &t.ty, qf, d);
                }
            }
            out.push('}');
        }
        Type::Tuple(types) => {
            out.push('(');
            for (i, t) in types.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_type(out, t, qf, d);
            }
            out.push(')');
        }
    }
}

fn write_params(out: &mut String, params: &[Param], variadic: bool, qf: Qualifier<'_>, depth: usize) {
    let named = params.iter().any(|p| !p.name.is_empty());
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        if named {
            out.push_str(if p.name.is_empty() { "_" } else { &p.name });
            out.push(' ');
        }
        if variadic && i + 1 == params.len() {
            out.push_str("...");
            match p.ty.as_ref() {
                Type::Slice(elem) => write_type(out, elem, qf, depth),
                _ => write_type(out, &p.ty, qf, depth),
            }
        } else {
            write_type(out, &p.ty, qf, depth);
        }
    }
}

/// Write `(params) results` without the `func` keyword.
pub fn write_signature(out: &mut String, sig: &Signature, qf: Qualifier<'_>, depth: usize) {
    out.push('(');
    write_params(out, &sig.params, sig.variadic, qf, depth);
    out.push(')');
    match sig.results.as_slice() {
        [] => {}
        [single] if single.name.is_empty() => {
            out.push(' ');
            write_type(out, &single.ty, qf, depth);
        }
        results => {
            out.push_str(" (");
            write_params(out, results, false, qf, depth);
            out.push(')');
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&type_string(&shallow_clone(self), &qualify_by_name))
    }
}

fn shallow_clone(ty: &Type) -> Ty {
    Arc::new(match ty {
        Type::Basic(k) => Type::Basic(*k),
        Type::Named(n) => Type::Named(n.clone()),
        Type::TypeParam(tp) => Type::TypeParam(tp.clone()),
        Type::Pointer(e) => Type::Pointer(e.clone()),
        Type::Slice(e) => Type::Slice(e.clone()),
        Type::Array(n, e) => Type::Array(*n, e.clone()),
        Type::Map(k, v) => Type::Map(k.clone(), v.clone()),
        Type::Chan(d, e) => Type::Chan(*d, e.clone()),
        Type::Signature(s) => Type::Signature(s.clone()),
        Type::Struct(s) => Type::Struct(s.clone()),
        Type::Interface(i) => Type::Interface(i.clone()),
        Type::Tuple(t) => Type::Tuple(t.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::FileId;
    use crate::hir::objects::{ObjKind, Pos};
    use text_size::TextSize;

    fn type_name(name: &str, offset: u32) -> ObjRef {
        Object::new(
            ObjKind::TypeName,
            name,
            Some(Pos::new(FileId::new(0), TextSize::new(offset))),
            Some(PkgRef::new("example.com/p", "p")),
        )
    }

    #[test]
    fn test_named_identity_is_positional() {
        let a = Named::new(type_name("T", 5), Vec::new());
        let b = Named::new(type_name("T", 5), Vec::new());
        let c = Named::new(type_name("T", 9), Vec::new());
        assert!(identical(&named(a.clone()), &named(b)));
        assert!(!identical(&named(a), &named(c)));
    }

    #[test]
    fn test_instantiation_substitutes_underlying() {
        let tp = TypeParam::new(type_name("E", 20), 0);
        let list = Named::new(type_name("List", 10), vec![tp.clone()]);
        list.set_underlying(slice(Arc::new(Type::TypeParam(tp))));
        let inst = instantiate(&list, vec![basic(BasicKind::Int)]);
        let u = under(&inst);
        assert!(identical(&u, &slice(basic(BasicKind::Int))));
        assert_eq!(type_string(&inst, &qualify_by_name), "p.List[int]");
        assert_eq!(type_string(&inst, &relative_to("example.com/p")), "List[int]");
    }

    #[test]
    fn test_signature_formatting() {
        let sig = Signature {
            params: vec![
                Param::new("xs", slice(basic(BasicKind::String))),
            ],
            results: vec![Param::new("", basic(BasicKind::Int))],
            variadic: true,
            ..Default::default()
        };
        let ty = Arc::new(Type::Signature(sig));
        assert_eq!(type_string(&ty, &qualify_by_name), "func(xs ...string) int");
    }

    #[test]
    fn test_default_type_of_untyped() {
        assert!(identical(
            &default_type(&basic(BasicKind::UntypedRune)),
            &basic(BasicKind::Int32)
        ));
    }
}
