//! Predeclared identifiers and the `unsafe` package.
//!
//! Predeclared objects are declared in a synthetic source file so that
//! navigation has somewhere to land: `error`, `len` and friends get a real
//! position in [`BUILTIN_FILE`].

use std::sync::{Arc, LazyLock};

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::base::FileId;
use crate::parser::{self, File, NodeKind};

use super::objects::{ObjKind, ObjRef, Object, PkgRef, Pos};
use super::types::{
    BasicKind, Interface, Method, Named, Param, Signature, Ty, Type, basic, named,
};

/// File id of the synthetic builtin declarations.
pub const BUILTIN_FILE: FileId = FileId::new(u32::MAX);
/// File id of the synthetic `unsafe` declarations.
pub const UNSAFE_FILE: FileId = FileId::new(u32::MAX - 1);

pub const BUILTIN_PATH: &str = "builtin/builtin.go";
pub const UNSAFE_PATH: &str = "unsafe/unsafe.go";

const BUILTIN_SOURCE: &str = r#"// Package builtin provides documentation for Go's predeclared identifiers.
package builtin

type bool bool

type uint8 uint8

type uint16 uint16

type uint32 uint32

type uint64 uint64

type int8 int8

type int16 int16

type int32 int32

type int64 int64

type float32 float32

type float64 float64

type complex64 complex64

type complex128 complex128

type string string

type int int

type uint uint

type uintptr uintptr

type byte = uint8

type rune = int32

type any = interface{}

type comparable interface{ comparable }

const (
	true  = 0 == 0 // Untyped bool.
	false = 0 != 0 // Untyped bool.
)

const iota = 0 // Untyped int.

var nil Type

type Type int

// The error built-in interface type is the conventional interface for
// representing an error condition, with the nil value representing no error.
type error interface {
	Error() string
}

func append(slice []Type, elems ...Type) []Type

func copy(dst, src []Type) int

func delete(m map[Type]Type, key Type)

func len(v Type) int

func cap(v Type) int

func make(t Type, size ...int) Type

func max(x Type, y ...Type) Type

func min(x Type, y ...Type) Type

func new(Type) *Type

func complex(r, i float64) complex128

func real(c complex128) float64

func imag(c complex128) float64

func clear(t Type)

func close(c chan<- Type)

func panic(v any)

func recover() any

func print(args ...Type)

func println(args ...Type)
"#;

const UNSAFE_SOURCE: &str = r#"// Package unsafe contains operations that step around the type safety of Go programs.
package unsafe

type ArbitraryType int

type IntegerType int

type Pointer *ArbitraryType

func Sizeof(x ArbitraryType) uintptr

func Offsetof(x ArbitraryType) uintptr

func Alignof(x ArbitraryType) uintptr

func Add(ptr Pointer, len IntegerType) Pointer

func Slice(ptr *ArbitraryType, len IntegerType) []ArbitraryType

func SliceData(slice []ArbitraryType) *ArbitraryType

func String(ptr *byte, len IntegerType) string

func StringData(str string) *byte
"#;

const BASIC_TYPES: &[(&str, BasicKind)] = &[
    ("bool", BasicKind::Bool),
    ("uint8", BasicKind::Uint8),
    ("uint16", BasicKind::Uint16),
    ("uint32", BasicKind::Uint32),
    ("uint64", BasicKind::Uint64),
    ("int8", BasicKind::Int8),
    ("int16", BasicKind::Int16),
    ("int32", BasicKind::Int32),
    ("int64", BasicKind::Int64),
    ("float32", BasicKind::Float32),
    ("float64", BasicKind::Float64),
    ("complex64", BasicKind::Complex64),
    ("complex128", BasicKind::Complex128),
    ("string", BasicKind::String),
    ("int", BasicKind::Int),
    ("uint", BasicKind::Uint),
    ("uintptr", BasicKind::Uintptr),
];

const BUILTIN_FUNCS: &[&str] = &[
    "append", "copy", "delete", "len", "cap", "make", "max", "min", "new", "complex", "real",
    "imag", "clear", "close", "panic", "recover", "print", "println",
];

const UNSAFE_FUNCS: &[&str] = &[
    "Sizeof",
    "Offsetof",
    "Alignof",
    "Add",
    "Slice",
    "SliceData",
    "String",
    "StringData",
];

pub struct Universe {
    pub builtin_file: Arc<File>,
    pub unsafe_file: Arc<File>,
    pub unsafe_pkg: Arc<PkgRef>,
    pub error_type: Ty,
    pub any_type: Ty,
    pub comparable_type: Ty,
    objects: FxHashMap<SmolStr, ObjRef>,
    unsafe_objects: FxHashMap<SmolStr, ObjRef>,
}

impl Universe {
    fn build() -> Self {
        let builtin_file = Arc::new(parser::parse(BUILTIN_SOURCE));
        let unsafe_file = Arc::new(parser::parse(UNSAFE_SOURCE));
        let builtin_pos = declared_names(&builtin_file, BUILTIN_FILE);
        let unsafe_pos = declared_names(&unsafe_file, UNSAFE_FILE);
        let at = |name: &str| builtin_pos.get(name).copied();

        let mut objects = FxHashMap::default();
        let mut add = |obj: ObjRef| {
            objects.insert(SmolStr::new(obj.name()), obj);
        };

        for (name, kind) in BASIC_TYPES {
            add(Object::with_type(ObjKind::TypeName, *name, at(*name), None, basic(*kind)));
        }
        for (name, kind) in [("byte", BasicKind::Uint8), ("rune", BasicKind::Int32)] {
            let obj = Object::type_alias(name, at(name), None);
            obj.set_ty(basic(kind));
            add(obj);
        }

        let any_type: Ty = Arc::new(Type::Interface(Interface::default()));
        let any = Object::type_alias("any", at("any"), None);
        any.set_ty(any_type.clone());
        add(any);

        let comparable_obj = Object::new(ObjKind::TypeName, "comparable", at("comparable"), None);
        let comparable = Named::new(comparable_obj.clone(), Vec::new());
        comparable.set_underlying(Arc::new(Type::Interface(Interface {
            comparable: true,
            ..Default::default()
        })));
        let comparable_type = named(comparable);
        comparable_obj.set_ty(comparable_type.clone());
        add(comparable_obj);

        let error_obj = Object::new(ObjKind::TypeName, "error", at("error"), None);
        let error = Named::new(error_obj.clone(), Vec::new());
        let error_type = named(error.clone());
        let sig = Signature {
            recv: Some(Param::new("", error_type.clone())),
            results: vec![Param::new("", basic(BasicKind::String))],
            ..Default::default()
        };
        let error_method = Object::with_type(
            ObjKind::Func,
            "Error",
            at("Error"),
            None,
            Arc::new(Type::Signature(sig.clone())),
        );
        error.set_underlying(Arc::new(Type::Interface(Interface {
            methods: vec![Method {
                obj: error_method,
                ty: Arc::new(Type::Signature(Signature { recv: None, ..sig })),
            }],
            ..Default::default()
        })));
        error_obj.set_ty(error_type.clone());
        add(error_obj);

        for name in ["true", "false"] {
            add(Object::with_type(ObjKind::Const, name, at(name), None, basic(BasicKind::UntypedBool)));
        }
        add(Object::with_type(ObjKind::Const, "iota", at("iota"), None, basic(BasicKind::UntypedInt)));
        add(Object::with_type(ObjKind::Nil, "nil", at("nil"), None, basic(BasicKind::UntypedNil)));
        for name in BUILTIN_FUNCS {
            add(Object::new(ObjKind::Builtin, *name, at(*name), None));
        }

        let unsafe_pkg = PkgRef::new("unsafe", "unsafe");
        let mut unsafe_objects = FxHashMap::default();
        let uat = |name: &str| unsafe_pos.get(name).copied();
        unsafe_objects.insert(
            SmolStr::new("Pointer"),
            Object::with_type(
                ObjKind::TypeName,
                "Pointer",
                uat("Pointer"),
                Some(unsafe_pkg.clone()),
                basic(BasicKind::UnsafePointer),
            ),
        );
        for name in UNSAFE_FUNCS {
            unsafe_objects.insert(
                SmolStr::new(*name),
                Object::new(ObjKind::Builtin, *name, uat(*name), Some(unsafe_pkg.clone())),
            );
        }

        Self {
            builtin_file,
            unsafe_file,
            unsafe_pkg,
            error_type,
            any_type,
            comparable_type,
            objects,
            unsafe_objects,
        }
    }
}

/// Name positions of every top-level declaration, plus interface methods.
fn declared_names(file: &File, file_id: FileId) -> FxHashMap<SmolStr, Pos> {
    let mut out = FxHashMap::default();
    let mut record = |id| {
        if let NodeKind::Ident(name) = file.kind(id) {
            out.entry(name.clone())
                .or_insert_with(|| Pos::new(file_id, file.range(id).start()));
        }
    };
    for id in file.node_ids() {
        match file.kind(id) {
            NodeKind::TypeSpec { name, .. } => record(*name),
            NodeKind::ValueSpec { names, .. } => names.iter().for_each(|n| record(*n)),
            NodeKind::FuncDecl { name, .. } => record(*name),
            NodeKind::InterfaceType { elems } => {
                for elem in elems {
                    if let NodeKind::Field { names, .. } = file.kind(*elem) {
                        names.iter().for_each(|n| record(*n));
                    }
                }
            }
            _ => {}
        }
    }
    out
}

static UNIVERSE: LazyLock<Universe> = LazyLock::new(Universe::build);

pub fn universe() -> &'static Universe {
    &UNIVERSE
}

/// Look up a predeclared identifier.
pub fn lookup(name: &str) -> Option<ObjRef> {
    UNIVERSE.objects.get(name).cloned()
}

/// Look up a member of the `unsafe` package.
pub fn lookup_unsafe(name: &str) -> Option<ObjRef> {
    UNIVERSE.unsafe_objects.get(name).cloned()
}

pub fn error_type() -> Ty {
    UNIVERSE.error_type.clone()
}

pub fn any_type() -> Ty {
    UNIVERSE.any_type.clone()
}

/// Whether `file` is one of the synthetic declaration files.
pub fn is_synthetic_file(file: FileId) -> bool {
    file == BUILTIN_FILE || file == UNSAFE_FILE
}

pub fn synthetic_file(file: FileId) -> Option<Arc<File>> {
    if file == BUILTIN_FILE {
        Some(UNIVERSE.builtin_file.clone())
    } else if file == UNSAFE_FILE {
        Some(UNIVERSE.unsafe_file.clone())
    } else {
        None
    }
}

pub fn synthetic_path(file: FileId) -> Option<&'static str> {
    if file == BUILTIN_FILE {
        Some(BUILTIN_PATH)
    } else if file == UNSAFE_FILE {
        Some(UNSAFE_PATH)
    } else {
        None
    }
}

/// Position of the `error` type's name in the builtin file.
pub fn error_decl_pos() -> Option<Pos> {
    universe()
        .error_type
        .as_named()
        .and_then(|n| n.obj().pos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_source_parses_cleanly() {
        assert!(universe().builtin_file.errors.is_empty(), "{:?}", universe().builtin_file.errors);
        assert!(universe().unsafe_file.errors.is_empty());
    }

    #[test]
    fn test_error_has_synthetic_position() {
        let pos = error_decl_pos().unwrap();
        assert_eq!(pos.file, BUILTIN_FILE);
        let start = usize::from(pos.offset);
        assert!(BUILTIN_SOURCE[start..].starts_with("error interface"));
    }

    #[test]
    fn test_predeclared_lookup() {
        assert_eq!(lookup("len").unwrap().kind(), ObjKind::Builtin);
        assert_eq!(lookup("nil").unwrap().kind(), ObjKind::Nil);
        assert!(lookup("byte").unwrap().is_alias());
        assert_eq!(lookup_unsafe("Slice").unwrap().pkg_path(), Some("unsafe"));
    }
}
