//! High-level IR (HIR): the semantic model of Go packages.
//!
//! Parsing is memoized through Salsa; everything above it is computed per
//! snapshot. A checked [`Package`] owns its objects, types and scopes, and
//! the IDE layer reaches packages only through the [`Snapshot`] trait.
//!
//! ## Key Types
//!
//! - [`Object`] - a named entity; compared by [`ObjKey`] across checks
//! - [`Type`] - the structural type representation
//! - [`ScopeTree`] - lexical scopes with declaration-order visibility
//! - [`Package`] / [`Metadata`] - checked packages and the import graph
//! - [`Snapshot`] - the workspace view queries run against
//!
//! ## Layers
//!
//! ```text
//! file_text(file)            ← INPUT: raw source text
//!     │
//!     ▼
//! parse_file(file)           ← arena AST (memoized)
//!     │
//!     ▼
//! check_package(files, mode) ← objects, scopes, TypeInfo
//!     │                         Headers: declarations only
//!     ▼                         Full:    declarations and bodies
//! lookup / method_set        ← fields, methods, interface satisfaction
//! ```

mod check;
mod db;
mod lookup;
mod objects;
mod package;
mod scope;
mod snapshot;
pub mod types;
pub mod universe;

pub use check::{
    CheckMode, Importer, Instance, NoImports, Selection, SelectionKind, TypeAndValue, TypeInfo,
    ValueMode, check_package,
};
pub use db::{FileText, ParseResult, RootDatabase, parse_file};
pub use lookup::{
    LookupResult, MethodSetEntry, MissingMethod, assignable, concrete_implements,
    has_pointer_receiver, implements, is_comparable, lookup_field_or_method, method_set,
    missing_method,
};
pub use objects::{ObjId, ObjKey, ObjKind, ObjRef, Object, PkgRef, Pos, VarKind, is_exported};
pub use package::{CheckedFile, Metadata, Package, PackageId, TypeError};
pub use scope::{Scope, ScopeId, ScopeKind, ScopeTree};
pub use snapshot::{Snapshot, SnapshotError};
pub use types::{
    BasicKind, Field, Interface, Method, Named, Param, Signature, Struct, Term, Ty, Type,
    TypeParam, identical, type_string,
};
