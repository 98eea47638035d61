//! Method-set fingerprints and the per-package index used by the global
//! implementation search.
//!
//! A [`MethodSetKey`] summarizes a method set without referring to any
//! checked objects, so keys computed from different checks (and different
//! packages) can be compared directly. Comparison is a pre-filter: a match
//! makes a pair a candidate, and the caller verifies candidates exactly.
//!
//! Each method contributes one bit (by hash of its id) to a 64-bit mask and
//! a fingerprint string of its signature. Signatures mentioning type
//! parameters get a wildcard fingerprint that matches anything.

use std::fmt::Write;
use std::hash::{Hash, Hasher};
use rustc_hash::FxHasher;
use smol_str::SmolStr;

use crate::hir::types::{is_interface, pointer};
use crate::hir::{ObjKind, Package, Pos, Ty, Type, method_set};

/// Structural digest of a method set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSetKey {
    mask: u64,
    /// Sorted by id.
    methods: Vec<MethodPrint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MethodPrint {
    /// `name`, or `pkgpath.name` for unexported methods.
    id: SmolStr,
    print: String,
    /// The signature mentions a type parameter; matches any signature.
    wildcard: bool,
}

impl MethodSetKey {
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Whether a type with method set `self` may implement an interface
    /// with method set `iface`.
    pub fn may_implement(&self, iface: &MethodSetKey) -> bool {
        if iface.mask & !self.mask != 0 {
            return false;
        }
        let mut mine = self.methods.iter().peekable();
        'next: for want in &iface.methods {
            while let Some(have) = mine.next_if(|m| m.id <= want.id) {
                if have.id == want.id {
                    if have.wildcard || want.wildcard || have.print == want.print {
                        continue 'next;
                    }
                    return false;
                }
            }
            return false;
        }
        true
    }

    fn has_method(&self, id: &str) -> bool {
        self.methods.iter().any(|m| m.id == id)
    }
}

/// The key of `ty`'s method set. Returns `None` for types without methods:
/// every type implements an empty interface, so they are never searched.
///
/// Concrete types are keyed by the method set of `*T`, which includes the
/// methods of `T`.
pub fn key_of(ty: &Ty) -> Option<MethodSetKey> {
    let set_of = if is_interface(ty) || matches!(ty.as_ref(), Type::Pointer(_)) {
        ty.clone()
    } else {
        pointer(ty.clone())
    };
    let mut methods: Vec<MethodPrint> = method_set(&set_of)
        .into_iter()
        .map(|entry| {
            let mut print = String::new();
            let mut wildcard = false;
            if let Type::Signature(sig) = entry.ty.as_ref() {
                fingerprint_tuple(&mut print, &sig.param_types(), &mut wildcard, 0);
                if sig.variadic {
                    print.push_str("...");
                }
                fingerprint_tuple(&mut print, &sig.result_types(), &mut wildcard, 0);
            }
            MethodPrint {
                id: method_id(entry.obj.pkg_path(), entry.obj.name()),
                print,
                wildcard,
            }
        })
        .collect();
    if methods.is_empty() {
        return None;
    }
    methods.sort_by(|a, b| a.id.cmp(&b.id));
    let mask = methods.iter().fold(0u64, |mask, m| mask | bit(&m.id));
    Some(MethodSetKey { mask, methods })
}

pub(crate) fn method_id(pkg: Option<&str>, name: &str) -> SmolStr {
    match pkg {
        Some(pkg) if !crate::hir::is_exported(name) => SmolStr::new(format!("{pkg}.{name}")),
        _ => SmolStr::new(name),
    }
}

fn bit(id: &str) -> u64 {
    let mut hasher = FxHasher::default();
    id.hash(&mut hasher);
    1 << (hasher.finish() % 64)
}

fn fingerprint_tuple(out: &mut String, types: &[Ty], wildcard: &mut bool, depth: usize) {
    out.push('(');
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        fingerprint(out, ty, wildcard, depth + 1);
    }
    out.push(')');
}

/// A structural rendering of `ty` that ignores parameter names.
fn fingerprint(out: &mut String, ty: &Ty, wildcard: &mut bool, depth: usize) {
    if depth > 32 {
        out.push('…');
        return;
    }
    let d = depth + 1;
    match ty.as_ref() {
        Type::Basic(kind) => out.push_str(kind.name()),
        Type::TypeParam(_) => {
            *wildcard = true;
            out.push('?');
        }
        Type::Named(n) => {
            let obj = n.origin().map(|o| o.obj()).unwrap_or(n.obj());
            if let Some(path) = obj.pkg_path() {
                out.push_str(path);
                out.push('.');
            }
            out.push_str(obj.name());
            if !n.targs().is_empty() {
                out.push('[');
                for (i, t) in n.targs().iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    fingerprint(out, t, wildcard, d);
                }
                out.push(']');
            }
        }
        Type::Pointer(e) => {
            out.push('*');
            fingerprint(out, e, wildcard, d);
        }
        Type::Slice(e) => {
            out.push_str("[]");
            fingerprint(out, e, wildcard, d);
        }
        Type::Array(len, e) => {
            match len {
                Some(n) => {
                    let _ = write!(out, "[{n}]");
                }
                None => out.push_str("[?]"),
            }
            fingerprint(out, e, wildcard, d);
        }
        Type::Map(k, v) => {
            out.push_str("map[");
            fingerprint(out, k, wildcard, d);
            out.push(']');
            fingerprint(out, v, wildcard, d);
        }
        Type::Chan(dir, e) => {
            let _ = write!(out, "chan{dir:?} ");
            fingerprint(out, e, wildcard, d);
        }
        Type::Signature(sig) => {
            out.push_str("func");
            fingerprint_tuple(out, &sig.param_types(), wildcard, d);
            if sig.variadic {
                out.push_str("...");
            }
            fingerprint_tuple(out, &sig.result_types(), wildcard, d);
        }
        Type::Struct(st) => {
            out.push_str("struct{");
            for (i, f) in st.fields.iter().enumerate() {
                if i > 0 {
                    out.push(';');
                }
                if !f.embedded {
                    out.push_str(f.name());
                    out.push(' ');
                }
                fingerprint(out, &f.ty, wildcard, d);
            }
            out.push('}');
        }
        // Interface literals match by method count only, so the print
        // can't say more than that.
        Type::Interface(iface) => {
            let _ = write!(out, "interface{{{}}}", iface.all_methods().len());
        }
        Type::Tuple(types) => fingerprint_tuple(out, types, wildcard, d),
    }
}

/// Direction of an implementation search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// Find types implementing the query (the query is an interface).
    Subtype,
    /// Find interfaces the query implements.
    Supertype,
    Both,
}

impl Relation {
    /// The natural direction for a query type.
    pub fn for_query(query_is_interface: bool) -> Self {
        if query_is_interface {
            Relation::Subtype
        } else {
            Relation::Supertype
        }
    }

    pub(crate) fn subtypes(self) -> bool {
        matches!(self, Relation::Subtype | Relation::Both)
    }

    pub(crate) fn supertypes(self) -> bool {
        matches!(self, Relation::Supertype | Relation::Both)
    }
}

#[derive(Debug, Clone)]
struct IndexEntry {
    key: MethodSetKey,
    is_interface: bool,
    name: SmolStr,
    pos: Pos,
    /// Declaring positions of the methods, by id.
    method_pos: Vec<(SmolStr, Pos)>,
}

/// A match returned by [`MethodSetIndex::search`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHit {
    pub name: SmolStr,
    pub is_interface: bool,
    /// Position of the type's name, or of the matching method when the
    /// search asked for one.
    pub pos: Pos,
}

/// Method sets of the package-level types of one package.
#[derive(Debug, Clone)]
pub struct MethodSetIndex {
    pkg_path: SmolStr,
    entries: Vec<IndexEntry>,
}

impl MethodSetIndex {
    /// Index the package-level named types of `pkg`, which only needs to be
    /// checked in header mode.
    pub fn build(pkg: &Package) -> Self {
        let mut entries = Vec::new();
        for obj in pkg.members() {
            if obj.kind() != ObjKind::TypeName || obj.is_alias() {
                continue;
            }
            let (Some(ty), Some(pos)) = (obj.ty(), obj.pos()) else {
                continue;
            };
            if !matches!(ty.as_ref(), Type::Named(_)) {
                continue;
            }
            let Some(key) = key_of(&ty) else {
                continue;
            };
            let is_interface = is_interface(&ty);
            let set_of = if is_interface { ty.clone() } else { pointer(ty.clone()) };
            let method_pos = method_set(&set_of)
                .into_iter()
                .filter_map(|m| Some((method_id(m.obj.pkg_path(), m.obj.name()), m.obj.pos()?)))
                .collect();
            entries.push(IndexEntry {
                key,
                is_interface,
                name: SmolStr::new(obj.name()),
                pos,
                method_pos,
            });
        }
        tracing::trace!(package = %pkg.id(), types = entries.len(), "built method-set index");
        Self {
            pkg_path: SmolStr::new(pkg.path()),
            entries,
        }
    }

    pub fn pkg_path(&self) -> &str {
        &self.pkg_path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Types related to a type with method set `key`.
    ///
    /// `query_is_interface` and `include_interface_pairs` together decide
    /// whether interface candidates of an interface query are reported.
    /// With `method` (a method id as built by [`key_of`]), hits point at
    /// that method of each candidate instead of the type.
    pub fn search(
        &self,
        key: &MethodSetKey,
        query_is_interface: bool,
        relation: Relation,
        method: Option<&str>,
        include_interface_pairs: bool,
    ) -> Vec<IndexHit> {
        let mut hits = Vec::new();
        for entry in &self.entries {
            if entry.is_interface && query_is_interface && !include_interface_pairs {
                continue;
            }
            let related = (relation.subtypes() && entry.key.may_implement(key))
                || (relation.supertypes() && entry.is_interface && key.may_implement(&entry.key));
            if !related {
                continue;
            }
            let pos = match method {
                None => entry.pos,
                Some(id) => {
                    if !entry.key.has_method(id) {
                        continue;
                    }
                    match entry.method_pos.iter().find(|(m, _)| m == id) {
                        Some((_, pos)) => *pos,
                        None => continue,
                    }
                }
            };
            hits.push(IndexHit {
                name: entry.name.clone(),
                is_interface: entry.is_interface,
                pos,
            });
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use indexmap::IndexMap;

    use super::*;
    use crate::base::FileId;
    use crate::hir::{CheckMode, Metadata, NoImports, PackageId, check_package};
    use crate::parser;

    fn check(src: &str) -> Package {
        let meta = Arc::new(Metadata {
            id: PackageId::new("p"),
            path: "p".into(),
            name: "p".into(),
            dir: PathBuf::from("/p"),
            files: vec![FileId::new(0)],
            imports: IndexMap::new(),
            for_test: None,
        });
        check_package(
            meta,
            vec![(FileId::new(0), Arc::new(parser::parse(src)))],
            CheckMode::Headers,
            &NoImports,
        )
    }

    fn key(pkg: &Package, name: &str) -> Option<MethodSetKey> {
        key_of(&pkg.lookup(name)?.ty()?)
    }

    const SRC: &str = "package p
type Reader interface{ Read(p []byte) (int, error) }
type Closer interface{ Close() error }
type ReadCloser interface{ Reader; Closer }
type File struct{}
func (*File) Read(b []byte) (int, error) { return 0, nil }
func (*File) Close() error { return nil }
type Buf struct{}
func (Buf) Read(b []byte) (n int, err error) { return }
type Other struct{}
func (Other) Read(s string) {}
type Empty interface{}
";

    #[test]
    fn test_key_ignores_order_and_names() {
        let pkg = check(SRC);
        let file = key(&pkg, "File").unwrap();
        let buf = key(&pkg, "Buf").unwrap();
        let reader = key(&pkg, "Reader").unwrap();
        assert!(file.may_implement(&reader));
        assert!(buf.may_implement(&reader));
        assert!(file.may_implement(&key(&pkg, "ReadCloser").unwrap()));
        assert!(!buf.may_implement(&key(&pkg, "ReadCloser").unwrap()));
        assert!(!key(&pkg, "Other").unwrap().may_implement(&reader));
    }

    #[test]
    fn test_empty_method_sets_have_no_key() {
        let pkg = check(SRC);
        assert!(key(&pkg, "Empty").is_none());
        assert!(key_of(&crate::hir::universe::any_type()).is_none());
    }

    #[test]
    fn test_index_search_directions() {
        let pkg = check(SRC);
        let index = MethodSetIndex::build(&pkg);
        let reader = key(&pkg, "Reader").unwrap();
        let mut names: Vec<_> = index
            .search(&reader, true, Relation::Subtype, None, false)
            .into_iter()
            .map(|h| h.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["Buf", "File"]);

        let file = key(&pkg, "File").unwrap();
        let mut supers: Vec<_> = index
            .search(&file, false, Relation::Supertype, None, false)
            .into_iter()
            .map(|h| h.name)
            .collect();
        supers.sort();
        assert_eq!(supers, vec!["Closer", "ReadCloser", "Reader"]);
    }

    #[test]
    fn test_interface_pairs_are_gated() {
        let pkg = check(SRC);
        let index = MethodSetIndex::build(&pkg);
        let reader = key(&pkg, "Reader").unwrap();
        let with_pairs = index.search(&reader, true, Relation::Subtype, None, true);
        assert!(with_pairs.iter().any(|h| h.name == "ReadCloser"));
        let without = index.search(&reader, true, Relation::Subtype, None, false);
        assert!(without.iter().all(|h| !h.is_interface));
    }

    #[test]
    fn test_method_hits_point_at_methods() {
        let pkg = check(SRC);
        let index = MethodSetIndex::build(&pkg);
        let reader = key(&pkg, "Reader").unwrap();
        let hits = index.search(&reader, true, Relation::Subtype, Some("Read"), false);
        let offsets: Vec<_> = hits.iter().map(|h| usize::from(h.pos.offset)).collect();
        for off in offsets {
            assert_eq!(&SRC[off..off + 4], "Read");
        }
    }

    #[test]
    fn test_type_parameters_are_wildcards() {
        let pkg = check(
            "package p
type Getter interface{ Get() int }
type Box[T any] struct{ v T }
func (b Box[T]) Get() T { return b.v }
",
        );
        let getter = key(&pkg, "Getter").unwrap();
        assert!(key(&pkg, "Box").unwrap().may_implement(&getter));
    }
}
