//! Mapping a cursor offset to the object it denotes.

use text_size::{TextRange, TextSize};

use crate::base::{FileId, Position};
use crate::hir::{CheckedFile, ObjKind, ObjRef, Package, Snapshot, Ty, Type};
use crate::parser::walk::{ident_at, path_enclosing_interval};
use crate::parser::{File, NodeId, NodeKind};

use super::error::{IdeError, IdeResult, bug};
use super::location::offset_at;

/// The object at a cursor position.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The identifier, or the import spec for a cursor on an import path.
    pub node: NodeId,
    pub obj: ObjRef,
    /// For the symbolic variable of a type switch, the type of the
    /// switched expression.
    pub selected_type: Option<Ty>,
    /// Set when the cursor was on the path of an import spec.
    pub import_path: Option<String>,
}

/// The path from the node denoting an object at `offset` up to the root.
///
/// The first element is an identifier or an import spec; the path is empty
/// when the offset is on neither. A cursor on the `*` of `*T` is moved to
/// the operand.
pub fn path_enclosing_obj_node(file: &File, offset: TextSize) -> Vec<NodeId> {
    if let Some(ident) = ident_at(file, offset) {
        return file.ancestors(ident).collect();
    }
    let (path, _) = path_enclosing_interval(file, offset, offset);
    let Some(&leaf) = path.first() else {
        return Vec::new();
    };
    if let NodeKind::Star(x) = file.kind(leaf)
        && file.range(leaf).start() == offset
    {
        return match file.kind(*x) {
            NodeKind::Ident(_) => file.ancestors(*x).collect(),
            _ => path_enclosing_obj_node(file, file.range(*x).start()),
        };
    }
    if let Some(i) = path
        .iter()
        .position(|n| matches!(file.kind(*n), NodeKind::ImportSpec { .. }))
        && let NodeKind::ImportSpec { path: lit, .. } = file.kind(path[i])
        && file.range(*lit).contains_inclusive(offset)
    {
        return path[i..].to_vec();
    }
    Vec::new()
}

/// Resolve the object referenced at `offset` of a fully checked file.
///
/// Uses are consulted before definitions, so the identifier of an embedded
/// field resolves to the embedded type rather than the field.
pub fn referenced_object(pkg: &Package, file: FileId, offset: TextSize) -> IdeResult<Resolved> {
    let checked = pkg
        .file(file)
        .ok_or_else(|| bug(format!("{file} is not part of package {}", pkg.id())))?;
    let path = path_enclosing_obj_node(&checked.file, offset);
    let Some(&leaf) = path.first() else {
        return Err(IdeError::NoIdentifier);
    };
    let info = &checked.info;

    if let NodeKind::ImportSpec { name, .. } = checked.file.kind(leaf) {
        let obj = name
            .and_then(|n| info.defs.get(&n))
            .or_else(|| info.implicits.get(&leaf))
            .cloned()
            .ok_or(IdeError::NoObject)?;
        return Ok(Resolved {
            node: leaf,
            obj,
            selected_type: None,
            import_path: checked.file.import_path(leaf),
        });
    }

    if let Some(obj) = info.uses.get(&leaf).or_else(|| info.defs.get(&leaf)) {
        return Ok(Resolved {
            node: leaf,
            obj: redirect_embedded(obj),
            selected_type: None,
            import_path: None,
        });
    }

    if let Some((obj, selected)) = type_switch_implicit(checked, &path) {
        return Ok(Resolved {
            node: leaf,
            obj,
            selected_type: selected,
            import_path: None,
        });
    }
    Err(IdeError::NoObject)
}

/// A definition of an embedded field stands for the embedded type.
fn redirect_embedded(obj: &ObjRef) -> ObjRef {
    if obj.is_embedded_field()
        && let Some(type_name) = obj.ty().as_ref().and_then(type_name_of)
    {
        return type_name;
    }
    obj.clone()
}

/// The type name of `T`, `*T` or an instance of generic `T`.
pub(crate) fn type_name_of(ty: &Ty) -> Option<ObjRef> {
    match ty.as_ref() {
        Type::Pointer(elem) => type_name_of(elem),
        Type::Named(n) => Some(n.origin().unwrap_or(n).obj().clone()),
        Type::TypeParam(tp) => Some(tp.obj().clone()),
        _ => None,
    }
}

/// `x` in `switch x := y.(type)`: the object of the first clause, and the
/// type of `y`.
fn type_switch_implicit(checked: &CheckedFile, path: &[NodeId]) -> Option<(ObjRef, Option<Ty>)> {
    let file = &checked.file;
    let [ident, assign, switch, ..] = path else {
        return None;
    };
    let NodeKind::Assign { lhs, rhs, .. } = file.kind(*assign) else {
        return None;
    };
    let NodeKind::TypeSwitch { body, .. } = file.kind(*switch) else {
        return None;
    };
    if lhs.first() != Some(ident) {
        return None;
    }
    let NodeKind::Block(clauses) = file.kind(*body) else {
        return None;
    };
    let obj = clauses
        .iter()
        .find_map(|c| checked.info.implicits.get(c))?
        .clone();
    let selected = rhs.first().and_then(|guard| match file.kind(*guard) {
        NodeKind::TypeAssert { x, .. } => checked.info.type_of(*x).cloned(),
        _ => None,
    });
    Some((obj, selected))
}

/// Resolve a client position in the narrowest package containing `file`.
pub fn object_at(
    snapshot: &dyn Snapshot,
    file: FileId,
    position: Position,
) -> IdeResult<(std::sync::Arc<Package>, Resolved)> {
    let offset = offset_at(snapshot, file, position)?;
    let pkg = snapshot.narrowest_package(file)?;
    let resolved = referenced_object(&pkg, file, offset)?;
    tracing::debug!(
        %file,
        obj = resolved.obj.name(),
        kind = resolved.obj.kind().describe(),
        "resolved object"
    );
    Ok((pkg, resolved))
}

/// The declaration whose name is at `offset`: a function, type spec, value
/// spec or field.
pub(crate) fn decl_node_at(file: &File, offset: TextSize) -> Option<NodeId> {
    let ident = ident_at(file, offset)?;
    let parent = file.parent(ident)?;
    match file.kind(parent) {
        NodeKind::FuncDecl { name, .. } if *name == ident => Some(parent),
        NodeKind::TypeSpec { name, .. } if *name == ident => Some(parent),
        NodeKind::ValueSpec { .. } | NodeKind::Field { .. } => Some(parent),
        _ => None,
    }
}

/// Whether `offset` is on the `func` keyword of a function type.
pub(crate) fn on_func_keyword(file: &File, node: NodeId, offset: TextSize) -> bool {
    match file.kind(node) {
        NodeKind::FuncType {
            func_kw: Some(kw), ..
        } => TextRange::at(*kw, TextSize::new(4)).contains_inclusive(offset),
        _ => false,
    }
}

pub(crate) fn is_package_name(obj: &ObjRef) -> bool {
    obj.kind() == ObjKind::PkgName
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use indexmap::IndexMap;

    use super::*;
    use crate::hir::{CheckMode, Metadata, NoImports, Object, PackageId, check_package};
    use crate::parser;

    fn check(src: &str) -> Package {
        let file = Arc::new(parser::parse(src));
        let meta = Arc::new(Metadata {
            id: PackageId::new("p"),
            path: "p".into(),
            name: "p".into(),
            dir: PathBuf::from("/p"),
            files: vec![FileId::new(0)],
            imports: IndexMap::new(),
            for_test: None,
        });
        check_package(meta, vec![(FileId::new(0), file)], CheckMode::Full, &NoImports)
    }

    fn at(src: &str, needle: &str) -> TextSize {
        TextSize::new(src.find(needle).expect("needle") as u32)
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let src = "package p\nfunc f() { v := 1; _ = v }\n";
        let pkg = check(src);
        let offset = at(src, "v }");
        let a = referenced_object(&pkg, FileId::new(0), offset).unwrap();
        let b = referenced_object(&pkg, FileId::new(0), offset).unwrap();
        assert!(Object::same(&a.obj, &b.obj));
    }

    #[test]
    fn test_keyword_is_no_identifier() {
        let src = "package p\nfunc f() {}\n";
        let pkg = check(src);
        let err = referenced_object(&pkg, FileId::new(0), at(src, "unc")).unwrap_err();
        assert_eq!(err, IdeError::NoIdentifier);
    }

    #[test]
    fn test_embedded_field_resolves_to_type() {
        let src = "package p\ntype B struct{ f int }\ntype A struct{ B }\nfunc g(a A) { _ = a.B; _ = a.f }\n";
        let pkg = check(src);
        let embedded = referenced_object(&pkg, FileId::new(0), at(src, "B }")).unwrap();
        assert_eq!(embedded.obj.kind(), ObjKind::TypeName);

        let selected = referenced_object(&pkg, FileId::new(0), at(src, "B; _")).unwrap();
        assert_eq!(selected.obj.kind(), ObjKind::TypeName);
        assert_eq!(selected.obj.pos(), embedded.obj.pos());

        let promoted = referenced_object(&pkg, FileId::new(0), at(src, "f }\n")).unwrap();
        assert!(promoted.obj.is_field());
        assert_eq!(promoted.obj.pos().map(|p| p.offset), Some(at(src, "f int")));
    }

    #[test]
    fn test_type_switch_symbolic_variable() {
        let src = "package p\nfunc f(y any) {\n\tswitch x := y.(type) {\n\tcase int:\n\t\t_ = x\n\t}\n}\n";
        let pkg = check(src);
        let r = referenced_object(&pkg, FileId::new(0), at(src, "x :=")).unwrap();
        assert_eq!(r.obj.name(), "x");
        assert_eq!(r.selected_type.map(|t| t.to_string()).as_deref(), Some("any"));
    }

    #[test]
    fn test_star_moves_to_operand() {
        let src = "package p\ntype T int\nvar v *T\n";
        let file = parser::parse(src);
        let path = path_enclosing_obj_node(&file, at(src, "*T"));
        assert_eq!(file.ident_name(path[0]), Some("T"));
    }

    #[test]
    fn test_import_path_resolves_to_package_name() {
        let src = "package p\nimport \"unsafe\"\nvar _ unsafe.Pointer\n";
        let pkg = check(src);
        let r = referenced_object(&pkg, FileId::new(0), at(src, "nsafe\"")).unwrap();
        assert!(is_package_name(&r.obj));
        assert_eq!(r.import_path.as_deref(), Some("unsafe"));
    }
}
