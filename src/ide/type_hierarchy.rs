//! Type hierarchy: the implementation search with an explicit direction.
//!
//! Supertypes of a type are the interfaces it implements; subtypes of an
//! interface are the types implementing it. Interface/interface pairs are
//! always reported here, since a hierarchy without them has holes.

use smol_str::SmolStr;

use crate::base::{FileId, Position};
use crate::hir::types::is_interface;
use crate::hir::{ObjKind, ObjRef, Snapshot, Type, universe};

use super::error::{IdeResult, soft};
use super::implementation::{Query, implementations_of};
use super::location::{Location, object_location};
use super::methodsets::Relation;
use super::options::ImplementationOptions;
use super::resolve::{object_at, referenced_object};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Interface,
    Struct,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeHierarchyItem {
    pub name: SmolStr,
    pub kind: TypeKind,
    /// Import path of the declaring package, empty for predeclared types.
    pub detail: String,
    /// The type's name in its declaration.
    pub location: Location,
}

/// The named type at `position`, if there is one.
pub fn prepare_type_hierarchy(
    snapshot: &dyn Snapshot,
    file: FileId,
    position: Position,
) -> IdeResult<Vec<TypeHierarchyItem>> {
    let Some((_, resolved)) = soft(object_at(snapshot, file, position).map(Some))? else {
        return Ok(Vec::new());
    };
    Ok(item_for(snapshot, &resolved.obj)?.into_iter().collect())
}

pub fn supertypes(
    snapshot: &dyn Snapshot,
    options: &ImplementationOptions,
    item: &TypeHierarchyItem,
) -> IdeResult<Vec<TypeHierarchyItem>> {
    related(snapshot, options, item, Relation::Supertype)
}

pub fn subtypes(
    snapshot: &dyn Snapshot,
    options: &ImplementationOptions,
    item: &TypeHierarchyItem,
) -> IdeResult<Vec<TypeHierarchyItem>> {
    related(snapshot, options, item, Relation::Subtype)
}

fn related(
    snapshot: &dyn Snapshot,
    options: &ImplementationOptions,
    item: &TypeHierarchyItem,
    relation: Relation,
) -> IdeResult<Vec<TypeHierarchyItem>> {
    let Some(obj) = object_of_item(snapshot, item)? else {
        return Ok(Vec::new());
    };
    let pkg = snapshot.narrowest_package(item.location.file)?;
    let Some(mut query) = Query::new(snapshot, &pkg, &obj)? else {
        return Ok(Vec::new());
    };
    query.relation = relation;
    let options = ImplementationOptions {
        include_interface_pairs: true,
        ..options.clone()
    };
    tracing::debug!(ty = %item.name, ?relation, "type hierarchy");

    let mut out = Vec::new();
    for location in implementations_of(snapshot, &options, &query)? {
        let found = if universe::is_synthetic_file(location.file) {
            universe::lookup(&snapshot_text(snapshot, &location)?)
        } else {
            object_at_location(snapshot, &location)?
        };
        if let Some(item) = found.map(|o| item_for(snapshot, &o)).transpose()?.flatten() {
            out.push(item);
        }
    }
    Ok(out)
}

fn item_for(snapshot: &dyn Snapshot, obj: &ObjRef) -> IdeResult<Option<TypeHierarchyItem>> {
    if obj.kind() != ObjKind::TypeName {
        return Ok(None);
    }
    let Some(ty) = obj.ty() else {
        return Ok(None);
    };
    let Type::Named(named) = ty.as_ref() else {
        return Ok(None);
    };
    let kind = if is_interface(&ty) {
        TypeKind::Interface
    } else if matches!(named.underlying().as_ref(), Type::Struct(_)) {
        TypeKind::Struct
    } else {
        TypeKind::Other
    };
    Ok(Some(TypeHierarchyItem {
        name: SmolStr::new(obj.name()),
        kind,
        detail: obj.pkg_path().unwrap_or_default().to_string(),
        location: object_location(snapshot, obj)?,
    }))
}

fn object_of_item(snapshot: &dyn Snapshot, item: &TypeHierarchyItem) -> IdeResult<Option<ObjRef>> {
    if universe::is_synthetic_file(item.location.file) {
        return Ok(universe::lookup(&item.name));
    }
    object_at_location(snapshot, &item.location)
}

fn object_at_location(snapshot: &dyn Snapshot, location: &Location) -> IdeResult<Option<ObjRef>> {
    let pkg = snapshot.narrowest_package(location.file)?;
    let resolved = soft(referenced_object(&pkg, location.file, location.range.start()).map(Some))?;
    Ok(resolved.map(|r| r.obj))
}

fn snapshot_text(snapshot: &dyn Snapshot, location: &Location) -> IdeResult<String> {
    let index = snapshot.line_index(location.file)?;
    Ok(index.text()[location.range].to_string())
}
