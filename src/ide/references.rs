//! Find references.
//!
//! Objects are matched by declaring position, never by pointer, since each
//! package variant is checked separately. The search covers every variant
//! declaring the object and, when the object is visible outside its
//! package, all packages that (transitively) import one of them.

use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use text_size::TextRange;

use crate::base::{FileId, Position};
use crate::hir::{CheckMode, ObjKey, ObjKind, ObjRef, Package, PackageId, Snapshot};
use crate::parser::NodeKind;

use super::error::{IdeResult, ResultExt};
use super::location::{Location, range_location};
use super::resolve::object_at;

/// Locations referring to the object at `position`, sorted and without
/// duplicates. The declaration is included on request.
pub fn references(
    snapshot: &dyn Snapshot,
    file: FileId,
    position: Position,
    include_declaration: bool,
) -> IdeResult<Vec<Location>> {
    let (pkg, resolved) = match object_at(snapshot, file, position) {
        Ok(found) => found,
        Err(e) if e.is_soft_empty() => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    object_references(snapshot, &pkg, &resolved.obj, include_declaration)
}

/// References to `obj`, which was resolved in `pkg`.
pub(crate) fn object_references(
    snapshot: &dyn Snapshot,
    pkg: &Arc<Package>,
    obj: &ObjRef,
    include_declaration: bool,
) -> IdeResult<Vec<Location>> {
    let Some(key) = obj.key() else {
        // Builtins have no position; match them by name in this package.
        return local_builtin_references(snapshot, pkg, obj);
    };
    let ids = search_scope(snapshot, pkg, obj, key);
    tracing::debug!(name = obj.name(), packages = ids.len(), "searching references");

    let packages = snapshot
        .type_check(&ids, CheckMode::Full)
        .context("checking referencing packages")?;
    let found: Mutex<Vec<Location>> = Mutex::new(Vec::new());
    packages.par_iter().try_for_each(|pkg| -> IdeResult<()> {
        snapshot.check_cancelled()?;
        for checked in pkg.files() {
            let info = &checked.info;
            let mut ranges: Vec<TextRange> = info
                .uses
                .iter()
                .filter(|(_, o)| o.key() == Some(key))
                .map(|(node, _)| checked.file.range(*node))
                .collect();
            if include_declaration {
                ranges.extend(
                    info.defs
                        .iter()
                        .filter(|(_, o)| o.key() == Some(key))
                        .map(|(node, _)| checked.file.range(*node)),
                );
                // An unnamed import declares its package name on the path.
                ranges.extend(info.implicits.iter().filter_map(|(node, o)| {
                    match checked.file.kind(*node) {
                        NodeKind::ImportSpec { name: None, path } if o.key() == Some(key) => {
                            Some(checked.file.range(*path))
                        }
                        _ => None,
                    }
                }));
            }
            if ranges.is_empty() {
                continue;
            }
            let locations = ranges
                .into_iter()
                .map(|r| range_location(snapshot, checked.file_id, r))
                .collect::<IdeResult<Vec<_>>>()?;
            found.lock().extend(locations);
        }
        Ok(())
    })?;

    let mut out = found.into_inner();
    out.sort();
    out.dedup();
    Ok(out)
}

/// Variants that may refer to an object declared at `key`.
fn search_scope(snapshot: &dyn Snapshot, pkg: &Package, obj: &ObjRef, key: ObjKey) -> Vec<PackageId> {
    let mut declaring: Vec<PackageId> = snapshot
        .metadata_for_file(key.file)
        .into_iter()
        .map(|m| m.id.clone())
        .collect();
    if declaring.is_empty() {
        // The synthetic builtin file belongs to no package.
        declaring.push(pkg.id().clone());
    }

    let mut seen: FxHashSet<PackageId> = declaring.iter().cloned().collect();
    let mut ids = declaring.clone();
    if is_visible_outside(obj) {
        for id in &declaring {
            for meta in snapshot.reverse_dependencies(id, true) {
                if seen.insert(meta.id.clone()) {
                    ids.push(meta.id.clone());
                }
            }
        }
    }
    ids
}

fn is_visible_outside(obj: &ObjRef) -> bool {
    if !obj.is_exported() {
        return false;
    }
    // Local types and constants are included too; searching more
    // packages than needed only costs time.
    obj.is_package_level()
        || obj.is_field()
        || obj.is_method()
        || matches!(obj.kind(), ObjKind::TypeName | ObjKind::Const)
}

fn local_builtin_references(snapshot: &dyn Snapshot, pkg: &Package, obj: &ObjRef) -> IdeResult<Vec<Location>> {
    let mut out = Vec::new();
    for checked in pkg.files() {
        for (node, used) in &checked.info.uses {
            if used.pos().is_none() && used.kind() == obj.kind() && used.name() == obj.name() {
                out.push(range_location(snapshot, checked.file_id, checked.file.range(*node))?);
            }
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}
