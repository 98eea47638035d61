//! Find implementations.
//!
//! For a type or method, two searches run and their results are merged:
//!
//! - the **local** search re-checks every variant of the declaring package
//!   and tests each type declaration in its syntax, including types local
//!   to function bodies;
//! - the **global** search checks every other package in header mode,
//!   indexes its package-level types by [`MethodSetKey`], and verifies the
//!   candidates the index turns up.
//!
//! For a function type (the `func` keyword of a declaration, literal or
//! type, or a dynamic call), matching is by signature unification within
//! the package instead.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use text_size::{TextRange, TextSize};

use crate::base::{FileId, Position};
use crate::hir::types::{deref, interface_of, is_interface, pointer};
use crate::hir::{
    CheckMode, CheckedFile, ObjKind, ObjRef, Package, PackageId, Pos, SelectionKind, Signature,
    Snapshot, Ty, Type, ValueMode, concrete_implements, implements, lookup_field_or_method,
    universe,
};
use crate::parser::walk::path_enclosing_interval;
use crate::parser::{File, NodeId, NodeKind};

use super::error::{IdeError, IdeResult, bug};
use super::location::{Location, pos_location, range_location};
use super::methodsets::{MethodSetIndex, Relation, key_of, method_id};
use super::options::ImplementationOptions;
use super::resolve::{on_func_keyword, referenced_object};
use super::unify::{Bindings, unify_signatures};

/// Implementations of the type, method or function type at `position`.
pub fn implementation(
    snapshot: &dyn Snapshot,
    options: &ImplementationOptions,
    file: FileId,
    position: Position,
) -> IdeResult<Vec<Location>> {
    let offset = super::location::offset_at(snapshot, file, position)?;
    let pkg = snapshot.narrowest_package(file)?;
    let checked = pkg
        .file(file)
        .ok_or_else(|| bug(format!("{file} missing from its own package")))?;

    if let Some(query) = func_type_query(checked, offset) {
        tracing::debug!(%file, is_abstract = query.is_abstract, "function type implementations");
        return func_type_implementations(snapshot, file, &query);
    }

    let resolved = match referenced_object(&pkg, file, offset) {
        Ok(r) => r,
        Err(e) if e.is_soft_empty() => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let Some(query) = Query::new(snapshot, &pkg, &resolved.obj)? else {
        return Ok(Vec::new());
    };
    implementations_of(snapshot, options, &query)
}

/// The subject of a type or method implementation query.
pub(crate) struct Query {
    /// The named type, never a pointer.
    pub ty: Ty,
    pub type_obj: ObjRef,
    pub method: Option<ObjRef>,
    pub is_interface: bool,
    pub relation: Relation,
}

impl Query {
    /// Build a query from a resolved object. `Ok(None)` means there is
    /// nothing to search for, such as a type without methods.
    pub(crate) fn new(snapshot: &dyn Snapshot, pkg: &Package, obj: &ObjRef) -> IdeResult<Option<Query>> {
        let (ty, method) = match obj.kind() {
            ObjKind::TypeName => match obj.ty() {
                Some(ty) => (ty, None),
                None => return Ok(None),
            },
            ObjKind::Func if obj.is_method() => match method_receiver(snapshot, pkg, obj)? {
                Some(ty) => (ty, Some(obj.clone())),
                None => return Ok(None),
            },
            kind => {
                return Err(IdeError::Unsupported(format!(
                    "{} is a {}, not a type or method",
                    obj.name(),
                    kind.describe()
                )));
            }
        };
        let Some(type_obj) = ty.as_named().map(|n| n.origin().unwrap_or(n).obj().clone()) else {
            // Type parameters, basic types and literals have nothing to search.
            return Ok(None);
        };
        let ty = type_obj.ty().unwrap_or(ty);
        let is_interface = is_interface(&ty);
        Ok(Some(Query {
            relation: Relation::for_query(is_interface),
            is_interface,
            ty,
            type_obj,
            method,
        }))
    }

    fn key(&self) -> Pos {
        self.type_obj.pos().unwrap_or(Pos::new(universe::BUILTIN_FILE, TextSize::new(0)))
    }
}

/// The named type declaring a method.
fn method_receiver(snapshot: &dyn Snapshot, pkg: &Package, method: &ObjRef) -> IdeResult<Option<Ty>> {
    let Some(recv) = method.signature().and_then(|s| s.recv) else {
        return Ok(None);
    };
    let (base, _) = deref(&recv.ty);
    if let Type::Named(_) = base.as_ref() {
        return Ok(Some(base));
    }
    // Interface methods: find the named interface whose method this is.
    let Some(key) = method.key() else {
        return Ok(None);
    };
    let error = universe::error_type();
    if interface_of(&error).is_some_and(|i| i.methods.iter().any(|m| m.obj.key() == Some(key))) {
        return Ok(Some(error));
    }
    let ids: Vec<PackageId> = snapshot
        .metadata_for_file(key.file)
        .into_iter()
        .map(|m| m.id.clone())
        .collect();
    let declaring = if ids.is_empty() {
        vec![]
    } else {
        snapshot.type_check(&ids[..1], CheckMode::Full)?
    };
    let named = declaring
        .iter()
        .map(Arc::as_ref)
        .chain(std::iter::once(pkg))
        .flat_map(|p| p.named_types().iter())
        .find(|n| match n.underlying().as_ref() {
            Type::Interface(iface) => iface.methods.iter().any(|m| m.obj.key() == Some(key)),
            _ => false,
        })
        .cloned();
    Ok(named.map(crate::hir::types::named))
}

/// A match found before conversion to a location: a name's position and
/// length.
type Hit = (Pos, usize);

pub(crate) fn implementations_of(
    snapshot: &dyn Snapshot,
    options: &ImplementationOptions,
    query: &Query,
) -> IdeResult<Vec<Location>> {
    let started = Instant::now();
    let key = key_of(&query.ty);
    if key.is_none() && options.suppress_empty_interfaces {
        tracing::debug!(ty = %query.ty, "no methods; every type is related");
        return Ok(Vec::new());
    }

    let declaring: Vec<PackageId> = query
        .type_obj
        .pos()
        .map(|pos| snapshot.metadata_for_file(pos.file))
        .unwrap_or_default()
        .into_iter()
        .map(|m| m.id.clone())
        .collect();

    let found: Mutex<Vec<Hit>> = Mutex::new(Vec::new());

    // Local search, one unit per variant.
    declaring.par_iter().try_for_each(|id| -> IdeResult<()> {
        snapshot.check_cancelled()?;
        let variant = snapshot.type_check(std::slice::from_ref(id), CheckMode::Full)?;
        for pkg in &variant {
            let hits = local_search(pkg, query, options);
            found.lock().extend(hits);
        }
        Ok(())
    })?;

    // Global search over the package-level types of everything else.
    if let Some(key) = &key {
        let exclude: FxHashSet<&PackageId> = declaring.iter().collect();
        let candidates: Vec<PackageId> = snapshot
            .all_metadata()
            .into_iter()
            .filter(|m| !exclude.contains(&m.id))
            .map(|m| m.id.clone())
            .collect();
        let relation = query.relation;
        let method = query.method.as_ref().map(|m| method_id(m.pkg_path(), m.name()));
        candidates
            .par_iter()
            .try_for_each(|id| -> IdeResult<()> {
                snapshot.check_cancelled()?;
                let checked = snapshot.type_check(std::slice::from_ref(id), CheckMode::Headers)?;
                for pkg in &checked {
                    let index = MethodSetIndex::build(pkg);
                    let hits = index.search(
                        key,
                        query.is_interface,
                        relation,
                        method.as_deref(),
                        options.include_interface_pairs,
                    );
                    for hit in hits {
                        let Some(cand) = pkg.lookup(&hit.name).and_then(|o| o.ty()) else {
                            continue;
                        };
                        if let Some(found_hit) = verify(query, &cand, options) {
                            tracing::trace!(package = %id, name = %hit.name, "global match");
                            found.lock().push(found_hit);
                        }
                    }
                }
                Ok(())
            })
            .map_err(|e| e.context("querying method sets"))?;
    }

    let mut hits = found.into_inner();
    if let Some(hit) = error_declaration(query) {
        hits.push(hit);
    }
    let mut locations = hits
        .par_iter()
        .map(|(pos, len)| pos_location(snapshot, *pos, *len))
        .collect::<IdeResult<Vec<_>>>()?;
    locations.sort();
    locations.dedup();
    tracing::debug!(
        ty = %query.ty,
        results = locations.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "implementations"
    );
    Ok(locations)
}

/// Every type declaration of `pkg` related to the query.
///
/// Generic candidates are compared as declared, so a generic type is only
/// found when its method signatures don't mention its type parameters.
fn local_search(pkg: &Package, query: &Query, options: &ImplementationOptions) -> Vec<Hit> {
    let mut hits = Vec::new();
    for checked in pkg.files() {
        for node in checked.file.node_ids() {
            let NodeKind::TypeSpec {
                name, assign: false, ..
            } = checked.file.kind(node)
            else {
                continue;
            };
            let Some(obj) = checked.info.defs.get(name) else {
                continue;
            };
            if obj.key() == Some(query.key()) {
                continue;
            }
            if let Some(cand) = obj.ty()
                && let Some(hit) = verify(query, &cand, options)
            {
                hits.push(hit);
            }
        }
    }
    hits
}

/// Whether `cand` and the query type are related, and the location to
/// report for it: the type's name, or the matching method's.
fn verify(query: &Query, cand: &Ty, options: &ImplementationOptions) -> Option<Hit> {
    let cand_obj = cand.as_named()?.obj().clone();
    if cand_obj.key() == Some(query.key()) {
        return None;
    }
    let cand_is_interface = is_interface(cand);
    let (down, up) = (query.relation.subtypes(), query.relation.supertypes());
    let related = match (query.is_interface, cand_is_interface) {
        (true, false) => down && concrete_implements(cand, &query.ty),
        (false, true) => up && !is_empty_interface(cand) && concrete_implements(&query.ty, cand),
        (true, true) if options.include_interface_pairs => {
            !is_empty_interface(cand)
                && ((down && implements(cand, &query.ty)) || (up && implements(&query.ty, cand)))
        }
        _ => false,
    };
    if !related {
        return None;
    }
    match &query.method {
        None => Some((cand_obj.pos()?, cand_obj.name().len())),
        Some(method) => {
            let recv = if cand_is_interface { cand.clone() } else { pointer(cand.clone()) };
            let found = lookup_field_or_method(&recv, method.pkg_path(), method.name())?;
            if !found.is_method() {
                return None;
            }
            let (want, have) = (method.signature()?, found.obj.signature()?);
            let mut bindings = Bindings::new();
            if !unify_signatures(&want, &have, Some(&mut bindings)) {
                return None;
            }
            Some((found.obj.pos()?, found.obj.name().len()))
        }
    }
}

fn is_empty_interface(ty: &Ty) -> bool {
    interface_of(ty).is_none_or(|i| i.all_methods().is_empty())
}

/// Every concrete type implementing `error` is related to the builtin
/// declaration, which no package index contains.
fn error_declaration(query: &Query) -> Option<Hit> {
    if query.is_interface || !query.relation.supertypes() {
        return None;
    }
    let error = universe::error_type();
    if !concrete_implements(&query.ty, &error) {
        return None;
    }
    let named = error.as_named()?;
    match &query.method {
        None => Some((named.obj().pos()?, named.obj().name().len())),
        Some(m) if m.name() == "Error" => {
            let method = lookup_field_or_method(&error, None, "Error")?;
            Some((method.obj.pos()?, method.obj.name().len()))
        }
        Some(_) => None,
    }
}

// ============================================================================
// FUNCTION TYPES
// ============================================================================

struct FuncQuery {
    sig: Signature,
    /// A function type or dynamic call, as opposed to a concrete function.
    is_abstract: bool,
    /// The range to leave out of the results.
    origin: TextRange,
}

/// Recognize a cursor on a function type: the `func` keyword of a function
/// declaration, literal or type expression, or the callee of a dynamic call.
fn func_type_query(checked: &CheckedFile, offset: TextSize) -> Option<FuncQuery> {
    let file = &checked.file;
    let info = &checked.info;
    let (path, _) = path_enclosing_interval(file, offset, offset);

    for (i, &node) in path.iter().enumerate() {
        // A declaration's signature node starts after the name, so the
        // keyword is only inside the declaration itself.
        let func_type = match file.kind(node) {
            NodeKind::FuncDecl { ty, .. } => *ty,
            _ => node,
        };
        if let NodeKind::FuncType {
            func_kw: Some(kw), ..
        } = file.kind(func_type)
            && on_func_keyword(file, func_type, offset)
        {
            let origin = TextRange::at(*kw, TextSize::of("func"));
            let parent = file.parent(func_type)?;
            return match file.kind(parent) {
                NodeKind::FuncDecl { name, .. } => Some(FuncQuery {
                    sig: info.defs.get(name)?.signature()?,
                    is_abstract: false,
                    origin,
                }),
                NodeKind::FuncLit { .. } => Some(FuncQuery {
                    sig: info.type_of(parent)?.as_signature()?.clone(),
                    is_abstract: false,
                    origin,
                }),
                _ => Some(FuncQuery {
                    sig: info.type_of(func_type)?.as_signature()?.clone(),
                    is_abstract: true,
                    origin,
                }),
            };
        }
        if let NodeKind::Call { fun, .. } = file.kind(node)
            && i > 0
            && *fun == path[i - 1]
            && is_dynamic_callee(checked, *fun)
        {
            return Some(FuncQuery {
                sig: info.type_of(*fun)?.as_signature()?.clone(),
                is_abstract: true,
                origin: file.range(*fun),
            });
        }
        if file.kind(node).is_stmt() {
            break;
        }
    }
    None
}

/// Whether `fun` is a call target that isn't a declared function, method
/// or builtin: a variable, field or other function-valued expression.
pub(crate) fn is_dynamic_callee(checked: &CheckedFile, fun: NodeId) -> bool {
    let (file, info) = (&checked.file, &checked.info);
    let Some(tv) = info.types.get(&fun) else {
        return false;
    };
    if !matches!(tv.ty.as_ref(), Type::Signature(_)) || matches!(tv.mode, ValueMode::TypeExpr | ValueMode::Builtin) {
        return false;
    }
    match file.kind(fun) {
        NodeKind::Paren(x) => is_dynamic_callee(checked, *x),
        NodeKind::Ident(_) => info.uses.get(&fun).is_some_and(|o| o.is_var()),
        NodeKind::Selector { sel, .. } => match info.selections.get(&fun) {
            Some(selection) => selection.kind == SelectionKind::FieldVal,
            None => info.uses.get(sel).is_some_and(|o| o.is_var()),
        },
        NodeKind::Index { x, .. } => !info.object_of(*x).is_some_and(|o| o.kind() == ObjKind::Func),
        NodeKind::FuncLit { .. } => false,
        _ => true,
    }
}

fn func_type_implementations(snapshot: &dyn Snapshot, file: FileId, query: &FuncQuery) -> IdeResult<Vec<Location>> {
    let ids: Vec<PackageId> = snapshot
        .metadata_for_file(file)
        .into_iter()
        .map(|m| m.id.clone())
        .collect();
    let found: Mutex<Vec<(FileId, TextRange)>> = Mutex::new(Vec::new());
    ids.par_iter().try_for_each(|id| -> IdeResult<()> {
        snapshot.check_cancelled()?;
        for pkg in snapshot.type_check(std::slice::from_ref(id), CheckMode::Full)? {
            for checked in pkg.files() {
                let ranges = func_candidates(checked, query);
                found
                    .lock()
                    .extend(ranges.into_iter().map(|r| (checked.file_id, r)));
            }
        }
        Ok(())
    })?;

    let mut out = found
        .into_inner()
        .into_iter()
        .filter(|(f, r)| !(*f == file && *r == query.origin))
        .map(|(f, r)| range_location(snapshot, f, r))
        .collect::<IdeResult<Vec<_>>>()?;
    out.sort();
    out.dedup();
    Ok(out)
}

/// Ranges in one file whose signature unifies with the query's: concrete
/// functions for an abstract query, function types and dynamic calls for
/// a concrete one.
fn func_candidates(checked: &CheckedFile, query: &FuncQuery) -> Vec<TextRange> {
    let (file, info) = (&checked.file, &checked.info);
    let matches = |sig: &Signature| {
        let mut bindings = Bindings::new();
        unify_signatures(&query.sig, sig, Some(&mut bindings))
    };
    let keyword = |func_type: NodeId| match file.kind(func_type) {
        NodeKind::FuncType {
            func_kw: Some(kw), ..
        } => Some(TextRange::at(*kw, TextSize::of("func"))),
        _ => None,
    };

    let mut out = Vec::new();
    for node in file.node_ids() {
        let (sig, range) = match (query.is_abstract, file.kind(node)) {
            (true, NodeKind::FuncDecl { name, ty, .. }) => {
                (info.defs.get(name).and_then(|o| o.signature()), keyword(*ty))
            }
            (true, NodeKind::FuncLit { ty, .. }) => (
                info.type_of(node).and_then(|t| t.as_signature().cloned()),
                keyword(*ty),
            ),
            (false, NodeKind::FuncType { .. }) if !is_signature_of_decl(file, node) => (
                info.type_of(node).and_then(|t| t.as_signature().cloned()),
                keyword(node),
            ),
            (false, NodeKind::Call { fun, .. }) if is_dynamic_callee(checked, *fun) => (
                info.type_of(*fun).and_then(|t| t.as_signature().cloned()),
                Some(file.range(*fun)),
            ),
            _ => continue,
        };
        if let (Some(sig), Some(range)) = (sig, range)
            && matches(&sig)
        {
            out.push(range);
        }
    }
    out
}

fn is_signature_of_decl(file: &File, func_type: NodeId) -> bool {
    file.parent(func_type).is_some_and(|p| {
        matches!(file.kind(p), NodeKind::FuncDecl { .. } | NodeKind::FuncLit { .. })
    })
}
