//! Call hierarchy.
//!
//! Every call site is attributed to a named anchor: the enclosing function
//! declaration, the initializer of a package-level variable (shown as
//! `init`), or the package itself. Function literals never become nodes of
//! their own; calls inside them belong to the function that contains them.

use indexmap::IndexMap;
use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use crate::base::{FileId, Position};
use crate::hir::{ObjKind, ObjRef, Snapshot};
use crate::parser::walk::{ident_at, inspect, path_enclosing_interval};
use crate::parser::{File, NodeId, NodeKind};

use super::error::{IdeResult, bug, soft};
use super::location::{Location, range_location};
use super::references::object_references;
use super::resolve::object_at;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Function,
    Method,
    /// Initializer of a package-level variable.
    Init,
    Package,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallHierarchyItem {
    pub name: SmolStr,
    pub kind: CallKind,
    /// Import path of the declaring package.
    pub detail: String,
    /// The whole declaration.
    pub range: Location,
    /// The name within it.
    pub selection: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingCall {
    pub from: CallHierarchyItem,
    pub from_ranges: Vec<Location>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingCall {
    pub to: CallHierarchyItem,
    /// Call sites in the queried function.
    pub from_ranges: Vec<Location>,
}

/// The function at `position`.
pub fn prepare_call_hierarchy(
    snapshot: &dyn Snapshot,
    file: FileId,
    position: Position,
) -> IdeResult<Vec<CallHierarchyItem>> {
    let Some(obj) = function_at(snapshot, file, position)? else {
        return Ok(Vec::new());
    };
    Ok(callee_item(snapshot, &obj)?.into_iter().collect())
}

/// Callers of the function at `position`, one entry per caller.
pub fn incoming_calls(snapshot: &dyn Snapshot, file: FileId, position: Position) -> IdeResult<Vec<IncomingCall>> {
    let Some((pkg, resolved)) = soft(object_at(snapshot, file, position).map(Some))? else {
        return Ok(Vec::new());
    };
    if resolved.obj.kind() != ObjKind::Func {
        return Ok(Vec::new());
    }
    let refs = object_references(snapshot, &pkg, &resolved.obj, false)?;
    tracing::debug!(callee = resolved.obj.name(), references = refs.len(), "incoming calls");

    // Keyed by the caller's location: objects from different checks of
    // the same function are distinct.
    let mut grouped: IndexMap<Location, IncomingCall> = IndexMap::new();
    for site in refs {
        let syntax = snapshot.syntax(site.file)?;
        let anchor = Anchor::enclosing(&syntax, site.range);
        let from = anchor.item(snapshot, site.file, &syntax)?;
        grouped
            .entry(from.selection.clone())
            .or_insert_with(|| IncomingCall {
                from,
                from_ranges: Vec::new(),
            })
            .from_ranges
            .push(site);
    }
    Ok(grouped.into_values().collect())
}

/// Functions called by the function at `position`, including calls made
/// from function literals inside it.
pub fn outgoing_calls(snapshot: &dyn Snapshot, file: FileId, position: Position) -> IdeResult<Vec<OutgoingCall>> {
    let Some(obj) = function_at(snapshot, file, position)? else {
        return Ok(Vec::new());
    };
    let Some(pos) = obj.pos() else {
        return Ok(Vec::new());
    };
    let pkg = match snapshot.narrowest_package(pos.file) {
        Ok(pkg) => pkg,
        // Builtins and unsafe functions have no body to walk.
        Err(_) if crate::hir::universe::is_synthetic_file(pos.file) => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let Some(checked) = pkg.file(pos.file) else {
        return Ok(Vec::new());
    };
    let Some(body) = declaration_of(&checked.file, pos.offset).and_then(|decl| match checked.file.kind(decl) {
        NodeKind::FuncDecl { body, .. } => *body,
        _ => None,
    }) else {
        return Ok(Vec::new());
    };

    let mut calls: Vec<(NodeId, ObjRef)> = Vec::new();
    inspect(&checked.file, body, |node| {
        if let NodeKind::Call { fun, .. } = checked.file.kind(node)
            && let Some(ident) = callee_ident(&checked.file, *fun)
            && let Some(callee) = checked.info.uses.get(&ident)
            && is_reportable_callee(callee)
        {
            calls.push((ident, callee.clone()));
        }
        true
    });

    let mut grouped: IndexMap<Location, OutgoingCall> = IndexMap::new();
    for (ident, callee) in calls {
        let Some(to) = callee_item(snapshot, &callee)? else {
            continue;
        };
        let site = range_location(snapshot, pos.file, checked.file.range(ident))?;
        grouped
            .entry(to.selection.clone())
            .or_insert_with(|| OutgoingCall {
                to,
                from_ranges: Vec::new(),
            })
            .from_ranges
            .push(site);
    }
    tracing::debug!(caller = obj.name(), callees = grouped.len(), "outgoing calls");
    Ok(grouped.into_values().collect())
}

fn function_at(snapshot: &dyn Snapshot, file: FileId, position: Position) -> IdeResult<Option<ObjRef>> {
    let resolved = soft(object_at(snapshot, file, position).map(Some))?;
    Ok(resolved
        .map(|(_, r)| r.obj)
        .filter(|obj| obj.kind() == ObjKind::Func))
}

/// Builtins are left out unless they belong to a package, like
/// `unsafe.Slice`.
fn is_reportable_callee(obj: &ObjRef) -> bool {
    match obj.kind() {
        ObjKind::Func => true,
        ObjKind::Builtin => obj.pkg().is_some(),
        _ => false,
    }
}

/// The identifier naming the called function: `f`, `p.f`, `x.m`, `f[T]`.
fn callee_ident(file: &File, fun: NodeId) -> Option<NodeId> {
    match file.kind(fun) {
        NodeKind::Ident(_) => Some(fun),
        NodeKind::Selector { sel, .. } => Some(*sel),
        NodeKind::Paren(x) => callee_ident(file, *x),
        NodeKind::Index { x, .. } => callee_ident(file, *x),
        _ => None,
    }
}

/// The function declaration (or other declaring node) whose name starts at
/// `offset`.
fn declaration_of(file: &File, offset: TextSize) -> Option<NodeId> {
    let ident = ident_at(file, offset)?;
    let parent = file.parent(ident)?;
    match file.kind(parent) {
        NodeKind::FuncDecl { name, .. } if *name == ident => Some(parent),
        _ => Some(ident),
    }
}

fn callee_item(snapshot: &dyn Snapshot, obj: &ObjRef) -> IdeResult<Option<CallHierarchyItem>> {
    let Some(pos) = obj.pos() else {
        return Ok(None);
    };
    let syntax = snapshot.syntax(pos.file)?;
    let Some(decl) = declaration_of(&syntax, pos.offset) else {
        return Ok(None);
    };
    let name_range = TextRange::at(pos.offset, TextSize::of(obj.name()));
    Ok(Some(CallHierarchyItem {
        name: SmolStr::new(obj.name()),
        kind: if obj.is_method() {
            CallKind::Method
        } else {
            CallKind::Function
        },
        detail: obj.pkg_path().unwrap_or_default().to_string(),
        range: range_location(snapshot, pos.file, syntax.range(decl))?,
        selection: range_location(snapshot, pos.file, name_range)?,
    }))
}

/// Where a call site is attributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Func(NodeId),
    Init(NodeId),
    Package,
}

impl Anchor {
    fn enclosing(file: &File, range: TextRange) -> Anchor {
        let (path, _) = path_enclosing_interval(file, range.start(), range.end());
        for &node in &path {
            match file.kind(node) {
                NodeKind::FuncDecl { .. } => return Anchor::Func(node),
                NodeKind::ValueSpec { .. } if is_package_level(file, node) => return Anchor::Init(node),
                _ => {}
            }
        }
        Anchor::Package
    }

    fn item(self, snapshot: &dyn Snapshot, file: FileId, syntax: &File) -> IdeResult<CallHierarchyItem> {
        let detail = snapshot
            .metadata_for_file(file)
            .first()
            .map(|m| m.path.to_string())
            .unwrap_or_default();
        let (name, kind, range, selection) = match self {
            Anchor::Func(decl) => {
                let NodeKind::FuncDecl { name, recv, .. } = syntax.kind(decl) else {
                    return Err(bug("call anchor is not a function declaration"));
                };
                let kind = if recv.is_some() {
                    CallKind::Method
                } else {
                    CallKind::Function
                };
                let ident = syntax.ident_name(*name).unwrap_or_default();
                (SmolStr::new(ident), kind, syntax.range(decl), syntax.range(*name))
            }
            Anchor::Init(spec) => {
                let selection = match syntax.kind(spec) {
                    NodeKind::ValueSpec { names, .. } => names.first().map(|n| syntax.range(*n)),
                    _ => None,
                };
                let range = syntax.range(spec);
                (SmolStr::new("init"), CallKind::Init, range, selection.unwrap_or(range))
            }
            Anchor::Package => (
                SmolStr::new(syntax.package_name()),
                CallKind::Package,
                syntax.range(syntax.root),
                syntax.range(syntax.package_name),
            ),
        };
        Ok(CallHierarchyItem {
            name,
            kind,
            detail,
            range: range_location(snapshot, file, range)?,
            selection: range_location(snapshot, file, selection)?,
        })
    }
}

fn is_package_level(file: &File, spec: NodeId) -> bool {
    file.ancestors(spec).skip(1).all(|n| {
        matches!(
            file.kind(n),
            NodeKind::GenDecl { .. } | NodeKind::File { .. }
        )
    })
}
