//! Extract function and extract method.
//!
//! The selected statements move into a new function declared after the
//! enclosing one. Locals declared before the selection become parameters;
//! locals the rest of the function still reads become results.
//!
//! Control flow leaving the selection (a `return`, or a `break`,
//! `continue` or `goto` whose target lies outside) cannot be expressed in
//! the new function directly. Each such exit returns an extra `ctrl`
//! result that the call site dispatches on:
//!
//! ```text
//! total, result, ctrl = newFunction(x, total)
//! if ctrl == 1 {
//!     return result
//! }
//! if ctrl == 2 {
//!     break
//! }
//! ```
//!
//! When the selection ends in a `return` and has no other exit, the call
//! site is simply `return newFunction(...)`.

use rustc_hash::FxHashSet;
use text_size::{TextRange, TextSize};

use crate::hir::types::default_type;
use crate::hir::{BasicKind, CheckedFile, ObjKind, ObjRef, Object, Ty, Type, lookup_field_or_method};
use crate::parser::walk::{inspect, path_enclosing_interval};
use crate::parser::{BranchKind, File, NodeId, NodeKind};

use super::super::error::{IdeError, IdeResult};
use super::super::options::ExtractOptions;
use super::freevars::{FreeVars, VarStatus};
use super::{Context, TextEdit, apply_edits, fresh_name, is_stmt_list, line_indent, reindent, stmt_list};

pub(crate) fn can_extract_function(ctx: &Context) -> bool {
    selected_stmts(ctx).is_ok()
}

pub(crate) fn can_extract_method(ctx: &Context) -> bool {
    selected_stmts(ctx).is_ok_and(|sel| receiver(ctx, &sel).is_ok())
}

/// Whole statements of one statement list.
#[derive(Debug)]
struct Selected {
    stmts: Vec<NodeId>,
    /// Innermost function declaration or literal around the statements.
    func: NodeId,
    /// The top-level function declaration.
    decl: NodeId,
}

#[derive(Debug)]
struct Receiver {
    obj: ObjRef,
    /// Source of the receiver field, such as `s *Stack[T]`.
    text: String,
}

#[derive(Debug, Default)]
struct ControlFlow {
    returns: Vec<NodeId>,
    /// Branch statements whose target is outside the selection, with their
    /// source text.
    branches: Vec<(NodeId, String)>,
    trailing_fallthrough: Option<NodeId>,
}

impl ControlFlow {
    fn is_empty(&self) -> bool {
        self.returns.is_empty() && self.branches.is_empty()
    }

    /// Distinct branch statements, in order of appearance.
    fn distinct_branches(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for (_, text) in &self.branches {
            if !out.contains(&text.as_str()) {
                out.push(text);
            }
        }
        out
    }
}

pub(crate) fn extract_function(ctx: &Context, options: &ExtractOptions, method: bool) -> IdeResult<Vec<TextEdit>> {
    let sel = selected_stmts(ctx)?;
    let checked = ctx.checked();
    let file = &checked.file;
    let receiver = if method { Some(receiver(ctx, &sel)?) } else { None };
    let flow = control_flow(file, &sel, ctx.range)?;

    let body_stmts: &[NodeId] = match flow.trailing_fallthrough {
        Some(_) => &sel.stmts[..sel.stmts.len() - 1],
        None => &sel.stmts,
    };
    let (Some(&first), Some(&last)) = (body_stmts.first(), body_stmts.last()) else {
        return Err(IdeError::Extract("nothing to extract besides fallthrough".into()));
    };
    let body_range = TextRange::new(file.range(first).start(), file.range(last).end());

    let vars = FreeVars::analyze(checked, sel.decl, body_range);
    check_local_types(&vars)?;
    let is_receiver = |v: &VarStatus| receiver.as_ref().is_some_and(|r| Object::same(&r.obj, &v.obj));
    let params: Vec<&VarStatus> = vars
        .params()
        .filter(|v| is_value(&v.obj) && !is_receiver(v))
        .collect();
    let results: Vec<&VarStatus> = vars.results().into_iter().filter(|v| is_value(&v.obj)).collect();

    let enclosing_results = enclosing_results(checked, sel.func);
    let taken = taken_names(file);
    let is_taken = |n: &str| taken.contains(n) || ctx.pkg.lookup(n).is_some();
    let name = match &receiver {
        Some(recv) => {
            let recv_ty = recv.obj.ty();
            let base = options.method_name.as_str();
            fresh_name(base, |n| {
                is_taken(n)
                    || recv_ty
                        .as_ref()
                        .is_some_and(|t| lookup_field_or_method(t, Some(ctx.pkg.path()), n).is_some())
            })
        }
        None => fresh_name(&options.func_name, is_taken),
    };

    let type_params = if receiver.is_none() { type_params(ctx, sel.decl) } else { Vec::new() };
    let indent = options.indent.as_str();
    let call_indent = line_indent(&file.text, body_range.start()).to_string();
    let mut body_edits: Vec<TextEdit> = Vec::new();
    let mut result_types: Vec<String> = Vec::new();
    let mut final_return: Option<String> = None;
    let mut call_lines: Vec<String> = Vec::new();

    let param_list = params
        .iter()
        .map(|v| format!("{} {}", v.obj.name(), var_type(ctx, &v.obj)))
        .collect::<Vec<_>>()
        .join(", ");
    let args = params.iter().map(|v| v.obj.name()).collect::<Vec<_>>().join(", ");
    let targs = if type_params.is_empty() {
        String::new()
    } else {
        let names: Vec<&str> = type_params.iter().map(|(n, _)| n.as_str()).collect();
        format!("[{}]", names.join(", "))
    };
    let call = match &receiver {
        Some(recv) => format!("{}.{name}({args})", recv.obj.name()),
        None => format!("{name}{targs}({args})"),
    };

    let terminal = flow.branches.is_empty() && is_return(file, last);
    if flow.is_empty() {
        result_types.extend(results.iter().map(|v| var_type(ctx, &v.obj)));
        if !results.is_empty() {
            let names: Vec<&str> = results.iter().map(|v| v.obj.name()).collect();
            final_return = Some(format!("return {}", names.join(", ")));
        }
        let lhs: Vec<Lhs> = results.iter().map(|v| Lhs::var(ctx, v)).collect();
        call_lines.extend(assignment(&lhs, &call));
    } else if terminal {
        // Every path through the selection returns: the results of the
        // new function are those of the enclosing one.
        result_types.extend(enclosing_results.iter().map(|t| ctx.type_text(t)));
        if enclosing_results.is_empty() {
            call_lines.push(call);
            call_lines.push("return".into());
        } else {
            call_lines.push(format!("return {call}"));
        }
    } else {
        let ret_names = fresh_names("result", enclosing_results.len(), &is_taken);
        let ctrl = fresh_name("ctrl", |n| is_taken(n) || ret_names.iter().any(|r| r == n));
        let has_return = !flow.returns.is_empty();
        let carried: &[Ty] = if has_return { &enclosing_results } else { &[] };

        result_types.extend(results.iter().map(|v| var_type(ctx, &v.obj)));
        result_types.extend(carried.iter().map(|t| ctx.type_text(t)));
        result_types.push("int".into());

        let live_results = |at: TextSize| -> Vec<String> {
            results
                .iter()
                .map(|v| {
                    if v.free || in_scope(ctx, &v.obj, at) {
                        v.obj.name().to_string()
                    } else {
                        zero_value(ctx, &var_ty(&v.obj))
                    }
                })
                .collect()
        };

        for &ret in &flow.returns {
            let NodeKind::Return(values) = file.kind(ret) else {
                continue;
            };
            if values.is_empty() && !enclosing_results.is_empty() {
                return Err(IdeError::Extract("cannot extract a bare return of named results".into()));
            }
            if values.len() != enclosing_results.len() {
                return Err(IdeError::Extract("cannot extract a return of a multi-valued call".into()));
            }
            let mut out = live_results(file.range(ret).start());
            out.extend(values.iter().map(|v| file.source(*v).to_string()));
            out.push("1".into());
            body_edits.push(TextEdit::replace(
                shift(file.range(ret), body_range.start()),
                format!("return {}", out.join(", ")),
            ));
        }
        let branches = flow.distinct_branches();
        let code_of = |text: &str| -> usize {
            let base = if has_return { 2 } else { 1 };
            base + branches.iter().position(|b| *b == text).unwrap_or(0)
        };
        for (branch, text) in &flow.branches {
            let mut out = live_results(file.range(*branch).start());
            out.extend(carried.iter().map(|t| zero_value(ctx, t)));
            out.push(code_of(text).to_string());
            body_edits.push(TextEdit::replace(
                shift(file.range(*branch), body_range.start()),
                format!("return {}", out.join(", ")),
            ));
        }
        let ends_in_exit = is_return(file, last) || flow.branches.iter().any(|(b, _)| *b == last);
        if !ends_in_exit {
            let mut out: Vec<String> = results.iter().map(|v| v.obj.name().to_string()).collect();
            out.extend(carried.iter().map(|t| zero_value(ctx, t)));
            out.push("0".into());
            final_return = Some(format!("return {}", out.join(", ")));
        }

        let mut lhs: Vec<Lhs> = results.iter().map(|v| Lhs::var(ctx, v)).collect();
        if has_return {
            lhs.extend(ret_names.iter().zip(carried).map(|(n, t)| Lhs::fresh(n, ctx.type_text(t))));
        }
        lhs.push(Lhs::fresh(&ctrl, "int".into()));
        call_lines.extend(assignment(&lhs, &call));
        if has_return {
            let ret = if !carried.is_empty() {
                format!("return {}", ret_names.join(", "))
            } else {
                "return".into()
            };
            call_lines.push(format!("if {ctrl} == 1 {{"));
            call_lines.push(format!("{indent}{ret}"));
            call_lines.push("}".into());
        }
        for text in &branches {
            call_lines.push(format!("if {ctrl} == {} {{", code_of(text)));
            call_lines.push(format!("{indent}{text}"));
            call_lines.push("}".into());
        }
    }

    let raw_body = apply_edits(file.slice(body_range), &body_edits)?;
    let mut body = reindent(&raw_body, &call_indent, indent);
    if let Some(ret) = final_return {
        body.push('\n');
        body.push_str(indent);
        body.push_str(&ret);
    }
    let results_text = match result_types.len() {
        0 => String::new(),
        1 => format!(" {}", result_types[0]),
        _ => format!(" ({})", result_types.join(", ")),
    };
    let header = match &receiver {
        Some(recv) => format!("func ({}) {name}({param_list}){results_text}", recv.text),
        None if type_params.is_empty() => format!("func {name}({param_list}){results_text}"),
        None => {
            let tparams: Vec<String> = type_params.iter().map(|(n, c)| format!("{n} {c}")).collect();
            format!("func {name}[{}]({param_list}){results_text}", tparams.join(", "))
        }
    };
    let new_func = format!("\n\n{header} {{\n{body}\n}}");

    let call_text = call_lines.join(&format!("\n{call_indent}"));

    tracing::debug!(%name, params = params.len(), results = result_types.len(), "extracting function");
    let decl_end = file.range(sel.decl).end();
    Ok(vec![
        TextEdit::replace(body_range, call_text),
        TextEdit::insert(decl_end, new_func),
    ])
}

/// The statements exactly covered by the selection.
fn selected_stmts(ctx: &Context) -> IdeResult<Selected> {
    let file = ctx.file();
    let range = ctx.range;
    if range.is_empty() {
        return Err(IdeError::Extract("selection is empty".into()));
    }
    let (path, _) = path_enclosing_interval(file, range.start(), range.end());
    for &node in &path {
        let kind = file.kind(node);
        if !is_stmt_list(kind) {
            continue;
        }
        let stmts: Vec<NodeId> = stmt_list(kind)
            .iter()
            .copied()
            .filter(|s| range.contains_range(file.range(*s)))
            .collect();
        let (Some(first), Some(last)) = (stmts.first(), stmts.last()) else {
            continue;
        };
        if file.range(*first).start() != range.start() || file.range(*last).end() != range.end() {
            continue;
        }
        let func = file
            .ancestors(node)
            .find(|n| matches!(file.kind(*n), NodeKind::FuncDecl { .. } | NodeKind::FuncLit { .. }))
            .ok_or_else(|| IdeError::Extract("statements are not inside a function".into()))?;
        let decl = ctx
            .top_level_decl(node)
            .filter(|d| matches!(file.kind(*d), NodeKind::FuncDecl { .. }))
            .ok_or_else(|| IdeError::Extract("statements are not inside a function declaration".into()))?;
        return Ok(Selected { stmts, func, decl });
    }
    Err(IdeError::Extract("selection does not cover whole statements".into()))
}

fn receiver(ctx: &Context, sel: &Selected) -> IdeResult<Receiver> {
    let file = ctx.file();
    let NodeKind::FuncDecl { recv: Some(fields), .. } = file.kind(sel.decl) else {
        return Err(IdeError::Extract("enclosing function is not a method".into()));
    };
    let field = fields
        .first()
        .ok_or_else(|| IdeError::Extract("enclosing function is not a method".into()))?;
    let NodeKind::Field { names, .. } = file.kind(*field) else {
        return Err(IdeError::Extract("malformed receiver".into()));
    };
    let obj = names
        .first()
        .filter(|n| file.ident_name(**n) != Some("_"))
        .and_then(|n| ctx.checked().info.defs.get(n))
        .ok_or_else(|| IdeError::Extract("receiver is unnamed".into()))?;
    Ok(Receiver {
        obj: obj.clone(),
        text: file.source(*field).to_string(),
    })
}

/// Find the exits from the selection.
fn control_flow(file: &File, sel: &Selected, range: TextRange) -> IdeResult<ControlFlow> {
    let mut flow = ControlFlow::default();
    let last = sel.stmts.last().copied();
    let mut error = None;
    for &stmt in &sel.stmts {
        inspect(file, stmt, |node| {
            match file.kind(node) {
                NodeKind::FuncLit { .. } => return false,
                NodeKind::Return(_) => flow.returns.push(node),
                NodeKind::Branch { kind, label } => {
                    let label = label.and_then(|l| file.ident_name(l));
                    let internal = match (kind, label) {
                        (BranchKind::Fallthrough, _) => {
                            if Some(node) == last {
                                flow.trailing_fallthrough = Some(node);
                            } else {
                                error = Some(IdeError::Extract("cannot extract a fallthrough statement".into()));
                            }
                            true
                        }
                        (_, Some(label)) => has_label(file, &sel.stmts, label),
                        (BranchKind::Break, None) => target_inside(file, node, range, true),
                        (BranchKind::Continue, None) => target_inside(file, node, range, false),
                        (BranchKind::Goto, None) => true,
                    };
                    if !internal {
                        flow.branches.push((node, file.source(node).to_string()));
                    }
                }
                _ => {}
            }
            true
        });
    }
    match error {
        Some(e) => Err(e),
        None => Ok(flow),
    }
}

fn has_label(file: &File, stmts: &[NodeId], name: &str) -> bool {
    let mut found = false;
    for &stmt in stmts {
        inspect(file, stmt, |node| {
            if let NodeKind::Labeled { label, .. } = file.kind(node)
                && file.ident_name(*label) == Some(name)
            {
                found = true;
            }
            !found
        });
    }
    found
}

/// Whether the loop (or, for `break`, the switch or select) an unlabeled
/// branch leaves lies inside `range`.
fn target_inside(file: &File, branch: NodeId, range: TextRange, is_break: bool) -> bool {
    for node in file.ancestors(branch).skip(1) {
        match file.kind(node) {
            NodeKind::FuncLit { .. } | NodeKind::FuncDecl { .. } => return false,
            NodeKind::For { .. } | NodeKind::Range { .. } => return range.contains_range(file.range(node)),
            NodeKind::Switch { .. } | NodeKind::TypeSwitch { .. } | NodeKind::Select { .. } if is_break => {
                return range.contains_range(file.range(node));
            }
            _ => {}
        }
    }
    false
}

fn check_local_types(vars: &FreeVars) -> IdeResult<()> {
    for var in vars.iter() {
        let is_type_param = var
            .obj
            .ty()
            .is_some_and(|t| matches!(t.as_ref(), Type::TypeParam(_)));
        if var.obj.kind() == ObjKind::TypeName && !is_type_param && (var.free || var.used_after) {
            return Err(IdeError::Extract(format!(
                "selection depends on local type {}",
                var.obj.name()
            )));
        }
    }
    Ok(())
}

fn is_value(obj: &ObjRef) -> bool {
    obj.is_var() || obj.kind() == ObjKind::Const
}

fn is_return(file: &File, stmt: NodeId) -> bool {
    matches!(file.kind(stmt), NodeKind::Return(_))
}

fn var_ty(obj: &ObjRef) -> Ty {
    obj.ty()
        .map(|t| default_type(&t))
        .unwrap_or_else(crate::hir::types::invalid)
}

fn var_type(ctx: &Context, obj: &ObjRef) -> String {
    ctx.type_text(&var_ty(obj))
}

fn in_scope(ctx: &Context, obj: &ObjRef, at: TextSize) -> bool {
    let scopes = ctx.pkg.scopes();
    scopes
        .innermost(ctx.file_id, at)
        .and_then(|s| scopes.lookup_parent(s, obj.name(), Some(at)))
        .is_some_and(|(_, found)| Object::same(&found, obj))
}

/// Result types of the function declaration or literal `func`.
fn enclosing_results(checked: &CheckedFile, func: NodeId) -> Vec<Ty> {
    let file = &checked.file;
    let sig = match file.kind(func) {
        NodeKind::FuncDecl { name, .. } => checked.info.defs.get(name).and_then(|o| o.signature()),
        _ => checked
            .info
            .type_of(func)
            .and_then(|t| t.as_signature().cloned()),
    };
    sig.map(|s| s.result_types()).unwrap_or_default()
}

/// Type parameters of the enclosing declaration, receiver ones included,
/// as `(name, constraint)`.
fn type_params(ctx: &Context, decl: NodeId) -> Vec<(String, String)> {
    let file = ctx.file();
    let info = &ctx.checked().info;
    let NodeKind::FuncDecl { recv, ty, .. } = file.kind(decl) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    // Receiver type parameters are bare names; their constraints come from
    // the type declaration.
    if let Some(field) = recv.as_ref().and_then(|f| f.first())
        && let NodeKind::Field { ty: Some(recv_ty), .. } = file.kind(*field)
    {
        let inner = match file.kind(*recv_ty) {
            NodeKind::Star(x) => *x,
            _ => *recv_ty,
        };
        if let NodeKind::Index { indices, .. } = file.kind(inner) {
            for ident in indices {
                let Some(obj) = info.defs.get(ident) else {
                    continue;
                };
                let constraint = match obj.ty().as_deref() {
                    Some(Type::TypeParam(tp)) => tp.constraint().map(|c| ctx.type_text(&c)),
                    _ => None,
                };
                out.push((obj.name().to_string(), constraint.unwrap_or_else(|| "any".into())));
            }
        }
    }
    if let NodeKind::FuncType { type_params, .. } = file.kind(*ty) {
        for field in type_params {
            if let NodeKind::Field { names, ty: Some(constraint), .. } = file.kind(*field) {
                let constraint = file.source(*constraint);
                out.extend(names.iter().filter_map(|n| Some((file.ident_name(*n)?.to_string(), constraint.to_string()))));
            }
        }
    }
    out
}

/// Every identifier in the file.
fn taken_names(file: &File) -> FxHashSet<String> {
    let mut taken = FxHashSet::default();
    inspect(file, file.root, |node| {
        if let Some(name) = file.ident_name(node) {
            taken.insert(name.to_string());
        }
        true
    });
    taken
}

fn fresh_names(base: &str, n: usize, is_taken: &dyn Fn(&str) -> bool) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for _ in 0..n {
        let name = fresh_name(base, |c| is_taken(c) || out.iter().any(|o| o == c));
        out.push(name);
    }
    out
}

/// One variable on the left of the call.
struct Lhs {
    name: String,
    ty: String,
    /// Already declared at the call site.
    exists: bool,
}

impl Lhs {
    fn var(ctx: &Context, var: &VarStatus) -> Lhs {
        Lhs {
            name: var.obj.name().to_string(),
            ty: var_type(ctx, &var.obj),
            exists: var.free,
        }
    }

    fn fresh(name: &str, ty: String) -> Lhs {
        Lhs {
            name: name.to_string(),
            ty,
            exists: false,
        }
    }
}

/// `a, b := call`, or `var` declarations and `=` when some of the names
/// already exist and `:=` would shadow them.
fn assignment(lhs: &[Lhs], call: &str) -> Vec<String> {
    if lhs.is_empty() {
        return vec![call.to_string()];
    }
    let names: Vec<&str> = lhs.iter().map(|l| l.name.as_str()).collect();
    if lhs.iter().all(|l| !l.exists) {
        return vec![format!("{} := {call}", names.join(", "))];
    }
    let mut out: Vec<String> = lhs
        .iter()
        .filter(|l| !l.exists)
        .map(|l| format!("var {} {}", l.name, l.ty))
        .collect();
    out.push(format!("{} = {call}", names.join(", ")));
    out
}

fn shift(range: TextRange, base: TextSize) -> TextRange {
    range - base
}

/// Source text of the zero value of `ty`.
pub(crate) fn zero_value(ctx: &Context, ty: &Ty) -> String {
    match ty.as_ref() {
        Type::Basic(kind) => basic_zero(*kind).to_string(),
        Type::Named(named) => match named.underlying().as_ref() {
            Type::Struct(_) | Type::Array(..) => format!("{}{{}}", ctx.type_text(ty)),
            Type::Basic(kind) => basic_zero(*kind).to_string(),
            _ => "nil".into(),
        },
        Type::TypeParam(_) => format!("*new({})", ctx.type_text(ty)),
        Type::Struct(_) | Type::Array(..) => format!("{}{{}}", ctx.type_text(ty)),
        _ => "nil".into(),
    }
}

fn basic_zero(kind: BasicKind) -> &'static str {
    match kind {
        BasicKind::Bool | BasicKind::UntypedBool => "false",
        BasicKind::String | BasicKind::UntypedString => "\"\"",
        BasicKind::UnsafePointer | BasicKind::UntypedNil | BasicKind::Invalid => "nil",
        _ => "0",
    }
}
