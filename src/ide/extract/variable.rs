//! Extract variable and extract constant.

use text_size::TextSize;

use crate::hir::{CheckedFile, ObjKind, Object, Type, ValueMode};
use crate::parser::walk::{inspect, path_enclosing_interval};
use crate::parser::{File, NodeId, NodeKind, UnaryOp};

use super::super::error::{IdeError, IdeResult};
use super::super::options::ExtractOptions;
use super::{Context, TextEdit, fresh_name, is_stmt_list, line_indent};

pub(crate) fn can_extract_variable(ctx: &Context) -> bool {
    selected_expr(ctx).is_ok()
}

/// Only offered when the expression occurs more than once.
pub(crate) fn can_extract_variable_all(ctx: &Context) -> bool {
    selected_expr(ctx).is_ok_and(|expr| occurrences(ctx.checked(), expr).len() > 1)
}

pub(crate) fn can_extract_constant(ctx: &Context) -> bool {
    selected_expr(ctx).is_ok_and(|expr| is_constant(ctx.checked(), expr))
}

/// Extract the selected expression, or every equivalent occurrence of it in
/// the enclosing function, into a new variable.
pub(crate) fn extract_variable(ctx: &Context, options: &ExtractOptions, all: bool) -> IdeResult<Vec<TextEdit>> {
    let expr = selected_expr(ctx)?;
    let checked = ctx.checked();
    let arity = match checked.info.type_of(expr).map(|t| t.as_ref()) {
        Some(Type::Tuple(types)) => types.len(),
        _ => 1,
    };
    let occurrences = if all { occurrences(checked, expr) } else { vec![expr] };
    declare(ctx, options, &occurrences, arity, false)
}

pub(crate) fn extract_constant(ctx: &Context, options: &ExtractOptions) -> IdeResult<Vec<TextEdit>> {
    let expr = selected_expr(ctx)?;
    if !is_constant(ctx.checked(), expr) {
        return Err(IdeError::Extract("selection is not a constant expression".into()));
    }
    declare(ctx, options, &[expr], 1, true)
}

/// Insert a declaration of the expression before the first statement that
/// dominates every occurrence, and replace the occurrences with its name.
fn declare(
    ctx: &Context,
    options: &ExtractOptions,
    occurrences: &[NodeId],
    arity: usize,
    constant: bool,
) -> IdeResult<Vec<TextEdit>> {
    let checked = ctx.checked();
    let file = &checked.file;
    let first = *occurrences
        .iter()
        .min_by_key(|n| file.range(**n).start())
        .ok_or_else(|| IdeError::Extract("no expression selected".into()))?;
    let expr_text = file.source(first);

    let anchor = insertion_point(file, occurrences)?;
    for &occ in occurrences {
        check_free_vars(checked, occ, anchor)?;
    }

    let at = match anchor {
        Anchor::Stmt(stmt) => file.range(stmt).start(),
        Anchor::TopLevel(decl) => {
            let start = file.range(decl).start();
            file.doc_comments(start).first().map_or(start, |c| c.range.start())
        }
    };
    let names = fresh_names(ctx, &options.var_name, arity, at, occurrences);
    let lhs = names.join(", ");
    let keyword = if constant { "const" } else { "var" };
    let decl = match anchor {
        Anchor::Stmt(_) if constant => format!("const {lhs} = {expr_text}\n{}", line_indent(&file.text, at)),
        Anchor::Stmt(_) => format!("{lhs} := {expr_text}\n{}", line_indent(&file.text, at)),
        Anchor::TopLevel(_) if arity > 1 => {
            return Err(IdeError::Extract(
                "cannot extract a multi-valued expression at package level".into(),
            ));
        }
        Anchor::TopLevel(_) => format!("{keyword} {lhs} = {expr_text}\n\n"),
    };

    let mut edits = vec![TextEdit::insert(at, decl)];
    edits.extend(
        occurrences
            .iter()
            .map(|occ| TextEdit::replace(file.range(*occ), lhs.clone())),
    );
    tracing::debug!(name = %lhs, occurrences = occurrences.len(), "extracting expression");
    Ok(edits)
}

/// The expression exactly covered by the selection.
fn selected_expr(ctx: &Context) -> IdeResult<NodeId> {
    let checked = ctx.checked();
    let file = &checked.file;
    if ctx.range.is_empty() {
        return Err(IdeError::Extract("selection is empty".into()));
    }
    let (path, exact) = path_enclosing_interval(file, ctx.range.start(), ctx.range.end());
    let Some(&expr) = path.first() else {
        return Err(IdeError::Extract("selection is not an expression".into()));
    };
    if !exact || !file.kind(expr).is_expr() {
        return Err(IdeError::Extract("selection is not an expression".into()));
    }
    if path.iter().any(|n| matches!(file.kind(*n), NodeKind::ImportSpec { .. })) {
        return Err(IdeError::Extract("cannot extract from an import declaration".into()));
    }
    let info = &checked.info;
    match info.types.get(&expr).map(|tv| tv.mode) {
        None => return Err(IdeError::Extract("selection has no type".into())),
        Some(ValueMode::TypeExpr) => return Err(IdeError::Extract("cannot extract a type".into())),
        Some(ValueMode::NoValue) => return Err(IdeError::Extract("expression has no value".into())),
        Some(ValueMode::PkgName | ValueMode::Builtin) => {
            return Err(IdeError::Extract("cannot extract a name that is not a value".into()));
        }
        _ => {}
    }
    if info.defs.contains_key(&expr) || file.ident_name(expr) == Some("_") {
        return Err(IdeError::Extract("cannot extract a declared name".into()));
    }
    if is_lvalue(file, expr) {
        return Err(IdeError::Extract("cannot extract an assignment target".into()));
    }
    if let Some(parent) = file.parent(expr) {
        match file.kind(parent) {
            NodeKind::Selector { sel, .. } if *sel == expr => {
                return Err(IdeError::Extract("cannot extract a field or method name".into()));
            }
            NodeKind::KeyValue { key, .. } if *key == expr => {
                return Err(IdeError::Extract("cannot extract a composite literal key".into()));
            }
            _ => {}
        }
    }
    Ok(expr)
}

fn is_lvalue(file: &File, expr: NodeId) -> bool {
    let Some(parent) = file.parent(expr) else {
        return false;
    };
    match file.kind(parent) {
        NodeKind::Assign { lhs, .. } => lhs.contains(&expr),
        NodeKind::IncDec { x, .. } => *x == expr,
        NodeKind::Range { key, value, .. } => *key == Some(expr) || *value == Some(expr),
        NodeKind::Unary { op: UnaryOp::Addr, x } => *x == expr,
        NodeKind::Paren(_) => is_lvalue(file, parent),
        _ => false,
    }
}

fn is_constant(checked: &CheckedFile, expr: NodeId) -> bool {
    checked
        .info
        .types
        .get(&expr)
        .is_some_and(|tv| tv.mode == ValueMode::Constant)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    /// Insert before this statement.
    Stmt(NodeId),
    /// Insert before this top-level declaration.
    TopLevel(NodeId),
}

/// Where a declaration evaluated once before every occurrence goes.
fn insertion_point(file: &File, occurrences: &[NodeId]) -> IdeResult<Anchor> {
    let first = *occurrences
        .iter()
        .min_by_key(|n| file.range(**n).start())
        .ok_or_else(|| IdeError::Extract("no expression selected".into()))?;
    let mut anchor = statement_before(file, first)?;
    loop {
        let Anchor::Stmt(stmt) = anchor else {
            return Ok(anchor);
        };
        let Some(list) = file.parent(stmt) else {
            return Ok(anchor);
        };
        let covers = |n: &NodeId| file.range(list).contains_range(file.range(*n));
        if occurrences.iter().all(covers) {
            return Ok(anchor);
        }
        anchor = statement_before(file, list)?;
    }
}

/// The statement in a statement list before which an expression at `node`
/// can be evaluated without changing its meaning.
fn statement_before(file: &File, node: NodeId) -> IdeResult<Anchor> {
    let mut child = node;
    let mut current = file.parent(node);
    while let Some(n) = current {
        let kind = file.kind(n);
        if matches!(kind, NodeKind::FuncDecl { .. } | NodeKind::GenDecl { .. }) && file.parent(n) == Some(file.root) {
            return Ok(Anchor::TopLevel(n));
        }
        if let NodeKind::For { cond, post, .. } = kind
            && (*cond == Some(child) || *post == Some(child))
        {
            return Err(IdeError::Extract(
                "cannot extract from a loop condition or post statement".into(),
            ));
        }
        if kind.is_stmt() && !is_stmt_list(kind) {
            let stmt = base_statement(file, n);
            if let Some(parent) = file.parent(stmt)
                && is_stmt_list(file.kind(parent))
            {
                return Ok(Anchor::Stmt(stmt));
            }
        }
        child = n;
        current = file.parent(n);
    }
    Err(IdeError::Extract("expression is not inside a statement or declaration".into()))
}

/// A case clause stands for its switch and an `else if` for the `if` it
/// belongs to: a declaration cannot go between them.
fn base_statement(file: &File, stmt: NodeId) -> NodeId {
    let mut stmt = stmt;
    loop {
        let Some(parent) = file.parent(stmt) else {
            return stmt;
        };
        match (file.kind(stmt), file.kind(parent)) {
            (NodeKind::If { .. }, NodeKind::If { else_, .. }) if *else_ == Some(stmt) => stmt = parent,
            (NodeKind::CaseClause { .. } | NodeKind::CommClause { .. }, _) => {
                // Clause -> Block -> switch/select.
                match file.parent(parent) {
                    Some(switch) => stmt = switch,
                    None => return stmt,
                }
            }
            // Labeled statements move with their label.
            (_, NodeKind::Labeled { .. }) => stmt = parent,
            _ => return stmt,
        }
    }
}

/// Variables the expression uses must already be declared where the new
/// declaration goes. Ones declared by the statement itself (an `if` or
/// `switch` init, a loop header) are not.
fn check_free_vars(checked: &CheckedFile, expr: NodeId, anchor: Anchor) -> IdeResult<()> {
    let file = &checked.file;
    let Anchor::Stmt(stmt) = anchor else {
        return check_package_level(checked, expr, anchor);
    };
    let stmt_range = file.range(stmt);
    let mut result = Ok(());
    inspect(file, expr, |node| {
        if result.is_err() {
            return false;
        }
        if let Some(obj) = checked.info.uses.get(&node)
            && let Some(pos) = obj.pos()
            && pos.file == checked.file_id
            && stmt_range.contains(pos.offset)
        {
            result = Err(IdeError::Extract(format!(
                "{} is declared in a statement the expression depends on",
                obj.name()
            )));
        }
        true
    });
    result
}

fn check_package_level(checked: &CheckedFile, expr: NodeId, anchor: Anchor) -> IdeResult<()> {
    let Anchor::TopLevel(decl) = anchor else {
        return Ok(());
    };
    let file = &checked.file;
    let decl_range = file.range(decl);
    let mut result = Ok(());
    inspect(file, expr, |node| {
        if let Some(obj) = checked.info.uses.get(&node)
            && let Some(pos) = obj.pos()
            && pos.file == checked.file_id
            && decl_range.contains(pos.offset)
            && !obj.is_package_level()
            && !matches!(obj.kind(), ObjKind::TypeName | ObjKind::Const)
        {
            result = Err(IdeError::Extract(format!("{} is local to the declaration", obj.name())));
        }
        result.is_ok()
    });
    result
}

/// Expressions in the enclosing function equivalent to `expr`.
fn occurrences(checked: &CheckedFile, expr: NodeId) -> Vec<NodeId> {
    let file = &checked.file;
    let root = file
        .ancestors(expr)
        .find(|n| matches!(file.kind(*n), NodeKind::FuncDecl { .. } | NodeKind::FuncLit { .. }))
        .unwrap_or(file.root);
    let mut out = Vec::new();
    inspect(file, root, |node| {
        if node == expr || (equivalent(checked, node, expr) && !is_lvalue(file, node)) {
            out.push(node);
            return false;
        }
        true
    });
    out
}

/// Structural equality, with identifiers compared by the object they denote.
fn equivalent(checked: &CheckedFile, a: NodeId, b: NodeId) -> bool {
    let file = &checked.file;
    let same_shape = match (file.kind(a), file.kind(b)) {
        (NodeKind::Ident(x), NodeKind::Ident(y)) => {
            let (oa, ob) = (checked.info.uses.get(&a), checked.info.uses.get(&b));
            x == y && match (oa, ob) {
                (Some(oa), Some(ob)) => Object::same(oa, ob),
                (None, None) => true,
                _ => false,
            }
        }
        (NodeKind::BasicLit { value: x, .. }, NodeKind::BasicLit { value: y, .. }) => x == y,
        (NodeKind::Binary { op: x, .. }, NodeKind::Binary { op: y, .. }) => x == y,
        (NodeKind::Unary { op: x, .. }, NodeKind::Unary { op: y, .. }) => x == y,
        (NodeKind::Call { ellipsis: x, .. }, NodeKind::Call { ellipsis: y, .. }) => x == y,
        (NodeKind::Slice { low: l1, high: h1, max: m1, .. }, NodeKind::Slice { low: l2, high: h2, max: m2, .. }) => {
            l1.is_some() == l2.is_some() && h1.is_some() == h2.is_some() && m1.is_some() == m2.is_some()
        }
        (NodeKind::TypeAssert { ty: x, .. }, NodeKind::TypeAssert { ty: y, .. }) => x.is_some() == y.is_some(),
        (NodeKind::FuncLit { .. }, NodeKind::FuncLit { .. }) => false,
        (x, y) => std::mem::discriminant(x) == std::mem::discriminant(y),
    };
    if !same_shape {
        return false;
    }
    let (ca, cb) = (file.children(a), file.children(b));
    ca.len() == cb.len() && ca.iter().zip(&cb).all(|(x, y)| equivalent(checked, *x, *y))
}

/// `arity` names based on `base`, unused in the enclosing function and not
/// visible at `at`.
fn fresh_names(ctx: &Context, base: &str, arity: usize, at: TextSize, occurrences: &[NodeId]) -> Vec<String> {
    let checked = ctx.checked();
    let file = &checked.file;
    let scopes = ctx.pkg.scopes();
    let root = occurrences
        .first()
        .and_then(|n| ctx.top_level_decl(*n))
        .unwrap_or(file.root);
    let mut used: Vec<String> = Vec::new();
    inspect(file, root, |node| {
        if let Some(name) = file.ident_name(node) {
            used.push(name.to_string());
        }
        true
    });
    let scope = scopes.innermost(ctx.file_id, at);
    let mut names: Vec<String> = Vec::new();
    for _ in 0..arity {
        let name = fresh_name(base, |n| {
            used.iter().any(|u| u == n)
                || names.iter().any(|u| u == n)
                || scope.is_some_and(|s| scopes.lookup_parent(s, n, Some(at)).is_some())
        });
        names.push(name);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{Position, Span};
    use crate::ide::extract::{ExtractKind, apply_edits, available, extract};
    use crate::ide::{AnalysisHost, IdeError};

    fn span_of(text: &str, needle: &str, nth: usize) -> Span {
        let offset = text.match_indices(needle).nth(nth).expect("needle").0;
        let pos = |offset: usize| {
            let before = &text[..offset];
            let line = before.matches('\n').count() as u32;
            let col = (offset - before.rfind('\n').map_or(0, |i| i + 1)) as u32;
            Position::new(line, col)
        };
        Span::new(pos(offset), pos(offset + needle.len()))
    }

    fn run(src: &str, kind: ExtractKind, needle: &str, nth: usize) -> Result<String, IdeError> {
        let mut host = AnalysisHost::new();
        let file = host.set_file_content("/ws/p/p.go", src);
        let analysis = host.analysis();
        let change = extract(&analysis, &Default::default(), kind, file, span_of(src, needle, nth))?;
        apply_edits(src, change.edits_for(file).unwrap_or_default())
    }

    #[test]
    fn test_extract_variable_before_statement() {
        let src = "package p\n\nfunc f(a int) int {\n\treturn a + 1 + 2\n}\n";
        let out = run(src, ExtractKind::Variable, "a + 1", 0).unwrap();
        assert_eq!(out, "package p\n\nfunc f(a int) int {\n\tx := a + 1\n\treturn x + 2\n}\n");
    }

    #[test]
    fn test_extract_variable_avoids_taken_names() {
        let src = "package p\n\nfunc f(x int) int {\n\treturn x * 2\n}\n";
        let out = run(src, ExtractKind::Variable, "x * 2", 0).unwrap();
        assert!(out.contains("x1 := x * 2"), "{out}");
        assert!(out.contains("return x1"));
    }

    #[test]
    fn test_else_if_goes_before_outer_if() {
        let src = "package p

func f(a int) int {
	if a > 0 {
		return 1
	} else if a < -10 {
		return 2
	}
	return 0
}
";
        let out = run(src, ExtractKind::Variable, "a < -10", 0).unwrap();
        assert!(out.contains("\tx := a < -10\n\tif a > 0 {"), "{out}");
        assert!(out.contains("} else if x {"));
    }

    #[test]
    fn test_init_variable_blocks_extraction() {
        let src = "package p

func f() int {
	if v := 3; v > 1 {
		return v
	}
	return 0
}
";
        let err = run(src, ExtractKind::Variable, "v > 1", 0).unwrap_err();
        assert!(matches!(err, IdeError::Extract(_)), "{err}");
    }

    #[test]
    fn test_extract_all_occurrences() {
        let src = "package p

func f(a, b int) int {
	if a > 0 {
		return a * b
	}
	return a * b + 1
}
";
        let out = run(src, ExtractKind::VariableAll, "a * b", 0).unwrap();
        assert_eq!(out.matches("a * b").count(), 1, "{out}");
        assert!(out.contains("\tx := a * b\n\tif a > 0 {"));
        assert!(out.contains("return x + 1"));
    }

    #[test]
    fn test_extract_constant() {
        let src = "package p\n\nfunc f() int {\n\treturn 60 * 60\n}\n";
        let out = run(src, ExtractKind::Constant, "60 * 60", 0).unwrap();
        assert!(out.contains("\tconst x = 60 * 60\n\treturn x\n"), "{out}");
    }

    #[test]
    fn test_package_level_variable() {
        let src = "package p\n\nvar limit = len(\"abc\") * 2\n";
        let out = run(src, ExtractKind::Variable, "len(\"abc\")", 0).unwrap();
        assert_eq!(out, "package p\n\nvar x = len(\"abc\")\n\nvar limit = x * 2\n");
    }

    #[test]
    fn test_rejections() {
        let src = "package p\n\nfunc f(count int) {\n\tcount = 2\n\tfor i := 0; i < count; i++ {\n\t}\n}\n";
        assert!(run(src, ExtractKind::Variable, "count", 1).is_err(), "assignment target");
        assert!(run(src, ExtractKind::Variable, "i < count", 0).is_err(), "loop condition");
        assert!(run(src, ExtractKind::Variable, "int", 0).is_err(), "type");
        assert!(run(src, ExtractKind::Constant, "count", 2).is_err(), "not constant");
        assert!(run(src, ExtractKind::Constant, "2", 0).is_ok());
    }

    #[test]
    fn test_available_lists_expression_kinds() {
        let src = "package p\n\nfunc f() int {\n\treturn 1 + 2\n}\n";
        let mut host = AnalysisHost::new();
        let file = host.set_file_content("/ws/p/p.go", src);
        let analysis = host.analysis();
        let kinds = available(&analysis, file, span_of(src, "1 + 2", 0)).unwrap();
        assert!(kinds.contains(&ExtractKind::Variable));
        assert!(!kinds.contains(&ExtractKind::VariableAll));
        assert!(kinds.contains(&ExtractKind::Constant));
        assert!(!kinds.contains(&ExtractKind::Function));
    }
}
