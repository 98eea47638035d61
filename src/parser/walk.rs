//! Tree traversal helpers over the arena AST.

use text_size::{TextRange, TextSize};

use super::ast::{File, NodeId, NodeKind};

/// Find the chain of nodes enclosing `[start, end)`, innermost first.
///
/// The interval is trimmed of surrounding whitespace before the search.
/// The returned flag is true when the innermost node covers exactly the
/// trimmed interval.
pub fn path_enclosing_interval(file: &File, start: TextSize, end: TextSize) -> (Vec<NodeId>, bool) {
    let (start, end) = trim_interval(file, start, end);
    let mut path = vec![file.root];
    let mut node = file.root;
    loop {
        let next = file.children(node).into_iter().find(|child| {
            let range = file.range(*child);
            !matches!(file.kind(*child), NodeKind::Bad | NodeKind::BadStmt)
                && range.start() <= start
                && end <= range.end()
                && (start < range.end() || range.is_empty() || start == end)
        });
        match next {
            Some(child) => {
                path.push(child);
                node = child;
            }
            None => break,
        }
    }
    let exact = file.range(node) == TextRange::new(start, end);
    path.reverse();
    (path, exact)
}

fn trim_interval(file: &File, start: TextSize, end: TextSize) -> (TextSize, TextSize) {
    if start >= end {
        return (start, start);
    }
    let text = file.slice(TextRange::new(start, end));
    let leading = text.len() - text.trim_start().len();
    let trailing = text.len() - text.trim_end().len();
    if leading + trailing >= text.len() {
        return (start, start);
    }
    (
        start + TextSize::from(leading as u32),
        end - TextSize::from(trailing as u32),
    )
}

/// Visit `root` and its descendants in preorder. Returning `false` from
/// `f` skips the children of that node.
pub fn inspect(file: &File, root: NodeId, mut f: impl FnMut(NodeId) -> bool) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if !f(node) {
            continue;
        }
        let mut children = file.children(node);
        children.reverse();
        stack.extend(children);
    }
}

/// All nodes under `root` (inclusive) in preorder.
pub fn preorder(file: &File, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    inspect(file, root, |n| {
        out.push(n);
        true
    });
    out
}

/// The innermost identifier at `offset`, accepting a cursor just past its end.
pub fn ident_at(file: &File, offset: TextSize) -> Option<NodeId> {
    let (path, _) = path_enclosing_interval(file, offset, offset);
    if let Some(id) = path.first().copied()
        && matches!(file.kind(id), NodeKind::Ident(_))
    {
        return Some(id);
    }
    if offset > TextSize::new(0) {
        let before = offset - TextSize::new(1);
        let (path, _) = path_enclosing_interval(file, before, before);
        if let Some(id) = path.first().copied()
            && matches!(file.kind(id), NodeKind::Ident(_))
            && file.range(id).end() == offset
        {
            return Some(id);
        }
    }
    None
}

/// The innermost enclosing node matching `pred`, starting from `id` itself.
pub fn enclosing(file: &File, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
    file.ancestors(id).find(|n| pred(file.kind(*n)))
}
