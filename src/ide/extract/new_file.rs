//! Move top-level declarations into a new file of the same package.

use std::path::{Path, PathBuf};

use text_size::{TextRange, TextSize};

use crate::hir::{CheckedFile, ObjRef, Object, Snapshot};
use crate::parser::walk::inspect;
use crate::parser::{DeclKind, File, NodeId, NodeKind};

use super::super::error::{IdeError, IdeResult};
use super::{Context, FileChange, SourceChange, TextEdit, line_start};

pub(crate) fn can_extract_to_new_file(ctx: &Context) -> bool {
    selected_decls(ctx).is_ok()
}

/// The moved declarations and the text they span, doc comments included.
struct Moved {
    decls: Vec<NodeId>,
    range: TextRange,
}

pub(crate) fn extract_to_new_file(ctx: &Context, snapshot: &dyn Snapshot) -> IdeResult<SourceChange> {
    let moved = selected_decls(ctx)?;
    let checked = ctx.checked();
    let file = &checked.file;

    let mut copied = Vec::new();
    let mut removed = Vec::new();
    for &spec in &file.imports {
        let Some(import) = Import::new(checked, spec) else {
            continue;
        };
        if !import.used_in(checked, moved.range) {
            continue;
        }
        copied.push(file.source(spec).to_string());
        if !import.used_outside(checked, moved.range) {
            removed.push(spec);
        }
    }

    let path = new_file_path(snapshot, &ctx.path, file, &moved.decls);
    let mut text = format!("package {}\n\n", file.package_name());
    match copied.as_slice() {
        [] => {}
        [one] => text.push_str(&format!("import {one}\n\n")),
        many => {
            text.push_str("import (\n");
            for spec in many {
                text.push_str(&format!("\t{spec}\n"));
            }
            text.push_str(")\n\n");
        }
    }
    text.push_str(file.slice(moved.range));
    text.push('\n');

    let mut edits = vec![TextEdit::delete(with_trailing_blank(&file.text, moved.range))];
    edits.extend(import_deletions(file, &removed));
    tracing::debug!(path = %path.display(), decls = moved.decls.len(), imports = copied.len(), "extracting to new file");

    Ok(SourceChange {
        label: super::ExtractKind::ToNewFile.title().to_string(),
        changes: vec![
            FileChange::Edit {
                file: ctx.file_id,
                path: ctx.path.clone(),
                edits,
            },
            FileChange::Create { path, text },
        ],
    })
}

/// Top-level declarations wholly covered by the selection.
fn selected_decls(ctx: &Context) -> IdeResult<Moved> {
    let file = ctx.file();
    let range = ctx.range;
    if range.is_empty() {
        return Err(IdeError::Extract("selection is empty".into()));
    }
    if range.start() < file.range(file.package_name).end() {
        return Err(IdeError::Extract("selection includes the package clause".into()));
    }
    let mut decls = Vec::new();
    let mut start = range.start();
    for &decl in &file.decls {
        let decl_range = file.range(decl);
        let extended = TextRange::new(doc_start(file, decl), decl_range.end());
        if extended.intersect(range).is_none_or(|r| r.is_empty()) {
            continue;
        }
        if matches!(file.kind(decl), NodeKind::GenDecl { kind: DeclKind::Import, .. }) {
            return Err(IdeError::Extract("selection includes imports".into()));
        }
        if !range.contains_range(decl_range) {
            return Err(IdeError::Extract("selection splits a declaration".into()));
        }
        if decls.is_empty() {
            start = start.min(extended.start());
        }
        decls.push(decl);
    }
    let Some(&last) = decls.last() else {
        return Err(IdeError::Extract("selection contains no declarations".into()));
    };
    Ok(Moved {
        decls,
        range: TextRange::new(start, file.range(last).end()),
    })
}

fn doc_start(file: &File, decl: NodeId) -> TextSize {
    let start = file.range(decl).start();
    file.doc_comments(start).first().map_or(start, |c| c.range.start())
}

/// One import of the file and the object it declares.
struct Import {
    path: String,
    obj: Option<ObjRef>,
    dot: bool,
}

impl Import {
    fn new(checked: &CheckedFile, spec: NodeId) -> Option<Import> {
        let file = &checked.file;
        let NodeKind::ImportSpec { name, .. } = file.kind(spec) else {
            return None;
        };
        let path = file.import_path(spec)?;
        let local = name.and_then(|n| file.ident_name(n));
        if local == Some("_") {
            // Kept for its side effects.
            return None;
        }
        let obj = name
            .and_then(|n| checked.info.defs.get(&n))
            .or_else(|| checked.info.implicits.get(&spec))
            .cloned();
        Some(Import {
            path,
            obj,
            dot: local == Some("."),
        })
    }

    fn is_use(&self, checked: &CheckedFile, ident: NodeId) -> bool {
        let Some(used) = checked.info.uses.get(&ident) else {
            return false;
        };
        if self.dot {
            return used.pkg_path() == Some(self.path.as_str());
        }
        self.obj.as_ref().is_some_and(|obj| Object::same(obj, used))
    }

    fn used_in(&self, checked: &CheckedFile, range: TextRange) -> bool {
        self.uses(checked).any(|r| range.contains_range(r))
    }

    fn used_outside(&self, checked: &CheckedFile, range: TextRange) -> bool {
        self.uses(checked).any(|r| !range.contains_range(r))
    }

    fn uses<'a>(&'a self, checked: &'a CheckedFile) -> impl Iterator<Item = TextRange> + 'a {
        let file = &checked.file;
        let mut out = Vec::new();
        inspect(file, file.root, |node| {
            if matches!(file.kind(node), NodeKind::Ident(_)) && self.is_use(checked, node) {
                out.push(file.range(node));
            }
            true
        });
        out.into_iter()
    }
}

/// Edits removing the given import specs, and their declaration when no
/// spec of it remains.
fn import_deletions(file: &File, removed: &[NodeId]) -> Vec<TextEdit> {
    let mut edits = Vec::new();
    let import_decls = file
        .decls
        .iter()
        .filter(|d| matches!(file.kind(**d), NodeKind::GenDecl { kind: DeclKind::Import, .. }));
    for &decl in import_decls {
        let NodeKind::GenDecl { specs, grouped, .. } = file.kind(decl) else {
            continue;
        };
        let gone: Vec<NodeId> = specs.iter().copied().filter(|s| removed.contains(s)).collect();
        if gone.is_empty() {
            continue;
        }
        if gone.len() == specs.len() || !grouped {
            edits.push(TextEdit::delete(with_trailing_blank(&file.text, file.range(decl))));
            continue;
        }
        for spec in gone {
            edits.push(TextEdit::delete(whole_lines(&file.text, file.range(spec))));
        }
    }
    edits
}

/// `range` widened to whole lines.
fn whole_lines(text: &str, range: TextRange) -> TextRange {
    let start = line_start(text, range.start());
    let end = usize::from(range.end());
    let end = text[end..].find('\n').map_or(text.len(), |i| end + i + 1);
    TextRange::new(start, TextSize::new(end as u32))
}

/// `range` widened to whole lines plus one following blank line.
fn with_trailing_blank(text: &str, range: TextRange) -> TextRange {
    let lines = whole_lines(text, range);
    let end = usize::from(lines.end());
    match text[end..].find('\n') {
        Some(i) if text[end..end + i].trim().is_empty() => TextRange::new(lines.start(), TextSize::new((end + i + 1) as u32)),
        _ => lines,
    }
}

/// `<first declared name>.go` next to the original file, numbered when a
/// file of that name exists. Test files stay test files.
fn new_file_path(snapshot: &dyn Snapshot, original: &Path, file: &File, decls: &[NodeId]) -> PathBuf {
    let dir = original.parent().map(Path::to_path_buf).unwrap_or_default();
    let base = decls
        .first()
        .and_then(|d| first_name(file, *d))
        .filter(|n| *n != "_")
        .map(|n| n.to_lowercase())
        .unwrap_or_else(|| "extracted".into());
    let is_test = original
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with("_test.go"));
    let suffix = if is_test { "_test.go" } else { ".go" };
    let taken = |p: &Path| snapshot.file_for_path(p).is_some() || p.exists();
    let mut path = dir.join(format!("{base}{suffix}"));
    let mut n = 1;
    while taken(&path) {
        path = dir.join(format!("{base}.{n}{suffix}"));
        n += 1;
    }
    path
}

fn first_name(file: &File, decl: NodeId) -> Option<&str> {
    match file.kind(decl) {
        NodeKind::FuncDecl { name, .. } => file.ident_name(*name),
        NodeKind::GenDecl { specs, .. } => match file.kind(*specs.first()?) {
            NodeKind::TypeSpec { name, .. } => file.ident_name(*name),
            NodeKind::ValueSpec { names, .. } => file.ident_name(*names.first()?),
            _ => None,
        },
        _ => None,
    }
}
