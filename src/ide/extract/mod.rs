//! Extract refactorings.
//!
//! Each extraction validates the selection, analyses the objects it
//! refers to, picks an insertion point and synthesizes the new code. The
//! result is a [`SourceChange`]; nothing is edited when any step fails.
//!
//! | Kind            | Selection                        | Produces                    |
//! |-----------------|----------------------------------|-----------------------------|
//! | `Variable`      | one expression                   | `x := expr` before its stmt |
//! | `VariableAll`   | one expression                   | same, all occurrences       |
//! | `Constant`      | one constant expression          | `const x = expr`            |
//! | `Function`      | whole statements in a body       | `func newFunction(...)`     |
//! | `Method`        | whole statements in a method     | `func (r T) newMethod(...)` |
//! | `ToNewFile`     | whole top-level declarations     | a new file in the package   |

mod freevars;
mod function;
mod new_file;
mod variable;

use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;

use text_size::{TextRange, TextSize};

use crate::base::{FileId, Span};
use crate::hir::{CheckedFile, Package, Snapshot, Ty};
use crate::parser::{File, NodeId, NodeKind};

use super::error::{IdeError, IdeResult};
use super::location::range_at;
use super::options::ExtractOptions;

pub(crate) use function::{can_extract_function, can_extract_method};
pub(crate) use new_file::can_extract_to_new_file;
pub(crate) use variable::{can_extract_constant, can_extract_variable, can_extract_variable_all};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractKind {
    Variable,
    VariableAll,
    Constant,
    Function,
    Method,
    ToNewFile,
}

impl ExtractKind {
    pub const ALL: [ExtractKind; 6] = [
        ExtractKind::Variable,
        ExtractKind::VariableAll,
        ExtractKind::Constant,
        ExtractKind::Function,
        ExtractKind::Method,
        ExtractKind::ToNewFile,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ExtractKind::Variable => "Extract variable",
            ExtractKind::VariableAll => "Extract all occurrences of expression",
            ExtractKind::Constant => "Extract constant",
            ExtractKind::Function => "Extract function",
            ExtractKind::Method => "Extract method",
            ExtractKind::ToNewFile => "Extract declarations to new file",
        }
    }
}

/// Replace `range` with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: TextRange,
    pub new_text: String,
}

impl TextEdit {
    pub fn replace(range: TextRange, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
        }
    }

    pub fn insert(offset: TextSize, new_text: impl Into<String>) -> Self {
        Self::replace(TextRange::empty(offset), new_text)
    }

    pub fn delete(range: TextRange) -> Self {
        Self::replace(range, String::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Edit {
        file: FileId,
        path: PathBuf,
        edits: Vec<TextEdit>,
    },
    Create {
        path: PathBuf,
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceChange {
    pub label: String,
    pub changes: Vec<FileChange>,
}

impl SourceChange {
    fn single(label: &str, file: FileId, path: PathBuf, edits: Vec<TextEdit>) -> Self {
        Self {
            label: label.to_string(),
            changes: vec![FileChange::Edit { file, path, edits }],
        }
    }

    /// Edits to `file`, if any.
    pub fn edits_for(&self, file: FileId) -> Option<&[TextEdit]> {
        self.changes.iter().find_map(|c| match c {
            FileChange::Edit { file: f, edits, .. } if *f == file => Some(edits.as_slice()),
            _ => None,
        })
    }
}

/// Apply `edits` to `text`.
///
/// Edits are applied back to front so offsets stay valid. Insertions at the
/// same offset keep their order. Overlapping edits are an error.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> IdeResult<String> {
    let len = TextSize::of(text);
    let mut sorted: Vec<(usize, &TextEdit)> = edits.iter().enumerate().collect();
    sorted.sort_by(|(i, a), (j, b)| match b.range.start().cmp(&a.range.start()) {
        Ordering::Equal => b.range.end().cmp(&a.range.end()).then(j.cmp(i)),
        other => other,
    });
    for pair in sorted.windows(2) {
        let (later, earlier) = (pair[0].1, pair[1].1);
        if earlier.range.end() > later.range.start() {
            return Err(IdeError::InvalidRange(format!(
                "edits at {:?} and {:?} overlap",
                earlier.range, later.range
            )));
        }
    }
    let mut out = text.to_string();
    for (_, edit) in sorted {
        if edit.range.end() > len {
            return Err(IdeError::InvalidRange(format!("edit {:?} is past the end of the text", edit.range)));
        }
        out.replace_range(std::ops::Range::<usize>::from(edit.range), &edit.new_text);
    }
    Ok(out)
}

/// The extractions available for `selection`.
pub fn available(snapshot: &dyn Snapshot, file: FileId, selection: Span) -> IdeResult<Vec<ExtractKind>> {
    let ctx = match Context::new(snapshot, file, selection) {
        Ok(ctx) => ctx,
        Err(e) if e.is_cancelled() => return Err(e),
        Err(_) => return Ok(Vec::new()),
    };
    let mut kinds = Vec::new();
    for kind in ExtractKind::ALL {
        let ok = match kind {
            ExtractKind::Variable => can_extract_variable(&ctx),
            ExtractKind::VariableAll => can_extract_variable_all(&ctx),
            ExtractKind::Constant => can_extract_constant(&ctx),
            ExtractKind::Function => can_extract_function(&ctx),
            ExtractKind::Method => can_extract_method(&ctx),
            ExtractKind::ToNewFile => can_extract_to_new_file(&ctx),
        };
        if ok {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

/// Run one extraction.
pub fn extract(
    snapshot: &dyn Snapshot,
    options: &ExtractOptions,
    kind: ExtractKind,
    file: FileId,
    selection: Span,
) -> IdeResult<SourceChange> {
    let ctx = Context::new(snapshot, file, selection)?;
    tracing::debug!(%file, ?kind, range = ?ctx.range, "extract");
    let label = kind.title();
    match kind {
        ExtractKind::Variable => variable::extract_variable(&ctx, options, false)
            .map(|edits| SourceChange::single(label, file, ctx.path.clone(), edits)),
        ExtractKind::VariableAll => variable::extract_variable(&ctx, options, true)
            .map(|edits| SourceChange::single(label, file, ctx.path.clone(), edits)),
        ExtractKind::Constant => variable::extract_constant(&ctx, options)
            .map(|edits| SourceChange::single(label, file, ctx.path.clone(), edits)),
        ExtractKind::Function => function::extract_function(&ctx, options, false)
            .map(|edits| SourceChange::single(label, file, ctx.path.clone(), edits)),
        ExtractKind::Method => function::extract_function(&ctx, options, true)
            .map(|edits| SourceChange::single(label, file, ctx.path.clone(), edits)),
        ExtractKind::ToNewFile => new_file::extract_to_new_file(&ctx, snapshot),
    }
}

/// A selection in a fully checked file.
pub(crate) struct Context {
    pub file_id: FileId,
    file_index: usize,
    pub path: PathBuf,
    pub pkg: Arc<Package>,
    /// The selection, trimmed of surrounding whitespace.
    pub range: TextRange,
}

impl Context {
    fn new(snapshot: &dyn Snapshot, file: FileId, selection: Span) -> IdeResult<Self> {
        let range = range_at(snapshot, file, selection)?;
        let pkg = snapshot.narrowest_package(file)?;
        let file_index = pkg
            .files()
            .iter()
            .position(|f| f.file_id == file)
            .ok_or_else(|| super::error::bug(format!("{file} missing from its own package")))?;
        let range = trim(&pkg.files()[file_index].file, range);
        Ok(Self {
            file_id: file,
            file_index,
            path: snapshot.display_path(file),
            pkg,
            range,
        })
    }

    pub fn checked(&self) -> &CheckedFile {
        &self.pkg.files()[self.file_index]
    }

    pub fn file(&self) -> &File {
        &self.checked().file
    }

    /// Format `ty` as written in this package.
    pub fn type_text(&self, ty: &Ty) -> String {
        let qualify = crate::hir::types::relative_to(self.pkg.path());
        crate::hir::type_string(ty, &qualify)
    }

    /// The top-level declaration containing `node`.
    pub fn top_level_decl(&self, node: NodeId) -> Option<NodeId> {
        let file = self.file();
        file.ancestors(node)
            .find(|n| file.parent(*n) == Some(file.root))
    }
}

fn trim(file: &File, range: TextRange) -> TextRange {
    let text = file.slice(range);
    let leading = text.len() - text.trim_start().len();
    let trimmed = text.trim();
    let start = range.start() + TextSize::new(leading as u32);
    TextRange::at(start, TextSize::of(trimmed))
}

/// Whether `node` is a statement list owner: a block or a clause body.
pub(crate) fn is_stmt_list(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Block(_) | NodeKind::CaseClause { .. } | NodeKind::CommClause { .. }
    )
}

/// Statements of a block or clause.
pub(crate) fn stmt_list(kind: &NodeKind) -> &[NodeId] {
    match kind {
        NodeKind::Block(stmts) => stmts,
        NodeKind::CaseClause { body, .. } | NodeKind::CommClause { body, .. } => body,
        _ => &[],
    }
}

/// Leading whitespace of the line containing `offset`.
pub(crate) fn line_indent(text: &str, offset: TextSize) -> &str {
    let offset = usize::from(offset).min(text.len());
    let start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line = &text[start..];
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}

/// Start of the line containing `offset`.
pub(crate) fn line_start(text: &str, offset: TextSize) -> TextSize {
    let offset = usize::from(offset).min(text.len());
    TextSize::new(text[..offset].rfind('\n').map_or(0, |i| i + 1) as u32)
}

/// Reindent `block`, whose first line was indented by `first_indent`, so
/// that its least indented line starts with `indent`.
pub(crate) fn reindent(block: &str, first_indent: &str, indent: &str) -> String {
    let leading = |l: &str| l.len() - l.trim_start_matches([' ', '\t']).len();
    let common = block
        .lines()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(leading)
        .chain(std::iter::once(first_indent.len()))
        .min()
        .unwrap_or(0);
    let mut out = String::with_capacity(block.len());
    for (i, line) in block.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if line.trim().is_empty() {
            continue;
        }
        out.push_str(indent);
        if i == 0 {
            out.push_str(&first_indent[common..]);
            out.push_str(line.trim_start());
        } else {
            out.push_str(&line[common.min(leading(line))..]);
        }
    }
    out
}

/// A name based on `base` that no identifier in `taken` uses.
pub(crate) fn fresh_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (1..)
        .map(|i| format!("{base}{i}"))
        .find(|name| !taken(name))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_edits_back_to_front() {
        let text = "a + b";
        let edits = vec![
            TextEdit::replace(TextRange::new(0.into(), 1.into()), "x"),
            TextEdit::insert(5.into(), ")"),
            TextEdit::insert(0.into(), "("),
        ];
        assert_eq!(apply_edits(text, &edits).unwrap(), "(x + b)");
    }

    #[test]
    fn test_apply_edits_rejects_overlap() {
        let edits = vec![
            TextEdit::replace(TextRange::new(0.into(), 3.into()), "x"),
            TextEdit::replace(TextRange::new(2.into(), 4.into()), "y"),
        ];
        assert!(matches!(apply_edits("abcdef", &edits), Err(IdeError::InvalidRange(_))));
    }

    #[test]
    fn test_reindent_keeps_relative_indentation() {
        let block = "if x {\n\t\t\ty()\n\t\t}";
        assert_eq!(reindent(block, "\t\t", "\t"), "\tif x {\n\t\ty()\n\t}");
    }

    #[test]
    fn test_fresh_name_skips_taken() {
        let taken = ["x", "x1"];
        assert_eq!(fresh_name("x", |n| taken.contains(&n)), "x2");
        assert_eq!(fresh_name("y", |n| taken.contains(&n)), "y");
    }

    #[test]
    fn test_line_helpers() {
        let text = "package p\n\tfoo()\n";
        assert_eq!(line_indent(text, TextSize::new(13)), "\t");
        assert_eq!(line_start(text, TextSize::new(13)), TextSize::new(10));
    }
}
