//! Go-to-definition and go-to-type-definition.
//!
//! Besides identifiers, definition understands a few positions that are
//! not identifiers at all:
//!
//! - the `return` keyword jumps to the enclosing function's results;
//! - `break`, `continue`, `goto` and `fallthrough` jump to their target;
//! - doc links such as `[Name]` or `[pkg.Name.Method]` in comments;
//! - the target of a `//go:linkname` directive;
//! - the patterns of a `//go:embed` directive, which name files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use text_size::{TextRange, TextSize};
use walkdir::WalkDir;

use crate::base::{FileId, Position};
use crate::hir::types::pointer;
use crate::hir::{
    CheckMode, ObjKind, ObjRef, Package, Snapshot, Type, lookup_field_or_method, universe,
};
use crate::parser::walk::path_enclosing_interval;
use crate::parser::{BranchKind, Comment, File, NodeId, NodeKind};

use super::error::IdeResult;
use super::location::{Location, object_location, offset_at, range_location};
use super::resolve::{referenced_object, type_name_of};

/// Result of a go-to-definition request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GotoResult {
    /// Source locations to jump to.
    pub targets: Vec<Location>,
    /// Files named by an embed pattern. They need not be Go files, so they
    /// are reported by path.
    pub files: Vec<PathBuf>,
}

impl GotoResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(target: Location) -> Self {
        Self {
            targets: vec![target],
            files: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty() && self.files.is_empty()
    }
}

/// Find the definition of whatever is at `position`.
pub fn goto_definition(snapshot: &dyn Snapshot, file: FileId, position: Position) -> IdeResult<GotoResult> {
    let offset = offset_at(snapshot, file, position)?;
    let syntax = snapshot.parsed_file(file)?;

    if let Some(comment) = syntax.comments.iter().find(|c| c.range.contains(offset)) {
        return comment_definition(snapshot, file, comment, offset);
    }

    let (path, _) = path_enclosing_interval(&syntax, offset, offset);
    if let Some(&leaf) = path.first()
        && let Some(target) = keyword_definition(&syntax, leaf, offset)
    {
        return match target {
            Some(range) => Ok(GotoResult::single(range_location(snapshot, file, range)?)),
            None => Ok(GotoResult::empty()),
        };
    }

    let pkg = snapshot.narrowest_package(file)?;
    let resolved = match referenced_object(&pkg, file, offset) {
        Ok(r) => r,
        Err(e) if e.is_soft_empty() => return Ok(GotoResult::empty()),
        Err(e) => return Err(e),
    };
    if let Some(import_path) = &resolved.import_path {
        return Ok(GotoResult {
            targets: package_locations(snapshot, import_path)?,
            files: Vec::new(),
        });
    }
    match definition_location(snapshot, &resolved.obj)? {
        Some(loc) => Ok(GotoResult::single(loc)),
        None => Ok(GotoResult::empty()),
    }
}

/// Where an object is declared. Objects without a position (such as the
/// universe's `.` import name) have no definition.
pub(crate) fn definition_location(snapshot: &dyn Snapshot, obj: &ObjRef) -> IdeResult<Option<Location>> {
    let Some(pos) = obj.pos() else {
        return Ok(None);
    };
    if obj.kind() == ObjKind::PkgName {
        // The name of an unnamed import sits on the import path.
        let syntax = snapshot.syntax(pos.file)?;
        let (path, _) = path_enclosing_interval(&syntax, pos.offset, pos.offset);
        if let Some(&leaf) = path.first()
            && let NodeKind::BasicLit { .. } = syntax.kind(leaf)
        {
            return range_location(snapshot, pos.file, syntax.range(leaf)).map(Some);
        }
    }
    object_location(snapshot, obj).map(Some)
}

/// The package clause of every file of the package at `import_path`.
fn package_locations(snapshot: &dyn Snapshot, import_path: &str) -> IdeResult<Vec<Location>> {
    if import_path == "unsafe" {
        let file = universe::UNSAFE_FILE;
        let syntax = snapshot.syntax(file)?;
        return Ok(vec![range_location(snapshot, file, syntax.range(syntax.package_name))?]);
    }
    let Some(meta) = snapshot
        .all_metadata()
        .into_iter()
        .filter(|m| m.path == import_path)
        .min_by_key(|m| m.is_test_variant())
    else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for &file in &meta.files {
        let syntax = snapshot.parsed_file(file)?;
        out.push(range_location(snapshot, file, syntax.range(syntax.package_name))?);
    }
    out.sort();
    Ok(out)
}

/// Definition of a keyword position. `None` means the position is not a
/// keyword this handles; `Some(None)` that it is, but there is no target.
fn keyword_definition(file: &File, leaf: NodeId, offset: TextSize) -> Option<Option<TextRange>> {
    let start = file.range(leaf).start();
    match file.kind(leaf) {
        NodeKind::Return(_) if TextRange::at(start, TextSize::new(6)).contains_inclusive(offset) => {
            Some(return_target(file, leaf))
        }
        NodeKind::Branch { kind, label } => {
            let kw = TextRange::at(start, TextSize::of(kind.keyword()));
            if !kw.contains_inclusive(offset) {
                return None;
            }
            Some(branch_target(file, leaf, *kind, *label))
        }
        _ => None,
    }
}

/// The result list of the function enclosing a return statement.
fn return_target(file: &File, ret: NodeId) -> Option<TextRange> {
    let func_type = file.ancestors(ret).find_map(|n| match file.kind(n) {
        NodeKind::FuncDecl { ty, .. } | NodeKind::FuncLit { ty, .. } => Some(*ty),
        _ => None,
    })?;
    let NodeKind::FuncType { results, .. } = file.kind(func_type) else {
        return None;
    };
    let first = file.range(*results.first()?);
    let last = file.range(*results.last()?);
    Some(first.cover(last))
}

fn branch_target(file: &File, stmt: NodeId, kind: BranchKind, label: Option<NodeId>) -> Option<TextRange> {
    let enclosing_func = file.ancestors(stmt).find(|n| {
        matches!(file.kind(*n), NodeKind::FuncDecl { .. } | NodeKind::FuncLit { .. })
    })?;
    if let Some(label) = label {
        let name = file.ident_name(label)?;
        let mut found = None;
        crate::parser::walk::inspect(file, enclosing_func, |n| match file.kind(n) {
            NodeKind::FuncLit { .. } if n != enclosing_func => false,
            NodeKind::Labeled { label: l, .. } if file.ident_name(*l) == Some(name) => {
                found = Some(file.range(*l));
                false
            }
            _ => found.is_none(),
        });
        return found;
    }

    let keyword = |n: NodeId, kw: &str| TextRange::at(file.range(n).start(), TextSize::of(kw));
    for n in file.ancestors(stmt).skip(1) {
        if n == enclosing_func {
            break;
        }
        match (kind, file.kind(n)) {
            (BranchKind::Break | BranchKind::Continue, NodeKind::For { .. } | NodeKind::Range { .. }) => {
                return Some(keyword(n, "for"));
            }
            (BranchKind::Break, NodeKind::Switch { .. } | NodeKind::TypeSwitch { .. }) => {
                return Some(keyword(n, "switch"));
            }
            (BranchKind::Break, NodeKind::Select { .. }) => return Some(keyword(n, "select")),
            (BranchKind::Fallthrough, NodeKind::CaseClause { .. }) => {
                let block = file.parent(n)?;
                let NodeKind::Block(clauses) = file.kind(block) else {
                    return None;
                };
                let i = clauses.iter().position(|c| *c == n)?;
                let next = *clauses.get(i + 1)?;
                let kw = match file.kind(next) {
                    NodeKind::CaseClause { list: None, .. } => "default",
                    _ => "case",
                };
                return Some(keyword(next, kw));
            }
            _ => {}
        }
    }
    None
}

fn comment_definition(
    snapshot: &dyn Snapshot,
    file: FileId,
    comment: &Comment,
    offset: TextSize,
) -> IdeResult<GotoResult> {
    let content = comment.content();
    // Both comment forms open with two marker bytes.
    let base = comment.range.start() + TextSize::new(2);
    let rel = usize::from(offset.max(base) - base);

    if let Some(args) = content.strip_prefix("go:linkname ") {
        let Some(at) = rel.checked_sub("go:linkname ".len()) else {
            return Ok(GotoResult::empty());
        };
        return match word_at(args, at) {
            Some((index, word)) => linkname_definition(snapshot, file, index, word),
            None => Ok(GotoResult::empty()),
        };
    }
    if let Some(args) = content.strip_prefix("go:embed ") {
        let Some(at) = rel.checked_sub("go:embed ".len()) else {
            return Ok(GotoResult::empty());
        };
        let Some((_, pattern)) = word_at(args, at) else {
            return Ok(GotoResult::empty());
        };
        let Some(dir) = snapshot.file_path(file).and_then(|p| p.parent().map(Path::to_path_buf)) else {
            return Ok(GotoResult::empty());
        };
        let files = embed_matches(&dir, pattern.trim_matches(|c| c == '"' || c == '`'));
        tracing::debug!(pattern, matched = files.len(), "embed pattern");
        return Ok(GotoResult {
            targets: Vec::new(),
            files,
        });
    }

    let Some(link) = doc_link_at(content, rel) else {
        return Ok(GotoResult::empty());
    };
    let pkg = snapshot.narrowest_package(file)?;
    match resolve_doc_link(&pkg, file, link) {
        Some(obj) => Ok(definition_location(snapshot, &obj)?
            .map(GotoResult::single)
            .unwrap_or_default()),
        None => Ok(GotoResult::empty()),
    }
}

/// The whitespace-separated word of `text` covering byte `at`, with its index.
fn word_at(text: &str, at: usize) -> Option<(usize, &str)> {
    let mut start = 0;
    for (i, word) in text.split(' ').enumerate() {
        let end = start + word.len();
        if !word.is_empty() && start <= at && at <= end {
            return Some((i, word));
        }
        start = end + 1;
    }
    None
}

/// `//go:linkname local target`: the first word names an object of this
/// package, the second `importpath.name`.
fn linkname_definition(snapshot: &dyn Snapshot, file: FileId, word_index: usize, word: &str) -> IdeResult<GotoResult> {
    let obj = match word_index {
        0 => snapshot.narrowest_package(file)?.lookup(word),
        1 => {
            let Some((pkg_path, name)) = word.rsplit_once('.') else {
                return Ok(GotoResult::empty());
            };
            let Some(meta) = snapshot
                .all_metadata()
                .into_iter()
                .filter(|m| m.path == pkg_path)
                .min_by_key(|m| m.is_test_variant())
            else {
                return Ok(GotoResult::empty());
            };
            snapshot
                .type_check(std::slice::from_ref(&meta.id), CheckMode::Headers)?
                .first()
                .and_then(|p| p.lookup(name))
        }
        _ => None,
    };
    match obj {
        Some(obj) => Ok(definition_location(snapshot, &obj)?
            .map(GotoResult::single)
            .unwrap_or_default()),
        None => Ok(GotoResult::empty()),
    }
}

/// Files under `dir` matched by an embed pattern. A pattern naming a
/// directory embeds the files below it, except hidden ones.
fn embed_matches(dir: &Path, pattern: &str) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).into_iter().filter_map(Result::ok) {
        let Ok(rel) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let rel: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let pattern_depth = pattern.split('/').count();
        if rel.len() < pattern_depth {
            continue;
        }
        let head = rel[..pattern_depth].join("/");
        if !path_match(pattern, &head) || !entry.file_type().is_file() {
            continue;
        }
        let hidden = rel[pattern_depth..]
            .iter()
            .any(|c| c.starts_with('.') || c.starts_with('_'));
        if !hidden {
            out.push(entry.path().to_path_buf());
        }
    }
    out.sort();
    out
}

/// Shell-style matching where `*` and `?` do not cross `/`.
fn path_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();
    fn go(p: &[char], n: &[char]) -> bool {
        match (p.first(), n.first()) {
            (None, None) => true,
            (Some('*'), _) => {
                go(&p[1..], n) || (!n.is_empty() && n[0] != '/' && go(p, &n[1..]))
            }
            (Some('?'), Some(c)) if *c != '/' => go(&p[1..], &n[1..]),
            (Some(a), Some(b)) if a == b => go(&p[1..], &n[1..]),
            _ => false,
        }
    }
    go(&p, &n)
}

/// The text of the `[link]` around byte `at` of a comment.
fn doc_link_at(content: &str, at: usize) -> Option<&str> {
    let open = content[..at.min(content.len())].rfind('[')?;
    let close = open + content[open..].find(']')?;
    if at > close {
        return None;
    }
    let link = &content[open + 1..close];
    let valid = !link.is_empty()
        && link
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '/' | '*'));
    valid.then_some(link)
}

/// Resolve `[Name]`, `[Name.Member]`, `[pkg.Name]`, `[pkg.Name.Member]` or
/// `[import/path.Name]` in the scope of `file`.
fn resolve_doc_link(pkg: &Package, file: FileId, link: &str) -> Option<ObjRef> {
    let link = link.trim_start_matches('*');
    let scopes = pkg.scopes();
    let file_scope = scopes.file_scope(file)?;

    // A qualifier containing a slash is a full import path.
    let (mut dep, rest): (Option<Arc<Package>>, &str) = match link.rfind('/') {
        Some(slash) => {
            let dot = slash + link[slash..].find('.')?;
            let path = &link[..dot];
            let dep = pkg.imports().iter().find(|p| p.path() == path)?.clone();
            (Some(dep), &link[dot + 1..])
        }
        None => (None, link),
    };
    let mut parts = rest.split('.');
    let mut name = parts.next()?;

    if dep.is_none() {
        let first = scopes.resolve(file_scope, name, None)?;
        if let Some(imported) = first.imported() {
            dep = Some(pkg.imports().iter().find(|p| p.path() == imported.path)?.clone());
            name = parts.next()?;
        } else if first.kind() != ObjKind::PkgName {
            return member(first, parts.next(), pkg.path());
        }
    }
    let dep = dep?;
    let obj = dep.lookup(name)?;
    member(obj, parts.next(), dep.path())
}

/// `obj`, or its field or method `member`.
fn member(obj: ObjRef, member: Option<&str>, pkg_path: &str) -> Option<ObjRef> {
    let Some(member) = member else {
        return Some(obj);
    };
    let ty = obj.ty()?;
    lookup_field_or_method(&pointer(ty), Some(pkg_path), member).map(|found| found.obj)
}

/// Go to the declaration of the type of the object at `position`.
pub fn goto_type_definition(snapshot: &dyn Snapshot, file: FileId, position: Position) -> IdeResult<Vec<Location>> {
    let offset = offset_at(snapshot, file, position)?;
    let pkg = snapshot.narrowest_package(file)?;
    let resolved = match referenced_object(&pkg, file, offset) {
        Ok(r) => r,
        Err(e) if e.is_soft_empty() => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let Some(mut ty) = resolved.selected_type.or_else(|| resolved.obj.ty()) else {
        return Ok(Vec::new());
    };
    if resolved.obj.kind() == ObjKind::Func
        && let Type::Signature(sig) = ty.as_ref()
    {
        match sig.results.as_slice() {
            [single] => ty = single.ty.clone(),
            _ => return Ok(Vec::new()),
        }
    }
    let target = match ty.as_ref() {
        Type::Basic(kind) => universe::lookup(kind.name()),
        _ => type_name_of(&ty),
    };
    match target {
        Some(obj) => Ok(definition_location(snapshot, &obj)?.into_iter().collect()),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::ide::AnalysisHost;

    fn position_of(text: &str, needle: &str) -> Position {
        let offset = text.find(needle).expect("needle");
        let before = &text[..offset];
        let line = before.matches('\n').count() as u32;
        let col = (offset - before.rfind('\n').map_or(0, |i| i + 1)) as u32;
        Position::new(line, col)
    }

    fn target_text<'a>(src: &'a str, result: &GotoResult) -> Vec<&'a str> {
        result.targets.iter().map(|l| &src[l.range]).collect()
    }

    const SRC: &str = "package p

type Point struct{ X int }

// Norm uses [Point.X] and [Scale].
func (p Point) Norm() int { return p.X }

func Scale(p Point, k int) (q Point) {
	q = p
	q.X *= k
	return
}

func loop(xs []int) {
outer:
	for range xs {
		for range xs {
			continue outer
		}
		break
	}
}
";

    #[test]
    fn test_identifiers() {
        let mut host = AnalysisHost::new();
        let f = host.set_file_content("/ws/p/p.go", SRC);
        let analysis = host.analysis();

        let field = goto_definition(&analysis, f, position_of(SRC, "X *= k")).unwrap();
        assert_eq!(field.targets.len(), 1);
        assert_eq!(field.targets[0].span.start, position_of(SRC, "X int"));

        let param = goto_definition(&analysis, f, position_of(SRC, "k\n")).unwrap();
        assert_eq!(param.targets[0].span.start, position_of(SRC, "k int"));

        let ty = goto_definition(&analysis, f, position_of(SRC, "Point, k")).unwrap();
        assert_eq!(target_text(SRC, &ty), vec!["Point"]);
        assert_eq!(ty.targets[0].span.start, position_of(SRC, "Point struct"));
    }

    #[test]
    fn test_whitespace_is_empty() {
        let mut host = AnalysisHost::new();
        let f = host.set_file_content("/ws/p/p.go", SRC);
        let analysis = host.analysis();
        assert!(goto_definition(&analysis, f, Position::new(1, 0)).unwrap().is_empty());
    }

    #[test]
    fn test_keywords() {
        let mut host = AnalysisHost::new();
        let f = host.set_file_content("/ws/p/p.go", SRC);
        let analysis = host.analysis();

        let ret = goto_definition(&analysis, f, position_of(SRC, "return\n")).unwrap();
        assert_eq!(target_text(SRC, &ret), vec!["q Point"]);

        let cont = goto_definition(&analysis, f, position_of(SRC, "continue outer")).unwrap();
        assert_eq!(target_text(SRC, &cont), vec!["outer"]);

        let brk = goto_definition(&analysis, f, position_of(SRC, "break")).unwrap();
        assert_eq!(brk.targets[0].span.start, position_of(SRC, "for range xs {\n\t\tfor"));
    }

    #[test]
    fn test_doc_links() {
        let mut host = AnalysisHost::new();
        let f = host.set_file_content("/ws/p/p.go", SRC);
        let analysis = host.analysis();

        let field = goto_definition(&analysis, f, position_of(SRC, "X] and")).unwrap();
        assert_eq!(field.targets[0].span.start, position_of(SRC, "X int"));

        let func = goto_definition(&analysis, f, position_of(SRC, "Scale]")).unwrap();
        assert_eq!(func.targets[0].span.start, position_of(SRC, "Scale(p"));
    }

    #[test]
    fn test_embed_patterns() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("static/.cache")).unwrap();
        fs::write(dir.path().join("static/index.html"), "<html/>").unwrap();
        fs::write(dir.path().join("static/.cache/x"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let src = "package p\n\nimport _ \"embed\"\n\n//go:embed static\nvar site string\n";
        let mut host = AnalysisHost::new();
        let f = host.set_file_content(dir.path().join("p.go"), src);
        let analysis = host.analysis();
        let result = goto_definition(&analysis, f, position_of(src, "static")).unwrap();
        assert!(result.targets.is_empty());
        assert_eq!(result.files, vec![dir.path().join("static/index.html")]);
    }

    #[test]
    fn test_path_match() {
        assert!(path_match("*.txt", "notes.txt"));
        assert!(!path_match("*.txt", "dir/notes.txt"));
        assert!(path_match("img/?.png", "img/a.png"));
    }

    #[test]
    fn test_type_definition() {
        let mut host = AnalysisHost::new();
        let f = host.set_file_content("/ws/p/p.go", SRC);
        let analysis = host.analysis();

        let of_var = goto_type_definition(&analysis, f, position_of(SRC, "q = p")).unwrap();
        assert_eq!(of_var.len(), 1);
        assert_eq!(of_var[0].span.start, position_of(SRC, "Point struct"));

        // A function's single result.
        let of_func = goto_type_definition(&analysis, f, position_of(SRC, "Scale(p")).unwrap();
        assert_eq!(of_func[0].span.start, position_of(SRC, "Point struct"));

        // Predeclared types live in the synthetic builtin file.
        let of_int = goto_type_definition(&analysis, f, position_of(SRC, "k int")).unwrap();
        assert_eq!(of_int[0].file, universe::BUILTIN_FILE);
    }
}
