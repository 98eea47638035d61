//! Helpers for setting up analysis hosts from in-memory Go sources.

use std::path::PathBuf;
use std::sync::Arc;

use gonav::base::FileId;
use gonav::hir::{CheckMode, Metadata, NoImports, Package, PackageId, Snapshot, check_package};
use gonav::ide::{Analysis, AnalysisHost, FileChange, Location, SourceChange, apply_edits};
use gonav::parser;
use gonav::{Position, Span};
use indexmap::IndexMap;

/// Directory every test module lives in.
pub const ROOT: &str = "/ws";

/// Module path of the test module.
pub const MODULE: &str = "example.com/m";

/// A host holding one workspace module, plus the sources it was built from.
pub struct TestWorkspace {
    pub host: AnalysisHost,
    files: Vec<(String, FileId, String)>,
}

impl TestWorkspace {
    /// Creates a workspace module at [`ROOT`] with files given relative to it.
    pub fn new(files: &[(&str, &str)]) -> Self {
        let mut host = AnalysisHost::new();
        host.add_module(ROOT, MODULE, true);
        let files = files
            .iter()
            .map(|(rel, text)| {
                let id = host.set_file_content(format!("{ROOT}/{rel}"), text);
                (rel.to_string(), id, text.to_string())
            })
            .collect();
        Self { host, files }
    }

    /// A workspace with a single file, `p/p.go`.
    pub fn single(text: &str) -> Self {
        Self::new(&[("p/p.go", text)])
    }

    fn entry(&self, rel: &str) -> &(String, FileId, String) {
        self.files
            .iter()
            .find(|(r, _, _)| r == rel)
            .unwrap_or_else(|| panic!("no file {rel} in test workspace"))
    }

    pub fn file(&self, rel: &str) -> FileId {
        self.entry(rel).1
    }

    pub fn text(&self, rel: &str) -> &str {
        &self.entry(rel).2
    }

    /// Position of the first occurrence of `needle` in `rel`.
    pub fn position(&self, rel: &str, needle: &str) -> Position {
        position_of(self.text(rel), needle)
    }

    /// Span covering the first occurrence of `needle` in `rel`.
    pub fn span(&self, rel: &str, needle: &str) -> Span {
        span_of(self.text(rel), needle)
    }

    /// Replaces the text of `rel`, as an editor would after applying a change.
    pub fn update(&mut self, rel: &str, text: &str) {
        let id = self.host.set_file_content(format!("{ROOT}/{rel}"), text);
        match self.files.iter_mut().find(|(r, _, _)| r == rel) {
            Some(entry) => entry.2 = text.to_string(),
            None => self.files.push((rel.to_string(), id, text.to_string())),
        }
    }

    pub fn analysis(&mut self) -> Analysis {
        self.host.analysis()
    }
}

fn position_at(text: &str, offset: usize) -> Position {
    let before = &text[..offset];
    let line = before.matches('\n').count() as u32;
    let col = offset - before.rfind('\n').map_or(0, |i| i + 1);
    Position::new(line, col as u32)
}

/// Position of the first occurrence of `needle`. Panics if absent.
pub fn position_of(text: &str, needle: &str) -> Position {
    let offset = text
        .find(needle)
        .unwrap_or_else(|| panic!("{needle:?} not found in source"));
    position_at(text, offset)
}

/// Span of the first occurrence of `needle`. Panics if absent.
pub fn span_of(text: &str, needle: &str) -> Span {
    let offset = text
        .find(needle)
        .unwrap_or_else(|| panic!("{needle:?} not found in source"));
    Span::new(position_at(text, offset), position_at(text, offset + needle.len()))
}

/// Span from the start of `from` to the end of the first `to` after it.
pub fn span_between(text: &str, from: &str, to: &str) -> Span {
    let start = text
        .find(from)
        .unwrap_or_else(|| panic!("{from:?} not found in source"));
    let end = text[start..]
        .find(to)
        .map(|i| start + i + to.len())
        .unwrap_or_else(|| panic!("{to:?} not found after {from:?}"));
    Span::new(position_at(text, start), position_at(text, end))
}

/// The source text a location covers. Works for the synthetic builtin
/// file too.
pub fn text_at(analysis: &Analysis, loc: &Location) -> String {
    let index = analysis
        .line_index(loc.file)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", loc.path.display()));
    index.text()[loc.range].to_string()
}

/// The source text of every location, in order.
pub fn texts(analysis: &Analysis, locs: &[Location]) -> Vec<String> {
    locs.iter().map(|l| text_at(analysis, l)).collect()
}

/// Zero-based start lines of every location, in order.
pub fn lines(locs: &[Location]) -> Vec<u32> {
    locs.iter().map(|l| l.span.start.line).collect()
}

/// The text of `file` after applying the edits `change` makes to it.
pub fn apply_change(analysis: &Analysis, change: &SourceChange, file: FileId) -> String {
    let text = analysis.read_file(file).expect("file text");
    let edits = change.edits_for(file).expect("change edits the file");
    apply_edits(&text, edits).expect("edits apply cleanly")
}

/// Files the change creates, keyed by path.
pub fn created_files(change: &SourceChange) -> Vec<(PathBuf, String)> {
    change
        .changes
        .iter()
        .filter_map(|c| match c {
            FileChange::Create { path, text } => Some((path.clone(), text.clone())),
            FileChange::Edit { .. } => None,
        })
        .collect()
}

/// Import path of packages built by [`check_sources`].
pub const CHECKED_PATH: &str = "example.com/p";

/// Type checks `sources` as one package at [`CHECKED_PATH`] with no imports.
/// The package name is taken from the first file.
pub fn check_sources(sources: &[&str]) -> Package {
    let files: Vec<_> = sources
        .iter()
        .enumerate()
        .map(|(i, src)| (FileId::new(i as u32), Arc::new(parser::parse(src))))
        .collect();
    let name = files.first().map(|(_, f)| f.package_name().to_string()).unwrap_or_default();
    let meta = Arc::new(Metadata {
        id: PackageId::new(CHECKED_PATH),
        path: CHECKED_PATH.into(),
        name: name.into(),
        dir: PathBuf::from("/src/p"),
        files: files.iter().map(|(id, _)| *id).collect(),
        imports: IndexMap::new(),
        for_test: None,
    });
    check_package(meta, files, CheckMode::Full, &NoImports)
}

/// Type checks a single source file; see [`check_sources`].
pub fn check_source(src: &str) -> Package {
    check_sources(&[src])
}

/// Syntax and type errors of the package containing `file`.
pub fn problems(analysis: &Analysis, file: FileId) -> Vec<String> {
    let syntax = analysis.parsed_file(file).expect("parsed file");
    let pkg = analysis.narrowest_package(file).expect("package");
    syntax
        .errors
        .iter()
        .map(|e| e.message.clone())
        .chain(pkg.errors().iter().map(|e| e.message.clone()))
        .collect()
}
