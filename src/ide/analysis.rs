//! AnalysisHost and Analysis: state management for navigation queries.
//!
//! The `AnalysisHost` owns all mutable state (file contents, module roots,
//! options) and hands out `Analysis` snapshots for querying. An `Analysis`
//! is immutable and implements [`Snapshot`], so every feature runs against
//! one consistent picture of the workspace.
//!
//! ## Usage
//!
//! ```ignore
//! let mut host = AnalysisHost::new();
//! host.add_module("/ws", "example.com/m", true);
//! let file = host.set_file_content("/ws/a/a.go", "package a\n");
//!
//! let analysis = host.analysis();
//! let targets = analysis.goto_definition(file, Position::new(0, 8))?;
//! ```
//!
//! Changing the host cancels every analysis handed out before the change;
//! their queries fail with [`IdeError::Cancelled`](super::IdeError).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use tokio_util::sync::CancellationToken;

use crate::base::{FileId, Position, Span};
use crate::hir::{
    CheckMode, FileText, Importer, Metadata, Package, PackageId, RootDatabase, Snapshot,
    SnapshotError, check_package, parse_file,
};
use crate::parser::File;

use super::call_hierarchy::{self, CallHierarchyItem, IncomingCall, OutgoingCall};
use super::definition::{self, GotoResult};
use super::error::IdeResult;
use super::extract::{self, ExtractKind, SourceChange};
use super::implementation;
use super::location::Location;
use super::options::IdeOptions;
use super::references;
use super::type_hierarchy::{self, TypeHierarchyItem};

/// A module root: files below `dir` get import paths under `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRoot {
    pub dir: PathBuf,
    pub path: SmolStr,
    /// Whether the module's packages belong to the workspace, as opposed
    /// to being dependencies.
    pub workspace: bool,
}

struct FileEntry {
    path: PathBuf,
    input: FileText,
}

#[derive(Clone)]
struct FileData {
    path: PathBuf,
    text: Arc<str>,
    parsed: Arc<File>,
}

/// Owns all mutable state for the IDE layer.
///
/// Apply changes via `set_file_content()` and `remove_file()`,
/// then get a consistent snapshot via `analysis()`.
pub struct AnalysisHost {
    db: RootDatabase,
    files: FxHashMap<FileId, FileEntry>,
    paths: FxHashMap<PathBuf, FileId>,
    next_file: u32,
    modules: Vec<ModuleRoot>,
    options: IdeOptions,
    cancel: CancellationToken,
}

impl Default for AnalysisHost {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisHost {
    /// Create a new empty AnalysisHost.
    pub fn new() -> Self {
        Self {
            db: RootDatabase::new(),
            files: FxHashMap::default(),
            paths: FxHashMap::default(),
            next_file: 0,
            modules: Vec::new(),
            options: IdeOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn options(&self) -> &IdeOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: IdeOptions) {
        self.invalidate();
        self.options = options;
    }

    /// Register a module root. A later root nested in an earlier one takes
    /// precedence for the files below it.
    pub fn add_module(&mut self, dir: impl Into<PathBuf>, path: impl Into<SmolStr>, workspace: bool) {
        self.invalidate();
        let dir = dir.into();
        self.modules.retain(|m| m.dir != dir);
        self.modules.push(ModuleRoot {
            dir,
            path: path.into(),
            workspace,
        });
    }

    pub fn modules(&self) -> &[ModuleRoot] {
        &self.modules
    }

    /// Set the content of a file, adding it if it is new.
    pub fn set_file_content(&mut self, path: impl AsRef<Path>, content: &str) -> FileId {
        self.invalidate();
        let path = path.as_ref().to_path_buf();
        if let Some(&id) = self.paths.get(&path) {
            // Inputs are immutable here; a new input replaces the old one.
            let input = FileText::new(&self.db, id, content.to_string());
            if let Some(entry) = self.files.get_mut(&id) {
                entry.input = input;
            }
            return id;
        }
        let id = FileId::new(self.next_file);
        self.next_file += 1;
        let input = FileText::new(&self.db, id, content.to_string());
        self.files.insert(id, FileEntry { path: path.clone(), input });
        self.paths.insert(path, id);
        id
    }

    /// Remove a file. Returns whether it was present.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) -> bool {
        let Some(id) = self.paths.remove(path.as_ref()) else {
            return false;
        };
        self.invalidate();
        self.files.remove(&id);
        true
    }

    pub fn has_file(&self, path: impl AsRef<Path>) -> bool {
        self.paths.contains_key(path.as_ref())
    }

    pub fn get_file_id(&self, path: impl AsRef<Path>) -> Option<FileId> {
        self.paths.get(path.as_ref()).copied()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Cancel outstanding queries of analyses handed out so far.
    pub fn request_cancellation(&mut self) {
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
    }

    /// Take an immutable snapshot of the current state.
    pub fn analysis(&mut self) -> Analysis {
        let mut files = FxHashMap::default();
        let mut paths = FxHashMap::default();
        for (&id, entry) in &self.files {
            let parsed = parse_file(&self.db, entry.input).file;
            files.insert(
                id,
                FileData {
                    path: entry.path.clone(),
                    text: Arc::from(entry.input.text(&self.db).as_str()),
                    parsed,
                },
            );
            paths.insert(entry.path.clone(), id);
        }
        let (metadata, workspace) = build_metadata(&files, &self.modules);
        tracing::debug!(
            files = files.len(),
            packages = metadata.len(),
            "analysis snapshot"
        );
        Analysis {
            files: Arc::new(files),
            paths: Arc::new(paths),
            metadata: Arc::new(metadata),
            workspace: Arc::new(workspace),
            options: self.options.clone(),
            cancel: self.cancel.clone(),
            checked: RwLock::new(FxHashMap::default()),
        }
    }
}

/// An immutable snapshot of the workspace.
///
/// Checked packages are cached per snapshot, keyed by variant and mode.
pub struct Analysis {
    files: Arc<FxHashMap<FileId, FileData>>,
    paths: Arc<FxHashMap<PathBuf, FileId>>,
    metadata: Arc<IndexMap<PackageId, Arc<Metadata>>>,
    workspace: Arc<FxHashSet<PackageId>>,
    options: IdeOptions,
    cancel: CancellationToken,
    checked: RwLock<FxHashMap<(PackageId, CheckMode), Arc<Package>>>,
}

impl Analysis {
    pub fn options(&self) -> &IdeOptions {
        &self.options
    }

    pub fn file_text(&self, file: FileId) -> Option<Arc<str>> {
        self.files.get(&file).map(|f| f.text.clone())
    }

    pub fn goto_definition(&self, file: FileId, position: Position) -> IdeResult<GotoResult> {
        definition::goto_definition(self, file, position)
    }

    pub fn goto_type_definition(&self, file: FileId, position: Position) -> IdeResult<Vec<Location>> {
        definition::goto_type_definition(self, file, position)
    }

    pub fn references(&self, file: FileId, position: Position, include_declaration: bool) -> IdeResult<Vec<Location>> {
        references::references(self, file, position, include_declaration)
    }

    pub fn implementation(&self, file: FileId, position: Position) -> IdeResult<Vec<Location>> {
        implementation::implementation(self, &self.options.implementation, file, position)
    }

    pub fn prepare_type_hierarchy(&self, file: FileId, position: Position) -> IdeResult<Vec<TypeHierarchyItem>> {
        type_hierarchy::prepare_type_hierarchy(self, file, position)
    }

    pub fn supertypes(&self, item: &TypeHierarchyItem) -> IdeResult<Vec<TypeHierarchyItem>> {
        type_hierarchy::supertypes(self, &self.options.implementation, item)
    }

    pub fn subtypes(&self, item: &TypeHierarchyItem) -> IdeResult<Vec<TypeHierarchyItem>> {
        type_hierarchy::subtypes(self, &self.options.implementation, item)
    }

    pub fn prepare_call_hierarchy(&self, file: FileId, position: Position) -> IdeResult<Vec<CallHierarchyItem>> {
        call_hierarchy::prepare_call_hierarchy(self, file, position)
    }

    pub fn incoming_calls(&self, file: FileId, position: Position) -> IdeResult<Vec<IncomingCall>> {
        call_hierarchy::incoming_calls(self, file, position)
    }

    pub fn outgoing_calls(&self, file: FileId, position: Position) -> IdeResult<Vec<OutgoingCall>> {
        call_hierarchy::outgoing_calls(self, file, position)
    }

    /// Extractions available for a selection, for code-action discovery.
    pub fn extract_actions(&self, file: FileId, selection: Span) -> IdeResult<Vec<ExtractKind>> {
        extract::available(self, file, selection)
    }

    pub fn extract(&self, kind: ExtractKind, file: FileId, selection: Span) -> IdeResult<SourceChange> {
        extract::extract(self, &self.options.extract, kind, file, selection)
    }

    fn file(&self, file: FileId) -> Result<&FileData, SnapshotError> {
        self.files.get(&file).ok_or(SnapshotError::FileNotFound(file))
    }

    fn check(&self, id: &PackageId, mode: CheckMode, visiting: &mut Vec<PackageId>) -> Result<Arc<Package>, SnapshotError> {
        self.check_cancelled()?;
        if let Some(pkg) = self.checked.read().get(&(id.clone(), mode)) {
            return Ok(pkg.clone());
        }
        let meta = self
            .metadata
            .get(id)
            .cloned()
            .ok_or_else(|| SnapshotError::PackageNotFound(id.clone()))?;
        let files = meta
            .files
            .iter()
            .map(|f| Ok((*f, self.file(*f)?.parsed.clone())))
            .collect::<Result<Vec<_>, SnapshotError>>()?;

        visiting.push(id.clone());
        let importer = SnapshotImporter {
            analysis: self,
            meta: &meta,
            visiting: RwLock::new(std::mem::take(visiting)),
        };
        let pkg = Arc::new(check_package(meta.clone(), files, mode, &importer));
        *visiting = importer.visiting.into_inner();
        visiting.pop();
        // Imports that failed because of cancellation look like missing
        // packages to the checker; don't cache that result.
        self.check_cancelled()?;

        tracing::trace!(package = %id, ?mode, errors = pkg.errors().len(), "type checked");
        let mut checked = self.checked.write();
        Ok(checked.entry((id.clone(), mode)).or_insert(pkg).clone())
    }
}

/// Resolves imports of one package through the snapshot's metadata, checking
/// dependencies in header mode.
struct SnapshotImporter<'a> {
    analysis: &'a Analysis,
    meta: &'a Metadata,
    visiting: RwLock<Vec<PackageId>>,
}

impl Importer for SnapshotImporter<'_> {
    fn import(&self, path: &str) -> Option<Arc<Package>> {
        let id = self.meta.imports.get(path)?;
        let mut visiting = self.visiting.write();
        if visiting.contains(id) {
            tracing::warn!(package = %self.meta.id, import = path, "import cycle");
            return None;
        }
        self.analysis.check(id, CheckMode::Headers, &mut visiting).ok()
    }
}

impl Snapshot for Analysis {
    fn metadata(&self, id: &PackageId) -> Option<Arc<Metadata>> {
        self.metadata.get(id).cloned()
    }

    fn all_metadata(&self) -> Vec<Arc<Metadata>> {
        self.metadata.values().cloned().collect()
    }

    fn workspace_metadata(&self) -> Vec<Arc<Metadata>> {
        self.metadata
            .values()
            .filter(|m| self.workspace.contains(&m.id))
            .cloned()
            .collect()
    }

    fn metadata_for_file(&self, file: FileId) -> Vec<Arc<Metadata>> {
        // Insertion order already puts the plain variant first.
        self.metadata
            .values()
            .filter(|m| m.files.contains(&file))
            .cloned()
            .collect()
    }

    fn reverse_dependencies(&self, id: &PackageId, transitive: bool) -> Vec<Arc<Metadata>> {
        let mut seen: FxHashSet<PackageId> = FxHashSet::default();
        let mut frontier = vec![id.clone()];
        let mut out = Vec::new();
        while let Some(target) = frontier.pop() {
            for meta in self.metadata.values() {
                if meta.imports.values().any(|dep| *dep == target) && seen.insert(meta.id.clone()) {
                    out.push(meta.clone());
                    if transitive {
                        frontier.push(meta.id.clone());
                    }
                }
            }
        }
        out
    }

    fn type_check(&self, ids: &[PackageId], mode: CheckMode) -> Result<Vec<Arc<Package>>, SnapshotError> {
        ids.iter()
            .map(|id| self.check(id, mode, &mut Vec::new()))
            .collect()
    }

    fn read_file(&self, file: FileId) -> Result<Arc<str>, SnapshotError> {
        self.check_cancelled()?;
        Ok(self.file(file)?.text.clone())
    }

    fn file_path(&self, file: FileId) -> Option<PathBuf> {
        self.files.get(&file).map(|f| f.path.clone())
    }

    fn file_for_path(&self, path: &Path) -> Option<FileId> {
        self.paths.get(path).copied()
    }

    fn parsed_file(&self, file: FileId) -> Result<Arc<File>, SnapshotError> {
        Ok(self.file(file)?.parsed.clone())
    }

    fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// The import path of the package in `dir`.
fn import_path(dir: &Path, modules: &[ModuleRoot]) -> (SmolStr, bool) {
    let module = modules
        .iter()
        .filter(|m| dir.starts_with(&m.dir))
        .max_by_key(|m| m.dir.components().count());
    match module {
        Some(m) => {
            let rel = dir.strip_prefix(&m.dir).unwrap_or(dir);
            let rel: Vec<String> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            let path = if rel.is_empty() {
                m.path.clone()
            } else {
                SmolStr::new(format!("{}/{}", m.path, rel.join("/")))
            };
            (path, m.workspace)
        }
        // Outside every module: the directory names the package. Such
        // files were opened by the user, so they count as workspace.
        None => (
            SmolStr::new(dir.to_string_lossy().trim_start_matches('/')),
            true,
        ),
    }
}

type DirEntry<'a> = (&'a Path, FileId, &'a File);

fn is_test_file(path: &Path) -> bool {
    path.to_string_lossy().ends_with("_test.go")
}

fn imports_of(list: &[&DirEntry<'_>]) -> Vec<String> {
    let mut out: Vec<String> = list
        .iter()
        .flat_map(|e| e.2.imports.iter().filter_map(|spec| e.2.import_path(*spec)))
        .collect();
    out.sort();
    out.dedup();
    out
}

struct Variant {
    meta: Metadata,
    import_paths: Vec<String>,
    external: bool,
}

impl Variant {
    fn new(id: PackageId, path: SmolStr, name: &str, dir: &Path, list: &[&DirEntry<'_>], for_test: Option<SmolStr>, external: bool) -> Self {
        Self {
            meta: Metadata {
                id,
                path,
                name: SmolStr::new(name),
                dir: dir.to_path_buf(),
                files: list.iter().map(|e| e.1).collect(),
                imports: IndexMap::new(),
                for_test,
            },
            import_paths: imports_of(list),
            external,
        }
    }
}

/// Group files into package variants by directory.
///
/// A directory yields the package itself, its test variant when it has
/// in-package test files, and the external test package when it has
/// `_test` package files.
fn build_metadata(
    files: &FxHashMap<FileId, FileData>,
    modules: &[ModuleRoot],
) -> (IndexMap<PackageId, Arc<Metadata>>, FxHashSet<PackageId>) {
    let mut dirs: IndexMap<PathBuf, Vec<DirEntry<'_>>> = IndexMap::new();
    let mut sorted: Vec<_> = files.iter().collect();
    sorted.sort_by(|a, b| a.1.path.cmp(&b.1.path));
    for (&id, data) in sorted {
        let dir = data.path.parent().map(Path::to_path_buf).unwrap_or_default();
        dirs.entry(dir).or_default().push((&data.path, id, &data.parsed));
    }

    let mut variants: Vec<Variant> = Vec::new();
    let mut by_path: FxHashMap<SmolStr, PackageId> = FxHashMap::default();
    let mut test_by_path: FxHashMap<SmolStr, PackageId> = FxHashMap::default();
    let mut workspace = FxHashSet::default();

    for (dir, entries) in &dirs {
        let (path, in_workspace) = import_path(dir, modules);
        let plain: Vec<&DirEntry<'_>> = entries.iter().filter(|e| !is_test_file(e.0)).collect();
        let base_name = plain
            .first()
            .map(|e| e.2.package_name())
            .or_else(|| entries.iter().map(|e| e.2.package_name()).find(|n| !n.ends_with("_test")))
            .map(str::to_string)
            .unwrap_or_else(|| path.rsplit('/').next().unwrap_or_default().to_string());
        let (internal, external): (Vec<&DirEntry<'_>>, Vec<&DirEntry<'_>>) = entries
            .iter()
            .filter(|e| is_test_file(e.0))
            .partition(|e| e.2.package_name() == base_name);

        let first = variants.len();
        if !plain.is_empty() {
            let id = PackageId::new(path.clone());
            by_path.insert(path.clone(), id.clone());
            variants.push(Variant::new(id, path.clone(), &base_name, dir, &plain, None, false));
        }
        if !internal.is_empty() {
            let mut list = plain.clone();
            list.extend(internal.iter().copied());
            let id = PackageId::test_variant(&path);
            test_by_path.insert(path.clone(), id.clone());
            by_path.entry(path.clone()).or_insert_with(|| id.clone());
            variants.push(Variant::new(id, path.clone(), &base_name, dir, &list, Some(path.clone()), false));
        }
        if let Some(first_external) = external.first() {
            let name = first_external.2.package_name().to_string();
            variants.push(Variant::new(
                PackageId::external_test(&path),
                SmolStr::new(format!("{path}_test")),
                &name,
                dir,
                &external,
                Some(path.clone()),
                true,
            ));
        }
        if in_workspace {
            workspace.extend(variants[first..].iter().map(|v| v.meta.id.clone()));
        }
    }

    let mut out = IndexMap::new();
    for mut variant in variants {
        for import in &variant.import_paths {
            let key = SmolStr::new(import);
            // The external test package sees the package under test with
            // its test files.
            let target = match &variant.meta.for_test {
                Some(under_test) if variant.external && *under_test == key => {
                    test_by_path.get(&key).or(by_path.get(&key))
                }
                _ => by_path.get(&key),
            };
            if let Some(target) = target
                && *target != variant.meta.id
            {
                variant.meta.imports.insert(key, target.clone());
            }
        }
        out.insert(variant.meta.id.clone(), Arc::new(variant.meta));
    }
    (out, workspace)
}
