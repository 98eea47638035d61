use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use crate::base::FileId;
use crate::ide::AnalysisHost;

use super::go_mod;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("directory not found: {0}")]
    NotADirectory(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load {} file(s):\n  {}", .0.len(), .0.join("\n  "))]
    Files(Vec<String>),
}

/// What a directory load registered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Module roots found, as `(directory, module path)`.
    pub modules: Vec<(PathBuf, String)>,
    pub files: Vec<FileId>,
}

/// Loads Go modules from disk into an [`AnalysisHost`].
#[derive(Debug, Clone)]
pub struct WorkspaceLoader {
    /// Whether loaded modules count as workspace (opened by the user) or as
    /// dependencies.
    workspace: bool,
}

impl WorkspaceLoader {
    pub fn new() -> Self {
        Self { workspace: true }
    }

    /// A loader for dependency modules: their packages are searched for
    /// implementations but are not part of the workspace.
    pub fn dependencies() -> Self {
        Self { workspace: false }
    }

    /// Load every `.go` file below `path`.
    ///
    /// Each `go.mod` found on the way becomes a module root. When `path`
    /// itself has none, the nearest `go.mod` above it is used.
    pub fn load_directory_into_host(&self, path: impl AsRef<Path>, host: &mut AnalysisHost) -> Result<LoadSummary, LoadError> {
        let root = path.as_ref();
        if !root.is_dir() {
            return Err(LoadError::NotADirectory(root.to_path_buf()));
        }
        let mut summary = LoadSummary::default();
        if !root.join("go.mod").is_file()
            && let Some((dir, module)) = enclosing_module(root)?
        {
            host.add_module(dir.clone(), module.as_str(), self.workspace);
            summary.modules.push((dir, module));
        }

        let mut errors = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_ignored(e));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    errors.push(e.to_string());
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let file_path = entry.path();
            match file_path.file_name().and_then(|n| n.to_str()) {
                Some("go.mod") => match read(file_path).map(|text| go_mod::module_path(&text)) {
                    Ok(Some(module)) => {
                        let dir = file_path.parent().unwrap_or(root).to_path_buf();
                        tracing::debug!(dir = %dir.display(), %module, "module root");
                        host.add_module(dir.clone(), module.as_str(), self.workspace);
                        summary.modules.push((dir, module));
                    }
                    Ok(None) => tracing::warn!(path = %file_path.display(), "go.mod without a module directive"),
                    Err(e) => errors.push(e.to_string()),
                },
                Some(name) if name.ends_with(".go") => match read(file_path) {
                    Ok(text) => summary.files.push(host.set_file_content(file_path, &text)),
                    Err(e) => errors.push(e.to_string()),
                },
                _ => {}
            }
        }

        tracing::debug!(
            root = %root.display(),
            modules = summary.modules.len(),
            files = summary.files.len(),
            "loaded directory"
        );
        if errors.is_empty() {
            Ok(summary)
        } else {
            Err(LoadError::Files(errors))
        }
    }

    /// Load a single file.
    pub fn load_file_into_host(&self, path: impl AsRef<Path>, host: &mut AnalysisHost) -> Result<FileId, LoadError> {
        let path = path.as_ref();
        let text = read(path)?;
        Ok(host.set_file_content(path, &text))
    }
}

impl Default for WorkspaceLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Directories the go command ignores: hidden ones, `_`-prefixed ones and
/// `testdata`.
fn is_ignored(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name.starts_with('_') || name == "testdata"
}

/// The nearest `go.mod` in `dir` or above it.
fn enclosing_module(dir: &Path) -> Result<Option<(PathBuf, String)>, LoadError> {
    for ancestor in dir.ancestors() {
        let candidate = ancestor.join("go.mod");
        if candidate.is_file() {
            let module = go_mod::module_path(&read(&candidate)?);
            return Ok(module.map(|m| (ancestor.to_path_buf(), m)));
        }
    }
    Ok(None)
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}
