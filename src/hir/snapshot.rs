//! The view of the workspace that navigation queries run against.
//!
//! A [`Snapshot`] is an immutable picture of the workspace: file contents,
//! package metadata and the ability to type check packages in either mode.
//! Every IDE feature is a function of a snapshot plus a file position.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::base::{FileId, LineIndex};
use crate::parser::File;

use super::check::CheckMode;
use super::package::{Metadata, Package, PackageId};
use super::universe;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("operation cancelled")]
    Cancelled,
    #[error("no such file: {0}")]
    FileNotFound(FileId),
    #[error("no such package: {0}")]
    PackageNotFound(PackageId),
    #[error("reading {path}: {message}")]
    Io { path: PathBuf, message: String },
}

pub trait Snapshot: Sync {
    fn metadata(&self, id: &PackageId) -> Option<Arc<Metadata>>;

    /// Every known package variant, workspace and dependencies alike.
    fn all_metadata(&self) -> Vec<Arc<Metadata>>;

    /// Package variants whose files belong to the workspace.
    fn workspace_metadata(&self) -> Vec<Arc<Metadata>>;

    /// Variants containing `file`, narrowest (non-test) first.
    fn metadata_for_file(&self, file: FileId) -> Vec<Arc<Metadata>>;

    /// Packages importing `id`, directly or (if `transitive`) indirectly.
    fn reverse_dependencies(&self, id: &PackageId, transitive: bool) -> Vec<Arc<Metadata>>;

    /// Type check the given variants, in order.
    fn type_check(&self, ids: &[PackageId], mode: CheckMode) -> Result<Vec<Arc<Package>>, SnapshotError>;

    fn read_file(&self, file: FileId) -> Result<Arc<str>, SnapshotError>;

    fn file_path(&self, file: FileId) -> Option<PathBuf>;

    fn file_for_path(&self, path: &Path) -> Option<FileId>;

    fn parsed_file(&self, file: FileId) -> Result<Arc<File>, SnapshotError>;

    fn cancel_token(&self) -> &CancellationToken;

    fn check_cancelled(&self) -> Result<(), SnapshotError> {
        if self.cancel_token().is_cancelled() {
            return Err(SnapshotError::Cancelled);
        }
        Ok(())
    }

    /// Line index of `file`, including the synthetic declaration files.
    fn line_index(&self, file: FileId) -> Result<LineIndex, SnapshotError> {
        if let Some(synthetic) = universe::synthetic_file(file) {
            return Ok(LineIndex::new(synthetic.text.clone()));
        }
        Ok(LineIndex::new(self.read_file(file)?))
    }

    /// Parsed syntax of `file`, including the synthetic declaration files.
    fn syntax(&self, file: FileId) -> Result<Arc<File>, SnapshotError> {
        match universe::synthetic_file(file) {
            Some(synthetic) => Ok(synthetic),
            None => self.parsed_file(file),
        }
    }

    /// Display path of `file`.
    fn display_path(&self, file: FileId) -> PathBuf {
        if let Some(path) = universe::synthetic_path(file) {
            return PathBuf::from(path);
        }
        self.file_path(file)
            .unwrap_or_else(|| PathBuf::from(file.to_string()))
    }

    /// The narrowest variant containing `file`, fully checked.
    fn narrowest_package(&self, file: FileId) -> Result<Arc<Package>, SnapshotError> {
        let meta = self
            .metadata_for_file(file)
            .into_iter()
            .next()
            .ok_or(SnapshotError::FileNotFound(file))?;
        self.type_check(std::slice::from_ref(&meta.id), CheckMode::Full)?
            .into_iter()
            .next()
            .ok_or_else(|| SnapshotError::PackageNotFound(meta.id.clone()))
    }
}
