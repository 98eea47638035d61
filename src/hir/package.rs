//! Packages: metadata (identity, files, import graph) and type-checked results.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;
use text_size::TextRange;

use crate::base::FileId;
use crate::parser::File;

use super::check::{CheckMode, TypeInfo};
use super::objects::{ObjRef, PkgRef};
use super::scope::{ScopeId, ScopeTree};
use super::types::{Named, TypeParam};

/// Stable identity of a package variant.
///
/// Test variants carry a bracketed suffix: `p [p.test]` is package `p`
/// compiled with its in-package tests, `p_test [p.test]` the external test
/// package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(SmolStr);

impl PackageId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Id of the test variant of the package at `path`.
    pub fn test_variant(path: &str) -> Self {
        Self(SmolStr::new(format!("{path} [{path}.test]")))
    }

    /// Id of the external test package for the package at `path`.
    pub fn external_test(path: &str) -> Self {
        Self(SmolStr::new(format!("{path}_test [{path}.test]")))
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What is known about a package before type checking it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub id: PackageId,
    pub path: SmolStr,
    pub name: SmolStr,
    pub dir: PathBuf,
    pub files: Vec<FileId>,
    /// Import path to the variant that satisfies it.
    pub imports: IndexMap<SmolStr, PackageId>,
    /// For test variants, the path of the package under test.
    pub for_test: Option<SmolStr>,
}

impl Metadata {
    pub fn is_test_variant(&self) -> bool {
        self.for_test.is_some()
    }
}

/// A type error. The checker keeps going after reporting one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeError {
    pub file: FileId,
    pub range: TextRange,
    pub message: String,
}

/// One file of a checked package.
#[derive(Debug)]
pub struct CheckedFile {
    pub file_id: FileId,
    pub file: Arc<File>,
    pub info: TypeInfo,
}

/// Everything the checker allocated with interior mutability.
///
/// Named types reference their methods, whose signatures reference the
/// named type again; dropping a package clears these slots so the cycles
/// don't leak.
#[derive(Debug, Default)]
pub(crate) struct Arena {
    pub objects: Vec<ObjRef>,
    pub named: Vec<Arc<Named>>,
    pub type_params: Vec<Arc<TypeParam>>,
}

/// A type-checked package variant.
#[derive(Debug)]
pub struct Package {
    metadata: Arc<Metadata>,
    pkg: Arc<PkgRef>,
    mode: CheckMode,
    files: Vec<CheckedFile>,
    scopes: ScopeTree,
    errors: Vec<TypeError>,
    imports: Vec<Arc<Package>>,
    arena: Arena,
}

impl Package {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        metadata: Arc<Metadata>,
        pkg: Arc<PkgRef>,
        mode: CheckMode,
        files: Vec<CheckedFile>,
        scopes: ScopeTree,
        errors: Vec<TypeError>,
        imports: Vec<Arc<Package>>,
        arena: Arena,
    ) -> Self {
        Self {
            metadata,
            pkg,
            mode,
            files,
            scopes,
            errors,
            imports,
            arena,
        }
    }

    pub fn metadata(&self) -> &Arc<Metadata> {
        &self.metadata
    }

    pub fn id(&self) -> &PackageId {
        &self.metadata.id
    }

    pub fn path(&self) -> &str {
        &self.pkg.path
    }

    pub fn name(&self) -> &str {
        &self.pkg.name
    }

    pub fn pkg_ref(&self) -> &Arc<PkgRef> {
        &self.pkg
    }

    pub fn mode(&self) -> CheckMode {
        self.mode
    }

    pub fn files(&self) -> &[CheckedFile] {
        &self.files
    }

    pub fn file(&self, file: FileId) -> Option<&CheckedFile> {
        self.files.iter().find(|f| f.file_id == file)
    }

    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    pub fn errors(&self) -> &[TypeError] {
        &self.errors
    }

    /// Directly imported packages, excluding `unsafe`.
    pub fn imports(&self) -> &[Arc<Package>] {
        &self.imports
    }

    /// A package-level object by name.
    pub fn lookup(&self, name: &str) -> Option<ObjRef> {
        self.scopes.lookup(ScopeId::PACKAGE, name).cloned()
    }

    /// Package-level objects in declaration order.
    pub fn members(&self) -> impl Iterator<Item = &ObjRef> {
        self.scopes.scope(ScopeId::PACKAGE).objects()
    }

    /// Every named type declared in the package, including local ones.
    pub fn named_types(&self) -> &[Arc<Named>] {
        &self.arena.named
    }
}

impl Drop for Package {
    fn drop(&mut self) {
        for named in &self.arena.named {
            named.clear();
        }
        for tp in &self.arena.type_params {
            tp.clear();
        }
        for obj in &self.arena.objects {
            obj.clear_ty();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_ids() {
        assert_eq!(PackageId::test_variant("a/b").as_str(), "a/b [a/b.test]");
        assert_eq!(PackageId::external_test("a/b").as_str(), "a/b_test [a/b.test]");
    }
}
