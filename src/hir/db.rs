//! Incremental parse cache.
//!
//! File text lives in salsa inputs; parsing is a tracked query so an
//! unchanged file keeps its AST across edits to its neighbours.

use std::sync::Arc;

use crate::base::FileId;
use crate::parser::{self, File};

/// Text of one Go source file, owned by the database.
#[salsa::input]
pub struct FileText {
    pub file: FileId,
    #[return_ref]
    pub text: String,
}

#[salsa::db]
#[derive(Default, Clone)]
pub struct RootDatabase {
    storage: salsa::Storage<Self>,
}

#[salsa::db]
impl salsa::Database for RootDatabase {
    fn salsa_event(&self, _event: &dyn Fn() -> salsa::Event) {}
}

impl RootDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The cached AST of a file. Syntax errors travel inside the [`File`].
#[derive(Clone, Debug)]
pub struct ParseResult {
    pub file: Arc<File>,
}

// Equality by identity: a re-parse always produces a new AST.
impl PartialEq for ParseResult {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.file, &other.file)
    }
}

impl Eq for ParseResult {}

impl ParseResult {
    pub fn syntax_error_count(&self) -> usize {
        self.file.errors.len()
    }
}

#[salsa::tracked]
pub fn parse_file(db: &dyn salsa::Database, input: FileText) -> ParseResult {
    let file = parser::parse(input.text(db));
    if !file.errors.is_empty() {
        tracing::debug!(
            file = %input.file(db),
            errors = file.errors.len(),
            "parsed with syntax errors"
        );
    }
    ParseResult { file: Arc::new(file) }
}
