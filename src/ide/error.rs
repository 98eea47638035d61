//! Errors returned by navigation queries.

use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

use crate::hir::SnapshotError;

pub type IdeResult<T> = Result<T, IdeError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdeError {
    /// The position is not on an identifier (whitespace, a keyword, ...).
    #[error("no identifier found")]
    NoIdentifier,
    /// The identifier denotes nothing the checker knows about.
    #[error("no object found")]
    NoObject,
    #[error("operation cancelled")]
    Cancelled,
    #[error("invalid range: {0}")]
    InvalidRange(String),
    #[error("{0}")]
    Unsupported(String),
    #[error("cannot extract: {0}")]
    Extract(String),
    /// A "can't happen" condition. See [`bug`].
    #[error("internal error: {0}")]
    Bug(String),
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("package not found: {0}")]
    PackageNotFound(String),
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<IdeError>,
    },
}

impl IdeError {
    /// Whether the error only means "nothing here": callers return an
    /// empty result instead of surfacing it.
    pub fn is_soft_empty(&self) -> bool {
        match self {
            IdeError::NoIdentifier | IdeError::NoObject => true,
            IdeError::Context { source, .. } => source.is_soft_empty(),
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            IdeError::Cancelled => true,
            IdeError::Context { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Wrap with what the caller was doing. Cancellation passes through as is.
    pub fn context(self, context: impl Into<String>) -> Self {
        if matches!(self, IdeError::Cancelled) {
            return self;
        }
        IdeError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<SnapshotError> for IdeError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::Cancelled => IdeError::Cancelled,
            SnapshotError::FileNotFound(file) => IdeError::FileNotFound(file.to_string()),
            SnapshotError::PackageNotFound(id) => IdeError::PackageNotFound(id.to_string()),
            SnapshotError::Io { path, message } => {
                IdeError::FileNotFound(format!("{}: {message}", path.display()))
            }
        }
    }
}

pub(crate) trait ResultExt<T> {
    fn context(self, context: &str) -> IdeResult<T>;
}

impl<T, E: Into<IdeError>> ResultExt<T> for Result<T, E> {
    fn context(self, context: &str) -> IdeResult<T> {
        self.map_err(|e| e.into().context(context))
    }
}

/// Turn a soft-empty failure into `Ok(default)`.
pub(crate) fn soft<T: Default>(result: IdeResult<T>) -> IdeResult<T> {
    match result {
        Err(e) if e.is_soft_empty() => Ok(T::default()),
        other => other,
    }
}

static BUG_REPORTS: AtomicUsize = AtomicUsize::new(0);

/// Report a broken internal invariant and degrade to an error.
pub(crate) fn bug(message: impl Into<String>) -> IdeError {
    let message = message.into();
    BUG_REPORTS.fetch_add(1, Ordering::Relaxed);
    tracing::error!(%message, "internal invariant violated");
    IdeError::Bug(message)
}

/// Number of bug reports since process start.
pub fn bug_reports() -> usize {
    BUG_REPORTS.load(Ordering::Relaxed)
}
