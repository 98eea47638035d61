//! Loading Go modules from disk.

pub mod go_mod;
pub mod workspace_loader;

pub use workspace_loader::{LoadError, LoadSummary, WorkspaceLoader};
