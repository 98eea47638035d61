//! IDE features: high-level navigation APIs for LSP handlers.
//!
//! This module sits between the semantic model (HIR) and a language
//! server. Each public function corresponds to one request.
//!
//! ## Design Principles
//!
//! 1. **Snapshot in, data out**: every feature takes a `&dyn Snapshot` and
//!    returns plain values; nothing here mutates workspace state
//! 2. **No LSP types**: positions are zero-based lines and byte columns,
//!    converted at the protocol boundary
//! 3. **Soft failures**: a position that names nothing yields an empty
//!    result, not an error
//!
//! ## Usage
//!
//! The recommended way to use this module is through `AnalysisHost`:
//!
//! ```ignore
//! use gonav::ide::AnalysisHost;
//!
//! let mut host = AnalysisHost::new();
//! host.add_module("/ws", "example.com/m", true);
//! let file = host.set_file_content("/ws/a/a.go", "package a\n\ntype T struct{}\n");
//!
//! let analysis = host.analysis();
//! let impls = analysis.implementation(file, Position::new(2, 5))?;
//! ```

mod analysis;
mod call_hierarchy;
mod definition;
mod error;
pub mod extract;
mod implementation;
mod location;
pub mod methodsets;
mod options;
mod references;
pub mod resolve;
mod type_hierarchy;
pub mod unify;

pub use analysis::{Analysis, AnalysisHost, ModuleRoot};
pub use call_hierarchy::{
    CallHierarchyItem, CallKind, IncomingCall, OutgoingCall, incoming_calls, outgoing_calls,
    prepare_call_hierarchy,
};
pub use definition::{GotoResult, goto_definition, goto_type_definition};
pub use error::{IdeError, IdeResult, bug_reports};
pub use extract::{ExtractKind, FileChange, SourceChange, TextEdit, apply_edits};
pub use implementation::implementation;
pub use location::Location;
pub use options::{ExtractOptions, IdeOptions, ImplementationOptions};
pub use references::references;
pub use type_hierarchy::{TypeHierarchyItem, TypeKind, prepare_type_hierarchy, subtypes, supertypes};
