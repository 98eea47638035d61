//! # gonav-base
//!
//! Core library for semantic navigation of Go source: object resolution,
//! implementations, call hierarchy and extract refactorings.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! project   → Workspace loading from disk
//!   ↓
//! ide       → Navigation features (definition, implementation, calls, extract)
//!   ↓
//! hir       → Semantic model: objects, types, scopes, type checking
//!   ↓
//! parser    → Logos lexer, recursive-descent parser, arena AST
//!   ↓
//! base      → Primitives (FileId, TextRange, LineIndex)
//! ```

// ============================================================================
// MODULES (dependency order: base → parser → hir → ide → project)
// ============================================================================

/// Foundation types: FileId, TextRange, line/column conversion
pub mod base;

/// Parser: Logos lexer, recursive-descent parser, arena AST
pub mod parser;

/// High-level IR: objects, types, scopes and the package checker
pub mod hir;

/// IDE features: definition, references, implementation, call hierarchy, extract
pub mod ide;

/// Project management: workspace loading
pub mod project;

// Re-export foundation types
pub use base::{FileId, LineCol, LineIndex, Position, Span, TextRange, TextSize};
