//! HIR tests
//!
//! Tests for:
//! - Field and method lookup through embedding
//! - Method sets and interface satisfaction
//! - Lexical scopes and declaration order
//! - Types of package-level declarations

pub mod tests_lookup;
pub mod tests_scopes;
pub mod tests_types;
