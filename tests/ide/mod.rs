//! IDE feature tests
//!
//! Tests for:
//! - Go to definition and type definition
//! - Find references across packages
//! - Implementation search
//! - Call and type hierarchy
//! - Extract refactorings
//! - Unification of checked types
//! - Workspaces loaded from disk

pub mod tests_call_hierarchy;
pub mod tests_definition;
pub mod tests_extract;
pub mod tests_implementation;
pub mod tests_loaded_workspace;
pub mod tests_references;
pub mod tests_type_hierarchy;
pub mod tests_unify;
