//! Shared fixtures and workspace builders for the integration tests.

pub mod fixtures;
pub mod workspace;
