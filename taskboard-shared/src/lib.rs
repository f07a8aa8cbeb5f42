//! # Taskboard Shared Library
//!
//! This crate contains the domain types, persistence plumbing, and the task
//! reordering core used by the Taskboard API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their CRUD operations
//! - `auth`: Authentication (JWT, passwords) and the ownership guard
//! - `db`: Connection pooling and migrations
//! - `store`: Persistence port consumed by the reorder core, with PostgreSQL
//!   and in-memory adapters
//! - `reorder`: Position normalizer and the reorder transaction coordinator

pub mod auth;
pub mod db;
pub mod models;
pub mod reorder;
pub mod store;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
