//! # TaskFlow Shared Library
//!
//! This crate contains the types, credential utilities, and storage layer used
//! by the TaskFlow API server and the mail worker.
//!
//! ## Module Organization
//!
//! - `auth`: Password hashing, tokens, verification codes, and the request gate
//! - `db`: SQLite connection pool and embedded migrations
//! - `models`: User and task stores

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the TaskFlow shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
