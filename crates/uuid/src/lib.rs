//! Record identifiers and sharded-path utilities.
//!
//! Every document in the Saúde stores (accounts, vitals, recommendations, sessions) is keyed by
//! a storage-generated identifier. Identifiers use a *canonical* UUID representation:
//! **32 lowercase hexadecimal characters** (no hyphens).
//!
//! This crate provides:
//! - [`RecordId`], a wrapper type that *guarantees* the canonical format once constructed.
//! - Shared sharding logic so the filesystem store can derive a document's directory from its
//!   identifier.
//!
//! ## Canonical form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Externally supplied identifiers (REST paths, CLI arguments, sharing codes) must already be
//! canonical. Use [`RecordId::parse`] to validate them.
//!
//! ## Sharded directory layout
//! For a canonical id `u`, documents live under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `saude_data/vitals/55/0e/550e8400e29b41d4a716446655440000/`

mod service;

pub use service::{RecordId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
