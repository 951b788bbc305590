//! Concrete implementations of the ports.
//!
//! - [`memory::MemoryStore`]: process-local document store
//! - [`files::FileStore`]: JSON documents in a sharded directory tree
//! - [`auth::StoreAuthProvider`]: email/password auth persisted in any document store

pub mod auth;
pub mod files;
pub mod memory;

pub use auth::StoreAuthProvider;
pub use files::FileStore;
pub use memory::MemoryStore;
