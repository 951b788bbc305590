//! Boundaries to the external collaborators.
//!
//! The services only ever talk to an auth provider and a document store through these traits.
//! Concrete implementations live in [`crate::adapters`].

pub mod auth;
pub mod store;

pub use auth::{AuthError, AuthProvider, AuthResult, Session};
pub use store::{
    Collection, Direction, Document, DocumentStore, Fields, Query, StoreError, StoreResult,
};
