//! # Saúde Core
//!
//! Core business logic for the Saúde patient/doctor vitals backend.
//!
//! This crate contains the data-access services and everything they need:
//! - Ports to the external collaborators (`DocumentStore`, `AuthProvider`)
//! - Adapters: in-memory and sharded-filesystem document stores, store-backed auth
//! - Accounts, doctor/patient linking, vital records and recommendations
//! - Per-screen view-models built on an explicit state machine
//!
//! **No API concerns**: HTTP servers and command line parsing belong in `api-rest` and
//! `saude-cli`. Configuration is resolved by the binaries and passed in as [`CoreConfig`].

pub mod adapters;
pub mod backend;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod ports;
pub mod repositories;
pub mod screens;
pub mod settings;

pub use backend::Backend;
pub use config::{CoreConfig, StoreKind};
pub use error::{ServiceError, ServiceResult};
pub use models::{Doctor, NewVital, Patient, Profile, Recommendation, Role, Vital};
pub use ports::Session;
pub use settings::{Settings, Theme};

pub use saude_types::{EmailAddress, NonEmptyText, TextError};
pub use saude_uuid::RecordId;
