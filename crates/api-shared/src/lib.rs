//! # API Shared
//!
//! Shared utilities and definitions for the Saúde APIs.
//!
//! Contains:
//! - Request/response DTOs with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//! - Bearer token parsing for the REST API

pub mod auth;
pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
