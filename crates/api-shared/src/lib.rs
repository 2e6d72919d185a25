//! # API Shared
//!
//! Shared definitions for the IPS suite APIs.
//!
//! Contains:
//! - Request and response bodies with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//!
//! Used by `api-rest`. Nothing here depends on the engine: conversions from engine types live in
//! the API crates.

pub mod dto;
pub mod health;

pub use dto::{ErrorRes, HealthRes, RunReq, RunRes, StatusTotalsRes, SuiteRes};
pub use health::HealthService;
