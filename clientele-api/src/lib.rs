//! Clientele API - REST Layer
//!
//! Customer CRUD over Axum. Postgres is the record of truth; a Dapr sidecar
//! provides the read-through cache and the change-event bus, and both are
//! treated as best-effort after every commit.

pub mod config;
pub mod db;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod sidecar;
pub mod startup;
pub mod telemetry;

// Re-export commonly used types
pub use config::{ApiConfig, AppConfig, SidecarConfig, StartupConfig, DEFAULT_API_PREFIX};
pub use db::{DbConfig, PgRecordStore, CUSTOMERS_SCHEMA};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use openapi::ApiDoc;
pub use routes::{build_cors_layer, create_api_router};
pub use services::{CustomerService, DEFAULT_PAGE_LIMIT};
pub use sidecar::DaprSidecar;
pub use startup::wait_for_store;
