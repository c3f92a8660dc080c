//! Error types for Clientele operations

use crate::CustomerId;
use thiserror::Error;

/// Record store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Customer not found: {id}")]
    NotFound { id: CustomerId },

    #[error("Constraint conflict: {reason}")]
    Conflict { reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Record store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Errors raised by the cache and pub/sub sidecar.
///
/// These never abort a request. Call sites log and count them, then move on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SidecarError {
    #[error("Cache {operation} failed for key {key}: {reason}")]
    CacheFailed {
        operation: String,
        key: String,
        reason: String,
    },

    #[error("Publish to topic {topic} failed: {reason}")]
    PublishFailed { topic: String, reason: String },

    #[error("Codec error: {reason}")]
    Codec { reason: String },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Clientele errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClienteleError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Sidecar error: {0}")]
    Sidecar(#[from] SidecarError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for Clientele operations.
pub type ClienteleResult<T> = Result<T, ClienteleError>;

/// Result type for sidecar calls.
pub type SidecarResult<T> = Result<T, SidecarError>;

// =============================================================================
// TESTS
// =============================================================================
