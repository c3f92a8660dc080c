//! Async record store trait for the authoritative customer table.
//!
//! Every mutating operation runs inside one local transaction that either
//! commits or leaves the table exactly as it was.

use async_trait::async_trait;
use clientele_core::{ClienteleResult, Customer, CustomerFields, CustomerId};

/// Durable CRUD over the customer table.
///
/// Implementations must surface a failed commit as
/// `StorageError::TransactionFailed` and a uniqueness/check violation as
/// `StorageError::Conflict`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new customer; the store assigns `id` and `created_at`.
    async fn insert(&self, fields: &CustomerFields) -> ClienteleResult<Customer>;

    /// Get a customer by ID.
    async fn get_by_id(&self, id: CustomerId) -> ClienteleResult<Option<Customer>>;

    /// List customers ordered by ascending id, skipping `offset` rows and
    /// returning at most `limit`.
    async fn list(&self, offset: i64, limit: i64) -> ClienteleResult<Vec<Customer>>;

    /// Replace the mutable fields of an existing customer and stamp
    /// `updated_at`.
    ///
    /// Returns `StorageError::NotFound` if the row does not exist.
    async fn update(&self, id: CustomerId, fields: &CustomerFields) -> ClienteleResult<Customer>;

    /// Delete a customer by ID.
    ///
    /// Returns `StorageError::NotFound` if the row does not exist.
    async fn delete_by_id(&self, id: CustomerId) -> ClienteleResult<()>;

    /// Round-trip to the backing store.
    async fn ping(&self) -> ClienteleResult<()>;
}
