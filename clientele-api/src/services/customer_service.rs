//! Customer Service
//!
//! Orchestrates every customer operation across the record store, the side
//! cache and the event publisher. The record store is always written first
//! and is the only dependency whose failure fails the request; cache and
//! publish calls after a commit are best-effort.
//!
//! | Operation | Store                  | Cache                 | Event            |
//! |-----------|------------------------|-----------------------|------------------|
//! | create    | insert                 | set                   | customer-created |
//! | read      | get on cache miss      | get, set on miss      |                  |
//! | update    | get, update            | set                   | customer-updated |
//! | delete    | get, delete            | delete                | customer-deleted |
//! | list      | list                   |                       |                  |

use std::sync::Arc;

use clientele_core::{customer_key, Customer, CustomerFields, CustomerId, SidecarError};
use clientele_events::{publish_event, CustomerEvent, EventPublisher};
use clientele_storage::cache::{read_entity, write_entity};
use clientele_storage::{RecordStore, StateStore};

use crate::error::{ApiError, ApiResult};
use crate::telemetry::metrics;

/// Default page size for [`CustomerService::list`].
pub const DEFAULT_PAGE_LIMIT: i64 = 100;

/// Cache-coherent customer service.
#[derive(Clone)]
pub struct CustomerService {
    store: Arc<dyn RecordStore>,
    cache: Arc<dyn StateStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl CustomerService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        cache: Arc<dyn StateStore>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            cache,
            publisher,
        }
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// Insert a customer, then cache it and announce `customer-created`.
    pub async fn create(&self, fields: &CustomerFields) -> ApiResult<Customer> {
        let customer = self
            .store
            .insert(fields)
            .await
            .map_err(|e| self.failed("create", e.into()))?;

        self.cache_put(&customer).await;
        self.publish(CustomerEvent::Created {
            customer: customer.clone(),
        })
        .await;

        tracing::info!(customer_id = customer.id, "Customer created");
        record_outcome("create", "ok");
        Ok(customer)
    }

    /// Read a customer, serving from the cache when possible.
    ///
    /// A cache hit is returned without touching the store. On a miss the
    /// row is read from the store and written back to the cache.
    pub async fn get(&self, id: CustomerId) -> ApiResult<Customer> {
        if let Some(customer) = self.cache_get(id).await {
            tracing::debug!(customer_id = id, "Customer served from cache");
            record_outcome("read", "cache_hit");
            return Ok(customer);
        }

        let customer = self.load(id, "read").await?;
        self.cache_put(&customer).await;

        record_outcome("read", "cache_miss");
        Ok(customer)
    }

    /// Replace a customer's fields, then refresh the cache and announce
    /// `customer-updated`.
    ///
    /// A failed commit leaves any cached copy exactly as it was.
    pub async fn update(&self, id: CustomerId, fields: &CustomerFields) -> ApiResult<Customer> {
        self.load(id, "update").await?;

        let customer = self
            .store
            .update(id, fields)
            .await
            .map_err(|e| self.failed("update", e.into()))?;

        self.cache_put(&customer).await;
        self.publish(CustomerEvent::Updated {
            customer: customer.clone(),
        })
        .await;

        tracing::info!(customer_id = id, "Customer updated");
        record_outcome("update", "ok");
        Ok(customer)
    }

    /// Delete a customer, then evict it from the cache and announce
    /// `customer-deleted`.
    pub async fn delete(&self, id: CustomerId) -> ApiResult<()> {
        self.load(id, "delete").await?;

        self.store
            .delete_by_id(id)
            .await
            .map_err(|e| self.failed("delete", e.into()))?;

        self.cache_evict(id).await;
        self.publish(CustomerEvent::Deleted { id }).await;

        tracing::info!(customer_id = id, "Customer deleted");
        record_outcome("delete", "ok");
        Ok(())
    }

    /// Page through customers by ascending id. Never consults the cache.
    pub async fn list(&self, offset: i64, limit: i64) -> ApiResult<Vec<Customer>> {
        if offset < 0 {
            return Err(ApiError::invalid_range("skip", 0, i64::MAX));
        }
        if limit < 0 {
            return Err(ApiError::invalid_range("limit", 0, i64::MAX));
        }

        let customers = self
            .store
            .list(offset, limit)
            .await
            .map_err(|e| self.failed("list", e.into()))?;

        record_outcome("list", "ok");
        Ok(customers)
    }

    // ========================================================================
    // STORE HELPERS
    // ========================================================================

    /// Read the authoritative row or fail with `CustomerNotFound`.
    async fn load(&self, id: CustomerId, operation: &str) -> ApiResult<Customer> {
        match self.store.get_by_id(id).await {
            Ok(Some(customer)) => Ok(customer),
            Ok(None) => {
                record_outcome(operation, "not_found");
                Err(ApiError::customer_not_found(id))
            }
            Err(e) => Err(self.failed(operation, e.into())),
        }
    }

    fn failed(&self, operation: &str, err: ApiError) -> ApiError {
        let outcome = if err.status_code().is_server_error() {
            "error"
        } else {
            "rejected"
        };
        record_outcome(operation, outcome);
        err
    }

    // ========================================================================
    // BEST-EFFORT SIDE CHANNELS
    // ========================================================================

    /// Cached copy of `id`, or `None` on a miss or any cache failure.
    async fn cache_get(&self, id: CustomerId) -> Option<Customer> {
        let key = customer_key(id);
        match read_entity::<Customer>(self.cache.as_ref(), &key).await {
            Ok(hit) => {
                record_sidecar("cache_get", true);
                hit
            }
            Err(e) => {
                warn_sidecar("cache_get", &e);
                None
            }
        }
    }

    async fn cache_put(&self, customer: &Customer) {
        let result = write_entity(self.cache.as_ref(), customer).await;
        self.settle("cache_set", result);
    }

    async fn cache_evict(&self, id: CustomerId) {
        let result = self.cache.delete(&customer_key(id)).await;
        self.settle("cache_delete", result);
    }

    async fn publish(&self, event: CustomerEvent) {
        let result = publish_event(self.publisher.as_ref(), &event).await;
        if result.is_err() {
            tracing::warn!(
                topic = event.topic(),
                customer_id = event.customer_id(),
                "Event not published"
            );
        }
        self.settle("publish", result);
    }

    fn settle(&self, operation: &str, result: Result<(), SidecarError>) {
        match result {
            Ok(()) => record_sidecar(operation, true),
            Err(e) => warn_sidecar(operation, &e),
        }
    }
}

fn warn_sidecar(operation: &str, err: &SidecarError) {
    tracing::warn!(operation, error = %err, "Sidecar call failed; continuing");
    record_sidecar(operation, false);
}

fn record_sidecar(operation: &str, success: bool) {
    if let Some(m) = metrics() {
        m.record_sidecar_operation(operation, success);
    }
}

fn record_outcome(operation: &str, outcome: &str) {
    if let Some(m) = metrics() {
        m.record_customer_operation(operation, outcome);
    }
}
