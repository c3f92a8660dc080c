//! Side cache for customer projections.
//!
//! The cache is never authoritative: the record store is written first and
//! a cached value is a possibly-stale copy of a committed row, keyed by
//! `customer-{id}`. Entries carry no TTL and change only by overwrite or
//! delete.
//!
//! # Example
//!
//! ```ignore
//! write_entity(cache.as_ref(), &customer).await?;
//! let hit: Option<Customer> = read_entity(cache.as_ref(), &customer_key(id)).await?;
//! ```

pub mod memory;
pub mod traits;

pub use memory::{CacheOp, InMemoryStateStore};
pub use traits::{is_present, read_entity, write_entity, CacheableEntity, StateStore};
