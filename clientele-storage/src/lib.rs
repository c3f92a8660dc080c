//! Clientele Storage
//!
//! The [`RecordStore`] trait over the authoritative customer table, the
//! [`cache`] module with the [`cache::StateStore`] side-cache contract, and
//! in-memory implementations of both for tests and local runs.

pub mod cache;
pub mod memory;
pub mod record_store;

pub use cache::{CacheOp, CacheableEntity, InMemoryStateStore, StateStore};
pub use memory::InMemoryRecordStore;
pub use record_store::RecordStore;
