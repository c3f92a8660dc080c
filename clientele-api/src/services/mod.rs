//! Service Layer
//!
//! Business logic sitting between the route handlers and the store, cache
//! and publisher seams.

mod customer_service;

pub use customer_service::*;
