//! Shared harness: a [`CustomerService`] wired to the in-memory doubles.

use axum::Router;
use clientele_api::{create_api_router, AppConfig, CustomerService};
use clientele_storage::RecordStore;
use clientele_test_utils::{InMemoryEventBus, InMemoryRecordStore, InMemoryStateStore};
use std::sync::Arc;

pub struct Harness {
    pub service: Arc<CustomerService>,
    pub store: Arc<InMemoryRecordStore>,
    pub cache: Arc<InMemoryStateStore>,
    pub bus: Arc<InMemoryEventBus>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryRecordStore::new());
        let cache = Arc::new(InMemoryStateStore::new());
        let bus = Arc::new(InMemoryEventBus::default());
        let service = Arc::new(CustomerService::new(
            store.clone(),
            cache.clone(),
            bus.clone(),
        ));
        Self {
            service,
            store,
            cache,
            bus,
        }
    }

    /// The full service router with default configuration.
    #[allow(dead_code)]
    pub fn router(&self) -> Router {
        self.router_with(|_| None)
    }

    /// The full service router mounted under `prefix`.
    #[allow(dead_code)]
    pub fn router_with_prefix(&self, prefix: &str) -> Router {
        let prefix = prefix.to_string();
        self.router_with(move |key| (key == "API_V1_STR").then(|| prefix.clone()))
    }

    fn router_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Router {
        let config = match AppConfig::from_lookup(lookup) {
            Ok(config) => config,
            Err(e) => panic!("configuration must load: {}", e),
        };
        let store: Arc<dyn RecordStore> = self.store.clone();
        create_api_router(self.service.clone(), store, &config)
    }
}
