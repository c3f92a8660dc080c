//! Clientele Test Utilities
//!
//! Shared test infrastructure for the Clientele workspace:
//! - Proptest generators for customer fields
//! - Fixtures for common records
//! - Assertions over results and the in-memory doubles

// Re-export the in-memory doubles from their source crates
pub use clientele_events::{InMemoryEventBus, PublishedMessage};
pub use clientele_storage::{CacheOp, InMemoryRecordStore, InMemoryStateStore};

// Re-export core types for convenience
pub use clientele_core::{
    customer_key, ClienteleError, ClienteleResult, Customer, CustomerFields, CustomerId,
    StorageError, Timestamp, ValidationError,
};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for customer data.

    use super::*;
    use proptest::prelude::*;

    /// A non-blank personal name.
    pub fn arb_name() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{1,11}"
    }

    /// A well-formed email address.
    pub fn arb_email() -> impl Strategy<Value = String> {
        ("[a-z][a-z0-9]{0,9}", "[a-z]{2,10}", "(com|org|net|io)")
            .prop_map(|(local, domain, tld)| format!("{}@{}.{}", local, domain, tld))
    }

    /// An optional phone number.
    pub fn arb_phone() -> impl Strategy<Value = Option<String>> {
        proptest::option::of("\\+?[0-9]{7,12}")
    }

    /// Valid customer fields.
    pub fn arb_customer_fields() -> impl Strategy<Value = CustomerFields> {
        (arb_name(), arb_name(), arb_email(), arb_phone()).prop_map(
            |(first_name, last_name, email, phone)| CustomerFields {
                first_name,
                last_name,
                email,
                phone,
            },
        )
    }

    /// Between one and `max` valid customers with pairwise distinct emails.
    pub fn arb_distinct_customers(max: usize) -> impl Strategy<Value = Vec<CustomerFields>> {
        proptest::collection::vec(arb_customer_fields(), 1..=max.max(1)).prop_map(|fields| {
            fields
                .into_iter()
                .enumerate()
                .map(|(i, mut f)| {
                    f.email = format!("{}.{}", i, f.email);
                    f
                })
                .collect()
        })
    }

    /// An id that the in-memory store has not assigned in a short test.
    pub fn arb_unknown_id() -> impl Strategy<Value = CustomerId> {
        prop_oneof![Just(0i64), 10_000i64..i64::MAX, i64::MIN..0i64]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records for common scenarios.

    use super::*;
    use chrono::Utc;

    /// The canonical `A B <a@b.com>` customer fields.
    pub fn sample_fields() -> CustomerFields {
        CustomerFields::new("A", "B", "a@b.com")
    }

    /// Fields with a phone number.
    pub fn fields_with_phone() -> CustomerFields {
        CustomerFields::new("Ada", "Lovelace", "ada@example.com").with_phone("+441234567890")
    }

    /// Fields that fail validation on the email.
    pub fn invalid_email_fields() -> CustomerFields {
        CustomerFields::new("A", "B", "not-an-email")
    }

    /// A persisted customer, as a cached copy would look.
    pub fn stored_customer(id: CustomerId) -> Customer {
        let fields = sample_fields();
        Customer {
            id,
            first_name: fields.first_name,
            last_name: fields.last_name,
            email: fields.email,
            phone: fields.phone,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for Clientele results and the in-memory doubles.

    use super::*;

    /// Assert that a result is a storage NotFound for `id`.
    pub fn assert_not_found<T: std::fmt::Debug>(result: &ClienteleResult<T>, id: CustomerId) {
        match result {
            Err(ClienteleError::Storage(StorageError::NotFound { id: found })) => {
                assert_eq!(*found, id, "NotFound for wrong id");
            }
            other => panic!("Expected NotFound({}), got {:?}", id, other),
        }
    }

    /// Assert that a result is a storage Conflict.
    pub fn assert_conflict<T: std::fmt::Debug>(result: &ClienteleResult<T>) {
        assert!(
            matches!(result, Err(ClienteleError::Storage(StorageError::Conflict { .. }))),
            "Expected Conflict, got {:?}",
            result
        );
    }

    /// Assert that the cache holds exactly `customer` under its key.
    pub fn assert_cached(cache: &InMemoryStateStore, customer: &Customer) {
        let key = customer_key(customer.id);
        let cached = cache
            .entry(&key)
            .map(serde_json::from_value::<Customer>);
        match cached {
            Some(Ok(found)) => assert_eq!(&found, customer, "cached copy differs"),
            Some(Err(e)) => panic!("cache entry {} is not a customer: {}", key, e),
            None => panic!("expected cache entry {}", key),
        }
    }

    /// Assert that no cache entry exists for `id`.
    pub fn assert_not_cached(cache: &InMemoryStateStore, id: CustomerId) {
        let key = customer_key(id);
        assert!(cache.entry(&key).is_none(), "unexpected cache entry {}", key);
    }

    /// Assert that nothing was written to the cache and nothing published.
    pub fn assert_no_side_effects(cache: &InMemoryStateStore, bus: &InMemoryEventBus) {
        assert!(cache.writes().is_empty(), "unexpected cache writes: {:?}", cache.writes());
        assert!(
            bus.attempted_topics().is_empty(),
            "unexpected publishes: {:?}",
            bus.attempted_topics()
        );
    }

    /// Assert that the topics accepted by the bus are exactly `expected`.
    pub fn assert_published_topics(bus: &InMemoryEventBus, expected: &[&str]) {
        let topics: Vec<String> = bus.published().into_iter().map(|m| m.topic).collect();
        assert_eq!(topics, expected);
    }
}
