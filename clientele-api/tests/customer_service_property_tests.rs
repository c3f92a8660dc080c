//! Property-Based Tests for Cache-Coherent Customer Operations
//!
//! Every property runs the real [`CustomerService`] against the in-memory
//! record store, state store and event bus, then inspects all three.

use clientele_api::{ApiError, ErrorCode};
use clientele_core::{customer_key, CustomerFields, CustomerId};
use clientele_events::{TOPIC_CUSTOMER_CREATED, TOPIC_CUSTOMER_DELETED, TOPIC_CUSTOMER_UPDATED};
use clientele_test_utils::assertions::{
    assert_cached, assert_no_side_effects, assert_not_cached, assert_published_topics,
};
use clientele_test_utils::generators::{
    arb_customer_fields, arb_distinct_customers, arb_name, arb_unknown_id,
};
use proptest::prelude::*;
use tokio::runtime::Runtime;

#[path = "support/harness.rs"]
mod harness;
use harness::Harness;

// ============================================================================
// TEST CONFIGURATION
// ============================================================================

fn test_runtime() -> Result<Runtime, TestCaseError> {
    Runtime::new().map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

fn fail(context: &str, e: ApiError) -> TestCaseError {
    TestCaseError::fail(format!("{}: {}", context, e))
}

fn expect_not_found<T: std::fmt::Debug>(
    result: Result<T, ApiError>,
    id: CustomerId,
) -> Result<(), TestCaseError> {
    match result {
        Err(e) if e.code == ErrorCode::CustomerNotFound => Ok(()),
        other => Err(TestCaseError::fail(format!(
            "expected CustomerNotFound for {}, got {:?}",
            id, other
        ))),
    }
}

// ============================================================================
// PROPERTY TESTS
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Create returns the store-assigned id and a later read returns an
    /// equal customer, served from the cache.
    #[test]
    fn prop_create_then_read_roundtrip(fields in arb_customer_fields()) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let h = Harness::new();

            let created = h.service.create(&fields).await.map_err(|e| fail("create", e))?;
            prop_assert_eq!(&created.fields(), &fields);
            prop_assert_eq!(h.store.row(created.id), Some(created.clone()));

            let reads_before = h.store.read_count();
            let read = h.service.get(created.id).await.map_err(|e| fail("read", e))?;
            prop_assert_eq!(&read, &created);
            prop_assert_eq!(h.store.read_count(), reads_before);

            assert_cached(&h.cache, &created);
            assert_published_topics(&h.bus, &[TOPIC_CUSTOMER_CREATED]);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Operations on ids that were never inserted fail with NotFound and
    /// leave no trace in the cache or on the bus.
    #[test]
    fn prop_unknown_ids_have_no_side_effects(
        id in arb_unknown_id(),
        fields in arb_customer_fields(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let h = Harness::new();

            expect_not_found(h.service.get(id).await, id)?;
            expect_not_found(h.service.update(id, &fields).await, id)?;
            expect_not_found(h.service.delete(id).await, id)?;

            assert_no_side_effects(&h.cache, &h.bus);
            prop_assert!(h.store.is_empty());
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// A failed publish does not stop the cache from holding the new row.
    #[test]
    fn prop_create_caches_even_when_publish_fails(fields in arb_customer_fields()) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let h = Harness::new();
            h.bus.set_failing(true);

            let created = h.service.create(&fields).await.map_err(|e| fail("create", e))?;

            assert_cached(&h.cache, &created);
            prop_assert_eq!(h.bus.attempted_topics(), vec![TOPIC_CUSTOMER_CREATED.to_string()]);
            prop_assert!(h.bus.published().is_empty());
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// After an update the cache-hit read path returns the new fields.
    #[test]
    fn prop_update_refreshes_cache(
        fields in arb_customer_fields(),
        new_last in arb_name(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let h = Harness::new();
            let created = h.service.create(&fields).await.map_err(|e| fail("create", e))?;

            let mut changed = fields.clone();
            changed.last_name = new_last.clone();
            let updated = h
                .service
                .update(created.id, &changed)
                .await
                .map_err(|e| fail("update", e))?;
            prop_assert!(updated.updated_at.is_some());

            let reads_before = h.store.read_count();
            let read = h.service.get(created.id).await.map_err(|e| fail("read", e))?;
            prop_assert_eq!(h.store.read_count(), reads_before);
            prop_assert_eq!(&read.last_name, &new_last);
            prop_assert_eq!(&read, &updated);

            assert_published_topics(&h.bus, &[TOPIC_CUSTOMER_CREATED, TOPIC_CUSTOMER_UPDATED]);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// After a delete the cache entry is gone and reads fail with NotFound.
    #[test]
    fn prop_delete_evicts(fields in arb_customer_fields()) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let h = Harness::new();
            let created = h.service.create(&fields).await.map_err(|e| fail("create", e))?;

            h.service.delete(created.id).await.map_err(|e| fail("delete", e))?;

            assert_not_cached(&h.cache, created.id);
            expect_not_found(h.service.get(created.id).await, created.id)?;

            let deleted = h.bus.published();
            prop_assert_eq!(deleted.len(), 2);
            prop_assert_eq!(deleted[1].topic.as_str(), TOPIC_CUSTOMER_DELETED);
            prop_assert_eq!(&deleted[1].payload, &serde_json::json!({ "id": created.id }));
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// A failed update commit leaves a cached entry exactly as it was.
    #[test]
    fn prop_failed_update_leaves_cache_untouched(
        fields in arb_customer_fields(),
        new_first in arb_name(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let h = Harness::new();
            let created = h.service.create(&fields).await.map_err(|e| fail("create", e))?;
            let key = customer_key(created.id);
            let cached_before = h.cache.entry(&key);
            h.cache.clear_ops();

            h.store.fail_next_commits(1);
            let mut changed = fields.clone();
            changed.first_name = new_first;
            let result = h.service.update(created.id, &changed).await;

            prop_assert!(matches!(result, Err(ref e) if e.code == ErrorCode::DatabaseError));
            prop_assert_eq!(h.cache.entry(&key), cached_before);
            prop_assert!(h.cache.writes().is_empty());
            prop_assert_eq!(h.store.row(created.id), Some(created.clone()));
            assert_published_topics(&h.bus, &[TOPIC_CUSTOMER_CREATED]);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// List never touches the cache and pages by ascending id.
    #[test]
    fn prop_list_pages_ascending_without_cache(
        batch in arb_distinct_customers(12),
        skip in 0i64..15,
        limit in 0i64..15,
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let h = Harness::new();
            let mut ids = Vec::new();
            for fields in &batch {
                let created = h.service.create(fields).await.map_err(|e| fail("create", e))?;
                ids.push(created.id);
            }
            h.cache.clear_ops();

            let page = h.service.list(skip, limit).await.map_err(|e| fail("list", e))?;

            let expected: Vec<CustomerId> = ids
                .iter()
                .copied()
                .skip(skip as usize)
                .take(limit as usize)
                .collect();
            let got: Vec<CustomerId> = page.iter().map(|c| c.id).collect();
            prop_assert_eq!(got, expected);
            prop_assert!(h.cache.ops().is_empty());
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// An unreachable cache never fails a request.
    #[test]
    fn prop_cache_outage_is_invisible(fields in arb_customer_fields()) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let h = Harness::new();
            h.cache.set_failing(true);

            let created = h.service.create(&fields).await.map_err(|e| fail("create", e))?;
            let read = h.service.get(created.id).await.map_err(|e| fail("read", e))?;
            prop_assert_eq!(&read, &created);

            let updated = h
                .service
                .update(created.id, &CustomerFields { phone: None, ..fields.clone() })
                .await
                .map_err(|e| fail("update", e))?;
            prop_assert!(updated.phone.is_none());

            h.service.delete(created.id).await.map_err(|e| fail("delete", e))?;
            prop_assert!(h.store.is_empty());
            prop_assert!(h.cache.is_empty());
            Ok::<(), TestCaseError>(())
        })?;
    }
}
