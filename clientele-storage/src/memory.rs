//! In-memory record store for tests and local development.

use crate::RecordStore;
use async_trait::async_trait;
use chrono::Utc;
use clientele_core::{
    ClienteleError, ClienteleResult, Customer, CustomerFields, CustomerId, StorageError,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone, Default)]
struct Table {
    rows: BTreeMap<CustomerId, Customer>,
    last_id: CustomerId,
}

impl Table {
    fn next_id(&mut self) -> CustomerId {
        self.last_id += 1;
        self.last_id
    }

    fn email_taken(&self, email: &str, except: Option<CustomerId>) -> bool {
        self.rows
            .values()
            .any(|row| row.email == email && Some(row.id) != except)
    }
}

/// In-memory [`RecordStore`] backed by an ordered map.
///
/// Mutations are staged on a copy of the table and swapped in on commit, so
/// an injected commit failure leaves every row untouched. Email uniqueness is
/// enforced like the relational schema's `UNIQUE` constraint.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    table: RwLock<Table>,
    failing_commits: AtomicUsize,
    unavailable: AtomicBool,
    reads: AtomicUsize,
}

impl InMemoryRecordStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` mutating operations fail at commit time.
    pub fn fail_next_commits(&self, count: usize) {
        self.failing_commits.store(count, Ordering::SeqCst);
    }

    /// Simulate the store being unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of point reads served (`get_by_id`).
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of rows currently committed.
    pub fn len(&self) -> usize {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .rows
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Committed row for `id`, bypassing the read counter.
    pub fn row(&self, id: CustomerId) -> Option<Customer> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .rows
            .get(&id)
            .cloned()
    }

    fn check_available(&self) -> ClienteleResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable {
                reason: "in-memory store marked unavailable".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn take_commit_failure(&self) -> bool {
        self.failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Run `mutate` against a staged copy of the table and commit it.
    fn transact<T>(
        &self,
        mutate: impl FnOnce(&mut Table) -> ClienteleResult<T>,
    ) -> ClienteleResult<T> {
        self.check_available()?;
        let mut table = self.table.write().map_err(|_| StorageError::LockPoisoned)?;
        let mut staged = table.clone();
        let result = mutate(&mut staged)?;
        if self.take_commit_failure() {
            return Err(StorageError::TransactionFailed {
                reason: "commit rejected".to_string(),
            }
            .into());
        }
        *table = staged;
        Ok(result)
    }
}

fn conflict(email: &str) -> ClienteleError {
    StorageError::Conflict {
        reason: format!("email {} is already registered", email),
    }
    .into()
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert(&self, fields: &CustomerFields) -> ClienteleResult<Customer> {
        self.transact(|table| {
            if table.email_taken(&fields.email, None) {
                return Err(conflict(&fields.email));
            }
            let customer = Customer {
                id: table.next_id(),
                first_name: fields.first_name.clone(),
                last_name: fields.last_name.clone(),
                email: fields.email.clone(),
                phone: fields.phone.clone(),
                created_at: Utc::now(),
                updated_at: None,
            };
            table.rows.insert(customer.id, customer.clone());
            Ok(customer)
        })
    }

    async fn get_by_id(&self, id: CustomerId) -> ClienteleResult<Option<Customer>> {
        self.check_available()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        let table = self.table.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(table.rows.get(&id).cloned())
    }

    async fn list(&self, offset: i64, limit: i64) -> ClienteleResult<Vec<Customer>> {
        self.check_available()?;
        let table = self.table.read().map_err(|_| StorageError::LockPoisoned)?;
        let skip = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let take = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(table.rows.values().skip(skip).take(take).cloned().collect())
    }

    async fn update(&self, id: CustomerId, fields: &CustomerFields) -> ClienteleResult<Customer> {
        self.transact(|table| {
            if table.email_taken(&fields.email, Some(id)) {
                return Err(conflict(&fields.email));
            }
            let row = table
                .rows
                .get_mut(&id)
                .ok_or(StorageError::NotFound { id })?;
            row.apply(fields, Utc::now());
            Ok(row.clone())
        })
    }

    async fn delete_by_id(&self, id: CustomerId) -> ClienteleResult<()> {
        self.transact(|table| {
            table
                .rows
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| StorageError::NotFound { id }.into())
        })
    }

    async fn ping(&self) -> ClienteleResult<()> {
        self.check_available()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(email: &str) -> CustomerFields {
        CustomerFields::new("A", "B", email)
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = InMemoryRecordStore::new();
        let first = store.insert(&fields("a@b.com")).await.unwrap();
        let second = store.insert(&fields("c@d.com")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(first.updated_at.is_none());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = InMemoryRecordStore::new();
        store.insert(&fields("a@b.com")).await.unwrap();

        let err = store.insert(&fields("a@b.com")).await.unwrap_err();
        assert!(matches!(
            err,
            ClienteleError::Storage(StorageError::Conflict { .. })
        ));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_update_sets_updated_at_and_keeps_id() {
        let store = InMemoryRecordStore::new();
        let created = store.insert(&fields("a@b.com")).await.unwrap();

        let updated = store
            .update(created.id, &CustomerFields::new("A", "C", "a@b.com"))
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.last_name, "C");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let store = InMemoryRecordStore::new();
        let err = store.update(9, &fields("a@b.com")).await.unwrap_err();
        assert_eq!(err, ClienteleError::Storage(StorageError::NotFound { id: 9 }));
    }

    #[tokio::test]
    async fn test_update_to_other_customers_email_conflicts() {
        let store = InMemoryRecordStore::new();
        store.insert(&fields("a@b.com")).await.unwrap();
        let second = store.insert(&fields("c@d.com")).await.unwrap();

        let err = store.update(second.id, &fields("a@b.com")).await.unwrap_err();
        assert!(matches!(
            err,
            ClienteleError::Storage(StorageError::Conflict { .. })
        ));
        assert_eq!(store.row(second.id).unwrap().email, "c@d.com");
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_rows_untouched() {
        let store = InMemoryRecordStore::new();
        let created = store.insert(&fields("a@b.com")).await.unwrap();

        store.fail_next_commits(1);
        let err = store
            .update(created.id, &CustomerFields::new("Z", "Z", "z@z.com"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClienteleError::Storage(StorageError::TransactionFailed { .. })
        ));
        assert_eq!(store.row(created.id), Some(created.clone()));

        // Only one commit was poisoned.
        store.delete_by_id(created.id).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_failed_insert_commit_adds_nothing() {
        let store = InMemoryRecordStore::new();
        store.fail_next_commits(1);
        assert!(store.insert(&fields("a@b.com")).await.is_err());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_row_is_not_found() {
        let store = InMemoryRecordStore::new();
        let err = store.delete_by_id(3).await.unwrap_err();
        assert_eq!(err, ClienteleError::Storage(StorageError::NotFound { id: 3 }));
    }

    #[tokio::test]
    async fn test_list_is_ordered_and_paginated() {
        let store = InMemoryRecordStore::new();
        for i in 0..5 {
            store.insert(&fields(&format!("u{}@x.com", i))).await.unwrap();
        }

        let page = store.list(1, 2).await.unwrap();
        let ids: Vec<_> = page.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3]);

        let tail = store.list(4, 100).await.unwrap();
        assert_eq!(tail.len(), 1);
        assert!(store.list(10, 100).await.unwrap().is_empty());
        assert!(store.list(0, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_operation() {
        let store = InMemoryRecordStore::new();
        store.set_unavailable(true);

        assert!(store.ping().await.is_err());
        assert!(store.get_by_id(1).await.is_err());
        assert!(store.insert(&fields("a@b.com")).await.is_err());

        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_read_count_tracks_point_reads_only() {
        let store = InMemoryRecordStore::new();
        store.insert(&fields("a@b.com")).await.unwrap();
        store.list(0, 10).await.unwrap();
        assert_eq!(store.read_count(), 0);

        store.get_by_id(1).await.unwrap();
        store.get_by_id(2).await.unwrap();
        assert_eq!(store.read_count(), 2);
    }
}
