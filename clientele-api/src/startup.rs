//! Startup Readiness
//!
//! Waits for the record store before the server accepts traffic.

use clientele_storage::RecordStore;

use crate::config::StartupConfig;
use crate::error::{ApiError, ApiResult};
use crate::telemetry::metrics;

/// Ping the record store until it answers or the attempts run out.
///
/// Sleeps `retry_interval` between attempts (not after the last one). Every
/// failed attempt bumps `db_connection_failures_total`.
pub async fn wait_for_store(store: &dyn RecordStore, config: &StartupConfig) -> ApiResult<()> {
    let attempts = config.max_retries.max(1);

    for attempt in 1..=attempts {
        match store.ping().await {
            Ok(()) => {
                tracing::info!(attempt, "Record store is reachable");
                return Ok(());
            }
            Err(e) => {
                if let Some(m) = metrics() {
                    m.record_db_connection_failure();
                }
                tracing::warn!(
                    attempt,
                    max_attempts = attempts,
                    error = %e,
                    "Record store not reachable"
                );
                if attempt < attempts {
                    tokio::time::sleep(config.retry_interval).await;
                }
            }
        }
    }

    tracing::error!(max_attempts = attempts, "Giving up on the record store");
    Err(ApiError::service_unavailable(format!(
        "Record store unreachable after {} attempts",
        attempts
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clientele_storage::InMemoryRecordStore;
    use std::time::Duration;

    fn fast(max_retries: u32) -> StartupConfig {
        StartupConfig {
            max_retries,
            retry_interval: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_wait_for_store_succeeds_immediately() {
        let store = InMemoryRecordStore::new();
        assert!(wait_for_store(&store, &fast(3)).await.is_ok());
    }

    #[tokio::test]
    async fn test_wait_for_store_gives_up() {
        let store = InMemoryRecordStore::new();
        store.set_unavailable(true);

        let err = match wait_for_store(&store, &fast(2)).await {
            Ok(()) => panic!("unavailable store must not be reported ready"),
            Err(e) => e,
        };
        assert_eq!(err.code, crate::error::ErrorCode::ServiceUnavailable);
    }

    #[tokio::test]
    async fn test_wait_for_store_counts_failures() {
        let store = InMemoryRecordStore::new();
        store.set_unavailable(true);

        let before = metrics()
            .map(|m| m.db_connection_failures_total.get())
            .unwrap_or_default();
        let _ = wait_for_store(&store, &fast(3)).await;
        let after = metrics()
            .map(|m| m.db_connection_failures_total.get())
            .unwrap_or_default();

        assert!(after - before >= 3.0);
    }
}
