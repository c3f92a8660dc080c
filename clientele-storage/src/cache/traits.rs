//! State store trait and the cacheable entity marker.
//!
//! The state store is an external key/value service with per-key
//! last-write-wins semantics and no transactions. Values travel as JSON.

use async_trait::async_trait;
use clientele_core::{customer_key, Customer, SidecarError, SidecarResult};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Marker trait for types that can be cached.
///
/// - `cache_key()` must be stable for the lifetime of the entity
/// - Implementations must be `Clone`, `Serialize`, and `DeserializeOwned` for
///   cache storage
pub trait CacheableEntity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Key under which this entity is cached.
    fn cache_key(&self) -> String;
}

impl CacheableEntity for Customer {
    fn cache_key(&self) -> String {
        customer_key(self.id)
    }
}

/// Key/value state store.
///
/// Object safe so the service can hold an `Arc<dyn StateStore>` and swap the
/// sidecar client for an in-memory store in tests.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the raw value stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> SidecarResult<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &Value) -> SidecarResult<()>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> SidecarResult<()>;
}

/// Whether a stored value should count as a hit.
///
/// `null`, empty strings and empty objects/arrays are treated as absent.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

/// Read and decode a cached entity.
///
/// Absent or empty values are `Ok(None)`. A present value that does not
/// decode as `T` is a `SidecarError::Codec`.
pub async fn read_entity<T: CacheableEntity>(
    store: &dyn StateStore,
    key: &str,
) -> SidecarResult<Option<T>> {
    match store.get(key).await? {
        Some(value) if is_present(&value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| SidecarError::Codec {
                reason: format!("cached value under {} is not decodable: {}", key, e),
            }),
        _ => Ok(None),
    }
}

/// Encode and store an entity under its own cache key.
pub async fn write_entity<T: CacheableEntity>(
    store: &dyn StateStore,
    entity: &T,
) -> SidecarResult<()> {
    let key = entity.cache_key();
    let value = serde_json::to_value(entity).map_err(|e| SidecarError::Codec {
        reason: format!("failed to encode {}: {}", key, e),
    })?;
    store.set(&key, &value).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_present() {
        assert!(!is_present(&Value::Null));
        assert!(!is_present(&json!("")));
        assert!(!is_present(&json!({})));
        assert!(!is_present(&json!([])));
        assert!(is_present(&json!({"id": 1})));
        assert!(is_present(&json!(0)));
        assert!(is_present(&json!(false)));
    }
}
