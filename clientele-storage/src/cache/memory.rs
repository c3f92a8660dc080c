//! In-memory state store with an operation log.

use super::traits::StateStore;
use async_trait::async_trait;
use clientele_core::{SidecarError, SidecarResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

/// A call made against the state store, recorded whether or not it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp {
    Get(String),
    Set(String),
    Delete(String),
}

impl CacheOp {
    pub fn key(&self) -> &str {
        match self {
            CacheOp::Get(key) | CacheOp::Set(key) | CacheOp::Delete(key) => key,
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, CacheOp::Get(_))
    }
}

/// [`StateStore`] backed by a `HashMap`.
///
/// `set_failing(true)` makes every call fail the way an unreachable sidecar
/// would, while still recording the attempt.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    entries: RwLock<HashMap<String, Value>>,
    ops: Mutex<Vec<CacheOp>>,
    failing: AtomicBool,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Current value under `key`, without recording an operation.
    pub fn entry(&self, key: &str) -> Option<Value> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Seed a raw value, e.g. a stale or undecodable entry.
    pub fn insert_raw(&self, key: impl Into<String>, value: Value) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value);
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every operation attempted so far, in call order.
    pub fn ops(&self) -> Vec<CacheOp> {
        self.ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Attempted `set`/`delete` calls only.
    pub fn writes(&self) -> Vec<CacheOp> {
        self.ops().into_iter().filter(CacheOp::is_write).collect()
    }

    pub fn clear_ops(&self) {
        self.ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, op: CacheOp) -> SidecarResult<()> {
        let failing = self.failing.load(Ordering::SeqCst);
        let (operation, key) = match &op {
            CacheOp::Get(key) => ("get", key.clone()),
            CacheOp::Set(key) => ("set", key.clone()),
            CacheOp::Delete(key) => ("delete", key.clone()),
        };
        self.ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(op);
        if failing {
            return Err(SidecarError::CacheFailed {
                operation: operation.to_string(),
                key,
                reason: "state store unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn poisoned(operation: &str, key: &str) -> SidecarError {
        SidecarError::CacheFailed {
            operation: operation.to_string(),
            key: key.to_string(),
            reason: "state store lock poisoned".to_string(),
        }
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, key: &str) -> SidecarResult<Option<Value>> {
        self.record(CacheOp::Get(key.to_string()))?;
        let entries = self
            .entries
            .read()
            .map_err(|_| Self::poisoned("get", key))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &Value) -> SidecarResult<()> {
        self.record(CacheOp::Set(key.to_string()))?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Self::poisoned("set", key))?;
        entries.insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> SidecarResult<()> {
        self.record(CacheOp::Delete(key.to_string()))?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Self::poisoned("delete", key))?;
        entries.remove(key);
        Ok(())
    }
}
