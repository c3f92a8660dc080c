//! Event publisher contract and the in-memory bus.

use crate::CustomerEvent;
use async_trait::async_trait;
use clientele_core::{SidecarError, SidecarResult};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;

/// Fire-and-forget publisher.
///
/// A returned error means the broker did not accept the message; callers in
/// the request path treat that as a warning, never as a failed request.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: &Value) -> SidecarResult<()>;
}

/// Encode a [`CustomerEvent`] and publish it on its topic.
pub async fn publish_event(
    publisher: &dyn EventPublisher,
    event: &CustomerEvent,
) -> SidecarResult<()> {
    let payload = event.payload().map_err(|e| SidecarError::Codec {
        reason: format!("failed to encode {} payload: {}", event.topic(), e),
    })?;
    publisher.publish(event.topic(), &payload).await
}

/// A message accepted by the [`InMemoryEventBus`].
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Value,
}

/// In-memory [`EventPublisher`].
///
/// Accepted messages are recorded and fanned out over a broadcast channel.
/// `set_failing(true)` rejects every publish.
pub struct InMemoryEventBus {
    published: Mutex<Vec<PublishedMessage>>,
    attempts: Mutex<Vec<String>>,
    failing: AtomicBool,
    tx: broadcast::Sender<PublishedMessage>,
}

impl InMemoryEventBus {
    /// Create a bus whose broadcast channel buffers `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self {
            published: Mutex::new(Vec::new()),
            attempts: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            tx,
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Messages accepted so far, in publish order.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Topics of every publish attempt, accepted or not.
    pub fn attempted_topics(&self) -> Vec<String> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Receive every message accepted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedMessage> {
        self.tx.subscribe()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, topic: &str, payload: &Value) -> SidecarResult<()> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(topic.to_string());

        if self.failing.load(Ordering::SeqCst) {
            return Err(SidecarError::PublishFailed {
                topic: topic.to_string(),
                reason: "event bus unavailable".to_string(),
            });
        }

        let message = PublishedMessage {
            topic: topic.to_string(),
            payload: payload.clone(),
        };
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
        // No subscribers is fine.
        let _ = self.tx.send(message);
        Ok(())
    }
}
