//! Dapr Sidecar Client
//!
//! HTTP client for the Dapr state store and pub/sub building blocks. One
//! `reqwest::Client` is shared; each call borrows a pooled connection for
//! the duration of the request only.
//!
//! ```text
//! GET    {base}/v1.0/state/{store}/{key}      200 + JSON = hit, 204 = miss
//! POST   {base}/v1.0/state/{store}            [{"key": k, "value": v}]
//! DELETE {base}/v1.0/state/{store}/{key}
//! POST   {base}/v1.0/publish/{pubsub}/{topic} JSON payload
//! ```

use async_trait::async_trait;
use clientele_core::{SidecarError, SidecarResult};
use clientele_events::EventPublisher;
use clientele_storage::StateStore;
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::config::SidecarConfig;
use crate::error::{ApiError, ApiResult};

/// Dapr sidecar client implementing both [`StateStore`] and
/// [`EventPublisher`].
#[derive(Clone)]
pub struct DaprSidecar {
    client: reqwest::Client,
    base_url: String,
    state_store: String,
    pubsub: String,
}

impl DaprSidecar {
    pub fn new(config: &SidecarConfig) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ApiError::internal_error(format!("Failed to build sidecar HTTP client: {}", e))
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            state_store: config.state_store.clone(),
            pubsub: config.pubsub.clone(),
        })
    }

    pub fn state_url(&self) -> String {
        format!("{}/v1.0/state/{}", self.base_url, self.state_store)
    }

    pub fn state_key_url(&self, key: &str) -> String {
        format!("{}/{}", self.state_url(), key)
    }

    pub fn publish_url(&self, topic: &str) -> String {
        format!("{}/v1.0/publish/{}/{}", self.base_url, self.pubsub, topic)
    }

    fn cache_error(operation: &str, key: &str, reason: impl ToString) -> SidecarError {
        SidecarError::CacheFailed {
            operation: operation.to_string(),
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Status and body text of a rejected sidecar call.
async fn describe_failure(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if body.is_empty() {
        format!("sidecar returned {}", status)
    } else {
        format!("sidecar returned {}: {}", status, body)
    }
}

#[async_trait]
impl StateStore for DaprSidecar {
    async fn get(&self, key: &str) -> SidecarResult<Option<Value>> {
        let response = self
            .client
            .get(self.state_key_url(key))
            .send()
            .await
            .map_err(|e| Self::cache_error("get", key, e))?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| Self::cache_error("get", key, e))?;
                if body.iter().all(u8::is_ascii_whitespace) {
                    return Ok(None);
                }
                serde_json::from_slice(&body)
                    .map(Some)
                    .map_err(|e| SidecarError::Codec {
                        reason: format!("state value under {} is not JSON: {}", key, e),
                    })
            }
            _ => Err(Self::cache_error("get", key, describe_failure(response).await)),
        }
    }

    async fn set(&self, key: &str, value: &Value) -> SidecarResult<()> {
        let body = json!([{ "key": key, "value": value }]);
        let response = self
            .client
            .post(self.state_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::cache_error("set", key, e))?;

        if !response.status().is_success() {
            return Err(Self::cache_error("set", key, describe_failure(response).await));
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> SidecarResult<()> {
        let response = self
            .client
            .delete(self.state_key_url(key))
            .send()
            .await
            .map_err(|e| Self::cache_error("delete", key, e))?;

        if !response.status().is_success() {
            return Err(Self::cache_error("delete", key, describe_failure(response).await));
        }
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for DaprSidecar {
    async fn publish(&self, topic: &str, payload: &Value) -> SidecarResult<()> {
        let publish_error = |reason: String| SidecarError::PublishFailed {
            topic: topic.to_string(),
            reason,
        };

        let response = self
            .client
            .post(self.publish_url(topic))
            .json(payload)
            .send()
            .await
            .map_err(|e| publish_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(publish_error(describe_failure(response).await));
        }
        Ok(())
    }
}
