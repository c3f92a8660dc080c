//! Pub/Sub Delivery Routes
//!
//! The sidecar discovers subscriptions through `GET /dapr/subscribe` and then
//! delivers every customer topic to a single endpoint under the API prefix.
//! Deliveries are only logged; the service does not react to its own events.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use clientele_events::{DeliveredEvent, CUSTOMER_TOPICS};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};

/// Path of the delivery endpoint relative to the API prefix.
pub const DELIVERY_PATH: &str = "/customers/events/customer";

// ============================================================================
// TYPES
// ============================================================================

/// One entry of the sidecar's programmatic subscription list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Subscription {
    pub pubsubname: String,
    pub topic: String,
    pub route: String,
}

/// Acknowledgement for a delivered event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeliveryAck {
    pub success: bool,
}

#[derive(Debug, Clone)]
pub struct SubscriptionState {
    pub pubsub: String,
    pub route: String,
}

impl SubscriptionState {
    pub fn new(pubsub: impl Into<String>, api_prefix: &str) -> Self {
        Self {
            pubsub: pubsub.into(),
            route: format!("{}{}", api_prefix, DELIVERY_PATH),
        }
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        CUSTOMER_TOPICS
            .iter()
            .map(|topic| Subscription {
                pubsubname: self.pubsub.clone(),
                topic: topic.to_string(),
                route: self.route.clone(),
            })
            .collect()
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// POST /api/v1/customers/events/customer - Receive a customer event
#[utoipa::path(
    post,
    path = "/api/v1/customers/events/customer",
    tag = "Events",
    request_body = DeliveredEvent,
    responses(
        (status = 200, description = "Event acknowledged", body = DeliveryAck),
        (status = 400, description = "Body is not a JSON object", body = crate::error::ApiError),
    ),
)]
pub async fn receive_customer_event(
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<DeliveryAck>> {
    let Json(body) = body?;
    let event = DeliveredEvent::from_body(body)
        .ok_or_else(|| ApiError::invalid_input("Event body must be a JSON object"))?;

    tracing::info!(
        event_id = ?event.id,
        topic = ?event.topic,
        event_type = ?event.event_type,
        customer_id = ?event.customer_id(),
        "Received customer event"
    );

    Ok(Json(DeliveryAck { success: true }))
}

/// GET /dapr/subscribe - Subscription discovery for the sidecar
#[utoipa::path(
    get,
    path = "/dapr/subscribe",
    tag = "Events",
    responses(
        (status = 200, description = "Topics this service subscribes to", body = Vec<Subscription>),
    ),
)]
pub async fn list_subscriptions(
    State(state): State<Arc<SubscriptionState>>,
) -> Json<Vec<Subscription>> {
    Json(state.subscriptions())
}

// ============================================================================
// ROUTERS
// ============================================================================

/// Delivery endpoint, merged into the prefixed API router.
pub fn create_router() -> Router {
    Router::new().route(DELIVERY_PATH, post(receive_customer_event))
}

/// Discovery endpoint, mounted at the root.
pub fn create_subscription_router(state: SubscriptionState) -> Router {
    Router::new()
        .route("/dapr/subscribe", get(list_subscriptions))
        .with_state(Arc::new(state))
}
