//! REST API Route Handlers
//!
//! Route modules and the function that assembles them into the service
//! router:
//! - `{prefix}/customers` CRUD plus the pub/sub delivery endpoint
//! - `{prefix}/openapi.json`
//! - `/dapr/subscribe` for sidecar subscription discovery
//! - `/health/*` and `/metrics`

pub mod customer;
pub mod events;
pub mod health;

use axum::{
    extract::State,
    http::{header, Method},
    middleware::from_fn,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use clientele_storage::RecordStore;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{ApiConfig, AppConfig};
use crate::openapi::ApiDoc;
use crate::services::CustomerService;
use crate::telemetry::{metrics_handler, observability_middleware};

// ============================================================================
// OPENAPI ENDPOINT
// ============================================================================

/// Handler for the openapi.json endpoint.
async fn openapi_json(State(doc): State<Arc<utoipa::openapi::OpenApi>>) -> impl IntoResponse {
    Json(doc.as_ref().clone())
}

// ============================================================================
// ROUTER ASSEMBLY
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
pub fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.is_production() {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<header::HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    } else {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    }
}

/// Create the complete service router.
///
/// Layers, outermost first: CORS, observability middleware, request tracing.
pub fn create_api_router(
    service: Arc<CustomerService>,
    store: Arc<dyn RecordStore>,
    config: &AppConfig,
) -> Router {
    let doc = Arc::new(ApiDoc::for_prefix(&config.api_prefix));
    let api_routes = Router::new()
        .nest("/customers", customer::create_router(service))
        .merge(events::create_router())
        .merge(
            Router::new()
                .route("/openapi.json", get(openapi_json))
                .with_state(doc),
        );

    let subscriptions = events::SubscriptionState::new(&config.sidecar.pubsub, &config.api_prefix);

    Router::new()
        .nest(&config.api_prefix, api_routes)
        .merge(events::create_subscription_router(subscriptions))
        .nest("/health", health::create_router(store))
        .route("/metrics", get(metrics_handler))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors_layer(&config.api))
                .layer(from_fn(observability_middleware))
                .layer(TraceLayer::new_for_http()),
        )
}
