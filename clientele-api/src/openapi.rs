//! OpenAPI Specification for the Clientele API
//!
//! Generated by utoipa from the route annotations and schema derives.

use utoipa::OpenApi;

use crate::config::DEFAULT_API_PREFIX;
use crate::error::{ApiError, ErrorCode};
use crate::routes::customer::{self, DeleteResponse};
use crate::routes::events::{self, DeliveryAck, Subscription};
use crate::routes::health::{self, ComponentHealth, HealthDetails, HealthResponse, HealthStatus};
use crate::telemetry::metrics;

use clientele_core::{Customer, CustomerFields};
use clientele_events::DeliveredEvent;

/// OpenAPI document for the Clientele API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Customer Management Service",
        description = "Customer CRUD with a read-through sidecar cache and change events",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8000", description = "Local Development")
    ),
    tags(
        (name = "Customers", description = "Customer records"),
        (name = "Events", description = "Pub/sub subscription and delivery"),
        (name = "Health", description = "Liveness and readiness checks"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        customer::create_customer,
        customer::list_customers,
        customer::get_customer,
        customer::update_customer,
        customer::delete_customer,
        events::receive_customer_event,
        events::list_subscriptions,
        health::ping,
        health::liveness,
        health::readiness,
        metrics::metrics_handler,
    ),
    components(schemas(
        Customer,
        CustomerFields,
        DeleteResponse,
        DeliveredEvent,
        DeliveryAck,
        Subscription,
        HealthResponse,
        HealthStatus,
        HealthDetails,
        ComponentHealth,
        ApiError,
        ErrorCode,
    ))
)]
pub struct ApiDoc;

impl ApiDoc {
    /// The document with every prefixed path rebased onto `prefix`.
    ///
    /// Route annotations are written against [`DEFAULT_API_PREFIX`].
    pub fn for_prefix(prefix: &str) -> utoipa::openapi::OpenApi {
        let mut doc = Self::openapi();
        if prefix != DEFAULT_API_PREFIX {
            doc.paths.paths = std::mem::take(&mut doc.paths.paths)
                .into_iter()
                .map(|(path, item)| match path.strip_prefix(DEFAULT_API_PREFIX) {
                    Some(rest) => (format!("{}{}", prefix, rest), item),
                    None => (path, item),
                })
                .collect();
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_has_schemas() {
        let doc = ApiDoc::openapi();
        let schemas = doc.components.map(|c| c.schemas).unwrap_or_default();
        assert!(schemas.contains_key("Customer"));
        assert!(schemas.contains_key("ApiError"));
        assert_eq!(doc.info.title, "Customer Management Service");
    }

    #[test]
    fn test_for_prefix_rebases_api_paths_only() {
        let doc = ApiDoc::for_prefix("/v2");
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/v2/customers"));
        assert!(paths.contains_key("/v2/customers/{id}"));
        assert!(paths.contains_key("/v2/customers/events/customer"));
        assert!(paths.contains_key("/dapr/subscribe"));
        assert!(paths.contains_key("/health/ready"));
        assert!(!paths.keys().any(|p| p.starts_with(DEFAULT_API_PREFIX)));
    }

    #[test]
    fn test_customer_timestamps_are_date_time_strings() -> Result<(), serde_json::Error> {
        let doc = serde_json::to_value(ApiDoc::openapi())?;
        let props = &doc["components"]["schemas"]["Customer"]["properties"];
        assert_eq!(props["created_at"]["format"], "date-time");
        assert_eq!(props["updated_at"]["format"], "date-time");
        Ok(())
    }

    #[test]
    fn test_for_default_prefix_is_unchanged() {
        assert_eq!(ApiDoc::for_prefix(DEFAULT_API_PREFIX), ApiDoc::openapi());
    }
}
