//! Prometheus Metrics Definitions
//!
//! Defines all Clientele metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    Encoder, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance - initialized once on first use
pub static METRICS: Lazy<ApiResult<ServiceMetrics>> = Lazy::new(ServiceMetrics::new);

/// The registered metrics, or `None` if registration failed.
///
/// Recording is never allowed to affect request handling.
pub fn metrics() -> Option<&'static ServiceMetrics> {
    METRICS.as_ref().ok()
}

/// Container for all Clientele metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Customer operation counter - labels: operation, outcome
    pub customer_operations_total: CounterVec,

    /// Sidecar call counter - labels: operation, status
    pub sidecar_operations_total: CounterVec,

    /// Failed record store connection attempts during startup
    pub db_connection_failures_total: Counter,
}

impl ServiceMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "clientele_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_requests_total: {}", e)))?,

            http_request_duration_seconds: register_histogram_vec!(
                "clientele_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_request_duration_seconds: {}", e)))?,

            customer_operations_total: register_counter_vec!(
                "clientele_customer_operations_total",
                "Total customer operations by outcome",
                &["operation", "outcome"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register customer_operations_total: {}", e)))?,

            sidecar_operations_total: register_counter_vec!(
                "clientele_sidecar_operations_total",
                "Total cache and pub/sub sidecar calls",
                &["operation", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register sidecar_operations_total: {}", e)))?,

            db_connection_failures_total: register_counter!(
                "clientele_db_connection_failures_total",
                "Total failed database connection attempts"
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register db_connection_failures_total: {}", e)))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, status_str.as_str()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record the outcome of a customer operation (`ok`, `not_found`, `error`).
    pub fn record_customer_operation(&self, operation: &str, outcome: &str) {
        self.customer_operations_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    /// Record a sidecar call such as `cache_get`, `cache_set` or `publish`.
    pub fn record_sidecar_operation(&self, operation: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.sidecar_operations_total
            .with_label_values(&[operation, status])
            .inc();
    }

    /// Count a failed connection attempt to the record store.
    pub fn record_db_connection_failure(&self) {
        self.db_connection_failures_total.inc();
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
)]
pub async fn metrics_handler() -> impl IntoResponse {
    // Register the service metrics before the first scrape.
    let _ = metrics();

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::Collector;

    fn registered() -> Result<&'static ServiceMetrics, String> {
        METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))
    }

    #[test]
    fn test_metrics_creation() -> Result<(), String> {
        let metrics = registered()?;
        assert!(!metrics.http_requests_total.desc().is_empty());
        Ok(())
    }

    #[test]
    fn test_record_http_request() -> Result<(), String> {
        let metrics = registered()?;
        metrics.record_http_request("GET", "/api/v1/customers/:id", 200, 0.015);
        let count = metrics
            .http_requests_total
            .with_label_values(&["GET", "/api/v1/customers/:id", "200"])
            .get();
        assert!(count >= 1.0);
        Ok(())
    }

    #[test]
    fn test_record_sidecar_operation() -> Result<(), String> {
        let metrics = registered()?;
        let before = metrics
            .sidecar_operations_total
            .with_label_values(&["publish", "error"])
            .get();
        metrics.record_sidecar_operation("publish", false);
        let after = metrics
            .sidecar_operations_total
            .with_label_values(&["publish", "error"])
            .get();
        assert!(after > before);
        Ok(())
    }

    #[test]
    fn test_db_connection_failures_counter() -> Result<(), String> {
        let metrics = registered()?;
        let before = metrics.db_connection_failures_total.get();
        metrics.record_db_connection_failure();
        assert!(metrics.db_connection_failures_total.get() > before);
        Ok(())
    }
}
