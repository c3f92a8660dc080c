//! OpenTelemetry Tracer Initialization
//!
//! Sets up the OTLP exporter for distributed tracing compatible with:
//! - Jaeger
//! - Zipkin (via an OTLP collector)
//! - Grafana Tempo
//! - Any OTLP-compatible backend

use clientele_core::ConfigError;
use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
    Resource,
};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Env;
use crate::error::{ApiError, ApiResult};

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// OTLP HTTP endpoint for traces (e.g., "http://localhost:4318/v1/traces")
    pub otlp_endpoint: Option<String>,
    /// Service name for traces
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Environment (production, staging, development)
    pub environment: String,
    /// Trace sampling ratio (0.0 to 1.0)
    pub trace_sample_rate: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            service_name: "clientele-api".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            trace_sample_rate: 1.0,
        }
    }
}

impl TelemetryConfig {
    pub(crate) fn from_source(env: &Env<'_>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            otlp_endpoint: env.get("CLIENTELE_OTLP_ENDPOINT"),
            service_name: env.string("CLIENTELE_SERVICE_NAME", &defaults.service_name),
            service_version: env.string("CLIENTELE_SERVICE_VERSION", &defaults.service_version),
            environment: env.string("CLIENTELE_ENVIRONMENT", &defaults.environment),
            trace_sample_rate: env.parse("CLIENTELE_TRACE_SAMPLE_RATE", 1.0)?,
        })
    }

    /// Sampler for the configured ratio.
    pub fn sampler(&self) -> Sampler {
        if self.trace_sample_rate >= 1.0 {
            Sampler::AlwaysOn
        } else if self.trace_sample_rate <= 0.0 {
            Sampler::AlwaysOff
        } else {
            Sampler::TraceIdRatioBased(self.trace_sample_rate)
        }
    }
}

/// Initialize the OpenTelemetry tracer and tracing subscriber.
///
/// Call once at startup before any tracing occurs. Sets up:
/// - OTLP exporter for distributed traces (if endpoint configured)
/// - TraceContext propagation (W3C traceparent header)
/// - tracing-subscriber with a JSON fmt layer and the OpenTelemetry layer
///
/// Returns the provider so it can be flushed by [`shutdown_tracer`].
pub fn init_tracer(config: &TelemetryConfig) -> ApiResult<SdkTracerProvider> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let resource = Resource::builder()
        .with_service_name(config.service_name.clone())
        .with_attributes([
            KeyValue::new("service.version", config.service_version.clone()),
            KeyValue::new("deployment.environment", config.environment.clone()),
        ])
        .build();

    let builder = SdkTracerProvider::builder()
        .with_sampler(config.sampler())
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource);

    let tracer_provider = match &config.otlp_endpoint {
        Some(endpoint) => {
            let exporter = SpanExporter::builder()
                .with_http()
                .with_endpoint(endpoint.clone())
                .build()
                .map_err(|e| {
                    ApiError::internal_error(format!("Failed to create OTLP exporter: {}", e))
                })?;
            builder.with_batch_exporter(exporter).build()
        }
        // Spans are still created for local logging.
        None => builder.build(),
    };

    let tracer = tracer_provider.tracer("clientele-api");
    global::set_tracer_provider(tracer_provider.clone());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("clientele_api=debug,tower_http=debug,info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .with(OpenTelemetryLayer::new(tracer))
        .try_init()
        .map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        environment = %config.environment,
        otlp_endpoint = ?config.otlp_endpoint,
        "Telemetry initialized"
    );

    Ok(tracer_provider)
}

/// Flush pending spans and shut the provider down.
///
/// Should be called before application exit.
pub fn shutdown_tracer(provider: SdkTracerProvider) {
    if let Err(e) = provider.shutdown() {
        tracing::warn!(error = %e, "Tracer shutdown reported an error");
    }
    tracing::info!("Tracer shutdown complete");
}
