//! Clientele API Server Entry Point
//!
//! Loads configuration, waits for Postgres, ensures the schema and starts
//! the Axum HTTP server.

use std::sync::Arc;

use axum::Router;
use clientele_api::telemetry::{init_tracer, shutdown_tracer};
use clientele_api::{
    create_api_router, wait_for_store, ApiError, ApiResult, AppConfig, CustomerService,
    DaprSidecar, PgRecordStore,
};
use clientele_storage::RecordStore;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let config = AppConfig::from_env()
        .map_err(|e| ApiError::internal_error(format!("Invalid configuration: {}", e)))?;

    let tracer_provider = init_tracer(&config.telemetry)?;

    let pg = Arc::new(PgRecordStore::from_config(&config.db)?);
    wait_for_store(pg.as_ref(), &config.startup).await?;
    pg.ensure_schema().await?;

    let sidecar = Arc::new(DaprSidecar::new(&config.sidecar)?);
    let store: Arc<dyn RecordStore> = pg;
    let service = Arc::new(CustomerService::new(
        store.clone(),
        sidecar.clone(),
        sidecar,
    ));

    let app: Router = create_api_router(service, store, &config);

    let addr = config.bind_addr;
    tracing::info!(
        %addr,
        project = %config.project_name,
        prefix = %config.api_prefix,
        "Starting Clientele API server"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    shutdown_tracer(tracer_provider);
    Ok(())
}
