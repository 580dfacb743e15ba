//! Revista API Server Entry Point
//!
//! Bootstraps configuration and tracing, assembles the per-process
//! collaborators and starts the Axum HTTP server.

use std::sync::Arc;

use axum::Router;
use revista_api::{
    create_router, init_tracing, ApiConfig, ApiError, ApiResult, AppState, AuthConfig,
    ServiceConfig,
};
use revista_storage::{DocumentStore, MemoryStore};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing()?;

    let api_config = ApiConfig::from_env();
    let auth_config = AuthConfig::from_env();
    auth_config.validate_for_production()?;

    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let service = ServiceConfig::with_store(store, api_config.batch_config());
    let state = AppState::new(service, auth_config);

    let app: Router = create_router(state, &api_config);

    let addr = api_config.bind_addr()?;
    tracing::info!(%addr, "Starting Revista API server");

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

    Ok(())
}
