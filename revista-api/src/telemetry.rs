//! Tracing subscriber initialization.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

/// Install the global JSON subscriber. Call once at startup.
///
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() -> ApiResult<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("revista_api=debug,revista_loader=debug,tower_http=debug,info")
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Tracing initialized");
    Ok(())
}
