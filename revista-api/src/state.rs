//! Shared application state for Axum routers.

use std::sync::Arc;

use crate::auth::AuthConfig;
use crate::context::ServiceConfig;
use crate::routes::graphql::{create_schema, RevistaSchema};

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub schema: RevistaSchema,
    /// Collaborators every request context is built from.
    pub service: ServiceConfig,
    pub auth: Arc<AuthConfig>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(service: ServiceConfig, auth: AuthConfig) -> Self {
        Self {
            schema: create_schema(),
            service,
            auth: Arc::new(auth),
            start_time: std::time::Instant::now(),
        }
    }
}
