//! Revista API - GraphQL service over the document store
//!
//! Every inbound request gets its own [`RequestContext`]: the caller's
//! identity is resolved once, and a fresh set of batching loaders serves all
//! of the request's field resolvers. Failures leave resolvers through the
//! error mapper, so callers see stable `extensions.code` values.

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod loaders;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;

pub use auth::{
    authenticate_bearer, generate_jwt_token, validate_jwt_token, AuthConfig, FixedClock,
    JwtClock, SystemClock,
};
pub use config::ApiConfig;
pub use context::{RequestContext, ServiceConfig};
pub use error::{map_failure, ApiError, ApiResult, ErrorCode, FailureKind, IntoGraphQL};
pub use identity::{
    elevate, Claim, ClaimSet, IdentityResolver, IdentityState, Principal, ResolvedIdentity,
};
pub use loaders::{Fetchers, Loaders};
pub use routes::create_router;
pub use routes::graphql::{create_schema, RevistaSchema};
pub use state::AppState;
pub use telemetry::init_tracing;
