//! Per-process collaborators and per-request context.

use std::sync::Arc;

use revista_core::ClaimSource;
use revista_loader::BatchConfig;
use revista_storage::{DocumentStore, StaffClaimSource};
use uuid::Uuid;

use crate::identity::{IdentityResolver, Principal, ResolvedIdentity};
use crate::loaders::{Fetchers, Loaders};

/// Collaborator handles assembled once at process start and handed to every
/// request explicitly.
#[derive(Clone)]
pub struct ServiceConfig {
    store: Arc<dyn DocumentStore>,
    identity: Arc<IdentityResolver>,
    fetchers: Fetchers,
    batch: BatchConfig,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("store", &"<DocumentStore>")
            .field("identity", &self.identity)
            .field("fetchers", &self.fetchers)
            .field("batch", &self.batch)
            .finish()
    }
}

impl ServiceConfig {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        claim_source: Arc<dyn ClaimSource>,
        batch: BatchConfig,
    ) -> Self {
        Self {
            fetchers: Fetchers::from_store(Arc::clone(&store)),
            identity: Arc::new(IdentityResolver::new(claim_source)),
            store,
            batch,
        }
    }

    /// Staff records are read from the same store as everything else.
    pub fn with_store(store: Arc<dyn DocumentStore>, batch: BatchConfig) -> Self {
        let claim_source: Arc<dyn ClaimSource> =
            Arc::new(StaffClaimSource::new(Arc::clone(&store)));
        Self::new(store, claim_source, batch)
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn identity(&self) -> &IdentityResolver {
        &self.identity
    }

    pub fn batch(&self) -> BatchConfig {
        self.batch
    }
}

/// Everything a resolver needs while one request executes.
///
/// Identity is resolved exactly once, when the context is built; loaders and
/// their cache live and die with the context.
pub struct RequestContext {
    pub request_id: Uuid,
    pub identity: ResolvedIdentity,
    pub loaders: Loaders,
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("identity", &self.identity)
            .field("loaders", &self.loaders)
            .finish_non_exhaustive()
    }
}

impl RequestContext {
    pub async fn new(service: &ServiceConfig, principal: Principal) -> Self {
        Self::with_request_id(service, principal, Uuid::now_v7()).await
    }

    pub async fn with_request_id(
        service: &ServiceConfig,
        principal: Principal,
        request_id: Uuid,
    ) -> Self {
        let identity = service.identity().resolve(&principal).await;
        tracing::debug!(
            request_id = %request_id,
            state = ?identity.state,
            "Request identity resolved"
        );
        Self {
            request_id,
            identity,
            loaders: Loaders::new(&service.fetchers, service.batch),
            store: Arc::clone(&service.store),
        }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }
}
