//! Per-request loader handles: batching plus request-scoped memoization.

use std::fmt;
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt};
use revista_core::{LoaderError, LookupKey, RevistaResult};

use crate::batch::Batcher;
use crate::cache::{LoaderId, PendingLoad, RequestCache};
use crate::config::BatchConfig;
use crate::fetch::{BatchFetch, Grouped, GroupedFetch};

/// Loads single values by key for one request.
///
/// Repeated keys within the request are served from the [`RequestCache`];
/// new keys are collected by the loader's [`Batcher`] and fetched together.
pub struct DataLoader<F: BatchFetch> {
    id: LoaderId,
    batcher: Batcher<F>,
    cache: Arc<RequestCache>,
}

impl<F: BatchFetch> fmt::Debug for DataLoader<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataLoader")
            .field("id", &self.id)
            .field("batcher", &self.batcher)
            .finish()
    }
}

impl<F: BatchFetch> DataLoader<F> {
    pub fn new(fetcher: Arc<F>, config: BatchConfig, cache: Arc<RequestCache>) -> Self {
        Self {
            id: LoaderId::of::<F>(fetcher.name()),
            batcher: Batcher::new(fetcher, config),
            cache,
        }
    }

    pub fn id(&self) -> LoaderId {
        self.id
    }

    pub fn batcher(&self) -> &Batcher<F> {
        &self.batcher
    }

    /// Load one value. `Ok(None)` means the key does not exist.
    pub fn load(&self, key: LookupKey) -> PendingLoad<Option<F::Value>> {
        let expected = self.batcher.fetcher().kind();
        if key.kind() != expected {
            let err = LoaderError::KindMismatch {
                loader: self.id.name(),
                expected,
                key,
            };
            return future::ready(Err(err.into())).boxed().shared();
        }

        let batcher = &self.batcher;
        self.cache
            .get_or_create(self.id, &key, || batcher.enqueue(key.clone()))
            .unwrap_or_else(|err| future::ready(Err(err)).boxed().shared())
    }

    /// Load several values, returned in the order the keys were given.
    ///
    /// All keys are registered before the returned future is first polled.
    pub fn load_many(
        &self,
        keys: impl IntoIterator<Item = LookupKey>,
    ) -> BoxFuture<'static, RevistaResult<Vec<Option<F::Value>>>> {
        let pending: Vec<_> = keys.into_iter().map(|key| self.load(key)).collect();
        future::try_join_all(pending).boxed()
    }
}

/// Loads ordered child lists by parent key for one request.
pub struct GroupedLoader<G: GroupedFetch> {
    inner: DataLoader<Grouped<G>>,
}

impl<G: GroupedFetch> fmt::Debug for GroupedLoader<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupedLoader")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<G: GroupedFetch> GroupedLoader<G> {
    pub fn new(fetcher: Arc<G>, config: BatchConfig, cache: Arc<RequestCache>) -> Self {
        Self {
            inner: DataLoader::new(Arc::new(Grouped(fetcher)), config, cache),
        }
    }

    pub fn id(&self) -> LoaderId {
        self.inner.id()
    }

    /// Number of batches this loader has opened so far.
    pub fn batches_opened(&self) -> u64 {
        self.inner.batcher().batches_opened()
    }

    /// Children of `parent`, in fetch order. A parent the fetch did not
    /// mention has no children.
    pub fn load(&self, parent: LookupKey) -> BoxFuture<'static, RevistaResult<Vec<G::Child>>> {
        let pending = self.inner.load(parent);
        async move { Ok(pending.await?.unwrap_or_default()) }.boxed()
    }

    pub fn load_many(
        &self,
        parents: impl IntoIterator<Item = LookupKey>,
    ) -> BoxFuture<'static, RevistaResult<Vec<Vec<G::Child>>>> {
        let pending: Vec<_> = parents.into_iter().map(|parent| self.load(parent)).collect();
        future::try_join_all(pending).boxed()
    }
}
