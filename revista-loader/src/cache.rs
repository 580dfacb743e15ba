//! Request-scoped memoization of loader results.
//!
//! One [`RequestCache`] is created per inbound request and dropped with it.
//! Each (loader, key) pair maps to a shared pending load: the first caller
//! creates it, every later caller in the same request gets a clone of the
//! same future, and once it settles its result never changes.

use std::any::{Any, TypeId};
use std::fmt;

use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use revista_core::{LoaderError, LookupKey, RevistaResult};

/// A memoized load: clone it to await the same result again.
pub type PendingLoad<V> = Shared<BoxFuture<'static, RevistaResult<V>>>;

/// Identifies one loader type inside the request cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoaderId {
    type_id: TypeId,
    name: &'static str,
}

impl LoaderId {
    pub fn of<F: 'static>(name: &'static str) -> Self {
        Self {
            type_id: TypeId::of::<F>(),
            name,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Pending,
    Settled,
}

type Erased = Box<dyn Any + Send + Sync>;

/// Per-request memo table of (loader, key) to pending load.
#[derive(Default)]
pub struct RequestCache {
    entries: DashMap<(LoaderId, LookupKey), Erased>,
}

impl fmt::Debug for RequestCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the memoized load for `(loader, key)`, calling `producer` only
    /// if this request has not asked for it before.
    ///
    /// The entry is inserted while its map shard is locked, so concurrent
    /// first accesses still invoke `producer` exactly once.
    pub fn get_or_create<V, P>(
        &self,
        loader: LoaderId,
        key: &LookupKey,
        producer: P,
    ) -> RevistaResult<PendingLoad<V>>
    where
        V: Clone + Send + Sync + 'static,
        P: FnOnce() -> BoxFuture<'static, RevistaResult<V>>,
    {
        let entry = self
            .entries
            .entry((loader, key.clone()))
            .or_insert_with(|| {
                let pending: PendingLoad<V> = producer().shared();
                Box::new(pending)
            });

        let erased: &(dyn Any + Send + Sync) = entry.value().as_ref();
        erased
            .downcast_ref::<PendingLoad<V>>()
            .cloned()
            .ok_or_else(|| {
                LoaderError::CacheTypeMismatch {
                    loader: loader.name(),
                }
                .into()
            })
    }

    /// State of an entry, or `None` if this request never asked for it.
    pub fn state<V>(&self, loader: LoaderId, key: &LookupKey) -> Option<EntryState>
    where
        V: Clone + Send + Sync + 'static,
    {
        let entry = self.entries.get(&(loader, key.clone()))?;
        let erased: &(dyn Any + Send + Sync) = entry.value().as_ref();
        let pending = erased.downcast_ref::<PendingLoad<V>>()?;
        Some(match pending.peek() {
            Some(_) => EntryState::Settled,
            None => EntryState::Pending,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Articles;
    struct Authors;

    #[tokio::test]
    async fn test_producer_runs_once_per_key() -> RevistaResult<()> {
        let cache = RequestCache::new();
        let calls = AtomicUsize::new(0);
        let loader = LoaderId::of::<Articles>("articles");
        let key = LookupKey::article("a1");

        let produce = || {
            calls.fetch_add(1, Ordering::SeqCst);
            future::ready(Ok::<_, revista_core::RevistaError>(7u32)).boxed()
        };

        let first = cache.get_or_create(loader, &key, produce)?;
        let second = cache.get_or_create(loader, &key, produce)?;

        assert_eq!(first.await?, 7);
        assert_eq!(second.await?, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_loaders_are_partitioned() -> RevistaResult<()> {
        let cache = RequestCache::new();
        let key = LookupKey::article("shared");

        let articles = cache.get_or_create(LoaderId::of::<Articles>("articles"), &key, || {
            future::ready(Ok::<_, revista_core::RevistaError>("article")).boxed()
        })?;
        let authors = cache.get_or_create(LoaderId::of::<Authors>("authors"), &key, || {
            future::ready(Ok::<_, revista_core::RevistaError>("author")).boxed()
        })?;

        assert_eq!(articles.await?, "article");
        assert_eq!(authors.await?, "author");
        assert_eq!(cache.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_entry_settles_once() -> RevistaResult<()> {
        let cache = RequestCache::new();
        let loader = LoaderId::of::<Articles>("articles");
        let key = LookupKey::article("a1");

        assert_eq!(cache.state::<u32>(loader, &key), None);

        let pending = cache.get_or_create(loader, &key, || {
            future::ready(Ok::<_, revista_core::RevistaError>(1u32)).boxed()
        })?;
        assert_eq!(cache.state::<u32>(loader, &key), Some(EntryState::Pending));

        assert_eq!(pending.await?, 1);
        assert_eq!(cache.state::<u32>(loader, &key), Some(EntryState::Settled));

        // A second producer would have returned something else; it is never run.
        let again = cache.get_or_create(loader, &key, || {
            future::ready(Ok::<_, revista_core::RevistaError>(2u32)).boxed()
        })?;
        assert_eq!(again.await?, 1);
        Ok(())
    }

    #[test]
    fn test_type_mismatch_is_reported() {
        let cache = RequestCache::new();
        let loader = LoaderId::of::<Articles>("articles");
        let key = LookupKey::article("a1");

        let _ = cache.get_or_create(loader, &key, || {
            future::ready(Ok::<_, revista_core::RevistaError>(1u32)).boxed()
        });
        let result = cache.get_or_create(loader, &key, || {
            future::ready(Ok::<_, revista_core::RevistaError>("text")).boxed()
        });

        assert!(matches!(
            result,
            Err(revista_core::RevistaError::Loader(
                LoaderError::CacheTypeMismatch { loader: "articles" }
            ))
        ));
    }
}
