//! Batch collector and dispatcher.
//!
//! A [`Batcher`] owns at most one *accumulating* batch at a time. Every
//! [`Batcher::enqueue`] call adds its key to that batch (deduplicated) and
//! gets back a future bound to the batch's single dispatch. The dispatch is a
//! shared future: whichever waiter polls it drives the window timer and then
//! the one fetch call, and every waiter observes the same outcome.
//!
//! Once the window elapses (or the batch fills up) the batch is sealed. Keys
//! requested afterwards open a fresh batch, so a request typically sees
//! several flush rounds as dependent fields resolve in waves.
//!
//! The batcher only holds a weak pointer to the accumulating batch. If every
//! waiter of a batch is dropped before it settles, the batch and its
//! in-flight fetch are dropped with them.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use futures_util::future::{self, BoxFuture, FutureExt, Shared};
use revista_core::{LoaderError, LookupKey, RevistaResult};
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::config::BatchConfig;
use crate::fetch::{BatchFetch, KeySet};

/// Settled outcome of one batch, shared by all of its waiters.
type BatchOutcome<V> = RevistaResult<Arc<HashMap<LookupKey, V>>>;

type Dispatch<V> = Shared<BoxFuture<'static, BatchOutcome<V>>>;

/// Future returned for one enqueued key. `Ok(None)` means the fetch succeeded
/// but had nothing for that key.
pub type PendingValue<V> = BoxFuture<'static, RevistaResult<Option<V>>>;

#[derive(Debug, Default)]
struct KeyBuffer {
    keys: KeySet,
    sealed: bool,
}

enum Admission {
    Accepted,
    /// Accepted, and the batch is now full.
    AcceptedLast,
    Closed,
}

struct Batch<V> {
    id: u64,
    buffer: Arc<Mutex<KeyBuffer>>,
    full: Arc<Notify>,
    dispatch: Dispatch<V>,
}

impl<V> fmt::Debug for Batch<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("id", &self.id)
            .field("buffer", &self.buffer)
            .field("dispatch", &"<shared future>")
            .finish()
    }
}

impl<V: Clone + Send + Sync + 'static> Batch<V> {
    fn open<F>(id: u64, fetcher: Arc<F>, config: &BatchConfig) -> Self
    where
        F: BatchFetch<Value = V>,
    {
        let buffer = Arc::new(Mutex::new(KeyBuffer::default()));
        let full = Arc::new(Notify::new());
        let deadline = Instant::now() + config.window;

        let dispatch = run_batch(id, fetcher, Arc::clone(&buffer), Arc::clone(&full), deadline)
            .boxed()
            .shared();

        Self {
            id,
            buffer,
            full,
            dispatch,
        }
    }

    fn try_add(
        &self,
        key: &LookupKey,
        loader: &'static str,
        config: &BatchConfig,
    ) -> RevistaResult<Admission> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| LoaderError::LockPoisoned { loader })?;

        if buffer.sealed {
            return Ok(Admission::Closed);
        }
        if buffer.keys.contains(key) {
            return Ok(Admission::Accepted);
        }
        let max = config.max_batch_size.map(|m| m.get());
        if matches!(max, Some(max) if buffer.keys.len() >= max) {
            return Ok(Admission::Closed);
        }

        buffer.keys.insert(key.clone());
        if matches!(max, Some(max) if buffer.keys.len() >= max) {
            self.full.notify_one();
            return Ok(Admission::AcceptedLast);
        }
        Ok(Admission::Accepted)
    }
}

/// Waits out the window, seals the buffer and performs the one fetch.
async fn run_batch<F: BatchFetch>(
    id: u64,
    fetcher: Arc<F>,
    buffer: Arc<Mutex<KeyBuffer>>,
    full: Arc<Notify>,
    deadline: Instant,
) -> BatchOutcome<F::Value> {
    tokio::select! {
        _ = tokio::time::sleep_until(deadline) => {}
        _ = full.notified() => {}
    }

    let keys = {
        let mut buffer = buffer.lock().map_err(|_| LoaderError::LockPoisoned {
            loader: fetcher.name(),
        })?;
        buffer.sealed = true;
        std::mem::take(&mut buffer.keys)
    };

    tracing::debug!(
        loader = fetcher.name(),
        batch = id,
        keys = keys.len(),
        "Dispatching batch"
    );

    match fetcher.fetch_many(&keys).await {
        Ok(values) => Ok(Arc::new(values)),
        Err(err) => {
            tracing::warn!(
                loader = fetcher.name(),
                batch = id,
                keys = keys.len(),
                error = %err,
                "Batch fetch failed"
            );
            Err(err)
        }
    }
}

/// Collects keys for one loader type and flushes them as batched fetches.
pub struct Batcher<F: BatchFetch> {
    fetcher: Arc<F>,
    config: BatchConfig,
    current: Mutex<Weak<Batch<F::Value>>>,
    next_batch_id: AtomicU64,
}

impl<F: BatchFetch> fmt::Debug for Batcher<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batcher")
            .field("loader", &self.fetcher.name())
            .field("config", &self.config)
            .field("batches_opened", &self.batches_opened())
            .finish()
    }
}

impl<F: BatchFetch> Batcher<F> {
    pub fn new(fetcher: Arc<F>, config: BatchConfig) -> Self {
        Self {
            fetcher,
            config,
            current: Mutex::new(Weak::new()),
            next_batch_id: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.fetcher.name()
    }

    pub fn fetcher(&self) -> &Arc<F> {
        &self.fetcher
    }

    /// Number of batches this collector has opened so far.
    pub fn batches_opened(&self) -> u64 {
        self.next_batch_id.load(Ordering::Relaxed)
    }

    /// Register `key` with the accumulating batch and return its result.
    ///
    /// Registration happens before this returns, so keys enqueued back to
    /// back always share a batch even if nothing has been polled yet.
    pub fn enqueue(&self, key: LookupKey) -> PendingValue<F::Value> {
        let batch = match self.join_current(&key) {
            Ok(batch) => batch,
            Err(err) => return future::ready(Err(err)).boxed(),
        };

        async move {
            let values = batch.dispatch.clone().await?;
            Ok(values.get(&key).cloned())
        }
        .boxed()
    }

    fn join_current(&self, key: &LookupKey) -> RevistaResult<Arc<Batch<F::Value>>> {
        let loader = self.fetcher.name();
        let mut current = self
            .current
            .lock()
            .map_err(|_| LoaderError::LockPoisoned { loader })?;

        if let Some(batch) = current.upgrade() {
            match batch.try_add(key, loader, &self.config)? {
                Admission::Accepted => return Ok(batch),
                Admission::AcceptedLast => {
                    *current = Weak::new();
                    return Ok(batch);
                }
                Admission::Closed => {}
            }
        }

        let id = self.next_batch_id.fetch_add(1, Ordering::Relaxed);
        let batch = Arc::new(Batch::open(id, Arc::clone(&self.fetcher), &self.config));
        *current = match batch.try_add(key, loader, &self.config)? {
            Admission::Accepted => Arc::downgrade(&batch),
            Admission::AcceptedLast | Admission::Closed => Weak::new(),
        };
        Ok(batch)
    }
}
