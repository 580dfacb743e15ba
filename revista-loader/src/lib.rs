//! Revista Loader - request-scoped batching for graph resolvers
//!
//! Resolving a graph query field by field naturally fans out into one lookup
//! per parent object (the N+1 problem). This crate collapses that fan-out:
//!
//! - A [`Batcher`] collects the keys that concurrently running resolvers
//!   request during one scheduling window and flushes them as a single call
//!   to a [`BatchFetch`] implementation, then hands every caller the value
//!   for its own key.
//! - A [`RequestCache`] memoizes (loader, key) to pending result for the
//!   lifetime of one inbound request, so a key is fetched at most once per
//!   request no matter how many resolvers ask for it.
//! - A [`DataLoader`] combines both for one loader type, and a
//!   [`GroupedLoader`] does the same for one-to-many associations through a
//!   [`GroupedFetch`] implementation.
//!
//! ## Usage
//!
//! ```ignore
//! let cache = Arc::new(RequestCache::new());
//! let authors = DataLoader::new(author_fetcher, BatchConfig::default(), cache.clone());
//!
//! // Inside concurrently executing resolvers:
//! let author = authors.load(LookupKey::author("au-1")).await?;
//! ```
//!
//! ## Outcomes
//!
//! - A key the fetch did not return resolves to `Ok(None)` (or an empty
//!   child list for grouped loaders). Whether absence is an error is the
//!   caller's decision.
//! - A failed fetch fails every caller waiting on that batch with the same
//!   error. No partial result is ever synthesized.
//! - Results are matched to callers by key identity, never by position.
//!
//! ## Scheduling
//!
//! All work is driven by polling the returned futures; nothing is spawned.
//! The window is a Tokio timer started when a batch opens, so loaders must be
//! polled inside a Tokio runtime with the time driver enabled. The request
//! cache keeps a handle on every pending load, so a batch's fetch lives as
//! long as the cache does: dropping the request (its cache and loaders)
//! cancels any fetch still outstanding, while dropping individual waiters
//! does not.
//!
//! Loaders, batchers and caches are `Send + Sync`, so resolvers may also run
//! on several worker threads; collector and cache mutation is guarded.
//!
//! There is no state shared between requests: build a fresh cache and fresh
//! loaders for every request.

mod batch;
mod cache;
mod config;
mod fetch;
mod loader;

pub use batch::{Batcher, PendingValue};
pub use cache::{EntryState, LoaderId, PendingLoad, RequestCache};
pub use config::BatchConfig;
pub use fetch::{BatchFetch, GroupedFetch, KeySet};
pub use loader::{DataLoader, GroupedLoader};
