//! Fetch contracts implemented by the persistence side.

use std::collections::{HashMap, HashSet};
use std::slice;
use std::sync::Arc;

use async_trait::async_trait;
use revista_core::{EntityKind, LookupKey, NaturalKey, RevistaResult};

/// The unique keys handed to one fetch call.
///
/// Keys keep the order in which they were first requested, but a fetcher must
/// not rely on it: results are matched back to callers by key identity only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: Vec<LookupKey>,
    seen: HashSet<LookupKey>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key. Returns `false` if it was already present.
    pub fn insert(&mut self, key: LookupKey) -> bool {
        if self.seen.contains(&key) {
            return false;
        }
        self.seen.insert(key.clone());
        self.keys.push(key);
        true
    }

    pub fn contains(&self, key: &LookupKey) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, LookupKey> {
        self.keys.iter()
    }

    /// Natural keys only, for stores that query a single collection.
    pub fn values(&self) -> impl Iterator<Item = &NaturalKey> + '_ {
        self.keys.iter().map(LookupKey::value)
    }

    pub fn as_slice(&self) -> &[LookupKey] {
        &self.keys
    }
}

impl FromIterator<LookupKey> for KeySet {
    fn from_iter<I: IntoIterator<Item = LookupKey>>(iter: I) -> Self {
        let mut set = KeySet::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

impl<'a> IntoIterator for &'a KeySet {
    type Item = &'a LookupKey;
    type IntoIter = slice::Iter<'a, LookupKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

/// Single-value fetch: one value per key.
///
/// Keys missing from the returned map resolve to "not found" for that key. An
/// `Err` fails every caller waiting on the batch.
#[async_trait]
pub trait BatchFetch: Send + Sync + 'static {
    type Value: Clone + Send + Sync + 'static;

    /// Loader name, used to partition the request cache and in logs.
    fn name(&self) -> &'static str;

    /// Kind every requested key must carry.
    fn kind(&self) -> EntityKind;

    async fn fetch_many(&self, keys: &KeySet) -> RevistaResult<HashMap<LookupKey, Self::Value>>;
}

/// One-to-many fetch: an ordered child list per parent key.
///
/// Child order is whatever the implementation returns; it is never changed on
/// the way back to callers. A parent missing from the map has no children.
#[async_trait]
pub trait GroupedFetch: Send + Sync + 'static {
    type Child: Clone + Send + Sync + 'static;

    fn name(&self) -> &'static str;

    /// Kind every parent key must carry.
    fn parent_kind(&self) -> EntityKind;

    async fn fetch_grouped(
        &self,
        parents: &KeySet,
    ) -> RevistaResult<HashMap<LookupKey, Vec<Self::Child>>>;
}

/// Runs a [`GroupedFetch`] through the single-value batching machinery.
pub(crate) struct Grouped<G>(pub(crate) Arc<G>);

#[async_trait]
impl<G: GroupedFetch> BatchFetch for Grouped<G> {
    type Value = Vec<G::Child>;

    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn kind(&self) -> EntityKind {
        self.0.parent_kind()
    }

    async fn fetch_many(&self, keys: &KeySet) -> RevistaResult<HashMap<LookupKey, Self::Value>> {
        self.0.fetch_grouped(keys).await
    }
}
