//! Document store contract.
//!
//! The store speaks raw JSON documents grouped by [`EntityKind`]; the typed
//! helpers below decode them into [`Document`] types.

use async_trait::async_trait;
use revista_core::{Document, EntityKind, NaturalKey, RevistaResult, StorageError};
use serde_json::Value;

/// Async document store used by loaders, services and the claim source.
///
/// Queries never fail because nothing matched: an empty `Vec` is returned.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents whose `id` is one of `ids`, in store order.
    async fn find_by_ids(&self, kind: EntityKind, ids: &[NaturalKey]) -> RevistaResult<Vec<Value>>;

    /// Documents whose string `field` equals one of `values`, in store order.
    async fn find_by_field(
        &self,
        kind: EntityKind,
        field: &str,
        values: &[String],
    ) -> RevistaResult<Vec<Value>>;

    /// Insert a new document. Fails if its `id` is already taken.
    async fn insert(&self, kind: EntityKind, document: Value) -> RevistaResult<()>;

    /// Replace an existing document.
    async fn replace(&self, kind: EntityKind, id: &NaturalKey, document: Value)
        -> RevistaResult<()>;
}

/// Decode a raw document into `T`.
pub fn decode<T: Document>(value: Value) -> RevistaResult<T> {
    serde_json::from_value(value).map_err(|e| {
        StorageError::MalformedDocument {
            kind: T::KIND,
            reason: e.to_string(),
        }
        .into()
    })
}

fn encode<T: Document>(document: &T) -> RevistaResult<Value> {
    serde_json::to_value(document).map_err(|e| {
        StorageError::MalformedDocument {
            kind: T::KIND,
            reason: e.to_string(),
        }
        .into()
    })
}

pub async fn find_by_ids<T: Document>(
    store: &dyn DocumentStore,
    ids: &[NaturalKey],
) -> RevistaResult<Vec<T>> {
    store
        .find_by_ids(T::KIND, ids)
        .await?
        .into_iter()
        .map(decode)
        .collect()
}

pub async fn find_one<T: Document>(
    store: &dyn DocumentStore,
    id: &NaturalKey,
) -> RevistaResult<Option<T>> {
    let mut found = find_by_ids::<T>(store, std::slice::from_ref(id)).await?;
    Ok(if found.is_empty() {
        None
    } else {
        Some(found.swap_remove(0))
    })
}

pub async fn find_by_field<T: Document>(
    store: &dyn DocumentStore,
    field: &str,
    values: &[String],
) -> RevistaResult<Vec<T>> {
    store
        .find_by_field(T::KIND, field, values)
        .await?
        .into_iter()
        .map(decode)
        .collect()
}

pub async fn insert_document<T: Document>(store: &dyn DocumentStore, document: &T) -> RevistaResult<()> {
    store.insert(T::KIND, encode(document)?).await
}

pub async fn replace_document<T: Document>(
    store: &dyn DocumentStore,
    document: &T,
) -> RevistaResult<()> {
    store.replace(T::KIND, document.id(), encode(document)?).await
}
