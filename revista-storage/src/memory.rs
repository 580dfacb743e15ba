//! In-memory document store.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use revista_core::{Document, EntityKind, NaturalKey, RevistaResult, StorageError};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::traits::DocumentStore;

#[derive(Debug, Default)]
struct Probe {
    reads: HashMap<EntityKind, usize>,
    unavailable: HashSet<EntityKind>,
}

/// Document store kept in process memory.
///
/// Collections keep insertion order. Every query is counted per kind, and a
/// kind can be marked unavailable so that its queries fail; both exist so
/// tests can observe batching and failure fan-out from the outside.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<EntityKind, Vec<Value>>>,
    probe: Mutex<Probe>,
}

fn document_id(value: &Value) -> Option<&str> {
    value.get("id").and_then(Value::as_str)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style seeding, usable outside a runtime.
    pub fn with_document<T: Document>(mut self, document: &T) -> RevistaResult<Self> {
        let value = serde_json::to_value(document).map_err(|e| StorageError::MalformedDocument {
            kind: T::KIND,
            reason: e.to_string(),
        })?;
        self.collections
            .get_mut()
            .entry(T::KIND)
            .or_default()
            .push(value);
        Ok(self)
    }

    pub fn with_documents<'a, T: Document>(
        self,
        documents: impl IntoIterator<Item = &'a T>,
    ) -> RevistaResult<Self> {
        documents
            .into_iter()
            .try_fold(self, |store, document| store.with_document(document))
    }

    /// Number of queries issued against `kind` so far.
    pub fn reads(&self, kind: EntityKind) -> usize {
        self.probe
            .lock()
            .map(|probe| probe.reads.get(&kind).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Make every query against `kind` fail with [`StorageError::Unavailable`].
    pub fn set_unavailable(&self, kind: EntityKind, unavailable: bool) {
        if let Ok(mut probe) = self.probe.lock() {
            if unavailable {
                probe.unavailable.insert(kind);
            } else {
                probe.unavailable.remove(&kind);
            }
        }
    }

    pub async fn count(&self, kind: EntityKind) -> usize {
        self.collections
            .read()
            .await
            .get(&kind)
            .map(Vec::len)
            .unwrap_or(0)
    }

    fn record_read(&self, kind: EntityKind) -> RevistaResult<()> {
        let mut probe = self.probe.lock().map_err(|_| StorageError::LockPoisoned)?;
        *probe.reads.entry(kind).or_insert(0) += 1;
        if probe.unavailable.contains(&kind) {
            return Err(StorageError::Unavailable {
                kind,
                reason: "collection marked unavailable".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_by_ids(&self, kind: EntityKind, ids: &[NaturalKey]) -> RevistaResult<Vec<Value>> {
        self.record_read(kind)?;
        let wanted: HashSet<&str> = ids.iter().map(NaturalKey::as_str).collect();
        let collections = self.collections.read().await;
        Ok(collections
            .get(&kind)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| document_id(doc).is_some_and(|id| wanted.contains(id)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_by_field(
        &self,
        kind: EntityKind,
        field: &str,
        values: &[String],
    ) -> RevistaResult<Vec<Value>> {
        self.record_read(kind)?;
        let wanted: HashSet<&str> = values.iter().map(String::as_str).collect();
        let collections = self.collections.read().await;
        Ok(collections
            .get(&kind)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| {
                        doc.get(field)
                            .and_then(Value::as_str)
                            .is_some_and(|v| wanted.contains(v))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, kind: EntityKind, document: Value) -> RevistaResult<()> {
        let id = document_id(&document)
            .map(NaturalKey::from)
            .ok_or_else(|| StorageError::MalformedDocument {
                kind,
                reason: "document has no string id".to_string(),
            })?;

        let mut collections = self.collections.write().await;
        let docs = collections.entry(kind).or_default();
        if docs.iter().any(|doc| document_id(doc) == Some(id.as_str())) {
            return Err(StorageError::DuplicateKey { kind, id }.into());
        }
        docs.push(document);
        tracing::debug!(kind = %kind, id = %id, "Document inserted");
        Ok(())
    }

    async fn replace(
        &self,
        kind: EntityKind,
        id: &NaturalKey,
        document: Value,
    ) -> RevistaResult<()> {
        let mut collections = self.collections.write().await;
        let slot = collections
            .get_mut(&kind)
            .and_then(|docs| docs.iter_mut().find(|doc| document_id(doc) == Some(id.as_str())))
            .ok_or_else(|| StorageError::MissingDocument {
                kind,
                id: id.clone(),
            })?;
        *slot = document;
        tracing::debug!(kind = %kind, id = %id, "Document replaced");
        Ok(())
    }
}
