//! Revista Test Utilities
//!
//! Centralized test infrastructure for the Revista workspace:
//! - Recording fetchers and claim sources for batching and identity tests
//! - A seeded in-memory document store
//! - Proptest generators for keys and staff records

pub use revista_storage::MemoryStore;

pub use revista_core::{
    Article, ArticleHistory, ArticleStatus, Author, ClaimSource, EntityKind, Interaction,
    InteractionKind, LookupKey, NaturalKey, RevistaError, RevistaResult, Staff, StaffJob,
    StaffRecord, Timestamp, Volume,
};

use async_trait::async_trait;
use revista_loader::{BatchFetch, GroupedFetch, KeySet};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// MOCK FETCHERS
// ============================================================================

fn record(calls: &Mutex<Vec<Vec<LookupKey>>>, keys: &KeySet) {
    let mut calls = calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    calls.push(keys.as_slice().to_vec());
}

fn snapshot(calls: &Mutex<Vec<Vec<LookupKey>>>) -> Vec<Vec<LookupKey>> {
    calls
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Single-value fetcher backed by a fixed map that records every call.
#[derive(Debug)]
pub struct RecordingFetcher<V> {
    name: &'static str,
    kind: EntityKind,
    values: HashMap<LookupKey, V>,
    failure: Option<RevistaError>,
    latency: Option<Duration>,
    calls: Mutex<Vec<Vec<LookupKey>>>,
}

impl<V: Clone + Send + Sync + 'static> RecordingFetcher<V> {
    pub fn new(name: &'static str, kind: EntityKind) -> Self {
        Self {
            name,
            kind,
            values: HashMap::new(),
            failure: None,
            latency: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_value(mut self, key: LookupKey, value: V) -> Self {
        self.values.insert(key, value);
        self
    }

    pub fn with_values(mut self, values: impl IntoIterator<Item = (LookupKey, V)>) -> Self {
        self.values.extend(values);
        self
    }

    /// Every call fails with `error`.
    pub fn failing(mut self, error: RevistaError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Every call sleeps for `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Key lists of every call so far, in call order.
    pub fn calls(&self) -> Vec<Vec<LookupKey>> {
        snapshot(&self.calls)
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

#[async_trait]
impl<V: Clone + Send + Sync + 'static> BatchFetch for RecordingFetcher<V> {
    type Value = V;

    fn name(&self) -> &'static str {
        self.name
    }

    fn kind(&self) -> EntityKind {
        self.kind
    }

    async fn fetch_many(&self, keys: &KeySet) -> RevistaResult<HashMap<LookupKey, V>> {
        record(&self.calls, keys);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(keys
            .iter()
            .filter_map(|key| self.values.get(key).map(|v| (key.clone(), v.clone())))
            .collect())
    }
}

/// Grouped fetcher backed by a fixed map that records every call.
#[derive(Debug)]
pub struct RecordingGroupedFetcher<C> {
    name: &'static str,
    parent_kind: EntityKind,
    children: HashMap<LookupKey, Vec<C>>,
    failure: Option<RevistaError>,
    calls: Mutex<Vec<Vec<LookupKey>>>,
}

impl<C: Clone + Send + Sync + 'static> RecordingGroupedFetcher<C> {
    pub fn new(
        name: &'static str,
        parent_kind: EntityKind,
        children: impl IntoIterator<Item = (LookupKey, Vec<C>)>,
    ) -> Self {
        Self {
            name,
            parent_kind,
            children: children.into_iter().collect(),
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, error: RevistaError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<Vec<LookupKey>> {
        snapshot(&self.calls)
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

#[async_trait]
impl<C: Clone + Send + Sync + 'static> GroupedFetch for RecordingGroupedFetcher<C> {
    type Child = C;

    fn name(&self) -> &'static str {
        self.name
    }

    fn parent_kind(&self) -> EntityKind {
        self.parent_kind
    }

    async fn fetch_grouped(&self, parents: &KeySet) -> RevistaResult<HashMap<LookupKey, Vec<C>>> {
        record(&self.calls, parents);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(parents
            .iter()
            .filter_map(|key| self.children.get(key).map(|c| (key.clone(), c.clone())))
            .collect())
    }
}

// ============================================================================
// MOCK CLAIM SOURCES
// ============================================================================

/// Claim source answering from a fixed table and counting lookups.
#[derive(Debug, Default)]
pub struct StaticClaimSource {
    records: HashMap<String, StaffRecord>,
    lookups: AtomicUsize,
}

impl StaticClaimSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_staff(mut self, subject_id: impl Into<String>, record: StaffRecord) -> Self {
        self.records.insert(subject_id.into(), record);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClaimSource for StaticClaimSource {
    async fn lookup(&self, subject_id: &str) -> RevistaResult<Option<StaffRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.get(subject_id).cloned())
    }
}

/// Claim source that always fails.
#[derive(Debug, Default)]
pub struct FailingClaimSource;

#[async_trait]
impl ClaimSource for FailingClaimSource {
    async fn lookup(&self, _subject_id: &str) -> RevistaResult<Option<StaffRecord>> {
        Err(RevistaError::ClaimSource("staff directory offline".to_string()))
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! A small journal: two volumes, four articles, their authors, history,
    //! comment threads and editorial staff.

    use super::*;
    use revista_core::Editorial;

    pub const VOLUME_1: &str = "v-1";
    pub const VOLUME_2: &str = "v-2";

    pub const AUTHOR_1: &str = "au-1";
    pub const AUTHOR_2: &str = "au-2";
    pub const AUTHOR_3: &str = "au-3";

    /// Published in volume 1, written by authors 1 and 2.
    pub const ARTICLE_1: &str = "a-1";
    /// Published in volume 1, written by author 2.
    pub const ARTICLE_2: &str = "a-2";
    /// In review, assigned to volume 2, written by authors 1 and 3.
    pub const ARTICLE_3: &str = "a-3";
    /// Draft without a volume, written by author 3.
    pub const ARTICLE_4: &str = "a-4";

    pub const EDITORIAL_1: &str = "ed-1";

    /// Top-level comment on article 1.
    pub const COMMENT_1: &str = "i-1";
    /// Reply to comment 1.
    pub const REPLY_1: &str = "i-2";
    /// Top-level comment on article 2.
    pub const COMMENT_2: &str = "i-3";
    /// Second top-level comment on article 1.
    pub const COMMENT_3: &str = "i-4";

    pub const EDITOR_USER: &str = "editor-1";
    pub const REVIEWER_USER: &str = "reviewer-1";
    pub const FORMER_EDITOR_USER: &str = "former-1";
    pub const READER_USER: &str = "reader-1";

    /// 2024-01-01T00:00:00Z
    pub fn fixed_time() -> Timestamp {
        chrono::DateTime::from_timestamp(1_704_067_200, 0).unwrap_or_default()
    }

    fn key(id: &str) -> NaturalKey {
        NaturalKey::new(id)
    }

    pub fn volumes() -> Vec<Volume> {
        vec![
            Volume {
                id: key(VOLUME_1),
                edition: 1,
                year: 2023,
                title: "Foundations".to_string(),
            },
            Volume {
                id: key(VOLUME_2),
                edition: 2,
                year: 2024,
                title: "Practice".to_string(),
            },
        ]
    }

    pub fn authors() -> Vec<Author> {
        [(AUTHOR_1, "Ada"), (AUTHOR_2, "Grace"), (AUTHOR_3, "Barbara")]
            .into_iter()
            .map(|(id, name)| Author {
                id: key(id),
                user_id: format!("user-{}", id),
                name: name.to_string(),
            })
            .collect()
    }

    fn article(
        id: &str,
        status: ArticleStatus,
        volume: Option<&str>,
        authors: &[&str],
    ) -> Article {
        Article {
            id: key(id),
            title: format!("Article {}", id),
            summary: format!("Summary of {}", id),
            status,
            author_ids: authors.iter().map(|a| key(a)).collect(),
            editorial_id: None,
            volume_id: volume.map(key),
            current_history_id: None,
            created_at: fixed_time(),
        }
    }

    pub fn articles() -> Vec<Article> {
        let mut first = article(
            ARTICLE_1,
            ArticleStatus::Published,
            Some(VOLUME_1),
            &[AUTHOR_1, AUTHOR_2],
        );
        first.editorial_id = Some(key(EDITORIAL_1));
        first.current_history_id = Some(key("h-2"));

        vec![
            first,
            article(ARTICLE_2, ArticleStatus::Published, Some(VOLUME_1), &[AUTHOR_2]),
            article(
                ARTICLE_3,
                ArticleStatus::InReview,
                Some(VOLUME_2),
                &[AUTHOR_1, AUTHOR_3],
            ),
            article(ARTICLE_4, ArticleStatus::Draft, None, &[AUTHOR_3]),
        ]
    }

    pub fn history() -> Vec<ArticleHistory> {
        [("h-1", ARTICLE_1, 1), ("h-2", ARTICLE_1, 2), ("h-3", ARTICLE_2, 1)]
            .into_iter()
            .map(|(id, article, version)| ArticleHistory {
                id: key(id),
                article_id: key(article),
                version,
                content: format!("{} body v{}", article, version),
                created_at: fixed_time(),
            })
            .collect()
    }

    pub fn editorials() -> Vec<Editorial> {
        vec![Editorial {
            id: key(EDITORIAL_1),
            article_id: key(ARTICLE_1),
            chief_editor_id: key("st-1"),
            reviewer_ids: vec![key("st-2")],
        }]
    }

    pub fn interactions() -> Vec<Interaction> {
        [
            (COMMENT_1, ARTICLE_1, None),
            (REPLY_1, ARTICLE_1, Some(COMMENT_1)),
            (COMMENT_2, ARTICLE_2, None),
            (COMMENT_3, ARTICLE_1, None),
        ]
        .into_iter()
        .map(|(id, article, parent)| Interaction {
            id: key(id),
            article_id: key(article),
            user_id: READER_USER.to_string(),
            kind: InteractionKind::Comment,
            content: format!("comment {}", id),
            parent_id: parent.map(key),
            created_at: fixed_time(),
        })
        .collect()
    }

    pub fn staff() -> Vec<Staff> {
        [
            ("st-1", EDITOR_USER, StaffJob::Editor, true),
            ("st-2", REVIEWER_USER, StaffJob::Reviewer, true),
            ("st-3", FORMER_EDITOR_USER, StaffJob::EditorInChief, false),
        ]
        .into_iter()
        .map(|(id, user, job, is_active)| Staff {
            id: key(id),
            user_id: user.to_string(),
            name: format!("Staff {}", id),
            job,
            is_active,
        })
        .collect()
    }

    /// A store holding every fixture document.
    pub fn seeded_store() -> RevistaResult<MemoryStore> {
        MemoryStore::new()
            .with_documents(&volumes())?
            .with_documents(&authors())?
            .with_documents(&articles())?
            .with_documents(&history())?
            .with_documents(&editorials())?
            .with_documents(&interactions())?
            .with_documents(&staff())
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for keys, key request sequences and staff records.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_entity_kind() -> impl Strategy<Value = EntityKind> {
        proptest::sample::select(EntityKind::ALL.to_vec())
    }

    pub fn arb_staff_job() -> impl Strategy<Value = StaffJob> {
        prop_oneof![
            Just(StaffJob::Administrator),
            Just(StaffJob::EditorInChief),
            Just(StaffJob::Editor),
            Just(StaffJob::Reviewer),
        ]
    }

    /// Short ids drawn from a small alphabet, so that sequences repeat keys.
    pub fn arb_natural_key() -> impl Strategy<Value = NaturalKey> {
        "[a-e][0-3]".prop_map(NaturalKey::new)
    }

    pub fn arb_lookup_key(kind: EntityKind) -> impl Strategy<Value = LookupKey> {
        arb_natural_key().prop_map(move |value| LookupKey::new(kind, value))
    }

    /// A sequence of key requests, usually with duplicates.
    pub fn arb_key_requests(
        kind: EntityKind,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<LookupKey>> {
        prop::collection::vec(arb_lookup_key(kind), 1..=max_len.max(1))
    }

    pub fn arb_staff_record() -> impl Strategy<Value = StaffRecord> {
        (any::<bool>(), arb_staff_job())
            .prop_map(|(is_active, job)| StaffRecord::new(is_active, job.as_str()))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use revista_storage::{find_by_field, find_one};

    #[tokio::test]
    async fn test_seeded_store_holds_every_fixture() -> RevistaResult<()> {
        let store = seeded_store()?;
        assert_eq!(store.count(EntityKind::Volume).await, 2);
        assert_eq!(store.count(EntityKind::Article).await, 4);
        assert_eq!(store.count(EntityKind::Interaction).await, 4);

        let article: Option<Article> = find_one(&store, &NaturalKey::new(ARTICLE_1)).await?;
        assert_eq!(article.map(|a| a.author_ids.len()), Some(2));

        let staff: Vec<Staff> =
            find_by_field(&store, "user_id", &[EDITOR_USER.to_string()]).await?;
        assert_eq!(staff.len(), 1);
        assert!(staff[0].is_active);
        Ok(())
    }

    #[tokio::test]
    async fn test_recording_fetcher_answers_known_keys() -> RevistaResult<()> {
        let fetcher = RecordingFetcher::new("volumes", EntityKind::Volume)
            .with_value(LookupKey::volume("v1"), 1u32);
        let keys: KeySet = [LookupKey::volume("v1"), LookupKey::volume("v2")]
            .into_iter()
            .collect();

        let found = fetcher.fetch_many(&keys).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(fetcher.calls(), vec![keys.as_slice().to_vec()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_static_claim_source_counts_lookups() -> RevistaResult<()> {
        let source =
            StaticClaimSource::new().with_staff("u1", StaffRecord::new(true, "EDITOR"));
        assert!(source.lookup("u1").await?.is_some());
        assert!(source.lookup("u2").await?.is_none());
        assert_eq!(source.lookups(), 2);
        Ok(())
    }
}
