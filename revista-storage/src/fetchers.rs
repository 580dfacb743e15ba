//! Loader fetch adapters over a [`DocumentStore`].
//!
//! Each adapter turns one batch of keys into exactly one store query.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use revista_core::{
    Article, ArticleHistory, Document, EntityKind, Interaction, LookupKey, NaturalKey,
    RevistaResult,
};
use revista_loader::{BatchFetch, GroupedFetch, KeySet};

use crate::traits::{find_by_field, find_by_ids, DocumentStore};

/// Loads documents of type `T` by id.
pub struct EntityFetcher<T> {
    name: &'static str,
    store: Arc<dyn DocumentStore>,
    _document: PhantomData<fn() -> T>,
}

impl<T: Document> EntityFetcher<T> {
    pub fn new(name: &'static str, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            name,
            store,
            _document: PhantomData,
        }
    }
}

impl<T> fmt::Debug for EntityFetcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityFetcher")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl<T: Document> BatchFetch for EntityFetcher<T> {
    type Value = T;

    fn name(&self) -> &'static str {
        self.name
    }

    fn kind(&self) -> EntityKind {
        T::KIND
    }

    async fn fetch_many(&self, keys: &KeySet) -> RevistaResult<HashMap<LookupKey, T>> {
        let ids: Vec<NaturalKey> = keys.values().cloned().collect();
        let documents: Vec<T> = find_by_ids(self.store.as_ref(), &ids).await?;
        Ok(documents
            .into_iter()
            .map(|document| (LookupKey::new(T::KIND, document.id().clone()), document))
            .collect())
    }
}

/// Loads the children of many parents with one query on a foreign-key field.
///
/// Children keep the order the store returned them in.
pub struct ChildrenFetcher<T> {
    name: &'static str,
    parent_kind: EntityKind,
    field: &'static str,
    parent_of: fn(&T) -> Option<&NaturalKey>,
    store: Arc<dyn DocumentStore>,
}

impl<T> fmt::Debug for ChildrenFetcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildrenFetcher")
            .field("name", &self.name)
            .field("parent_kind", &self.parent_kind)
            .field("field", &self.field)
            .finish()
    }
}

impl<T: Document> ChildrenFetcher<T> {
    /// `parent_of` returns the parent a child belongs to, or `None` to leave
    /// the child out of every group.
    pub fn new(
        name: &'static str,
        parent_kind: EntityKind,
        field: &'static str,
        parent_of: fn(&T) -> Option<&NaturalKey>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            name,
            parent_kind,
            field,
            parent_of,
            store,
        }
    }
}

fn article_volume(article: &Article) -> Option<&NaturalKey> {
    article.volume_id.as_ref()
}

fn history_article(history: &ArticleHistory) -> Option<&NaturalKey> {
    Some(&history.article_id)
}

fn top_level_article(interaction: &Interaction) -> Option<&NaturalKey> {
    match interaction.parent_id {
        None => Some(&interaction.article_id),
        Some(_) => None,
    }
}

fn reply_parent(interaction: &Interaction) -> Option<&NaturalKey> {
    interaction.parent_id.as_ref()
}

impl ChildrenFetcher<Article> {
    pub fn volume_articles(store: Arc<dyn DocumentStore>) -> Self {
        Self::new("volume_articles", EntityKind::Volume, "volume_id", article_volume, store)
    }
}

impl ChildrenFetcher<ArticleHistory> {
    pub fn article_history(store: Arc<dyn DocumentStore>) -> Self {
        Self::new(
            "article_history",
            EntityKind::Article,
            "article_id",
            history_article,
            store,
        )
    }
}

impl ChildrenFetcher<Interaction> {
    /// Top-level interactions of an article. Replies are reached through
    /// [`ChildrenFetcher::interaction_replies`].
    pub fn article_interactions(store: Arc<dyn DocumentStore>) -> Self {
        Self::new(
            "article_interactions",
            EntityKind::Article,
            "article_id",
            top_level_article,
            store,
        )
    }

    pub fn interaction_replies(store: Arc<dyn DocumentStore>) -> Self {
        Self::new(
            "interaction_replies",
            EntityKind::Interaction,
            "parent_id",
            reply_parent,
            store,
        )
    }
}

#[async_trait]
impl<T: Document> GroupedFetch for ChildrenFetcher<T> {
    type Child = T;

    fn name(&self) -> &'static str {
        self.name
    }

    fn parent_kind(&self) -> EntityKind {
        self.parent_kind
    }

    async fn fetch_grouped(&self, parents: &KeySet) -> RevistaResult<HashMap<LookupKey, Vec<T>>> {
        let values: Vec<String> = parents.values().map(|id| id.as_str().to_string()).collect();
        let children: Vec<T> = find_by_field(self.store.as_ref(), self.field, &values).await?;

        let mut groups: HashMap<LookupKey, Vec<T>> = HashMap::new();
        for child in children {
            let Some(parent) = (self.parent_of)(&child).cloned() else {
                continue;
            };
            let key = LookupKey::new(self.parent_kind, parent);
            if parents.contains(&key) {
                groups.entry(key).or_default().push(child);
            }
        }
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use chrono::Utc;
    use revista_core::{ArticleStatus, InteractionKind, Volume};

    fn article(id: &str, volume: Option<&str>) -> Article {
        Article {
            id: NaturalKey::new(id),
            title: format!("Article {}", id),
            summary: String::new(),
            status: ArticleStatus::Published,
            author_ids: Vec::new(),
            editorial_id: None,
            volume_id: volume.map(NaturalKey::new),
            current_history_id: None,
            created_at: Utc::now(),
        }
    }

    fn interaction(id: &str, article: &str, parent: Option<&str>) -> Interaction {
        Interaction {
            id: NaturalKey::new(id),
            article_id: NaturalKey::new(article),
            user_id: "reader-1".to_string(),
            kind: InteractionKind::Comment,
            content: format!("comment {}", id),
            parent_id: parent.map(NaturalKey::new),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_entity_fetcher_keys_results_by_id() -> RevistaResult<()> {
        let store = MemoryStore::new().with_document(&Volume {
            id: NaturalKey::new("v1"),
            edition: 1,
            year: 2024,
            title: "First".to_string(),
        })?;
        let store: Arc<dyn DocumentStore> = Arc::new(store);
        let fetcher = EntityFetcher::<Volume>::new("volumes", store);

        let keys: KeySet = [LookupKey::volume("v1"), LookupKey::volume("v2")]
            .into_iter()
            .collect();
        let found = fetcher.fetch_many(&keys).await?;

        assert_eq!(found.len(), 1);
        assert_eq!(found[&LookupKey::volume("v1")].title, "First");
        assert!(!found.contains_key(&LookupKey::volume("v2")));
        Ok(())
    }

    #[tokio::test]
    async fn test_volume_articles_grouped_in_store_order() -> RevistaResult<()> {
        let store = MemoryStore::new().with_documents(&[
            article("a3", Some("v1")),
            article("a1", Some("v2")),
            article("a2", Some("v1")),
            article("a4", None),
        ])?;
        let store = Arc::new(store);
        let fetcher = ChildrenFetcher::<Article>::volume_articles(store.clone());

        let keys: KeySet = [LookupKey::volume("v1"), LookupKey::volume("v2")]
            .into_iter()
            .collect();
        let groups = fetcher.fetch_grouped(&keys).await?;

        let v1: Vec<&str> = groups[&LookupKey::volume("v1")]
            .iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(v1, vec!["a3", "a2"]);
        assert_eq!(groups[&LookupKey::volume("v2")].len(), 1);
        assert_eq!(store.reads(EntityKind::Article), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_article_interactions_exclude_replies() -> RevistaResult<()> {
        let store = MemoryStore::new().with_documents(&[
            interaction("i1", "a1", None),
            interaction("i2", "a1", Some("i1")),
            interaction("i3", "a1", None),
        ])?;
        let store: Arc<dyn DocumentStore> = Arc::new(store);

        let top = ChildrenFetcher::<Interaction>::article_interactions(store.clone());
        let keys: KeySet = std::iter::once(LookupKey::article("a1")).collect();
        let groups = top.fetch_grouped(&keys).await?;
        let ids: Vec<&str> = groups[&LookupKey::article("a1")]
            .iter()
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(ids, vec!["i1", "i3"]);

        let replies = ChildrenFetcher::<Interaction>::interaction_replies(store);
        let keys: KeySet = [LookupKey::interaction("i1"), LookupKey::interaction("i3")]
            .into_iter()
            .collect();
        let groups = replies.fetch_grouped(&keys).await?;
        assert_eq!(groups[&LookupKey::interaction("i1")].len(), 1);
        assert!(!groups.contains_key(&LookupKey::interaction("i3")));
        Ok(())
    }
}
