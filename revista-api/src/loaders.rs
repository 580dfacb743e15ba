//! The loader set of one request.

use std::sync::Arc;

use revista_core::{Article, ArticleHistory, Author, Editorial, Interaction, Volume};
use revista_loader::{BatchConfig, DataLoader, GroupedLoader, RequestCache};
use revista_storage::{ChildrenFetcher, DocumentStore, EntityFetcher};

/// Fetch adapters shared by every request of the process.
#[derive(Debug, Clone)]
pub struct Fetchers {
    pub articles: Arc<EntityFetcher<Article>>,
    pub authors: Arc<EntityFetcher<Author>>,
    pub editorials: Arc<EntityFetcher<Editorial>>,
    pub volumes: Arc<EntityFetcher<Volume>>,
    pub interactions: Arc<EntityFetcher<Interaction>>,
    pub history: Arc<EntityFetcher<ArticleHistory>>,
    pub volume_articles: Arc<ChildrenFetcher<Article>>,
    pub article_history: Arc<ChildrenFetcher<ArticleHistory>>,
    pub article_interactions: Arc<ChildrenFetcher<Interaction>>,
    pub interaction_replies: Arc<ChildrenFetcher<Interaction>>,
}

impl Fetchers {
    pub fn from_store(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            articles: Arc::new(EntityFetcher::new("articles", Arc::clone(&store))),
            authors: Arc::new(EntityFetcher::new("authors", Arc::clone(&store))),
            editorials: Arc::new(EntityFetcher::new("editorials", Arc::clone(&store))),
            volumes: Arc::new(EntityFetcher::new("volumes", Arc::clone(&store))),
            interactions: Arc::new(EntityFetcher::new("interactions", Arc::clone(&store))),
            history: Arc::new(EntityFetcher::new("history", Arc::clone(&store))),
            volume_articles: Arc::new(ChildrenFetcher::<Article>::volume_articles(Arc::clone(
                &store,
            ))),
            article_history: Arc::new(ChildrenFetcher::<ArticleHistory>::article_history(
                Arc::clone(&store),
            )),
            article_interactions: Arc::new(
                ChildrenFetcher::<Interaction>::article_interactions(Arc::clone(&store)),
            ),
            interaction_replies: Arc::new(ChildrenFetcher::<Interaction>::interaction_replies(
                store,
            )),
        }
    }
}

/// Loaders bound to one request's cache. Build one per request.
#[derive(Debug)]
pub struct Loaders {
    pub articles: DataLoader<EntityFetcher<Article>>,
    pub authors: DataLoader<EntityFetcher<Author>>,
    pub editorials: DataLoader<EntityFetcher<Editorial>>,
    pub volumes: DataLoader<EntityFetcher<Volume>>,
    pub interactions: DataLoader<EntityFetcher<Interaction>>,
    pub history: DataLoader<EntityFetcher<ArticleHistory>>,
    pub volume_articles: GroupedLoader<ChildrenFetcher<Article>>,
    pub article_history: GroupedLoader<ChildrenFetcher<ArticleHistory>>,
    pub article_interactions: GroupedLoader<ChildrenFetcher<Interaction>>,
    pub interaction_replies: GroupedLoader<ChildrenFetcher<Interaction>>,
    cache: Arc<RequestCache>,
}

impl Loaders {
    pub fn new(fetchers: &Fetchers, config: BatchConfig) -> Self {
        let cache = Arc::new(RequestCache::new());
        Self {
            articles: DataLoader::new(Arc::clone(&fetchers.articles), config, Arc::clone(&cache)),
            authors: DataLoader::new(Arc::clone(&fetchers.authors), config, Arc::clone(&cache)),
            editorials: DataLoader::new(
                Arc::clone(&fetchers.editorials),
                config,
                Arc::clone(&cache),
            ),
            volumes: DataLoader::new(Arc::clone(&fetchers.volumes), config, Arc::clone(&cache)),
            interactions: DataLoader::new(
                Arc::clone(&fetchers.interactions),
                config,
                Arc::clone(&cache),
            ),
            history: DataLoader::new(Arc::clone(&fetchers.history), config, Arc::clone(&cache)),
            volume_articles: GroupedLoader::new(
                Arc::clone(&fetchers.volume_articles),
                config,
                Arc::clone(&cache),
            ),
            article_history: GroupedLoader::new(
                Arc::clone(&fetchers.article_history),
                config,
                Arc::clone(&cache),
            ),
            article_interactions: GroupedLoader::new(
                Arc::clone(&fetchers.article_interactions),
                config,
                Arc::clone(&cache),
            ),
            interaction_replies: GroupedLoader::new(
                Arc::clone(&fetchers.interaction_replies),
                config,
                Arc::clone(&cache),
            ),
            cache,
        }
    }

    /// The request cache every loader of this set writes to.
    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }
}
