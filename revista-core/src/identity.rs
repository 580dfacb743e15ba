//! Identity types for Revista documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new document id (UUIDv7, timestamp-sortable, rendered as text).
pub fn new_document_id() -> NaturalKey {
    NaturalKey(Uuid::now_v7().to_string())
}

/// Entity kind discriminator. Also names the document collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Article,
    ArticleHistory,
    Author,
    Editorial,
    Staff,
    Volume,
    Interaction,
}

impl EntityKind {
    /// All kinds, in collection order.
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Article,
        EntityKind::ArticleHistory,
        EntityKind::Author,
        EntityKind::Editorial,
        EntityKind::Staff,
        EntityKind::Volume,
        EntityKind::Interaction,
    ];

    /// Collection name in the document store.
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Article => "articles",
            EntityKind::ArticleHistory => "article_history",
            EntityKind::Author => "authors",
            EntityKind::Editorial => "editorials",
            EntityKind::Staff => "staff",
            EntityKind::Volume => "volumes",
            EntityKind::Interaction => "interactions",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Article => "Article",
            EntityKind::ArticleHistory => "ArticleHistory",
            EntityKind::Author => "Author",
            EntityKind::Editorial => "Editorial",
            EntityKind::Staff => "Staff",
            EntityKind::Volume => "Volume",
            EntityKind::Interaction => "Interaction",
        };
        f.write_str(name)
    }
}

/// Natural key of a document: the opaque id it is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NaturalKey(String);

impl NaturalKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NaturalKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NaturalKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for NaturalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Typed (kind, natural key) pair used by every batching loader.
///
/// Equality and hashing cover both halves, so an article and an author that
/// happen to share an id never collide in a batch or in the request cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LookupKey {
    kind: EntityKind,
    value: NaturalKey,
}

impl LookupKey {
    pub fn new(kind: EntityKind, value: impl Into<NaturalKey>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn article(value: impl Into<NaturalKey>) -> Self {
        Self::new(EntityKind::Article, value)
    }

    pub fn author(value: impl Into<NaturalKey>) -> Self {
        Self::new(EntityKind::Author, value)
    }

    pub fn volume(value: impl Into<NaturalKey>) -> Self {
        Self::new(EntityKind::Volume, value)
    }

    pub fn interaction(value: impl Into<NaturalKey>) -> Self {
        Self::new(EntityKind::Interaction, value)
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn value(&self) -> &NaturalKey {
        &self.value
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_lookup_key_equality_covers_kind() {
        let article = LookupKey::article("42");
        let author = LookupKey::author("42");
        assert_ne!(article, author);

        let set: HashSet<_> = [article.clone(), author, LookupKey::article("42")]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&article));
    }

    #[test]
    fn test_lookup_key_display() {
        let key = LookupKey::volume("v-7");
        assert_eq!(key.to_string(), "Volume:v-7");
        assert_eq!(key.kind(), EntityKind::Volume);
        assert_eq!(key.value().as_str(), "v-7");
    }

    #[test]
    fn test_natural_key_serializes_transparently() -> Result<(), serde_json::Error> {
        let key = NaturalKey::new("abc");
        assert_eq!(serde_json::to_string(&key)?, "\"abc\"");
        Ok(())
    }

    #[test]
    fn test_collections_are_distinct() {
        let names: HashSet<_> = EntityKind::ALL.iter().map(|k| k.collection()).collect();
        assert_eq!(names.len(), EntityKind::ALL.len());
    }

    #[test]
    fn test_new_document_id_is_unique() {
        assert_ne!(new_document_id(), new_document_id());
    }
}
