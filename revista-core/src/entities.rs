//! Document types stored in the document store.
//!
//! Every document carries its own `id` and is persisted as a JSON object.
//! References between documents are plain ids resolved lazily by loaders.

use crate::{ArticleStatus, EntityKind, InteractionKind, NaturalKey, StaffJob, Timestamp};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// A typed document living in one collection of the store.
pub trait Document: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection this document type is stored in.
    const KIND: EntityKind;

    /// Natural key the document is stored under.
    fn id(&self) -> &NaturalKey;
}

/// A submitted article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: NaturalKey,
    pub title: String,
    pub summary: String,
    pub status: ArticleStatus,
    #[serde(default)]
    pub author_ids: Vec<NaturalKey>,
    pub editorial_id: Option<NaturalKey>,
    pub volume_id: Option<NaturalKey>,
    pub current_history_id: Option<NaturalKey>,
    pub created_at: Timestamp,
}

/// One versioned body of an article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleHistory {
    pub id: NaturalKey,
    pub article_id: NaturalKey,
    pub version: u32,
    pub content: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: NaturalKey,
    pub user_id: String,
    pub name: String,
}

/// Editorial team assigned to an article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Editorial {
    pub id: NaturalKey,
    pub article_id: NaturalKey,
    pub chief_editor_id: NaturalKey,
    #[serde(default)]
    pub reviewer_ids: Vec<NaturalKey>,
}

/// Editorial staff record. Looked up by the caller's user id during identity
/// augmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    pub id: NaturalKey,
    pub user_id: String,
    pub name: String,
    pub job: StaffJob,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub id: NaturalKey,
    pub edition: i32,
    pub year: i32,
    pub title: String,
}

/// A comment or editorial note. Replies point at their parent interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: NaturalKey,
    pub article_id: NaturalKey,
    pub user_id: String,
    pub kind: InteractionKind,
    pub content: String,
    pub parent_id: Option<NaturalKey>,
    pub created_at: Timestamp,
}

macro_rules! impl_document {
    ($ty:ty, $kind:expr) => {
        impl Document for $ty {
            const KIND: EntityKind = $kind;

            fn id(&self) -> &NaturalKey {
                &self.id
            }
        }
    };
}

impl_document!(Article, EntityKind::Article);
impl_document!(ArticleHistory, EntityKind::ArticleHistory);
impl_document!(Author, EntityKind::Author);
impl_document!(Editorial, EntityKind::Editorial);
impl_document!(Staff, EntityKind::Staff);
impl_document!(Volume, EntityKind::Volume);
impl_document!(Interaction, EntityKind::Interaction);

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_article_document_round_trip() -> Result<(), serde_json::Error> {
        let article = Article {
            id: NaturalKey::new("a1"),
            title: "On Batching".to_string(),
            summary: "Why N+1 hurts".to_string(),
            status: ArticleStatus::Draft,
            author_ids: vec![NaturalKey::new("au1")],
            editorial_id: None,
            volume_id: Some(NaturalKey::new("v1")),
            current_history_id: None,
            created_at: Utc::now(),
        };

        let value = serde_json::to_value(&article)?;
        assert_eq!(value["id"], "a1");
        assert_eq!(value["status"], "DRAFT");

        let back: Article = serde_json::from_value(value)?;
        assert_eq!(back, article);
        assert_eq!(Article::KIND, EntityKind::Article);
        Ok(())
    }

    #[test]
    fn test_missing_author_ids_default_to_empty() -> Result<(), serde_json::Error> {
        let value = serde_json::json!({
            "id": "a2",
            "title": "t",
            "summary": "s",
            "status": "IN_REVIEW",
            "editorial_id": null,
            "volume_id": null,
            "current_history_id": null,
            "created_at": "2024-01-01T00:00:00Z"
        });
        let article: Article = serde_json::from_value(value)?;
        assert!(article.author_ids.is_empty());
        assert_eq!(article.status, ArticleStatus::InReview);
        Ok(())
    }
}
