//! Editorial operations behind the GraphQL mutations.
//!
//! Each operation checks the caller's resolved identity, validates against
//! the current store contents and writes through [`DocumentStore`]. Reads
//! here bypass the request loaders so that checks see the latest state.

use chrono::Utc;
use revista_core::{
    new_document_id, Article, ArticleHistory, ArticleStatus, Author, EntityKind, Interaction,
    InteractionKind, NaturalKey, RevistaError, RevistaResult, StaffJob, Volume,
};
use revista_storage::{find_by_ids, find_one, insert_document, replace_document, DocumentStore};

use crate::identity::ResolvedIdentity;

/// Fields of a new article.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub title: String,
    pub summary: String,
    pub content: String,
    pub author_ids: Vec<NaturalKey>,
    pub volume_id: Option<NaturalKey>,
}

/// Fields of a new comment, note or reply.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInteraction {
    pub article_id: NaturalKey,
    pub kind: InteractionKind,
    pub content: String,
    pub parent_id: Option<NaturalKey>,
}

fn require_subject<'a>(identity: &'a ResolvedIdentity, action: &str) -> RevistaResult<&'a str> {
    identity
        .claims
        .subject_id
        .as_deref()
        .ok_or_else(|| RevistaError::unauthorized(format!("Authentication required to {}", action)))
}

fn editorial_roles() -> Vec<&'static str> {
    StaffJob::EDITORIAL.iter().map(StaffJob::as_str).collect()
}

fn staff_roles() -> Vec<&'static str> {
    [
        StaffJob::Administrator,
        StaffJob::EditorInChief,
        StaffJob::Editor,
        StaffJob::Reviewer,
    ]
    .iter()
    .map(StaffJob::as_str)
    .collect()
}

/// Submit a new article as a draft with its first history entry.
pub async fn create_article(
    store: &dyn DocumentStore,
    identity: &ResolvedIdentity,
    input: NewArticle,
) -> RevistaResult<Article> {
    let subject = require_subject(identity, "create articles")?;

    let title = input.title.trim();
    if title.is_empty() {
        return Err(RevistaError::invalid_operation("Article title must not be empty"));
    }
    if input.author_ids.is_empty() {
        return Err(RevistaError::invalid_operation(
            "An article needs at least one author",
        ));
    }

    let authors: Vec<Author> = find_by_ids(store, &input.author_ids).await?;
    if let Some(missing) = input
        .author_ids
        .iter()
        .find(|id| !authors.iter().any(|author| &author.id == *id))
    {
        return Err(RevistaError::not_found(EntityKind::Author, missing));
    }

    if let Some(volume_id) = &input.volume_id {
        if find_one::<Volume>(store, volume_id).await?.is_none() {
            return Err(RevistaError::not_found(EntityKind::Volume, volume_id));
        }
    }

    let now = Utc::now();
    let article_id = new_document_id();
    let history = ArticleHistory {
        id: new_document_id(),
        article_id: article_id.clone(),
        version: 1,
        content: input.content,
        created_at: now,
    };
    let article = Article {
        id: article_id,
        title: title.to_string(),
        summary: input.summary,
        status: ArticleStatus::Draft,
        author_ids: input.author_ids,
        editorial_id: None,
        volume_id: input.volume_id,
        current_history_id: Some(history.id.clone()),
        created_at: now,
    };

    insert_document(store, &article).await?;
    insert_document(store, &history).await?;

    tracing::info!(article_id = %article.id, subject = %subject, "Article created");
    Ok(article)
}

/// Move an article through the editorial lifecycle.
pub async fn change_article_status(
    store: &dyn DocumentStore,
    identity: &ResolvedIdentity,
    article_id: &NaturalKey,
    status: ArticleStatus,
) -> RevistaResult<Article> {
    if !identity.principal.has_any_role(&editorial_roles()) {
        return Err(RevistaError::unauthorized(
            "Only editorial staff may change article status",
        ));
    }

    let mut article: Article = find_one(store, article_id)
        .await?
        .ok_or_else(|| RevistaError::not_found(EntityKind::Article, article_id))?;

    if !article.status.can_transition_to(status) {
        return Err(RevistaError::invalid_operation(format!(
            "Cannot move article '{}' from {} to {}",
            article_id, article.status, status
        )));
    }

    let previous = article.status;
    article.status = status;
    replace_document(store, &article).await?;

    tracing::info!(
        article_id = %article.id,
        from = %previous,
        to = %status,
        "Article status changed"
    );
    Ok(article)
}

/// Attach a comment, editorial note or reply to an article.
pub async fn add_interaction(
    store: &dyn DocumentStore,
    identity: &ResolvedIdentity,
    input: NewInteraction,
) -> RevistaResult<Interaction> {
    let subject = require_subject(identity, "comment on articles")?;

    let content = input.content.trim();
    if content.is_empty() {
        return Err(RevistaError::invalid_operation(
            "Interaction content must not be empty",
        ));
    }

    if input.kind == InteractionKind::EditorialNote
        && !identity.principal.has_any_role(&staff_roles())
    {
        return Err(RevistaError::unauthorized(
            "Only editorial staff may add editorial notes",
        ));
    }

    if find_one::<Article>(store, &input.article_id).await?.is_none() {
        return Err(RevistaError::not_found(EntityKind::Article, &input.article_id));
    }

    if let Some(parent_id) = &input.parent_id {
        let parent: Interaction = find_one(store, parent_id)
            .await?
            .ok_or_else(|| RevistaError::not_found(EntityKind::Interaction, parent_id))?;
        if parent.article_id != input.article_id {
            return Err(RevistaError::invalid_operation(format!(
                "Interaction '{}' belongs to another article",
                parent_id
            )));
        }
    }

    let interaction = Interaction {
        id: new_document_id(),
        article_id: input.article_id,
        user_id: subject.to_string(),
        kind: input.kind,
        content: content.to_string(),
        parent_id: input.parent_id,
        created_at: Utc::now(),
    };
    insert_document(store, &interaction).await?;

    tracing::info!(
        interaction_id = %interaction.id,
        article_id = %interaction.article_id,
        "Interaction added"
    );
    Ok(interaction)
}
