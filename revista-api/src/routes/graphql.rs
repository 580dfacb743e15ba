//! GraphQL API Routes
//!
//! This module implements the GraphQL endpoint using async-graphql.
//! Relationship fields resolve through the request's loaders, so sibling
//! objects that need the same kind of document share one store query.
//!
//! Endpoints:
//! - POST /graphql - Execute GraphQL queries/mutations
//! - GET /graphql - GraphiQL playground

use async_graphql::{
    ComplexObject, Context, EmptySubscription, Enum, InputObject, Object, Result as GqlResult,
    Schema, SimpleObject, ID,
};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use revista_core::{
    Article, ArticleHistory, Author, Editorial, EntityKind, Interaction, LookupKey, NaturalKey,
    RevistaError, RevistaResult, Volume,
};
use revista_loader::{BatchFetch, DataLoader};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    auth::authenticate_bearer,
    context::RequestContext,
    error::IntoGraphQL,
    identity::IdentityState,
    services::{self, NewArticle, NewInteraction},
    state::AppState,
};

// ============================================================================
// GRAPHQL TYPES
// ============================================================================

/// GraphQL representation of ArticleStatus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum GqlArticleStatus {
    Draft,
    InReview,
    Approved,
    Rejected,
    Published,
    Archived,
}

impl From<revista_core::ArticleStatus> for GqlArticleStatus {
    fn from(status: revista_core::ArticleStatus) -> Self {
        match status {
            revista_core::ArticleStatus::Draft => GqlArticleStatus::Draft,
            revista_core::ArticleStatus::InReview => GqlArticleStatus::InReview,
            revista_core::ArticleStatus::Approved => GqlArticleStatus::Approved,
            revista_core::ArticleStatus::Rejected => GqlArticleStatus::Rejected,
            revista_core::ArticleStatus::Published => GqlArticleStatus::Published,
            revista_core::ArticleStatus::Archived => GqlArticleStatus::Archived,
        }
    }
}

impl From<GqlArticleStatus> for revista_core::ArticleStatus {
    fn from(status: GqlArticleStatus) -> Self {
        match status {
            GqlArticleStatus::Draft => revista_core::ArticleStatus::Draft,
            GqlArticleStatus::InReview => revista_core::ArticleStatus::InReview,
            GqlArticleStatus::Approved => revista_core::ArticleStatus::Approved,
            GqlArticleStatus::Rejected => revista_core::ArticleStatus::Rejected,
            GqlArticleStatus::Published => revista_core::ArticleStatus::Published,
            GqlArticleStatus::Archived => revista_core::ArticleStatus::Archived,
        }
    }
}

/// GraphQL representation of InteractionKind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum GqlInteractionKind {
    Comment,
    EditorialNote,
}

impl From<revista_core::InteractionKind> for GqlInteractionKind {
    fn from(kind: revista_core::InteractionKind) -> Self {
        match kind {
            revista_core::InteractionKind::Comment => GqlInteractionKind::Comment,
            revista_core::InteractionKind::EditorialNote => GqlInteractionKind::EditorialNote,
        }
    }
}

impl From<GqlInteractionKind> for revista_core::InteractionKind {
    fn from(kind: GqlInteractionKind) -> Self {
        match kind {
            GqlInteractionKind::Comment => revista_core::InteractionKind::Comment,
            GqlInteractionKind::EditorialNote => revista_core::InteractionKind::EditorialNote,
        }
    }
}

/// GraphQL representation of IdentityState.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum GqlIdentityState {
    Unauthenticated,
    Authenticated,
    Elevated,
}

impl From<IdentityState> for GqlIdentityState {
    fn from(state: IdentityState) -> Self {
        match state {
            IdentityState::Unauthenticated => GqlIdentityState::Unauthenticated,
            IdentityState::Authenticated => GqlIdentityState::Authenticated,
            IdentityState::Elevated => GqlIdentityState::Elevated,
        }
    }
}

fn gql_id(key: &NaturalKey) -> ID {
    ID(key.to_string())
}

fn natural_key(id: ID) -> NaturalKey {
    NaturalKey::new(id.0)
}

/// GraphQL article object.
#[derive(Debug, Clone, SimpleObject)]
#[graphql(complex)]
pub struct GqlArticle {
    pub id: ID,
    pub title: String,
    pub summary: String,
    pub status: GqlArticleStatus,
    pub created_at: String,
    #[graphql(skip)]
    pub key: NaturalKey,
    #[graphql(skip)]
    pub author_ids: Vec<NaturalKey>,
    #[graphql(skip)]
    pub editorial_id: Option<NaturalKey>,
    #[graphql(skip)]
    pub volume_id: Option<NaturalKey>,
    #[graphql(skip)]
    pub current_history_id: Option<NaturalKey>,
}

impl From<Article> for GqlArticle {
    fn from(a: Article) -> Self {
        Self {
            id: gql_id(&a.id),
            title: a.title,
            summary: a.summary,
            status: a.status.into(),
            created_at: a.created_at.to_rfc3339(),
            key: a.id,
            author_ids: a.author_ids,
            editorial_id: a.editorial_id,
            volume_id: a.volume_id,
            current_history_id: a.current_history_id,
        }
    }
}

/// GraphQL author object.
#[derive(Debug, Clone, SimpleObject)]
pub struct GqlAuthor {
    pub id: ID,
    pub user_id: String,
    pub name: String,
}

impl From<Author> for GqlAuthor {
    fn from(a: Author) -> Self {
        Self {
            id: gql_id(&a.id),
            user_id: a.user_id,
            name: a.name,
        }
    }
}

/// GraphQL editorial object.
#[derive(Debug, Clone, SimpleObject)]
pub struct GqlEditorial {
    pub id: ID,
    pub article_id: ID,
    pub chief_editor_id: ID,
    pub reviewer_ids: Vec<ID>,
}

impl From<Editorial> for GqlEditorial {
    fn from(e: Editorial) -> Self {
        Self {
            id: gql_id(&e.id),
            article_id: gql_id(&e.article_id),
            chief_editor_id: gql_id(&e.chief_editor_id),
            reviewer_ids: e.reviewer_ids.iter().map(gql_id).collect(),
        }
    }
}

/// GraphQL volume object.
#[derive(Debug, Clone, SimpleObject)]
#[graphql(complex)]
pub struct GqlVolume {
    pub id: ID,
    pub edition: i32,
    pub year: i32,
    pub title: String,
    #[graphql(skip)]
    pub key: NaturalKey,
}

impl From<Volume> for GqlVolume {
    fn from(v: Volume) -> Self {
        Self {
            id: gql_id(&v.id),
            edition: v.edition,
            year: v.year,
            title: v.title,
            key: v.id,
        }
    }
}

/// GraphQL article history object.
#[derive(Debug, Clone, SimpleObject)]
pub struct GqlArticleHistory {
    pub id: ID,
    pub article_id: ID,
    pub version: u32,
    pub content: String,
    pub created_at: String,
}

impl From<ArticleHistory> for GqlArticleHistory {
    fn from(h: ArticleHistory) -> Self {
        Self {
            id: gql_id(&h.id),
            article_id: gql_id(&h.article_id),
            version: h.version,
            content: h.content,
            created_at: h.created_at.to_rfc3339(),
        }
    }
}

/// GraphQL interaction object.
#[derive(Debug, Clone, SimpleObject)]
#[graphql(complex)]
pub struct GqlInteraction {
    pub id: ID,
    pub article_id: ID,
    pub user_id: String,
    pub kind: GqlInteractionKind,
    pub content: String,
    pub parent_id: Option<ID>,
    pub created_at: String,
    #[graphql(skip)]
    pub key: NaturalKey,
    #[graphql(skip)]
    pub article_key: NaturalKey,
    #[graphql(skip)]
    pub parent_key: Option<NaturalKey>,
}

impl From<Interaction> for GqlInteraction {
    fn from(i: Interaction) -> Self {
        Self {
            id: gql_id(&i.id),
            article_id: gql_id(&i.article_id),
            user_id: i.user_id,
            kind: i.kind.into(),
            content: i.content,
            parent_id: i.parent_id.as_ref().map(gql_id),
            created_at: i.created_at.to_rfc3339(),
            key: i.id,
            article_key: i.article_id,
            parent_key: i.parent_id,
        }
    }
}

/// The caller as resolved for this request.
#[derive(Debug, Clone, SimpleObject)]
pub struct GqlViewer {
    pub authenticated: bool,
    pub subject_id: Option<String>,
    pub role: Option<String>,
    pub state: GqlIdentityState,
}

// ============================================================================
// INPUT TYPES
// ============================================================================

/// Input for creating an article.
#[derive(Debug, Clone, InputObject)]
pub struct CreateArticleInput {
    pub title: String,
    pub summary: Option<String>,
    pub content: String,
    pub author_ids: Vec<ID>,
    pub volume_id: Option<ID>,
}

/// Input for adding a comment, editorial note or reply.
#[derive(Debug, Clone, InputObject)]
pub struct AddInteractionInput {
    pub article_id: ID,
    pub kind: GqlInteractionKind,
    pub content: String,
    pub parent_id: Option<ID>,
}

// ============================================================================
// LOADER HELPERS
// ============================================================================

fn request_context<'a>(ctx: &Context<'a>) -> GqlResult<&'a RequestContext> {
    ctx.data::<RequestContext>()
}

/// Optional reference: a missing id or a missing document both give `None`.
async fn load_reference<F: BatchFetch>(
    loader: &DataLoader<F>,
    kind: EntityKind,
    id: Option<&NaturalKey>,
) -> GqlResult<Option<F::Value>> {
    let Some(id) = id else {
        return Ok(None);
    };
    loader
        .load(LookupKey::new(kind, id.clone()))
        .await
        .into_graphql()
}

/// Root lookup: a missing document is a not-found failure.
async fn load_required<F: BatchFetch>(
    loader: &DataLoader<F>,
    kind: EntityKind,
    id: NaturalKey,
) -> RevistaResult<F::Value> {
    loader
        .load(LookupKey::new(kind, id.clone()))
        .await?
        .ok_or_else(|| RevistaError::not_found(kind, &id))
}

// ============================================================================
// RELATIONSHIP RESOLVERS
// ============================================================================

#[ComplexObject]
impl GqlArticle {
    /// Authors in the order the article lists them.
    async fn authors(&self, ctx: &Context<'_>) -> GqlResult<Vec<GqlAuthor>> {
        let rc = request_context(ctx)?;
        let authors = rc
            .loaders
            .authors
            .load_many(self.author_ids.iter().cloned().map(LookupKey::author))
            .await
            .into_graphql()?;
        Ok(authors.into_iter().flatten().map(GqlAuthor::from).collect())
    }

    async fn editorial(&self, ctx: &Context<'_>) -> GqlResult<Option<GqlEditorial>> {
        let rc = request_context(ctx)?;
        let editorial = load_reference(
            &rc.loaders.editorials,
            EntityKind::Editorial,
            self.editorial_id.as_ref(),
        )
        .await?;
        Ok(editorial.map(GqlEditorial::from))
    }

    async fn volume(&self, ctx: &Context<'_>) -> GqlResult<Option<GqlVolume>> {
        let rc = request_context(ctx)?;
        let volume =
            load_reference(&rc.loaders.volumes, EntityKind::Volume, self.volume_id.as_ref())
                .await?;
        Ok(volume.map(GqlVolume::from))
    }

    /// Body of the current history entry.
    async fn current_content(&self, ctx: &Context<'_>) -> GqlResult<Option<GqlArticleHistory>> {
        let rc = request_context(ctx)?;
        let history = load_reference(
            &rc.loaders.history,
            EntityKind::ArticleHistory,
            self.current_history_id.as_ref(),
        )
        .await?;
        Ok(history.map(GqlArticleHistory::from))
    }

    async fn history(&self, ctx: &Context<'_>) -> GqlResult<Vec<GqlArticleHistory>> {
        let rc = request_context(ctx)?;
        let history = rc
            .loaders
            .article_history
            .load(LookupKey::article(self.key.clone()))
            .await
            .into_graphql()?;
        Ok(history.into_iter().map(GqlArticleHistory::from).collect())
    }

    /// Top-level interactions. Replies hang off each interaction.
    async fn interactions(&self, ctx: &Context<'_>) -> GqlResult<Vec<GqlInteraction>> {
        let rc = request_context(ctx)?;
        let interactions = rc
            .loaders
            .article_interactions
            .load(LookupKey::article(self.key.clone()))
            .await
            .into_graphql()?;
        Ok(interactions.into_iter().map(GqlInteraction::from).collect())
    }
}

#[ComplexObject]
impl GqlVolume {
    async fn articles(&self, ctx: &Context<'_>) -> GqlResult<Vec<GqlArticle>> {
        let rc = request_context(ctx)?;
        let articles = rc
            .loaders
            .volume_articles
            .load(LookupKey::volume(self.key.clone()))
            .await
            .into_graphql()?;
        Ok(articles.into_iter().map(GqlArticle::from).collect())
    }
}

#[ComplexObject]
impl GqlInteraction {
    async fn replies(&self, ctx: &Context<'_>) -> GqlResult<Vec<GqlInteraction>> {
        let rc = request_context(ctx)?;
        let replies = rc
            .loaders
            .interaction_replies
            .load(LookupKey::interaction(self.key.clone()))
            .await
            .into_graphql()?;
        Ok(replies.into_iter().map(GqlInteraction::from).collect())
    }

    async fn parent(&self, ctx: &Context<'_>) -> GqlResult<Option<GqlInteraction>> {
        let rc = request_context(ctx)?;
        let parent = load_reference(
            &rc.loaders.interactions,
            EntityKind::Interaction,
            self.parent_key.as_ref(),
        )
        .await?;
        Ok(parent.map(GqlInteraction::from))
    }

    async fn article(&self, ctx: &Context<'_>) -> GqlResult<Option<GqlArticle>> {
        let rc = request_context(ctx)?;
        let article = load_reference(
            &rc.loaders.articles,
            EntityKind::Article,
            Some(&self.article_key),
        )
        .await?;
        Ok(article.map(GqlArticle::from))
    }
}

// ============================================================================
// QUERY ROOT
// ============================================================================

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Get an article by ID.
    async fn article(&self, ctx: &Context<'_>, id: ID) -> GqlResult<GqlArticle> {
        let rc = request_context(ctx)?;
        load_required(&rc.loaders.articles, EntityKind::Article, natural_key(id))
            .await
            .map(GqlArticle::from)
            .into_graphql()
    }

    /// Get several articles by ID. Unknown IDs give `null` in their position.
    async fn articles(&self, ctx: &Context<'_>, ids: Vec<ID>) -> GqlResult<Vec<Option<GqlArticle>>> {
        let rc = request_context(ctx)?;
        let articles = rc
            .loaders
            .articles
            .load_many(ids.into_iter().map(natural_key).map(LookupKey::article))
            .await
            .into_graphql()?;
        Ok(articles
            .into_iter()
            .map(|a| a.map(GqlArticle::from))
            .collect())
    }

    /// Get a volume by ID.
    async fn volume(&self, ctx: &Context<'_>, id: ID) -> GqlResult<GqlVolume> {
        let rc = request_context(ctx)?;
        load_required(&rc.loaders.volumes, EntityKind::Volume, natural_key(id))
            .await
            .map(GqlVolume::from)
            .into_graphql()
    }

    /// Get several volumes by ID. Unknown IDs give `null` in their position.
    async fn volumes(&self, ctx: &Context<'_>, ids: Vec<ID>) -> GqlResult<Vec<Option<GqlVolume>>> {
        let rc = request_context(ctx)?;
        let volumes = rc
            .loaders
            .volumes
            .load_many(ids.into_iter().map(natural_key).map(LookupKey::volume))
            .await
            .into_graphql()?;
        Ok(volumes.into_iter().map(|v| v.map(GqlVolume::from)).collect())
    }

    /// Get an interaction by ID.
    async fn interaction(&self, ctx: &Context<'_>, id: ID) -> GqlResult<GqlInteraction> {
        let rc = request_context(ctx)?;
        load_required(&rc.loaders.interactions, EntityKind::Interaction, natural_key(id))
            .await
            .map(GqlInteraction::from)
            .into_graphql()
    }

    /// The caller's resolved identity.
    async fn viewer(&self, ctx: &Context<'_>) -> GqlResult<GqlViewer> {
        let rc = request_context(ctx)?;
        Ok(GqlViewer {
            authenticated: rc.identity.principal.is_authenticated(),
            subject_id: rc.identity.claims.subject_id.clone(),
            role: rc.identity.claims.role.clone(),
            state: rc.identity.state.into(),
        })
    }
}

// ============================================================================
// MUTATION ROOT
// ============================================================================

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Submit a new article as a draft.
    async fn create_article(
        &self,
        ctx: &Context<'_>,
        input: CreateArticleInput,
    ) -> GqlResult<GqlArticle> {
        let rc = request_context(ctx)?;
        let new_article = NewArticle {
            title: input.title,
            summary: input.summary.unwrap_or_default(),
            content: input.content,
            author_ids: input.author_ids.into_iter().map(natural_key).collect(),
            volume_id: input.volume_id.map(natural_key),
        };

        services::create_article(rc.store(), &rc.identity, new_article)
            .await
            .map(GqlArticle::from)
            .into_graphql()
    }

    /// Move an article to another lifecycle status.
    async fn change_article_status(
        &self,
        ctx: &Context<'_>,
        id: ID,
        status: GqlArticleStatus,
    ) -> GqlResult<GqlArticle> {
        let rc = request_context(ctx)?;
        services::change_article_status(rc.store(), &rc.identity, &natural_key(id), status.into())
            .await
            .map(GqlArticle::from)
            .into_graphql()
    }

    /// Comment on an article, reply to a comment, or leave an editorial note.
    async fn add_interaction(
        &self,
        ctx: &Context<'_>,
        input: AddInteractionInput,
    ) -> GqlResult<GqlInteraction> {
        let rc = request_context(ctx)?;
        let new_interaction = NewInteraction {
            article_id: natural_key(input.article_id),
            kind: input.kind.into(),
            content: input.content,
            parent_id: input.parent_id.map(natural_key),
        };

        services::add_interaction(rc.store(), &rc.identity, new_interaction)
            .await
            .map(GqlInteraction::from)
            .into_graphql()
    }
}

// ============================================================================
// SCHEMA & HANDLERS
// ============================================================================

/// The GraphQL schema type.
pub type RevistaSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Create the GraphQL schema.
///
/// Collaborators are not schema data: every request carries its own
/// [`RequestContext`].
pub fn create_schema() -> RevistaSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription).finish()
}

/// Handler for GraphQL requests.
///
/// Authenticates the bearer token, resolves identity once and builds the
/// request's loaders before any field runs.
pub async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let principal = authenticate_bearer(&state.auth, auth_header);

    let request_id = Uuid::now_v7();
    let span = tracing::info_span!(
        "graphql_request",
        request_id = %request_id,
        subject = tracing::field::Empty
    );

    async move {
        let context = RequestContext::with_request_id(&state.service, principal, request_id).await;
        if let Some(subject) = context.identity.claims.subject_id.as_deref() {
            tracing::Span::current().record("subject", subject);
        }

        let request = req.into_inner().data(context);
        state.schema.execute(request).await.into()
    }
    .instrument(span)
    .await
}

/// Handler for GraphiQL playground.
pub async fn graphiql_handler() -> impl IntoResponse {
    Html(
        async_graphql::http::GraphiQLSource::build()
            .endpoint("/graphql")
            .finish(),
    )
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the GraphQL routes router.
pub fn create_router() -> Router<AppState> {
    Router::new().route("/graphql", get(graphiql_handler).post(graphql_handler))
}
