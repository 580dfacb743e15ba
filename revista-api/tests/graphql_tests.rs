//! End-to-end GraphQL tests against the seeded in-memory store.
//!
//! Time is paused so that every loader window closes only once all
//! concurrently resolving fields have registered their keys.

use std::sync::Arc;

use async_graphql::Request;
use revista_api::identity::SUBJECT_CLAIM;
use revista_api::{create_schema, Claim, Principal, RequestContext, RevistaSchema, ServiceConfig};
use revista_core::{EntityKind, RevistaResult};
use revista_loader::BatchConfig;
use revista_storage::{DocumentStore, MemoryStore};
use revista_test_utils::fixtures::{
    seeded_store, ARTICLE_1, ARTICLE_2, ARTICLE_3, COMMENT_1, COMMENT_2, EDITOR_USER,
    FORMER_EDITOR_USER, READER_USER,
};
use serde_json::{json, Value};

// ============================================================================
// TEST HARNESS
// ============================================================================

struct Harness {
    store: Arc<MemoryStore>,
    service: ServiceConfig,
    schema: RevistaSchema,
}

impl Harness {
    fn new() -> RevistaResult<Self> {
        let store = Arc::new(seeded_store()?);
        let shared: Arc<dyn DocumentStore> = store.clone();
        Ok(Self {
            store,
            service: ServiceConfig::with_store(shared, BatchConfig::default()),
            schema: create_schema(),
        })
    }

    /// Run one request the way the HTTP handler does and return the
    /// serialized response.
    async fn execute(&self, principal: Principal, query: &str) -> Value {
        let context = RequestContext::new(&self.service, principal).await;
        let response = self.schema.execute(Request::new(query).data(context)).await;
        serde_json::to_value(&response).unwrap_or(Value::Null)
    }
}

fn caller(subject: &str) -> Principal {
    Principal::authenticated([Claim::new(SUBJECT_CLAIM, subject)])
}

fn error_codes(response: &Value) -> Vec<String> {
    response["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e["extensions"]["code"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// BATCHING
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_nested_lists_issue_one_query_per_level() -> RevistaResult<()> {
    let harness = Harness::new()?;
    let response = harness
        .execute(
            Principal::anonymous(),
            r#"{ volumes(ids: ["v-1", "v-2"]) { title articles { id authors { name } } } }"#,
        )
        .await;

    assert_eq!(response.get("errors"), None);
    assert_eq!(
        response["data"]["volumes"],
        json!([
            {
                "title": "Foundations",
                "articles": [
                    { "id": ARTICLE_1, "authors": [{ "name": "Ada" }, { "name": "Grace" }] },
                    { "id": ARTICLE_2, "authors": [{ "name": "Grace" }] }
                ]
            },
            {
                "title": "Practice",
                "articles": [
                    { "id": ARTICLE_3, "authors": [{ "name": "Ada" }, { "name": "Barbara" }] }
                ]
            }
        ])
    );

    assert_eq!(harness.store.reads(EntityKind::Volume), 1);
    assert_eq!(harness.store.reads(EntityKind::Article), 1);
    assert_eq!(harness.store.reads(EntityKind::Author), 1);
    assert_eq!(harness.store.reads(EntityKind::Staff), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_repeated_key_in_one_request_is_fetched_once() -> RevistaResult<()> {
    let harness = Harness::new()?;
    let response = harness
        .execute(
            Principal::anonymous(),
            r#"{
                first: article(id: "a-1") { title }
                again: article(id: "a-1") { title }
                list: articles(ids: ["a-1", "a-2", "a-1"]) { id }
            }"#,
        )
        .await;

    assert_eq!(response.get("errors"), None);
    assert_eq!(response["data"]["first"], response["data"]["again"]);
    assert_eq!(
        response["data"]["list"],
        json!([{ "id": ARTICLE_1 }, { "id": ARTICLE_2 }, { "id": ARTICLE_1 }])
    );
    assert_eq!(harness.store.reads(EntityKind::Article), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_requests_do_not_share_cached_values() -> RevistaResult<()> {
    let harness = Harness::new()?;
    let query = r#"{ article(id: "a-1") { title } }"#;

    let (first, second) = tokio::join!(
        harness.execute(Principal::anonymous(), query),
        harness.execute(Principal::anonymous(), query),
    );

    assert_eq!(first["data"], second["data"]);
    assert_eq!(harness.store.reads(EntityKind::Article), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_comment_threads_resolve_through_grouped_loaders() -> RevistaResult<()> {
    let harness = Harness::new()?;
    let response = harness
        .execute(
            Principal::anonymous(),
            r#"{ articles(ids: ["a-1", "a-2"]) {
                interactions { id replies { id parent { id } } }
            } }"#,
        )
        .await;

    assert_eq!(response.get("errors"), None);
    assert_eq!(
        response["data"]["articles"],
        json!([
            {
                "interactions": [
                    { "id": COMMENT_1, "replies": [{ "id": "i-2", "parent": { "id": COMMENT_1 } }] },
                    { "id": "i-4", "replies": [] }
                ]
            },
            { "interactions": [{ "id": COMMENT_2, "replies": [] }] }
        ])
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_storage_failure_reaches_every_waiting_field() -> RevistaResult<()> {
    let harness = Harness::new()?;
    harness.store.set_unavailable(EntityKind::Author, true);

    let response = harness
        .execute(
            Principal::anonymous(),
            r#"{ articles(ids: ["a-1", "a-2"]) { authors { name } } }"#,
        )
        .await;

    let errors = response["errors"].as_array().cloned().unwrap_or_default();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0]["message"], errors[1]["message"]);
    assert_eq!(error_codes(&response), vec!["STORAGE_FAILURE", "STORAGE_FAILURE"]);
    assert_eq!(harness.store.reads(EntityKind::Author), 1);
    Ok(())
}

// ============================================================================
// ERROR MAPPING AT THE BOUNDARY
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_missing_root_entity_is_resource_not_found() -> RevistaResult<()> {
    let harness = Harness::new()?;
    let response = harness
        .execute(Principal::anonymous(), r#"{ article(id: "nope") { id } }"#)
        .await;

    assert_eq!(response["data"], Value::Null);
    assert_eq!(error_codes(&response), vec!["RESOURCE_NOT_FOUND"]);
    assert_eq!(
        response["errors"][0]["message"],
        "Article with id 'nope' was not found"
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_missing_nested_reference_is_null() -> RevistaResult<()> {
    let harness = Harness::new()?;
    let response = harness
        .execute(
            Principal::anonymous(),
            r#"{ article(id: "a-4") { volume { id } editorial { id } currentContent { id } } }"#,
        )
        .await;

    assert_eq!(response.get("errors"), None);
    assert_eq!(
        response["data"]["article"],
        json!({ "volume": null, "editorial": null, "currentContent": null })
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_illegal_transition_is_business_invalid_operation() -> RevistaResult<()> {
    let harness = Harness::new()?;
    let response = harness
        .execute(
            caller(EDITOR_USER),
            r#"mutation { changeArticleStatus(id: "a-3", status: PUBLISHED) { status } }"#,
        )
        .await;

    assert_eq!(error_codes(&response), vec!["BUSINESS_INVALID_OPERATION"]);
    assert_eq!(
        response["errors"][0]["message"],
        "Cannot move article 'a-3' from IN_REVIEW to PUBLISHED"
    );

    let response = harness
        .execute(
            caller(EDITOR_USER),
            r#"mutation { changeArticleStatus(id: "a-3", status: APPROVED) { id status } }"#,
        )
        .await;
    assert_eq!(
        response["data"]["changeArticleStatus"],
        json!({ "id": ARTICLE_3, "status": "APPROVED" })
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unauthorized_failure_keeps_native_code() -> RevistaResult<()> {
    let harness = Harness::new()?;

    let anonymous = harness
        .execute(
            Principal::anonymous(),
            r#"mutation { createArticle(input: { title: "T", content: "c", authorIds: ["au-1"] }) { id } }"#,
        )
        .await;
    assert_eq!(error_codes(&anonymous), vec!["AUTH_NOT_AUTHORIZED"]);

    let former_editor = harness
        .execute(
            caller(FORMER_EDITOR_USER),
            r#"mutation { changeArticleStatus(id: "a-3", status: APPROVED) { id } }"#,
        )
        .await;
    assert_eq!(error_codes(&former_editor), vec!["AUTH_NOT_AUTHORIZED"]);
    Ok(())
}

// ============================================================================
// MUTATIONS
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_created_article_is_a_draft_with_content() -> RevistaResult<()> {
    let harness = Harness::new()?;
    let response = harness
        .execute(
            caller("user-au-1"),
            r#"mutation {
                createArticle(input: {
                    title: "On Batching",
                    content: "First draft",
                    authorIds: ["au-1", "au-3"],
                    volumeId: "v-2"
                }) {
                    title status
                    authors { name }
                    volume { title }
                    currentContent { version content }
                }
            }"#,
        )
        .await;

    assert_eq!(response.get("errors"), None);
    assert_eq!(
        response["data"]["createArticle"],
        json!({
            "title": "On Batching",
            "status": "DRAFT",
            "authors": [{ "name": "Ada" }, { "name": "Barbara" }],
            "volume": { "title": "Practice" },
            "currentContent": { "version": 1, "content": "First draft" }
        })
    );
    assert_eq!(harness.store.count(EntityKind::Article).await, 5);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_reply_must_stay_on_its_article() -> RevistaResult<()> {
    let harness = Harness::new()?;
    let response = harness
        .execute(
            caller(READER_USER),
            r#"mutation {
                addInteraction(input: {
                    articleId: "a-2", kind: COMMENT, content: "Agreed", parentId: "i-1"
                }) { id }
            }"#,
        )
        .await;
    assert_eq!(error_codes(&response), vec!["BUSINESS_INVALID_OPERATION"]);

    let response = harness
        .execute(
            caller(READER_USER),
            r#"mutation {
                addInteraction(input: {
                    articleId: "a-1", kind: COMMENT, content: "Agreed", parentId: "i-1"
                }) { userId parent { id } article { id } }
            }"#,
        )
        .await;
    assert_eq!(
        response["data"]["addInteraction"],
        json!({ "userId": READER_USER, "parent": { "id": COMMENT_1 }, "article": { "id": ARTICLE_1 } })
    );
    Ok(())
}

// ============================================================================
// IDENTITY
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_viewer_reflects_resolved_identity() -> RevistaResult<()> {
    let harness = Harness::new()?;
    let query = "{ viewer { authenticated subjectId role state } }";

    let editor = harness.execute(caller(EDITOR_USER), query).await;
    assert_eq!(
        editor["data"]["viewer"],
        json!({ "authenticated": true, "subjectId": EDITOR_USER, "role": "EDITOR", "state": "ELEVATED" })
    );

    let former = harness.execute(caller(FORMER_EDITOR_USER), query).await;
    assert_eq!(
        former["data"]["viewer"],
        json!({
            "authenticated": true,
            "subjectId": FORMER_EDITOR_USER,
            "role": null,
            "state": "AUTHENTICATED"
        })
    );

    let anonymous = harness.execute(Principal::anonymous(), query).await;
    assert_eq!(
        anonymous["data"]["viewer"],
        json!({ "authenticated": false, "subjectId": null, "role": null, "state": "UNAUTHENTICATED" })
    );
    Ok(())
}
