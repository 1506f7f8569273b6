//! Integration tests for the HTTP backend clients against a mock server.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use heimdall::backend::{HttpAccountSource, HttpFeatureSource, HttpJobRunner, HttpPublisher};
use heimdall::error::{BackendError, PublishError};
use heimdall::traits::{AccountSource, FeatureSource, JobRunner, Publisher};
use heimdall::{ApiKeyRole, BatchJob, Event, EventPayload, GoalEvent};

const TIMEOUT: Duration = Duration::from_secs(5);

fn goal(id: &str) -> Event {
    Event::new(
        id,
        EventPayload::Goal(GoalEvent {
            timestamp: 1_700_000_000,
            goal_id: "checkout".into(),
            user_id: "alice".into(),
            ..Default::default()
        }),
    )
    .in_environment("env-1")
}

// =============================================================================
// Account service
// =============================================================================

#[tokio::test]
async fn api_key_lookup_sends_token_in_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/api_keys:lookup"))
        .and(body_json(json!({ "api_key": "secret" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "environment_api_key": {
                "environment_id": "env-1",
                "api_key_id": "key-1",
                "role": "SDK_CLIENT",
                "disabled": false
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let accounts = HttpAccountSource::new(server.uri(), TIMEOUT).unwrap();
    let key = accounts.get_api_key_by_token("secret").await.unwrap();

    assert_eq!(key.environment_id, "env-1");
    assert_eq!(key.api_key_id, "key-1");
    assert_eq!(key.role, ApiKeyRole::SdkClient);
    assert!(!key.disabled);
}

#[tokio::test]
async fn unknown_api_key_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/api_keys:lookup"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let accounts = HttpAccountSource::new(server.uri(), TIMEOUT).unwrap();
    let err = accounts.get_api_key_by_token("nope").await.unwrap_err();
    assert!(matches!(err, BackendError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn trailing_slash_in_base_url_is_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/api_keys:lookup"))
        .respond_with(ResponseTemplate::new(503).set_body_string("draining"))
        .mount(&server)
        .await;

    let accounts = HttpAccountSource::new(format!("{}/", server.uri()), TIMEOUT).unwrap();
    let err = accounts.get_api_key_by_token("secret").await.unwrap_err();
    match err {
        BackendError::Unavailable(message) => assert!(message.contains("draining")),
        other => panic!("expected Unavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_response_body_is_other() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/api_keys:lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let accounts = HttpAccountSource::new(server.uri(), TIMEOUT).unwrap();
    let err = accounts.get_api_key_by_token("secret").await.unwrap_err();
    assert!(matches!(err, BackendError::Other(_)), "got {err:?}");
}

// =============================================================================
// Feature service
// =============================================================================

#[tokio::test]
async fn list_features_passes_cursor_and_page_size() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/environments/env-1/features"))
        .and(query_param("cursor", "page-2"))
        .and(query_param("page_size", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "features": [
                { "id": "f1", "version": 3, "enabled": true, "tags": ["web"] },
                { "id": "f2", "archived": true, "updated_at": 42 }
            ],
            "cursor": "page-3"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = HttpFeatureSource::new(server.uri(), TIMEOUT).unwrap();
    let page = source.list_features("env-1", "page-2", 500).await.unwrap();

    assert_eq!(page.cursor, "page-3");
    assert_eq!(page.features.len(), 2);
    assert_eq!(page.features[0].version, 3);
    assert!(page.features[0].has_tag("web"));
    assert!(page.features[1].archived);
    assert_eq!(page.features[1].updated_at, 42);
}

#[tokio::test]
async fn last_feature_page_has_empty_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/environments/env-1/features"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "features": [] })))
        .mount(&server)
        .await;

    let source = HttpFeatureSource::new(server.uri(), TIMEOUT).unwrap();
    let page = source.list_features("env-1", "", 100).await.unwrap();
    assert!(page.features.is_empty());
    assert!(page.cursor.is_empty());
}

#[tokio::test]
async fn segment_users_and_segment_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/environments/env-1/segments/seg-1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [
                { "segment_id": "seg-1", "user_id": "alice" },
                { "segment_id": "seg-1", "user_id": "bob" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/environments/env-1/segments/seg-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "segment": { "id": "seg-1", "updated_at": 1234 }
        })))
        .mount(&server)
        .await;

    let source = HttpFeatureSource::new(server.uri(), TIMEOUT).unwrap();

    let users = source.list_segment_users("env-1", "seg-1").await.unwrap();
    let ids: Vec<&str> = users.iter().map(|u| u.user_id.as_str()).collect();
    assert_eq!(ids, vec!["alice", "bob"]);

    let segment = source.get_segment("env-1", "seg-1").await.unwrap();
    assert_eq!(segment.id, "seg-1");
    assert_eq!(segment.updated_at, 1234);
    assert!(!segment.deleted);
}

#[tokio::test]
async fn missing_segment_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/environments/env-1/segments/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let source = HttpFeatureSource::new(server.uri(), TIMEOUT).unwrap();
    let err = source.get_segment("env-1", "gone").await.unwrap_err();
    assert!(matches!(err, BackendError::NotFound(_)), "got {err:?}");
}

// =============================================================================
// Publisher
// =============================================================================

#[tokio::test]
async fn publish_multi_reports_per_message_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/topics/goal:publish"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "failures": {
                "e2": { "bad_message": true },
                "e3": { "message": "quota" }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let publisher = HttpPublisher::new(server.uri(), "goal", TIMEOUT).unwrap();
    assert_eq!(publisher.topic(), "goal");

    let failures = publisher
        .publish_multi(&[goal("e1"), goal("e2"), goal("e3")])
        .await;
    assert_eq!(failures.len(), 2);
    assert_eq!(failures["e2"], PublishError::BadMessage);
    assert_eq!(failures["e3"], PublishError::Failed("quota".into()));
    assert!(failures["e3"].is_retriable());
}

#[tokio::test]
async fn rejected_batch_fails_every_message_as_bad() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/topics/evaluation:publish"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let publisher = HttpPublisher::new(server.uri(), "evaluation", TIMEOUT).unwrap();
    let failures = publisher.publish_multi(&[goal("e1"), goal("e2")]).await;

    assert_eq!(failures.len(), 2);
    assert!(failures.values().all(|e| *e == PublishError::BadMessage));
}

#[tokio::test]
async fn unavailable_topic_fails_every_message_as_retriable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/topics/user:publish"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let publisher = HttpPublisher::new(server.uri(), "user", TIMEOUT).unwrap();
    let failures = publisher.publish_multi(&[goal("e1"), goal("e2")]).await;

    assert_eq!(failures.len(), 2);
    assert!(failures.values().all(PublishError::is_retriable));

    let err = publisher.publish(&goal("e3")).await.unwrap_err();
    assert!(err.is_retriable());
}

#[tokio::test]
async fn single_publish_succeeds_without_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/topics/goal:publish"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let publisher = HttpPublisher::new(server.uri(), "goal", TIMEOUT).unwrap();
    publisher.publish(&goal("e1")).await.unwrap();
}

// =============================================================================
// Batch service
// =============================================================================

#[tokio::test]
async fn job_runner_posts_job_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/jobs/FeatureFlagCacher:run"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let runner = HttpJobRunner::new(server.uri(), TIMEOUT).unwrap();
    runner.run(BatchJob::FeatureFlagCacher).await.unwrap();
}

#[tokio::test]
async fn busy_batch_instance_is_resource_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/jobs/ApiKeyCacher:run"))
        .respond_with(ResponseTemplate::new(429).set_body_string("already running"))
        .mount(&server)
        .await;

    let runner = HttpJobRunner::new(server.uri(), TIMEOUT).unwrap();
    let err = runner.run(BatchJob::ApiKeyCacher).await.unwrap_err();
    assert!(matches!(err, BackendError::ResourceExhausted(_)), "got {err:?}");
}
