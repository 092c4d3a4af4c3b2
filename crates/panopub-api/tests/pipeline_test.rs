mod helpers;

use helpers::{
    issue_grant, sample_tour_zip, setup_test_app, upload_and_complete, TEST_SERVICE_API_KEY,
    TEST_WEBHOOK_SECRET,
};
use panopub_processor::{
    HttpReporter, NoopCdn, ObjectEvent, ProcessOutcome, ProcessorConfig, TourProcessor,
};
use panopub_storage::ObjectStore;
use std::sync::Arc;

#[tokio::test]
async fn test_grant_rejects_oversized_file() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/v0/uploads/grants")
        .add_header("X-API-Key", TEST_SERVICE_API_KEY)
        .json(&serde_json::json!({
            "target_name": "museum",
            "file_name": "tour.zip",
            "file_size": 100 * 1024 * 1024,
            "file_type": "application/zip",
            "is_update": false
        }))
        .await;

    assert_eq!(response.status_code(), 413);

    // Nothing was granted
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM upload_sessions")
        .fetch_one(app.pool())
        .await
        .expect("count");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_grant_rejects_wrong_archive_type() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/v0/uploads/grants")
        .add_header("X-API-Key", TEST_SERVICE_API_KEY)
        .json(&serde_json::json!({
            "target_name": "museum",
            "file_name": "tour.rar",
            "file_size": 1000,
            "file_type": "application/zip",
            "is_update": false
        }))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = app
        .client()
        .post("/api/v0/uploads/grants")
        .add_header("X-API-Key", TEST_SERVICE_API_KEY)
        .json(&serde_json::json!({
            "target_name": "museum",
            "file_name": "tour.zip",
            "file_size": 1000,
            "file_type": "text/html",
            "is_update": false
        }))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_grant_rejects_unknown_content_id_for_update() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/v0/uploads/grants")
        .add_header("X-API-Key", TEST_SERVICE_API_KEY)
        .json(&serde_json::json!({
            "existing_content_id": "no-such-content",
            "file_name": "tour.zip",
            "file_size": 1000,
            "file_type": "application/zip",
            "is_update": true
        }))
        .await;

    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_grant_requires_api_key() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/v0/uploads/grants")
        .json(&serde_json::json!({
            "target_name": "museum",
            "file_name": "tour.zip",
            "file_size": 1000,
            "file_type": "application/zip",
            "is_update": false
        }))
        .await;

    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_complete_rejects_missing_object() {
    let app = setup_test_app().await;

    let grant = issue_grant(app.client(), "museum").await;
    let session_id = grant["session_id"].as_str().expect("session id");

    // No upload happened; the head check must catch the lie.
    let response = app
        .client()
        .post("/api/v0/uploads/complete")
        .add_header("X-API-Key", TEST_SERVICE_API_KEY)
        .json(&serde_json::json!({ "session_id": session_id }))
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_complete_notice_is_idempotent() {
    let app = setup_test_app().await;

    let (session_id, job_id) = upload_and_complete(&app, "museum").await;

    // A retried notice returns the same job id and creates no second job.
    let response = app
        .client()
        .post("/api/v0/uploads/complete")
        .add_header("X-API-Key", TEST_SERVICE_API_KEY)
        .json(&serde_json::json!({ "session_id": session_id }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["job_id"].as_str().expect("job id"), job_id.to_string());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM processing_jobs")
        .fetch_one(app.pool())
        .await
        .expect("count");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_concurrent_complete_notices_create_one_job() {
    let app = setup_test_app().await;

    let grant = issue_grant(app.client(), "museum").await;
    let session_id = grant["session_id"].as_str().expect("session id").to_string();
    let object_key = grant["object_key"].as_str().expect("object key");
    app.storage
        .put(object_key, sample_tour_zip().into(), "application/zip")
        .await
        .expect("seed upload");

    let notice = |session_id: String| async move {
        app.client()
            .post("/api/v0/uploads/complete")
            .add_header("X-API-Key", TEST_SERVICE_API_KEY)
            .json(&serde_json::json!({ "session_id": session_id }))
            .await
    };

    let (first, second) = tokio::join!(notice(session_id.clone()), notice(session_id));
    assert_eq!(first.status_code(), 200);
    assert_eq!(second.status_code(), 200);

    let first_body: serde_json::Value = first.json();
    let second_body: serde_json::Value = second.json();
    assert_eq!(first_body["job_id"], second_body["job_id"]);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM processing_jobs")
        .fetch_one(app.pool())
        .await
        .expect("count");
    assert_eq!(count, 1, "the simulated race must not spawn two jobs");
}

/// Full pipeline: grant → direct upload → complete notice → processor run
/// (reporting over real HTTP) → progress shows completed → tour listed.
#[tokio::test]
async fn test_end_to_end_publish() {
    let app = setup_test_app().await;

    let (session_id, _job_id) = upload_and_complete(&app, "museum").await;

    let reporter = Arc::new(
        HttpReporter::new(app.base_url(), Some(TEST_WEBHOOK_SECRET.to_vec())).expect("reporter"),
    );
    let processor = TourProcessor::new(
        app.storage.clone() as Arc<dyn ObjectStore>,
        Arc::new(NoopCdn),
        reporter,
        ProcessorConfig {
            max_archive_size_bytes: 10 * 1024 * 1024,
            cdn_invalidation_enabled: false,
        },
    );

    let outcome = processor
        .handle_event(&ObjectEvent {
            bucket: "local".to_string(),
            key: "uploads/museum.zip".to_string(),
        })
        .await
        .expect("processing");
    assert!(matches!(outcome, ProcessOutcome::Published { .. }));

    // Progress observes the terminal state
    let response = app
        .client()
        .get(&format!("/api/v0/uploads/{}/progress", session_id))
        .add_header("X-API-Key", TEST_SERVICE_API_KEY)
        .await;
    assert_eq!(response.status_code(), 200);
    let progress: serde_json::Value = response.json();
    assert_eq!(progress["status"], "completed");
    assert_eq!(progress["percent"], 100);

    // Entries are published, the inbox object is consumed
    assert!(app
        .storage
        .head("tours/museum/index.html")
        .await
        .expect("head")
        .is_some());
    assert!(app.storage.head("uploads/museum.zip").await.expect("head").is_none());

    // The tour is visible in the read API
    let response = app
        .client()
        .get("/api/v0/tours")
        .add_header("X-API-Key", TEST_SERVICE_API_KEY)
        .await;
    assert_eq!(response.status_code(), 200);
    let tours: serde_json::Value = response.json();
    let tours = tours.as_array().expect("array");
    assert_eq!(tours.len(), 1);
    assert_eq!(tours[0]["slug"], "museum");
    assert_eq!(tours[0]["storage_prefix"], "tours/museum/");
    assert_eq!(tours[0]["status"], "completed");
}

#[tokio::test]
async fn test_progress_unknown_id_is_404() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get(&format!("/api/v0/uploads/{}/progress", uuid::Uuid::new_v4()))
        .add_header("X-API-Key", TEST_SERVICE_API_KEY)
        .await;
    assert_eq!(response.status_code(), 404);
}
