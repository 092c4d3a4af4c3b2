mod helpers;

use helpers::{publish_via_webhook, setup_test_app, TEST_SERVICE_API_KEY};
use panopub_storage::ObjectStore;

async fn seed_published_objects(app: &helpers::TestApp, prefix: &str) {
    for (name, body) in [
        ("index.html", b"<html>tour</html>".as_slice()),
        ("media/pano1.jpg", b"\xff\xd8\xff".as_slice()),
    ] {
        app.storage
            .put(
                &format!("{}{}", prefix, name),
                bytes::Bytes::copy_from_slice(body),
                "application/octet-stream",
            )
            .await
            .expect("seed object");
    }
}

#[tokio::test]
async fn test_soft_delete_copies_before_deleting() {
    let app = setup_test_app().await;
    publish_via_webhook(&app, "museum", "abc123").await;
    seed_published_objects(&app, "tours/museum/").await;

    let response = app
        .client()
        .delete("/api/v0/tours/abc123")
        .add_header("X-API-Key", TEST_SERVICE_API_KEY)
        .await;
    assert_eq!(response.status_code(), 200);
    let outcome: serde_json::Value = response.json();
    assert_eq!(outcome["objects_archived"], 2);
    let archive_prefix = outcome["archive_prefix"].as_str().expect("archive prefix");
    assert!(archive_prefix.starts_with("archive/abc123/"));

    // Originals are gone, archived copies exist
    assert!(app.storage.head("tours/museum/index.html").await.expect("head").is_none());
    let archived = app.storage.list_prefix(archive_prefix).await.expect("list");
    assert_eq!(archived.len(), 2);

    // The tour row carries the retention stamp
    let tour: serde_json::Value = app
        .client()
        .get("/api/v0/tours/abc123")
        .add_header("X-API-Key", TEST_SERVICE_API_KEY)
        .await
        .json();
    assert!(tour["archived_at"].is_string());

    // Archived tours are not publicly servable
    let response = app.client().get("/t/museum").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_soft_delete_twice_conflicts() {
    let app = setup_test_app().await;
    publish_via_webhook(&app, "museum", "abc123").await;
    seed_published_objects(&app, "tours/museum/").await;

    let first = app
        .client()
        .delete("/api/v0/tours/abc123")
        .add_header("X-API-Key", TEST_SERVICE_API_KEY)
        .await;
    assert_eq!(first.status_code(), 200);

    let second = app
        .client()
        .delete("/api/v0/tours/abc123")
        .add_header("X-API-Key", TEST_SERVICE_API_KEY)
        .await;
    assert_eq!(second.status_code(), 409);
}

#[tokio::test]
async fn test_retention_sweep_hard_deletes_expired_archives() {
    let app = setup_test_app().await;
    publish_via_webhook(&app, "museum", "abc123").await;
    seed_published_objects(&app, "tours/museum/").await;

    let response = app
        .client()
        .delete("/api/v0/tours/abc123")
        .add_header("X-API-Key", TEST_SERVICE_API_KEY)
        .await;
    assert_eq!(response.status_code(), 200);
    let outcome: serde_json::Value = response.json();
    let archive_prefix = outcome["archive_prefix"].as_str().expect("archive prefix").to_string();

    // Not yet expired: the sweep must leave it alone.
    app.sweeper(3600).run_once().await.expect("sweep");
    assert!(!app.storage.list_prefix(&archive_prefix).await.expect("list").is_empty());

    // Force the retention expiry into the past.
    sqlx::query(
        "UPDATE published_tours SET retention_expires_at = NOW() - INTERVAL '1 day' WHERE content_id = 'abc123'",
    )
    .execute(app.pool())
    .await
    .expect("age archive");

    app.sweeper(3600).run_once().await.expect("sweep");

    assert!(app.storage.list_prefix(&archive_prefix).await.expect("list").is_empty());
    let response = app
        .client()
        .get("/api/v0/tours/abc123")
        .add_header("X-API-Key", TEST_SERVICE_API_KEY)
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_slug_change_keeps_old_links_working() {
    let app = setup_test_app().await;
    publish_via_webhook(&app, "museum", "abc123").await;
    seed_published_objects(&app, "tours/museum/").await;

    let response = app
        .client()
        .post("/api/v0/tours/abc123/slug")
        .add_header("X-API-Key", TEST_SERVICE_API_KEY)
        .json(&serde_json::json!({ "slug": "grand-museum" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let tour: serde_json::Value = response.json();
    assert_eq!(tour["slug"], "grand-museum");
    // Identity and storage are untouched by a slug change
    assert_eq!(tour["content_id"], "abc123");
    assert_eq!(tour["storage_prefix"], "tours/museum/");

    // New slug serves
    let response = app.client().get("/t/grand-museum").await;
    assert_eq!(response.status_code(), 308);
    let location = response.header("location");
    assert!(location
        .to_str()
        .expect("location str")
        .ends_with("tours/museum/index.html"));

    // Old slug still resolves through the redirect mapping
    let response = app.client().get("/t/museum").await;
    assert_eq!(response.status_code(), 308);

    // Asset paths resolve under the prefix
    let response = app.client().get("/t/grand-museum/media/pano1.jpg").await;
    assert_eq!(response.status_code(), 308);
    let location = response.header("location");
    assert!(location
        .to_str()
        .expect("location str")
        .ends_with("tours/museum/media/pano1.jpg"));
}

#[tokio::test]
async fn test_session_retention_sweep_removes_old_terminal_sessions() {
    let app = setup_test_app().await;
    publish_via_webhook(&app, "museum", "abc123").await;

    // Age the completed session past the retention window.
    sqlx::query("UPDATE upload_sessions SET updated_at = NOW() - INTERVAL '8 days'")
        .execute(app.pool())
        .await
        .expect("age session");

    app.sweeper(3600).run_once().await.expect("sweep");

    let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM upload_sessions")
        .fetch_one(app.pool())
        .await
        .expect("count");
    assert_eq!(sessions, 0);

    // The published tour is unaffected by session cleanup.
    let response = app
        .client()
        .get("/api/v0/tours/abc123")
        .add_header("X-API-Key", TEST_SERVICE_API_KEY)
        .await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_unknown_slug_is_404() {
    let app = setup_test_app().await;
    let response = app.client().get("/t/nowhere").await;
    assert_eq!(response.status_code(), 404);
}
