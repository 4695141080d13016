//! End-to-end HTTP surface tests driven through the router directly,
//! covering submission, status polling, conflict, and cancellation.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use pipeworks_api::{create_router, ApiConfig, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn test_app() -> (AppState, axum::Router) {
    let db_file = tempfile::NamedTempFile::new().unwrap();
    let db_path = db_file.path().to_path_buf();
    std::mem::forget(db_file);
    let artifact_dir = tempfile::tempdir().unwrap();
    let inbox_dir = tempfile::tempdir().unwrap();
    let artifact_dir_path = artifact_dir.path().to_path_buf();
    let inbox_dir_path = inbox_dir.path().to_path_buf();
    std::mem::forget(artifact_dir);
    std::mem::forget(inbox_dir);

    let config = ApiConfig {
        database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
        artifact_root: artifact_dir_path.to_string_lossy().to_string(),
        discovery_source_dir: inbox_dir_path.to_string_lossy().to_string(),
        port: 0,
        ..ApiConfig::default()
    };

    let state = AppState::new(config).await.expect("app state builds");
    let router = create_router(state.clone(), None);
    (state, router)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok_and_queue_counts() {
    let (_state, app) = test_app().await;

    let response = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ok"], json!(true));
}

#[tokio::test]
async fn discover_episodes_is_idempotent_over_http() {
    let (state, app) = test_app().await;
    let media_path = std::path::Path::new(&state.config.discovery_source_dir).join("ep1.mp4");
    tokio::fs::write(&media_path, b"fake media bytes").await.unwrap();

    let first = app
        .clone()
        .oneshot(Request::builder().method("POST").uri("/api/episodes/discover").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first_body = body_json(first).await;
    assert_eq!(first_body["registered"], json!(1));

    let second = app
        .oneshot(Request::builder().method("POST").uri("/api/episodes/discover").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let second_body = body_json(second).await;
    assert_eq!(second_body["registered"], json!(0));
}

#[tokio::test]
async fn submitting_a_process_job_twice_for_the_same_episode_conflicts() {
    let (state, app) = test_app().await;
    state
        .registry
        .register_episode(pipeworks_models::EpisodeDraft {
            episode_id: "show_ep1_2024-01-01".into(),
            content_hash: "abc123".into(),
            source_path: "ep1.mp4".into(),
            file_size: 10,
            duration_seconds: None,
            last_modified: chrono::Utc::now(),
            metadata: pipeworks_models::EpisodeMetadata::default(),
        })
        .await
        .unwrap();

    let submit_body = json!({
        "episode_id": "show_ep1_2024-01-01",
        "target_stage": "rendered",
    });

    let first = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/jobs/process")
                .header("content-type", "application/json")
                .body(Body::from(submit_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::ACCEPTED);

    let second = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/jobs/process")
                .header("content-type", "application/json")
                .body(Body::from(submit_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn getting_an_unknown_job_returns_not_found() {
    let (_state, app) = test_app().await;
    let random_id = uuid::Uuid::new_v4();

    let response = app.oneshot(Request::builder().uri(format!("/api/jobs/{random_id}")).body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_an_unknown_episode_returns_not_found() {
    let (_state, app) = test_app().await;

    let response = app.oneshot(Request::builder().method("DELETE").uri("/api/episodes/does-not-exist").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
