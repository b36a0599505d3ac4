use super::*;
use crate::downloader::test_helpers::{
    MemoryStore, RecordingTagger, ScriptedAcquirer, TestDownloader, create_test_downloader_with,
};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tower::ServiceExt;


/// Test downloader plus the Arc the router wants
///
/// The [`TestDownloader`] holds the temp dir, so it must outlive the router.
struct ApiHarness {
    inner: TestDownloader,
    downloader: Arc<TrackDownloader>,
}

impl ApiHarness {
    fn store(&self) -> &MemoryStore {
        &self.inner.store
    }

    fn router(&self) -> Router {
        create_router(self.downloader.clone(), self.downloader.config.clone())
    }
}

fn create_harness() -> ApiHarness {
    create_harness_with(|_| {})
}

fn create_harness_with(configure: impl FnOnce(&mut Config)) -> ApiHarness {
    let inner = create_test_downloader_with(
        ScriptedAcquirer::default(),
        RecordingTagger::default(),
        |config| {
            config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
            configure(config);
        },
    );
    let downloader = Arc::new(inner.downloader.clone());
    ApiHarness { inner, downloader }
}

async fn get(app: Router, uri: &str) -> axum::response::Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> axum::response::Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let harness = create_harness();

    let api_handle = tokio::spawn({
        let downloader = harness.downloader.clone();
        let config = harness.downloader.config.clone();
        async move { start_api_server(downloader, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server should still be serving");

    api_handle.abort();
}

#[tokio::test]
async fn test_spawn_api_server_method() {
    let harness = create_harness();

    let api_handle = harness.downloader.spawn_api_server();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished());

    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled() {
    let harness = create_harness_with(|config| {
        config.server.api.cors_enabled = true;
        config.server.api.cors_origins = vec!["*".to_string()];
    });

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = harness.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let harness = create_harness_with(|config| config.server.api.cors_enabled = false);

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = harness.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let harness = create_harness();

    let response = get(harness.router(), "/api/v1/queue").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
