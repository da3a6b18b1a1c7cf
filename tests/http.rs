// HTTP surface: submission validation, status lookup, log truncation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpListener;

use fetchbot::queue::{JobRunner, Scheduler};
use fetchbot::server::{router, AppState};
use fetchbot::store::JobStore;

/// Runner that parks jobs forever so submitted jobs stay `queued`.
struct ParkedRunner;

#[async_trait]
impl JobRunner for ParkedRunner {
    async fn run(&self, _job_id: String) {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
}

async fn spawn_server() -> (String, Arc<JobStore>) {
    let store = Arc::new(JobStore::new());
    let scheduler = Scheduler::new(1, Arc::new(ParkedRunner));
    let app = router(AppState {
        store: store.clone(),
        scheduler,
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), store)
}

#[tokio::test]
async fn valid_submission_is_immediately_queryable() {
    let (base, _store) = spawn_server().await;
    let client = reqwest::Client::new();

    let created: serde_json::Value = client
        .post(format!("{}/api/jobs", base))
        .json(&serde_json::json!({ "url": "https://example.com/video.mp4" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(created["status"], "queued");
    let id = created["id"].as_str().unwrap();
    assert!(!id.is_empty());

    let fetched: serde_json::Value = client
        .get(format!("{}/api/jobs/{}", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["id"], *id);
    assert_eq!(fetched["status"], "queued");
    assert_eq!(fetched["url"], "https://example.com/video.mp4");
}

#[tokio::test]
async fn ids_are_unique_across_submissions() {
    let (base, _store) = spawn_server().await;
    let client = reqwest::Client::new();

    let mut ids = std::collections::HashSet::new();
    for _ in 0..5 {
        let created: serde_json::Value = client
            .post(format!("{}/api/jobs", base))
            .json(&serde_json::json!({ "url": "https://example.com/a.mp4" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(ids.insert(created["id"].as_str().unwrap().to_string()));
    }
}

#[tokio::test]
async fn bad_urls_are_rejected() {
    let (base, _store) = spawn_server().await;
    let client = reqwest::Client::new();

    for bad in ["ftp://example.com/file", "not a url", "file:///etc/passwd"] {
        let response = client
            .post(format!("{}/api/jobs", base))
            .json(&serde_json::json!({ "url": bad }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "accepted {:?}", bad);
    }

    // the endpoint still works after rejections
    let response = client
        .post(format!("{}/api/jobs", base))
        .json(&serde_json::json!({ "url": "https://ok.example.com/x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn unknown_job_is_404() {
    let (base, _store) = spawn_server().await;
    let response = reqwest::get(format!("{}/api/jobs/nope", base)).await.unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn status_response_truncates_long_logs() {
    let (base, store) = spawn_server().await;
    store.create("big", "https://example.com/x").unwrap();
    store.append_log("big", &"x".repeat(20_000));

    let fetched: serde_json::Value = reqwest::get(format!("{}/api/jobs/big", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["log"].as_str().unwrap().len(), 8000);
}

#[tokio::test]
async fn index_serves_the_form_page() {
    let (base, _store) = spawn_server().await;
    let body = reqwest::get(format!("{}/", base))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("<form"));
    assert!(body.contains("/api/jobs"));
}
