// HTTP surface - job submission and status

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::info;
use url::Url;
use uuid::Uuid;

use crate::queue::Scheduler;
use crate::store::JobStore;

/// Trailing window of the job log exposed over HTTP.
const LOG_TAIL_BYTES: usize = 8000;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JobStore>,
    pub scheduler: Scheduler,
}

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub url: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/jobs", post(create_job))
        .route("/api/jobs/{id}", get(job_status))
        .with_state(state)
}

pub async fn serve(state: AppState, port: u16) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("listening on port {}", port);
    axum::serve(listener, router(state)).await
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

async fn create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> Response {
    let url = match Url::parse(&request.url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        Ok(url) => {
            return bad_request(format!("unsupported scheme: {}", url.scheme()));
        }
        Err(e) => {
            return bad_request(format!("invalid url: {}", e));
        }
    };

    let id = Uuid::new_v4().to_string();
    if let Err(e) = state.store.create(&id, url.as_str()) {
        // Fresh v4 ids colliding would mean something is very wrong.
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response();
    }

    state.scheduler.enqueue(id.clone());
    info!(job = %id, url = %url, "job accepted");
    Json(json!({ "id": id, "status": "queued" })).into_response()
}

async fn job_status(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.get(&id) {
        Some(mut job) => {
            job.log = tail(&job.log, LOG_TAIL_BYTES).to_string();
            Json(job).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "job not found" })),
        )
            .into_response(),
    }
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// Last `max_bytes` of `s`, cut on a character boundary.
fn tail(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut start = s.len() - max_bytes;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

const INDEX_PAGE: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>fetchbot</title></head>
<body>
<h1>fetchbot</h1>
<form id="f">
  <input name="url" size="60" placeholder="https://...">
  <button>Download</button>
</form>
<pre id="out"></pre>
<script>
document.getElementById('f').onsubmit = async (e) => {
  e.preventDefault();
  const url = new FormData(e.target).get('url');
  const res = await fetch('/api/jobs', {
    method: 'POST',
    headers: {'Content-Type': 'application/json'},
    body: JSON.stringify({url})
  });
  document.getElementById('out').textContent = JSON.stringify(await res.json(), null, 2);
};
</script>
</body>
</html>
"#;
