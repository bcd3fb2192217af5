//! HTTP surface.
//!
//! `POST /handle_task` runs a task request to completion before answering.
//! Authentication and round errors come back as `{"error": ...}` objects;
//! any failure inside the pipeline fails the request with a 500.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use pagesmith_core::{TaskReport, TaskRequest};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::server::SharedState;

/// Attachments arrive inline as data URIs, so bodies can be large.
const MAX_BODY_BYTES: usize = 12 * 1024 * 1024;

pub fn router(state: Arc<SharedState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/handle_task", post(handle_task))
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "API is running. Use /handle_task for POST requests."
    }))
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Serialize)]
struct TaskResponse {
    message: String,
    repo: String,
    commits: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

impl TaskResponse {
    fn from_report(round: u8, report: &TaskReport) -> Self {
        Self {
            message: format!("Round {round} completed"),
            repo: report.container.to_string(),
            commits: report.cycles.iter().map(|c| c.revision.to_string()).collect(),
            warnings: report.warnings.iter().map(|w| w.to_string()).collect(),
        }
    }
}

fn error_object(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn secret_matches(expected: &str, given: &str) -> bool {
    !expected.is_empty() && expected == given
}

/// Checked on the raw body so out-of-range numbers get the same answer as 3.
fn round_supported(body: &serde_json::Value) -> bool {
    matches!(body.get("round").and_then(|r| r.as_i64()), Some(1 | 2))
}

async fn handle_task(
    State(state): State<Arc<SharedState>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let given = body.get("secret").and_then(|s| s.as_str()).unwrap_or("");
    if !secret_matches(&state.secret, given) {
        tracing::warn!("Rejected task request with incorrect secret");
        return error_object(StatusCode::FORBIDDEN, "Incorrect secret");
    }

    if !round_supported(&body) {
        return error_object(StatusCode::BAD_REQUEST, "Invalid round");
    }

    let task: TaskRequest = match serde_json::from_value(body) {
        Ok(task) => task,
        Err(e) => {
            return error_object(
                StatusCode::BAD_REQUEST,
                &format!("Invalid task request: {e}"),
            );
        }
    };

    let container = task.container();
    tracing::info!(
        task = %task.task,
        round = task.round,
        repo = %container,
        "Task request accepted"
    );

    let lock = state.container_locks.lock_for(&container);
    let result = {
        let _guard = lock.lock().await;
        state.orchestrator.run(&task).await
    };
    drop(lock);
    state.container_locks.prune();

    match result {
        Ok(report) => Json(TaskResponse::from_report(task.round, &report)).into_response(),
        Err(e) => {
            tracing::error!(task = %task.task, repo = %container, "Task failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_server_secret_rejects_everything() {
        assert!(!secret_matches("", ""));
        assert!(!secret_matches("", "anything"));
        assert!(!secret_matches("s3cret", "S3CRET"));
        assert!(secret_matches("s3cret", "s3cret"));
    }

    #[test]
    fn only_rounds_one_and_two_are_supported() {
        use serde_json::json;
        assert!(round_supported(&json!({"round": 1})));
        assert!(round_supported(&json!({"round": 2})));
        assert!(!round_supported(&json!({"round": 3})));
        assert!(!round_supported(&json!({"round": 300})));
        assert!(!round_supported(&json!({"round": -1})));
        assert!(!round_supported(&json!({"round": "1"})));
        assert!(!round_supported(&json!({})));
    }
}
