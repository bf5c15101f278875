use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::format::FormattedPost;
use crate::pipeline::{Pipeline, PipelineError, RunSummary, Trigger};

pub const SECRET_HEADER: &str = "x-middleware-secret";
pub const SECRET_QUERY: &str = "secret";

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
    secret: Option<Arc<str>>,
}

impl AppState {
    /// A blank secret disables authentication.
    pub fn new(pipeline: Arc<Pipeline>, secret: Option<String>) -> Self {
        let secret = secret
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(Arc::from);
        Self { pipeline, secret }
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    fn authorized(&self, query: &HashMap<String, String>, headers: &HeaderMap) -> bool {
        let Some(expected) = self.secret.as_deref() else {
            return true;
        };
        let from_query = query.get(SECRET_QUERY).map(String::as_str);
        let from_header = headers.get(SECRET_HEADER).and_then(|h| h.to_str().ok());
        [from_query, from_header]
            .into_iter()
            .flatten()
            .any(|given| given == expected)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/_health", get(health))
        .route("/check-jobs", get(check_jobs))
        .route("/last-run", get(last_run))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct Health {
    ok: bool,
}

#[derive(Serialize)]
struct Success<T: Serialize> {
    status: &'static str,
    data: T,
}

#[derive(Serialize)]
struct Failure {
    status: &'static str,
    message: String,
}

#[derive(Serialize)]
struct CheckJobsData {
    jobs: Vec<FormattedPost>,
    summary: RunSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LastRunData {
    run_id: Option<u64>,
    finished_at: Option<DateTime<Utc>>,
    jobs: Vec<FormattedPost>,
}

fn success<T: Serialize>(data: T) -> Response {
    (
        StatusCode::OK,
        Json(Success {
            status: "success",
            data,
        }),
    )
        .into_response()
}

fn failure(code: StatusCode, message: impl Into<String>) -> Response {
    (
        code,
        Json(Failure {
            status: "error",
            message: message.into(),
        }),
    )
        .into_response()
}

async fn health() -> Json<Health> {
    Json(Health { ok: true })
}

/// Runs the whole pipeline before answering. The run lives in its own task:
/// a disconnecting client does not cancel it, and a panic becomes a 500.
async fn check_jobs(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !state.authorized(&query, &headers) {
        tracing::warn!(target: "pipeline", "unauthorized /check-jobs request");
        return failure(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let pipeline = state.pipeline.clone();
    let joined = tokio::spawn(async move { pipeline.run(Trigger::Http).await }).await;
    let result = match joined {
        Ok(r) => r,
        Err(e) => Err(PipelineError::Aborted(e.to_string())),
    };

    match result {
        Ok(report) => success(CheckJobsData {
            jobs: report.jobs,
            summary: report.summary,
        }),
        Err(e) => {
            tracing::error!(target: "pipeline", error = %e, "http-triggered run failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn last_run(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !state.authorized(&query, &headers) {
        return failure(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let data = match state.pipeline.store().last_run.get() {
        Some(run) => LastRunData {
            run_id: Some(run.run_id),
            finished_at: Some(run.finished_at),
            jobs: run.posts.as_ref().clone(),
        },
        None => LastRunData {
            run_id: None,
            finished_at: None,
            jobs: Vec::new(),
        },
    };
    success(data)
}
