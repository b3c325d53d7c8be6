use std::sync::Arc;

use anyhow::Result;
use app_utils::{init_from_env, init_tracing, InitFromEnv};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use moodle_api::assignment::AssignmentId;
use moodle_api::fetch::HttpFetcher;
use moodle_api::pipeline::{AssignmentInfo, AssignmentList, CrawlResult, Pipeline, ScoreResult};
use moodle_api::scoring::GeminiScorer;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

type AppPipeline = Arc<Pipeline<HttpFetcher, GeminiScorer>>;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let InitFromEnv {
        pipeline,
        bind_addr,
    } = init_from_env()?;

    let app = Router::new()
        .route("/", get(root))
        .route("/tools/crawl", post(crawl))
        .route("/tools/get-assignments-of-class", post(get_assignments))
        .route("/tools/get-assignment-info", post(get_assignment_info))
        .route("/tools/score-assignment", post(score_assignment))
        .with_state(Arc::new(pipeline));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(%bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Debug, Deserialize)]
struct CrawlRequest {
    url: String,
    selector: Option<String>,
    cookie: String,
}

#[derive(Debug, Deserialize)]
struct AssignmentsRequest {
    course: String,
    cookie: String,
}

#[derive(Debug, Deserialize)]
struct AssignmentRequest {
    assignment_id: String,
    cookie: String,
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "status": "online" }))
}

async fn crawl(
    State(pipeline): State<AppPipeline>,
    Json(request): Json<CrawlRequest>,
) -> Result<Json<CrawlResult>, ApiError> {
    let result = pipeline
        .crawl(&request.url, request.selector.as_deref(), &request.cookie)
        .await?;
    Ok(Json(result))
}

async fn get_assignments(
    State(pipeline): State<AppPipeline>,
    Json(request): Json<AssignmentsRequest>,
) -> Result<Json<AssignmentList>, ApiError> {
    let list = pipeline
        .list_assignments(&request.course, &request.cookie)
        .await?;
    Ok(Json(list))
}

async fn get_assignment_info(
    State(pipeline): State<AppPipeline>,
    Json(request): Json<AssignmentRequest>,
) -> Result<Json<AssignmentInfo>, ApiError> {
    let assignment = AssignmentId::new(request.assignment_id);
    let info = pipeline.assignment_info(&assignment, &request.cookie).await?;
    Ok(Json(info))
}

async fn score_assignment(
    State(pipeline): State<AppPipeline>,
    Json(request): Json<AssignmentRequest>,
) -> Result<Json<Vec<ScoreResult>>, ApiError> {
    let assignment = AssignmentId::new(request.assignment_id);
    let results = pipeline
        .score_assignment(&assignment, &request.cookie)
        .await?;
    Ok(Json(results))
}

/// Every pipeline failure becomes one generic 500 carrying the error chain as
/// text; the taxonomy stays readable in the detail string.
struct ApiError(moodle_api::error::Error);

impl From<moodle_api::error::Error> for ApiError {
    fn from(err: moodle_api::error::Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = error_chain(&self.0);
        tracing::error!(%detail, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": detail })),
        )
            .into_response()
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut detail = err.to_string();
    let mut source = err.source();
    while let Some(err) = source {
        detail.push_str(": ");
        detail.push_str(&err.to_string());
        source = err.source();
    }
    detail
}
