//! HTTP routes.

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use m2m::{Job, JobArtifacts, ResultError, SubmitError};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);
    Router::new()
        .route("/ping", get(ping))
        .route("/submit/file", post(submit_file))
        .route("/status/:job_id", get(status))
        .route("/result/:job_id", get(result))
        .route("/jobs", get(list_jobs))
        .layer(upload_limit)
        .with_state(state)
}

/// Error body: `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::new(status, err.to_string())
    }
}

impl From<ResultError> for ApiError {
    fn from(err: ResultError) -> Self {
        let status = match err {
            ResultError::NotFound(_) => StatusCode::NOT_FOUND,
            ResultError::NotReady { .. } => StatusCode::BAD_REQUEST,
        };
        Self::new(status, err.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub state: &'static str,
}

async fn ping() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "message": "server awake" }))
}

async fn submit_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SubmitResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_owned();
        let data = field.bytes().await.map_err(multipart_error)?;

        return submit_upload(&state, &filename, &data).await.map(Json);
    }

    Err(ApiError::new(
        StatusCode::BAD_REQUEST,
        "Missing multipart field 'file'",
    ))
}

/// Keeps axum's status, so an oversized body is a 413 rather than a 400.
fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::new(err.status(), err.body_text())
}

/// Hands one uploaded file to the worker pool.
pub async fn submit_upload(
    state: &AppState,
    filename: &str,
    data: &[u8],
) -> Result<SubmitResponse, ApiError> {
    match state.pool.submit(data, filename).await {
        Ok(job_id) => {
            info!(job_id = %job_id, bytes = data.len(), "Accepted upload");
            Ok(SubmitResponse {
                job_id,
                state: "queued",
            })
        }
        Err(e) => {
            warn!(error = %e, "Rejected upload");
            Err(e.into())
        }
    }
}

async fn status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    state
        .pool
        .status(&job_id)
        .map(Json)
        .ok_or_else(|| ResultError::NotFound(job_id).into())
}

async fn result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobArtifacts>, ApiError> {
    Ok(Json(state.pool.result(&job_id)?))
}

async fn list_jobs(State(state): State<AppState>) -> Json<Vec<Job>> {
    Json(state.pool.list())
}
