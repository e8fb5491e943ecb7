//! HTTP handlers, grouped by upstream family.

pub mod generation;
pub mod rigging;

use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use modelgate_core::job::{JobHandle, JobRequest};
use modelgate_core::status::JobStatus;
use modelgate_upstream::{JobApi, UpstreamResponse};

use crate::error::{AppError, AppResult};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Relay a successful upstream answer with its own status and body untouched.
pub(crate) fn passthrough(response: UpstreamResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
    (status, Json(response.body)).into_response()
}

/// Build the payload for a validated request and submit it as JSON.
pub(crate) async fn submit_job(
    api: &dyn JobApi,
    path: &str,
    request: JobRequest,
) -> AppResult<Response> {
    let kind = request.kind;
    let payload = request.into_payload();

    let response = api.submit_json(path, &payload).await?;

    tracing::info!(
        family = %api.family(),
        job_type = %kind,
        status = response.status,
        "Job submitted upstream",
    );

    Ok(passthrough(response))
}

/// Fetch a job's current state and relay it verbatim.
pub(crate) async fn fetch_status(
    api: &dyn JobApi,
    path: &str,
    handle: &JobHandle,
) -> AppResult<Response> {
    let response = api.get(path, &[]).await?;

    let status = JobStatus::from_upstream(&response.body);
    tracing::debug!(
        family = %api.family(),
        task_id = %handle,
        state = ?status.state,
        progress = ?status.progress,
        "Job status fetched",
    );

    Ok(passthrough(response))
}

/// Router fallback: unknown paths answer with the JSON error body.
pub async fn not_found(method: Method, uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {method} {}", uri.path()))
}
