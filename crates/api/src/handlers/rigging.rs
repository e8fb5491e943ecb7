//! Handlers for the `/rigging` resource.

use axum::extract::{Path, State};
use axum::response::Response;
use modelgate_core::job::{JobHandle, JobRequest};
use serde_json::Value;

use crate::error::AppResult;
use crate::extract::ApiJson;
use crate::handlers::{fetch_status, submit_job};
use crate::relay::StreamRelay;
use crate::state::AppState;

/// POST /api/rigging/rig
///
/// Body: `{model_url, height_meters?, ...options}`. `height_meters`
/// defaults to 1.8.
pub async fn create_rig(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> AppResult<Response> {
    let request = JobRequest::rigging(body)?;
    submit_job(state.rigging.as_ref(), "/rigging", request).await
}

/// GET /api/rigging/rig/status/{id}
pub async fn rig_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let handle = JobHandle::parse(&id)?;
    fetch_status(state.rigging.as_ref(), &format!("/rigging/{handle}"), &handle).await
}

/// GET /api/rigging/rig/stream/{id}
///
/// Relays the upstream progress event stream. Once the stream headers are
/// sent, upstream failures arrive as a single `event: error` frame.
pub async fn rig_stream(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StreamRelay> {
    let handle = JobHandle::parse(&id)?;
    tracing::info!(task_id = %handle, "Opening rigging progress relay");
    Ok(StreamRelay::start(
        state.rigging.clone(),
        format!("/rigging/{handle}/stream"),
    ))
}
