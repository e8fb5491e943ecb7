//! Handlers for the `/generation` resource.
//!
//! JSON job creation validates locally and never reaches the upstream on a
//! bad request. The multipart endpoints stage uploads in the temporary
//! asset store first; every staged file is released once the upstream call
//! settles, whatever its outcome.

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use modelgate_core::error::CoreError;
use modelgate_core::job::{JobHandle, JobKind, JobRequest};
use modelgate_upstream::FormPart;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::extract::{ApiJson, ApiMultipart, ApiQuery};
use crate::handlers::{fetch_status, passthrough, submit_job};
use crate::multipart::stage_form;
use crate::query::PaginationParams;
use crate::state::AppState;

const TASK_PATH: &str = "/task";
const UPLOAD_PATH: &str = "/upload/sts";

// ---------------------------------------------------------------------------
// JSON job creation
// ---------------------------------------------------------------------------

/// POST /api/generation/text-to-model
///
/// Body: `{prompt, options?}`.
pub async fn text_to_model(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> AppResult<Response> {
    let request = JobRequest::text_to_model(body)?;
    submit_job(state.generation.as_ref(), TASK_PATH, request).await
}

/// POST /api/generation/create-task
///
/// Body: `{type, <input>, ...options}` for any generation kind.
pub async fn create_task(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> AppResult<Response> {
    let request = JobRequest::from_body(body)?;
    if request.kind == JobKind::Rigging {
        return Err(CoreError::invalid("Rigging jobs are created via /api/rigging/rig").into());
    }
    submit_job(state.generation.as_ref(), TASK_PATH, request).await
}

/// POST /api/generation/multiview-to-model-with-tokens
///
/// Body: `{type: "multiview_to_model", files: [{type, file_token}, ...]}`.
pub async fn multiview_with_tokens(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> AppResult<Response> {
    let request = JobRequest::from_body_of_kind(body, JobKind::MultiviewToModel)?;
    submit_job(state.generation.as_ref(), TASK_PATH, request).await
}

/// POST /api/generation/generate-texture
///
/// Body: `{type: "texture_model", original_model_task_id, ...options}`.
pub async fn generate_texture(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> AppResult<Response> {
    let request = JobRequest::from_body_of_kind(body, JobKind::TextureModel)?;
    submit_job(state.generation.as_ref(), TASK_PATH, request).await
}

// ---------------------------------------------------------------------------
// Multipart uploads
// ---------------------------------------------------------------------------

/// POST /api/generation/multiview-to-model
///
/// Multipart: up to `max_multiview_files` `images` parts and an optional
/// `prompt`. The staged images are streamed to the upstream task endpoint.
pub async fn multiview_to_model(
    State(state): State<AppState>,
    ApiMultipart(multipart): ApiMultipart,
) -> AppResult<Response> {
    let max_files = state.staging.limits().max_multiview_files;
    let form = stage_form(&state.staging, multipart, "images", max_files).await?;

    let mut parts = vec![FormPart::text("type", JobKind::MultiviewToModel.as_str())];
    parts.extend(
        form.batch
            .uploads()
            .iter()
            .map(|upload| FormPart::staged("images", upload)),
    );
    if let Some(prompt) = form.fields.get("prompt").filter(|p| !p.trim().is_empty()) {
        parts.push(FormPart::text("prompt", prompt.clone()));
    }

    tracing::info!(images = form.batch.len(), "Submitting multiview upload");
    let result = state.generation.submit_multipart(TASK_PATH, parts).await;
    form.batch.release().await;

    Ok(passthrough(result?))
}

/// POST /api/generation/upload/sts
///
/// Multipart: one `file` part. Returns the upstream file token response.
pub async fn upload_sts(
    State(state): State<AppState>,
    ApiMultipart(multipart): ApiMultipart,
) -> AppResult<Response> {
    let max_files = state.staging.limits().max_files;
    let form = stage_form(&state.staging, multipart, "file", max_files).await?;

    let parts = form
        .batch
        .uploads()
        .iter()
        .map(|upload| FormPart::staged("file", upload))
        .collect();

    let result = state.generation.submit_multipart(UPLOAD_PATH, parts).await;
    form.batch.release().await;

    Ok(passthrough(result?))
}

/// POST /api/generation/test-upload
///
/// Stages a single `file` part and describes it without calling upstream.
pub async fn test_upload(
    State(state): State<AppState>,
    ApiMultipart(multipart): ApiMultipart,
) -> AppResult<Json<Value>> {
    let max_files = state.staging.limits().max_files;
    let form = stage_form(&state.staging, multipart, "file", max_files).await?;

    let file = form.batch.uploads().first().map(|upload| {
        json!({
            "original_name": upload.original_name(),
            "media_type": upload.media_type(),
            "size": upload.size(),
            "staged_name": upload.staged_name(),
        })
    });
    form.batch.release().await;

    Ok(Json(json!({
        "success": true,
        "message": "File received",
        "file": file,
    })))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/generation/status/{id}
pub async fn task_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let handle = JobHandle::parse(&id)?;
    fetch_status(
        state.generation.as_ref(),
        &format!("{TASK_PATH}/{handle}"),
        &handle,
    )
    .await
}

/// GET /api/generation/task?limit=&offset=
pub async fn list_tasks(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> AppResult<Response> {
    let response = state.generation.get(TASK_PATH, &params.to_query()).await?;
    Ok(passthrough(response))
}

/// DELETE /api/generation/task/{id}
pub async fn cancel_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let handle = JobHandle::parse(&id)?;
    let response = state
        .generation
        .delete(&format!("{TASK_PATH}/{handle}"))
        .await?;

    tracing::info!(task_id = %handle, "Task cancelled upstream");
    Ok(passthrough(response))
}
