//! Route definitions for the `/generation` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

/// Routes mounted at `/generation`.
///
/// ```text
/// POST   /text-to-model                   -> text_to_model
/// POST   /create-task                     -> create_task
/// POST   /multiview-to-model              -> multiview_to_model (multipart)
/// POST   /multiview-to-model-with-tokens  -> multiview_with_tokens
/// POST   /generate-texture                -> generate_texture
/// POST   /upload/sts                      -> upload_sts (multipart)
/// POST   /test-upload                     -> test_upload (multipart)
/// GET    /status/{id}                     -> task_status
/// GET    /task                            -> list_tasks
/// DELETE /task/{id}                       -> cancel_task
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/text-to-model", post(generation::text_to_model))
        .route("/create-task", post(generation::create_task))
        .route("/multiview-to-model", post(generation::multiview_to_model))
        .route(
            "/multiview-to-model-with-tokens",
            post(generation::multiview_with_tokens),
        )
        .route("/generate-texture", post(generation::generate_texture))
        .route("/upload/sts", post(generation::upload_sts))
        .route("/test-upload", post(generation::test_upload))
        .route("/status/{id}", get(generation::task_status))
        .route("/task", get(generation::list_tasks))
        .route("/task/{id}", delete(generation::cancel_task))
}
