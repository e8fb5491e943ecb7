//! Route definitions for the `/rigging` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::rigging;
use crate::state::AppState;

/// Routes mounted at `/rigging`.
///
/// ```text
/// POST   /rig                 -> create_rig
/// GET    /rig/status/{id}     -> rig_status
/// GET    /rig/stream/{id}     -> rig_stream (text/event-stream)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rig", post(rigging::create_rig))
        .route("/rig/status/{id}", get(rigging::rig_status))
        .route("/rig/stream/{id}", get(rigging::rig_stream))
}
