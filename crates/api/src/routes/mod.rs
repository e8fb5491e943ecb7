pub mod generation;
pub mod health;
pub mod rigging;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generation                       text/image/multiview/texture jobs, uploads, status
/// /rigging                          rig jobs, status, live progress stream
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/generation", generation::router())
        .nest("/rigging", rigging::router())
}
