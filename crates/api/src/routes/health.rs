use axum::extract::State;
use axum::{routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
    /// Whether each upstream has a credential configured.
    pub upstreams: UpstreamHealth,
    /// Uploads currently held in the temporary asset store.
    pub staged_uploads: usize,
}

#[derive(Serialize)]
pub struct UpstreamHealth {
    pub generation: bool,
    pub rigging: bool,
}

/// GET /health -- returns service health and upstream configuration.
///
/// Reports `degraded` when an upstream credential is missing; the upstreams
/// themselves are not contacted.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let upstreams = UpstreamHealth {
        generation: state.config.generation.is_configured(),
        rigging: state.config.rigging.is_configured(),
    };

    let status = if upstreams.generation && upstreams.rigging {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
        upstreams,
        staged_uploads: state.staging.outstanding(),
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
