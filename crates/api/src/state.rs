use std::sync::Arc;

use modelgate_core::staging::StagingArea;
use modelgate_upstream::JobApi;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Read-only after startup; cheaply cloneable.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Temporary asset store for uploaded images.
    pub staging: StagingArea,
    /// Generation API client.
    pub generation: Arc<dyn JobApi>,
    /// Rigging API client.
    pub rigging: Arc<dyn JobApi>,
}
