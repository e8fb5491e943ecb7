use std::net::SocketAddr;
use std::sync::Arc;

use modelgate_core::staging::StagingArea;
use modelgate_upstream::HttpJobApi;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use modelgate_api::config::ServerConfig;
use modelgate_api::router::build_app_router;
use modelgate_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "modelgate_api=debug,modelgate_upstream=debug,modelgate_core=info,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        upload_dir = %config.upload_dir.display(),
        generation = ?config.generation,
        rigging = ?config.rigging,
        "Loaded server configuration",
    );

    // --- Temporary asset store ---
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .expect("Failed to create upload directory");
    let staging = StagingArea::new(config.upload_dir.clone(), config.upload_limits.clone());

    // --- Upstream clients ---
    let http = reqwest::Client::new();
    let generation = Arc::new(HttpJobApi::with_client(http.clone(), config.generation.clone()));
    let rigging = Arc::new(HttpJobApi::with_client(http, config.rigging.clone()));

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        staging,
        generation,
        rigging,
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
