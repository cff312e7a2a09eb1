//! Lingua Server
//!
//! Document ingestion and text extraction server for translation pipelines:
//! single-shot uploads, a chunked-upload protocol for very large files, and
//! multi-strategy extraction with ordered fallback.

use std::net::SocketAddr;

use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lingua_server::config::Config;
use lingua_server::routes;
use lingua_server::session::SessionReaper;
use lingua_server::state::AppState;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lingua_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing::info!("Starting Lingua Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        max_file_size = config.ingest.max_file_size,
        extraction_timeout_secs = config.ingest.extraction_timeout_secs,
        session_timeout_secs = config.ingest.session_timeout_secs,
        "Ingestion configuration loaded"
    );

    // Create application state
    let app_state = AppState::new(config.clone());

    // Start the session reaper
    let reaper = SessionReaper::new(
        app_state.registry().clone(),
        std::time::Duration::from_secs(config.ingest.reaper_interval_secs),
        chrono::Duration::seconds(config.ingest.session_timeout_secs),
    );
    let reaper_handle = reaper.spawn();

    // Build router
    let app = routes::app(app_state);

    // Start server with graceful shutdown
    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| [0, 0, 0, 0].into()),
        config.server.port,
    ));
    tracing::info!("Lingua Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    // Stop the reaper so no timer outlives the server
    reaper_handle.stop();
    tracing::info!("Server shutdown complete");
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
