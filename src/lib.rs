pub mod api;
pub mod app_state;
pub mod config;
pub mod provider;
pub mod relay;

use anyhow::Context;
use axum::Router;
use axum::extract::{DefaultBodyLimit, Extension};
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

//
// Re-export
//
pub use api::{ApiError, UploadImageResponse, index, log_request_outcome, upload_image};
pub use app_state::AppState;
pub use config::Config;
pub use provider::{CloudinaryClient, CloudinaryConfig, SignatureAlgorithm};
pub use relay::{AllowList, MediaHost, UploadError, UploadRelay, UploadRequest};

pub const UPLOAD_ROUTE: &str = "/api/upload-image";

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    let body_limit = state.max_file_size().saturating_add(MULTIPART_OVERHEAD);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route(UPLOAD_ROUTE, post(upload_image))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(api::log_request_outcome))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(Extension(state))
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let state = AppState::new(&config)?;
    serve(config.listen_on_port, state).await
}

/// Bind to `port` on all interfaces and serve until Ctrl-C
pub async fn serve(port: u16, state: AppState) -> anyhow::Result<()> {
    info!(
        host = state.relay.host_name(),
        folder = state.folder(),
        field = state.field_name(),
        max_file_size = state.max_file_size(),
        "Upload relay ready"
    );
    let app = router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running on http://localhost:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        // Without a signal handler the server runs until the task is dropped
        Err(_) => std::future::pending::<()>().await,
    }
}
