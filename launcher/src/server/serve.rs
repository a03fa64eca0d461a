//! HTTP server setup

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::LauncherError;
use crate::server::handlers::{
    cancel_handler, deploy_handler, download_key_handler, health_handler, job_status_handler,
    status_handler, version_handler,
};
use crate::server::state::ServerState;

/// Build the application router
///
/// Unmatched paths fall through to the static files in `public_dir`.
pub fn router(state: Arc<ServerState>, public_dir: &Path) -> Router {
    Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Deployment lifecycle
        .route("/deploy", post(deploy_handler))
        .route("/deploy/cancel", post(cancel_handler))
        .route("/status", get(status_handler))
        .route("/status/{job_id}", get(job_status_handler))
        // SSH key
        .route("/download-key", get(download_key_handler))
        // Static assets
        .fallback_service(ServeDir::new(public_dir))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    public_dir: &Path,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), LauncherError>>, LauncherError> {
    let app = router(state, public_dir);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| LauncherError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| LauncherError::ServerError(e.to_string()))
    });

    Ok(handle)
}
