//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{IntoResponse, Response},
    Json,
};
use http::{header, StatusCode};
use serde::Serialize;
use tracing::{error, warn};

use crate::deploy::job::JobId;
use crate::errors::LauncherError;
use crate::models::deployment::{DeployForm, DeploymentRequest};
use crate::server::state::ServerState;
use crate::utils::version_info;

/// File name offered for the private key download
pub const KEY_DOWNLOAD_NAME: &str = "id_rsa.pem";

/// Error body returned by the JSON endpoints
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Maps launcher errors onto HTTP responses
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<LauncherError> for ApiError {
    fn from(err: LauncherError) -> Self {
        let status = match &err {
            LauncherError::ValidationError(_) => StatusCode::BAD_REQUEST,
            LauncherError::JobInProgress(_) => StatusCode::CONFLICT,
            LauncherError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "ec2-launcher".to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    Json(version_info())
}

/// Deploy acknowledgment
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResponse {
    pub message: String,
    pub job_id: JobId,
}

/// Deploy handler
///
/// Validates the form and starts the pipeline without waiting for it.
pub async fn deploy_handler(
    State(state): State<Arc<ServerState>>,
    form: Result<Json<DeployForm>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(form) = form.map_err(|e| {
        warn!("Rejected deploy body: {}", e);
        LauncherError::ValidationError(e.body_text())
    })?;

    let request = DeploymentRequest::try_from(form)?;
    let job_id = state.deployer.submit(request)?;

    Ok(Json(DeployResponse {
        message: "Deployment started".to_string(),
        job_id,
    }))
}

/// Cancel handler
pub async fn cancel_handler(
    State(state): State<Arc<ServerState>>,
) -> Result<impl IntoResponse, ApiError> {
    let job_id = state.deployer.cancel()?;
    Ok(Json(DeployResponse {
        message: "Deployment cancellation requested".to_string(),
        job_id,
    }))
}

/// Current status handler
pub async fn status_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let snapshot = state.store.current_status();
    Json(snapshot.as_ref().clone())
}

/// Status of a specific job
pub async fn job_status_handler(
    State(state): State<Arc<ServerState>>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let job_id: JobId = job_id
        .parse()
        .map_err(|_| LauncherError::ValidationError(format!("invalid job id: {job_id}")))?;

    let snapshot = state
        .store
        .status(&job_id)
        .ok_or_else(|| LauncherError::NotFound(format!("job {job_id}")))?;
    Ok(Json(snapshot.as_ref().clone()))
}

/// Private key download handler
pub async fn download_key_handler(State(state): State<Arc<ServerState>>) -> Response {
    let key_file = &state.ssh_key_file;
    if !key_file.exists().await {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    }

    match key_file.read_bytes().await {
        Ok(contents) => (
            [
                (header::CONTENT_TYPE, "application/x-pem-file".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{KEY_DOWNLOAD_NAME}\""),
                ),
            ],
            contents,
        )
            .into_response(),
        Err(e) => {
            error!(
                "Error downloading {}: {}",
                key_file.path().display(),
                e
            );
            (StatusCode::INTERNAL_SERVER_ERROR, "Error downloading file").into_response()
        }
    }
}
