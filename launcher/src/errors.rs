//! Error types for the EC2 launcher

use thiserror::Error;

/// Main error type for the EC2 launcher
#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Bad deploy input, rejected before any external effect
    #[error("{0}")]
    ValidationError(String),

    /// A deployment is already running
    #[error("Deployment {0} is already in progress")]
    JobInProgress(String),

    /// The external command could not be started
    #[error("Failed to start {program}: {reason}")]
    ProcessSpawnError { program: String, reason: String },

    /// The external command exited non-zero
    #[error("{program} failed: {stderr}")]
    ProcessExecutionError { program: String, stderr: String },

    /// The output document is valid but not populated yet
    #[error("Outputs not ready: {0}")]
    NotReady(String),

    /// The output document cannot be parsed
    #[error("Malformed output: {0}")]
    MalformedOutput(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Invalid transition: {0}")]
    TransitionError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LauncherError {
    /// Whether retrying the output retrieval can still succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LauncherError::NotReady(_) | LauncherError::ProcessExecutionError { .. }
        )
    }
}

impl From<anyhow::Error> for LauncherError {
    fn from(err: anyhow::Error) -> Self {
        LauncherError::Internal(err.to_string())
    }
}
