//! Settings file management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::LauncherError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Launcher settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,

    /// Directory for daily log files; stdout only when absent
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Terraform configuration
    #[serde(default)]
    pub terraform: TerraformSettings,

    /// Output retrieval retry configuration
    #[serde(default)]
    pub retry: RetrySettings,

    /// Static assets and key download
    #[serde(default)]
    pub assets: AssetSettings,
}

impl Settings {
    /// Read settings from `file`, falling back to defaults when it does not exist
    pub async fn load(file: &File) -> Result<Self, LauncherError> {
        if !file.exists().await {
            info!(
                "Settings file {} not found, using defaults",
                file.path().display()
            );
            return Ok(Settings::default());
        }
        file.read_json::<Settings>()
            .await
            .map_err(|e| LauncherError::ConfigError(format!("{}: {}", file.path().display(), e)))
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Terraform settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerraformSettings {
    /// Terraform executable
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Directory holding the Terraform configuration
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Upper bound for a single Terraform command in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

fn default_binary() -> String {
    "terraform".to_string()
}

fn default_working_dir() -> PathBuf {
    PathBuf::from("terraform")
}

fn default_command_timeout() -> u64 {
    30 * 60
}

impl Default for TerraformSettings {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            working_dir: default_working_dir(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

/// Output retrieval retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Delay between attempts in seconds
    #[serde(default = "default_retry_interval")]
    pub interval_secs: u64,

    /// Attempts before the deployment times out
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_retry_interval() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    30
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            interval_secs: default_retry_interval(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Static asset settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetSettings {
    /// Directory served at `/`
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,

    /// Private key offered at `/download-key`
    #[serde(default = "default_ssh_key_path")]
    pub ssh_key_path: PathBuf,
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_ssh_key_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ssh")
        .join("id_rsa")
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            public_dir: default_public_dir(),
            ssh_key_path: default_ssh_key_path(),
        }
    }
}
