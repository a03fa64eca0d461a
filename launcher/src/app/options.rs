//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

use crate::deploy::backend::TerraformOptions;
use crate::deploy::retry::RetryOptions;
use crate::storage::settings::Settings;

/// Main application options
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Server configuration
    pub server: ServerOptions,

    /// Terraform backend configuration
    pub terraform: TerraformOptions,

    /// Output retrieval retry configuration
    pub retry: RetryOptions,

    /// Static assets and key download
    pub assets: AssetOptions,
}

impl From<&Settings> for AppOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            terraform: TerraformOptions {
                binary: settings.terraform.binary.clone(),
                working_dir: settings.terraform.working_dir.clone(),
                command_timeout: Duration::from_secs(settings.terraform.command_timeout_secs),
            },
            retry: RetryOptions {
                interval: Duration::from_secs(settings.retry.interval_secs),
                max_attempts: settings.retry.max_attempts,
            },
            assets: AssetOptions {
                public_dir: settings.assets.public_dir.clone(),
                ssh_key_path: settings.assets.ssh_key_path.clone(),
            },
        }
    }
}

/// Lifecycle options for the launcher
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Static asset options
#[derive(Debug, Clone)]
pub struct AssetOptions {
    /// Directory served at `/`
    pub public_dir: PathBuf,

    /// Private key offered at `/download-key`
    pub ssh_key_path: PathBuf,
}

impl Default for AssetOptions {
    fn default() -> Self {
        let settings = crate::storage::settings::AssetSettings::default();
        Self {
            public_dir: settings.public_dir,
            ssh_key_path: settings.ssh_key_path,
        }
    }
}
