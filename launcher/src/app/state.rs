//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::deploy::backend::{ProvisioningBackend, TerraformBackend};
use crate::deploy::executor::Deployer;
use crate::deploy::store::JobStore;
use crate::errors::LauncherError;
use crate::filesys::file::File;

/// Main application state
pub struct AppState {
    /// Published deployment status
    pub store: Arc<JobStore>,

    /// Deployment pipeline
    pub deployer: Arc<Deployer>,

    /// Private key offered for download
    pub ssh_key_file: Arc<File>,
}

impl AppState {
    /// Initialize application state with the Terraform backend
    pub fn init(options: &AppOptions) -> Self {
        info!("Initializing application state...");
        info!(
            "Terraform: {} in {}",
            options.terraform.binary,
            options.terraform.working_dir.display()
        );

        let backend = Arc::new(TerraformBackend::new(options.terraform.clone()));
        Self::with_backend(options, backend)
    }

    /// Initialize application state around any provisioning backend
    pub fn with_backend(options: &AppOptions, backend: Arc<dyn ProvisioningBackend>) -> Self {
        let store = Arc::new(JobStore::new());
        let deployer = Arc::new(Deployer::new(
            backend,
            store.clone(),
            options.retry.clone(),
        ));
        let ssh_key_file = Arc::new(File::new(options.assets.ssh_key_path.clone()));

        Self {
            store,
            deployer,
            ssh_key_file,
        }
    }

    /// Shutdown application state
    pub async fn shutdown(&self) -> Result<(), LauncherError> {
        info!("Shutting down application state...");
        self.deployer.shutdown().await;
        Ok(())
    }
}
