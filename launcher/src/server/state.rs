//! Server state

use std::sync::Arc;

use crate::app::state::AppState;
use crate::deploy::executor::Deployer;
use crate::deploy::store::JobStore;
use crate::filesys::file::File;

/// Server state shared across handlers
pub struct ServerState {
    pub store: Arc<JobStore>,
    pub deployer: Arc<Deployer>,
    pub ssh_key_file: Arc<File>,
}

impl ServerState {
    pub fn new(store: Arc<JobStore>, deployer: Arc<Deployer>, ssh_key_file: Arc<File>) -> Self {
        Self {
            store,
            deployer,
            ssh_key_file,
        }
    }
}

impl From<&AppState> for ServerState {
    fn from(app_state: &AppState) -> Self {
        Self::new(
            app_state.store.clone(),
            app_state.deployer.clone(),
            app_state.ssh_key_file.clone(),
        )
    }
}
