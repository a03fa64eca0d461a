//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::options::{AppOptions, LifecycleOptions};
use crate::app::state::AppState;
use crate::errors::LauncherError;
use crate::server::serve::serve;
use crate::server::state::ServerState;

/// Run the launcher until `shutdown_signal` resolves
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), LauncherError> {
    info!("Initializing EC2 launcher...");

    // Create shutdown channel
    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager =
        ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    let app_state = Arc::new(AppState::init(&options));
    shutdown_manager.with_app_state(app_state.clone())?;

    if let Err(e) = init_server(
        &options,
        app_state,
        &mut shutdown_manager,
        shutdown_tx.subscribe(),
    )
    .await
    {
        error!("Failed to start launcher: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

async fn init_server(
    options: &AppOptions,
    app_state: Arc<AppState>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), LauncherError> {
    info!("Initializing HTTP server...");

    let server_state = ServerState::from(app_state.as_ref());

    let server_handle = serve(
        &options.server,
        &options.assets.public_dir,
        Arc::new(server_state),
        async move {
            let _ = shutdown_rx.recv().await;
        },
    )
    .await?;

    shutdown_manager.with_server_handle(server_handle)?;
    Ok(())
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    app_state: Option<Arc<AppState>>,
    server_handle: Option<JoinHandle<Result<(), LauncherError>>>,
}

impl ShutdownManager {
    pub fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            app_state: None,
            server_handle: None,
        }
    }

    pub fn with_app_state(&mut self, state: Arc<AppState>) -> Result<(), LauncherError> {
        if self.app_state.is_some() {
            return Err(LauncherError::ShutdownError(
                "app_state already set".to_string(),
            ));
        }
        self.app_state = Some(state);
        Ok(())
    }

    pub fn with_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), LauncherError>>,
    ) -> Result<(), LauncherError> {
        if self.server_handle.is_some() {
            return Err(LauncherError::ShutdownError(
                "server_handle already set".to_string(),
            ));
        }
        self.server_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), LauncherError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(
            self.lifecycle_options.max_shutdown_delay,
            self.shutdown_impl(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(LauncherError::ShutdownError(format!(
                "shutdown timed out after {:?}",
                self.lifecycle_options.max_shutdown_delay
            ))),
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), LauncherError> {
        info!("Shutting down EC2 launcher...");

        // 1. HTTP server
        if let Some(handle) = self.server_handle.take() {
            handle
                .await
                .map_err(|e| LauncherError::ShutdownError(e.to_string()))??;
        }

        // 2. In-flight deployment
        if let Some(app_state) = self.app_state.take() {
            app_state.shutdown().await?;
        }

        info!("Shutdown complete");
        Ok(())
    }
}
