//! Deployment pipeline executor

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::deploy::backend::ProvisioningBackend;
use crate::deploy::fsm::DeploymentEvent;
use crate::deploy::job::{DeploymentJob, JobId, StatusSnapshot};
use crate::deploy::outputs::{extract, ExtractedOutputs};
use crate::deploy::retry::{retry_until_ready, wait_cancelled, RetryOptions};
use crate::deploy::store::JobStore;
use crate::errors::LauncherError;
use crate::models::deployment::DeploymentRequest;

/// Handle on the job currently owned by the executor
struct ActiveJob {
    id: JobId,
    cancel_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

/// Runs deployments through init, apply and output retrieval
pub struct Deployer {
    backend: Arc<dyn ProvisioningBackend>,
    store: Arc<JobStore>,
    retry: RetryOptions,
    active: Mutex<Option<ActiveJob>>,
}

impl Deployer {
    /// Create a new deployer
    pub fn new(
        backend: Arc<dyn ProvisioningBackend>,
        store: Arc<JobStore>,
        retry: RetryOptions,
    ) -> Self {
        Self {
            backend,
            store,
            retry,
            active: Mutex::new(None),
        }
    }

    /// Get the job store
    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Accept a request and start its pipeline in the background
    ///
    /// Returns as soon as the job is recorded in the `initializing` phase.
    /// The slot claim and the handle registration happen under the `active`
    /// lock, so `cancel` and `shutdown` always reach the job the store reports.
    pub fn submit(self: &Arc<Self>, request: DeploymentRequest) -> Result<JobId, LauncherError> {
        let mut job = DeploymentJob::new(&request);
        job.apply(DeploymentEvent::Start)?;

        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        let job_id = self.store.begin(job.snapshot())?;

        info!("Deployment {} accepted: {}", job_id, request.describe());

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let deployer = self.clone();
        let handle = tokio::spawn(async move {
            deployer.run_pipeline(job, request, cancel_rx).await;
        });

        *active = Some(ActiveJob {
            id: job_id,
            cancel_tx,
            handle: Some(handle),
        });

        Ok(job_id)
    }

    /// Ask the active job to stop
    pub fn cancel(&self) -> Result<JobId, LauncherError> {
        let active_id = self
            .store
            .active_job()
            .ok_or_else(|| LauncherError::NotFound("no deployment in progress".to_string()))?;

        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        match active.as_ref() {
            Some(job) if job.id == active_id => {
                info!("Cancelling deployment {}", job.id);
                job.cancel_tx.send_replace(true);
                Ok(job.id)
            }
            _ => Err(LauncherError::NotFound(
                "no deployment in progress".to_string(),
            )),
        }
    }

    /// Wait for the active pipeline task to finish
    ///
    /// Returns the snapshot published last.
    pub async fn wait_for_active(&self) -> Arc<StatusSnapshot> {
        let handle = {
            let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            active.as_mut().and_then(|job| job.handle.take())
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Deployment task failed: {}", e);
            }
        }
        self.store.current_status()
    }

    /// Cancel the active job and wait for it to record its terminal phase
    pub async fn shutdown(&self) {
        {
            let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(job) = active.as_ref() {
                job.cancel_tx.send_replace(true);
            }
        }
        self.wait_for_active().await;
    }

    async fn run_pipeline(
        &self,
        mut job: DeploymentJob,
        request: DeploymentRequest,
        mut cancel: watch::Receiver<bool>,
    ) {
        let event = match self.drive(&mut job, &request, &mut cancel).await {
            Ok(outputs) => {
                info!(
                    "Deployment {} completed, public IP {}",
                    job.id(),
                    outputs.public_ip
                );
                DeploymentEvent::OutputsReady(outputs)
            }
            Err(event) => event,
        };
        self.transition(&mut job, event);
    }

    /// Run the phases in order, stopping at the first failure
    async fn drive(
        &self,
        job: &mut DeploymentJob,
        request: &DeploymentRequest,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<ExtractedOutputs, DeploymentEvent> {
        info!("Deployment {}: initializing Terraform", job.id());
        until_cancelled(self.backend.initialize(), cancel)
            .await
            .map_err(|e| failure("Error initializing Terraform", e))?;
        self.transition(job, DeploymentEvent::Initialized);

        info!("Deployment {}: applying Terraform plan", job.id());
        until_cancelled(self.backend.apply(request), cancel)
            .await
            .map_err(|e| failure("Error deploying instance on AWS", e))?;
        self.transition(job, DeploymentEvent::Applied);

        info!("Deployment {}: retrieving instance outputs", job.id());
        let backend = &self.backend;
        let store = &self.store;
        retry_until_ready(
            &self.retry,
            || async move {
                let raw = backend.fetch_outputs().await?;
                extract(&raw)
            },
            tokio::time::sleep,
            |attempt| {
                job.record_attempt(attempt);
                if let Err(e) = store.publish(job.snapshot()) {
                    warn!("Failed to publish attempt {}: {}", attempt, e);
                }
            },
            cancel,
        )
        .await
        .map_err(|e| failure("Error retrieving instance outputs", e))
    }

    /// Apply an event to the job and publish the resulting snapshot
    fn transition(&self, job: &mut DeploymentJob, event: DeploymentEvent) {
        match job.apply(event) {
            Ok(phase) => {
                info!("Deployment {} is now {:?}", job.id(), phase);
                if let Err(e) = self.store.publish(job.snapshot()) {
                    error!("Failed to publish deployment {}: {}", job.id(), e);
                }
            }
            Err(e) => error!("Deployment {}: {}", job.id(), e),
        }
    }
}

/// Await `fut` unless the job is cancelled first
async fn until_cancelled<T>(
    fut: impl Future<Output = Result<T, LauncherError>>,
    cancel: &mut watch::Receiver<bool>,
) -> Result<T, LauncherError> {
    tokio::select! {
        result = fut => result,
        _ = wait_cancelled(cancel) => Err(LauncherError::Cancelled("deployment cancelled".to_string())),
    }
}

/// Map a step failure onto the event that ends the job
fn failure(context: &str, err: LauncherError) -> DeploymentEvent {
    match err {
        LauncherError::Cancelled(_) => {
            warn!("{}: cancelled", context);
            DeploymentEvent::Cancel
        }
        LauncherError::ProcessExecutionError { stderr, .. } => {
            error!("{}: {}", context, stderr);
            DeploymentEvent::Failed(format!("{context}: {stderr}"))
        }
        other => {
            error!("{}: {}", context, other);
            DeploymentEvent::Failed(format!("{context}: {other}"))
        }
    }
}
