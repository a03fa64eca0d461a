//! Deployment job and its published snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::deploy::fsm::{DeploymentEvent, DeploymentFsm, Phase};
use crate::errors::LauncherError;
use crate::models::deployment::{DeploymentRequest, FeatureToggles};
use crate::utils::generate_uuid;

/// Identifier of an accepted deployment
pub type JobId = Uuid;

/// Message published alongside a completed deployment
pub const COMPLETED_MESSAGE: &str = "Instance deployed successfully";

/// The single mutable unit of work
///
/// Only the pipeline task that owns the job mutates it. Readers see it
/// through [`StatusSnapshot`] values.
#[derive(Debug, Clone)]
pub struct DeploymentJob {
    id: JobId,
    region: String,
    ami_id: String,
    toggles: FeatureToggles,
    fsm: DeploymentFsm,
    attempts: u32,
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DeploymentJob {
    pub fn new(request: &DeploymentRequest) -> Self {
        let now = Utc::now();
        Self {
            id: generate_uuid(),
            region: request.region().to_string(),
            ami_id: request.ami_id().to_string(),
            toggles: request.toggles(),
            fsm: DeploymentFsm::new(),
            attempts: 0,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.fsm.phase()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Apply an event to the job's state machine
    pub fn apply(&mut self, event: DeploymentEvent) -> Result<Phase, LauncherError> {
        let phase = self.fsm.process(event)?;
        self.updated_at = Utc::now();
        Ok(phase)
    }

    /// Record the start of an output retrieval attempt
    pub fn record_attempt(&mut self, attempt: u32) {
        self.attempts = attempt;
        self.updated_at = Utc::now();
    }

    /// Build the read model for the job's current state
    pub fn snapshot(&self) -> StatusSnapshot {
        let phase = self.fsm.phase();
        let outputs = match phase {
            Phase::Completed => self.fsm.outputs(),
            _ => None,
        };
        let error = match phase {
            Phase::Error => Some(
                self.fsm
                    .error()
                    .unwrap_or("Deployment failed")
                    .to_string(),
            ),
            _ => None,
        };

        StatusSnapshot {
            job_id: Some(self.id),
            status: phase,
            public_ip: outputs.map(|o| o.public_ip.clone()),
            vscode_server_url: outputs.and_then(|o| o.vscode_server_url.clone()),
            message: outputs.map(|_| COMPLETED_MESSAGE.to_string()),
            error,
            attempts: self.attempts,
            region: Some(self.region.clone()),
            ami_id: Some(self.ami_id.clone()),
            features: Some(self.toggles),
            started_at: Some(self.started_at),
            updated_at: Some(self.updated_at),
        }
    }
}

/// Published status of a deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,

    pub status: Phase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vscode_server_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub attempts: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ami_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureToggles>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl StatusSnapshot {
    /// Snapshot reported before any job has run
    pub fn not_started() -> Self {
        Self {
            job_id: None,
            status: Phase::NotStarted,
            public_ip: None,
            vscode_server_url: None,
            message: None,
            error: None,
            attempts: 0,
            region: None,
            ami_id: None,
            features: None,
            started_at: None,
            updated_at: None,
        }
    }

    /// Whether the result fields agree with the phase
    pub fn is_consistent(&self) -> bool {
        match self.status {
            Phase::Completed => self.public_ip.is_some() && self.error.is_none(),
            Phase::Error => self.error.is_some() && self.public_ip.is_none(),
            _ => self.public_ip.is_none() && self.error.is_none(),
        }
    }
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self::not_started()
    }
}
