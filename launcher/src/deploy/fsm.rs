//! Finite State Machine for instance deployment

use serde::{Deserialize, Serialize};

use crate::deploy::outputs::ExtractedOutputs;
use crate::errors::LauncherError;

/// Deployment phase
///
/// Serialized with the names the web form polls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No deployment has been accepted
    NotStarted,

    /// `terraform init` is running
    Initializing,

    /// `terraform apply` is running
    Applying,

    /// Waiting for the instance outputs
    #[serde(rename = "retrieving_ip")]
    RetrievingOutputs,

    /// Instance deployed, outputs available
    Completed,

    /// Deployment failed
    Error,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Error)
    }
}

/// Deployment event
#[derive(Debug, Clone)]
pub enum DeploymentEvent {
    /// Request accepted
    Start,

    /// Init exited successfully
    Initialized,

    /// Apply exited successfully
    Applied,

    /// Outputs retrieved
    OutputsReady(ExtractedOutputs),

    /// The current step failed
    Failed(String),

    /// Job cancelled by the operator or shutdown
    Cancel,
}

/// Deployment FSM
#[derive(Debug, Clone)]
pub struct DeploymentFsm {
    phase: Phase,
    outputs: Option<ExtractedOutputs>,
    error: Option<String>,
}

impl DeploymentFsm {
    /// Create a new FSM in the not-started phase
    pub fn new() -> Self {
        Self {
            phase: Phase::NotStarted,
            outputs: None,
            error: None,
        }
    }

    /// Get current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Outputs once completed
    pub fn outputs(&self) -> Option<&ExtractedOutputs> {
        self.outputs.as_ref()
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process an event and transition phase
    pub fn process(&mut self, event: DeploymentEvent) -> Result<Phase, LauncherError> {
        let new_phase = match (self.phase, event) {
            (Phase::NotStarted, DeploymentEvent::Start) => Phase::Initializing,
            (Phase::Initializing, DeploymentEvent::Initialized) => Phase::Applying,
            (Phase::Applying, DeploymentEvent::Applied) => Phase::RetrievingOutputs,
            (Phase::RetrievingOutputs, DeploymentEvent::OutputsReady(outputs)) => {
                self.outputs = Some(outputs);
                Phase::Completed
            }

            (phase, DeploymentEvent::Failed(err)) if !phase.is_terminal() => {
                self.error = Some(err);
                Phase::Error
            }
            (phase, DeploymentEvent::Cancel) if !phase.is_terminal() => {
                self.error = Some("Deployment cancelled".to_string());
                Phase::Error
            }

            // Invalid transitions
            (phase, event) => {
                return Err(LauncherError::TransitionError(format!(
                    "{:?} -> {:?}",
                    phase, event
                )));
            }
        };

        self.phase = new_phase;
        Ok(new_phase)
    }
}

impl Default for DeploymentFsm {
    fn default() -> Self {
        Self::new()
    }
}
