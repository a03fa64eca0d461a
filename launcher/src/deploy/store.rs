//! Job store publishing deployment status

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::deploy::job::{JobId, StatusSnapshot};
use crate::errors::LauncherError;

#[derive(Default)]
struct Slots {
    current: Option<JobId>,
    jobs: HashMap<JobId, Arc<StatusSnapshot>>,
}

/// Holds the published snapshot of each known job
///
/// Only one job is kept: accepting a new one replaces the previous job once
/// it is terminal. Writers swap whole snapshots, so readers never see a job
/// half updated, and locks are only held for the swap.
pub struct JobStore {
    slots: RwLock<Slots>,
    not_started: Arc<StatusSnapshot>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Slots::default()),
            not_started: Arc::new(StatusSnapshot::not_started()),
        }
    }

    /// Claim the slot for a new job
    ///
    /// Fails with [`LauncherError::JobInProgress`] while the current job is
    /// not terminal.
    pub fn begin(&self, snapshot: StatusSnapshot) -> Result<JobId, LauncherError> {
        let job_id = snapshot.job_id.ok_or_else(|| {
            LauncherError::Internal("cannot store a snapshot without a job id".to_string())
        })?;

        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        if let Some(current) = slots.current {
            let active = slots
                .jobs
                .get(&current)
                .is_some_and(|s| !s.status.is_terminal());
            if active {
                return Err(LauncherError::JobInProgress(current.to_string()));
            }
        }

        slots.jobs.clear();
        slots.jobs.insert(job_id, Arc::new(snapshot));
        slots.current = Some(job_id);
        Ok(job_id)
    }

    /// Replace the published snapshot of a known job
    pub fn publish(&self, snapshot: StatusSnapshot) -> Result<(), LauncherError> {
        let job_id = snapshot.job_id.ok_or_else(|| {
            LauncherError::Internal("cannot publish a snapshot without a job id".to_string())
        })?;

        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        match slots.jobs.get_mut(&job_id) {
            Some(slot) => {
                *slot = Arc::new(snapshot);
                Ok(())
            }
            None => Err(LauncherError::NotFound(format!("job {job_id}"))),
        }
    }

    /// Latest snapshot of the current job, or the not-started snapshot
    pub fn current_status(&self) -> Arc<StatusSnapshot> {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        slots
            .current
            .and_then(|id| slots.jobs.get(&id).cloned())
            .unwrap_or_else(|| self.not_started.clone())
    }

    /// Latest snapshot of a specific job
    pub fn status(&self, job_id: &JobId) -> Option<Arc<StatusSnapshot>> {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        slots.jobs.get(job_id).cloned()
    }

    /// The current job if it has not reached a terminal phase
    pub fn active_job(&self) -> Option<JobId> {
        let status = self.current_status();
        match status.job_id {
            Some(id) if !status.status.is_terminal() => Some(id),
            _ => None,
        }
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
