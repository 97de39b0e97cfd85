//! Recurring poll registration and bounded teardown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use regpoll_common::{DeviceId, RegisterReadPlan};

use crate::endpoint::{
    BridgeUnavailable, EndpointResolver, FailureCallback, PollHandle, ResultCallback,
};

/// Identifier of a registered poll job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(u64);

struct ActiveJob {
    id: JobId,
    device_id: DeviceId,
    handle: PollHandle,
}

/// Error from draining registered jobs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrainError {
    /// Cancelled jobs did not stop within the bound.
    #[error("poll jobs did not stop within {timeout:?}")]
    Timeout { timeout: Duration },
}

/// Registers recurring reads against the shared endpoint and owns the
/// resulting jobs.
///
/// Lifecycle per job: unregistered, then active once the endpoint
/// resolved and the transport accepted the registration, then
/// unregistered again on cancel or drain. There is no paused state;
/// reinitialization drains and rebuilds from scratch.
pub struct PollScheduler {
    resolver: Arc<EndpointResolver>,
    jobs: Mutex<Vec<ActiveJob>>,
    next_id: AtomicU64,
}

impl PollScheduler {
    /// Create a scheduler resolving against the given endpoint resolver.
    pub fn new(resolver: Arc<EndpointResolver>) -> Self {
        Self {
            resolver,
            jobs: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a recurring read.
    ///
    /// Resolves the shared endpoint first; when that fails the job is not
    /// scheduled and the caller receives the reason. The scheduler never
    /// retries failed reads itself; the callbacks observe every outcome.
    pub fn register_poll(
        &self,
        plan: RegisterReadPlan,
        interval: Duration,
        initial_delay: Duration,
        on_result: ResultCallback,
        on_failure: FailureCallback,
    ) -> Result<JobId, BridgeUnavailable> {
        let endpoint = self.resolver.resolve()?;
        let handle = endpoint.register_poll(plan, interval, initial_delay, on_result, on_failure);

        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.jobs.lock().unwrap().push(ActiveJob {
            id,
            device_id: plan.device_id,
            handle,
        });

        debug!(job = id.0, device = plan.device_id, "Registered poll job");
        Ok(id)
    }

    /// Cancel one job. Returns false when the id is unknown (already
    /// cancelled or drained).
    pub fn cancel(&self, id: JobId) -> bool {
        let mut jobs = self.jobs.lock().unwrap();
        let Some(index) = jobs.iter().position(|job| job.id == id) else {
            return false;
        };

        let job = jobs.remove(index);
        job.handle.cancel();
        debug!(job = id.0, device = job.device_id, "Cancelled poll job");
        true
    }

    /// Number of currently registered jobs.
    pub fn active_jobs(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    /// Cancel every job and wait until the underlying tasks have stopped.
    ///
    /// Registration of a new generation must only happen after this
    /// returns Ok, so no two generations overlap for the same channel
    /// key. A hang is reported instead of swallowed.
    pub async fn drain(&self, timeout: Duration) -> Result<(), DrainError> {
        let jobs: Vec<ActiveJob> = std::mem::take(&mut *self.jobs.lock().unwrap());
        if jobs.is_empty() {
            return Ok(());
        }

        for job in &jobs {
            job.handle.cancel();
        }

        let count = jobs.len();
        let wait = async {
            for job in jobs {
                job.handle.stopped().await;
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| DrainError::Timeout { timeout })?;

        debug!(jobs = count, "Drained poll jobs");
        Ok(())
    }
}
