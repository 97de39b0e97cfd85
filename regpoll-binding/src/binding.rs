//! Binding orchestration: wires plans, scheduler, decoder, health and the
//! host seams together.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use regpoll_common::error::ConfigError;
use regpoll_common::{
    DecodePlan, DeviceId, HealthTracker, ReadOutcome, RegisterReadPlan, build_plans, channel_keys,
    decode, parse_device_ids,
};

use crate::config::BindingConfig;
use crate::endpoint::{
    BridgeConnection, EndpointResolver, FailureCallback, RawReadResult, ReadFailure,
    ResultCallback,
};
use crate::scheduler::{DrainError, PollScheduler};
use crate::status::{BindingStatus, MeasurementSink, StatusDetail, StatusSink};

/// Bound on waiting for a previous job generation to stop.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that abort initialization.
#[derive(Debug, Error)]
pub enum BindingError {
    /// The device id list is malformed; no jobs were registered.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A previous job generation did not stop in time.
    #[error(transparent)]
    Drain(#[from] DrainError),
}

/// The polling binding for one endpoint and its configured devices.
///
/// Collaborators are injected rather than inherited: the parent bridge
/// connection, a status sink and a measurement sink stand in for the
/// host framework.
pub struct PollBinding {
    device_ids: String,
    poll_interval: Duration,
    initial_delay: Duration,
    resolver: Arc<EndpointResolver>,
    scheduler: Arc<PollScheduler>,
    health: Arc<HealthTracker>,
    status: Arc<dyn StatusSink>,
    measurements: Arc<dyn MeasurementSink>,
}

impl PollBinding {
    /// Create a binding for the given configuration and collaborators.
    pub fn new(
        config: &BindingConfig,
        bridge: Option<Arc<dyn BridgeConnection>>,
        status: Arc<dyn StatusSink>,
        measurements: Arc<dyn MeasurementSink>,
    ) -> Self {
        let resolver = Arc::new(EndpointResolver::new(bridge));
        let scheduler = Arc::new(PollScheduler::new(Arc::clone(&resolver)));

        Self {
            device_ids: config.device_ids.clone(),
            poll_interval: config.poll_interval(),
            initial_delay: config.initial_delay(),
            resolver,
            scheduler,
            health: Arc::new(HealthTracker::new()),
            status,
            measurements,
        }
    }

    /// The channel keys this binding exposes, one set per configured
    /// device, in declared order.
    pub fn channels(&self) -> Result<Vec<String>, ConfigError> {
        let ids = parse_device_ids(&self.device_ids)?;
        Ok(ids.into_iter().flat_map(channel_keys).collect())
    }

    /// Number of currently registered poll jobs.
    pub fn active_jobs(&self) -> usize {
        self.scheduler.active_jobs()
    }

    /// (Re)initialize the binding.
    ///
    /// Any previous job generation is fully drained before new
    /// registrations are issued. A malformed device id list publishes a
    /// configuration-error status and aborts; an unavailable bridge only
    /// publishes an offline status and is retried on the next cycle.
    pub async fn initialize(&self) -> Result<(), BindingError> {
        self.scheduler.drain(DRAIN_TIMEOUT).await?;
        self.health.reset();
        self.status.update(BindingStatus::unknown());

        let plans = match build_plans(&self.device_ids) {
            Ok(plans) => plans,
            Err(e) => {
                self.status
                    .update(BindingStatus::configuration_error(e.to_string()));
                return Err(e.into());
            }
        };

        let mut setup = JoinSet::new();
        for plan in plans {
            let scheduler = Arc::clone(&self.scheduler);
            let health = Arc::clone(&self.health);
            let status = Arc::clone(&self.status);
            let measurements = Arc::clone(&self.measurements);
            let interval = self.poll_interval;
            let initial_delay = self.initial_delay;

            setup.spawn(async move {
                setup_device(
                    plan,
                    &scheduler,
                    interval,
                    initial_delay,
                    health,
                    status,
                    measurements,
                );
            });
        }
        while setup.join_next().await.is_some() {}

        Ok(())
    }

    /// Tear the binding down: stop all jobs and drop the cached endpoint.
    pub async fn dispose(&self) -> Result<(), DrainError> {
        self.scheduler.drain(DRAIN_TIMEOUT).await?;
        self.resolver.invalidate();
        Ok(())
    }
}

/// Register the poll for one device with its decode and health callbacks.
fn setup_device(
    plan: RegisterReadPlan,
    scheduler: &PollScheduler,
    interval: Duration,
    initial_delay: Duration,
    health: Arc<HealthTracker>,
    status: Arc<dyn StatusSink>,
    measurements: Arc<dyn MeasurementSink>,
) {
    let device_id: DeviceId = plan.device_id;
    let decode_plan = DecodePlan::power_meter();

    let on_result: ResultCallback = {
        let health = Arc::clone(&health);
        let status = Arc::clone(&status);
        Arc::new(move |result: RawReadResult| {
            let device_id = result.plan.device_id;
            match decode(device_id, &result.payload, &decode_plan) {
                Ok(decoded) => {
                    if health.observe(device_id, ReadOutcome::Success).is_some() {
                        status.update(BindingStatus::online());
                    }
                    for measurement in &decoded {
                        measurements.publish(measurement);
                    }
                }
                Err(e) => {
                    warn!(device = device_id, error = %e, "Failed to decode register payload");
                    if health.observe(device_id, ReadOutcome::Failure).is_some() {
                        status.update(BindingStatus::offline(
                            StatusDetail::CommunicationError,
                            e.to_string(),
                        ));
                    }
                }
            }
        })
    };

    let on_failure: FailureCallback = {
        let health = Arc::clone(&health);
        let status = Arc::clone(&status);
        Arc::new(move |failure: ReadFailure| {
            warn!(
                device = failure.plan.device_id,
                error = %failure.error,
                "Poll failed"
            );
            if health
                .observe(failure.plan.device_id, ReadOutcome::Failure)
                .is_some()
            {
                status.update(BindingStatus::offline(
                    StatusDetail::CommunicationError,
                    failure.error.clone(),
                ));
            }
        })
    };

    match scheduler.register_poll(plan, interval, initial_delay, on_result, on_failure) {
        Ok(job) => debug!(device = device_id, job = ?job, "Device setup complete"),
        Err(reason) => {
            debug!(device = device_id, %reason, "Endpoint unavailable, poll not registered");
            status.update(BindingStatus::offline(
                StatusDetail::BridgeOffline,
                reason.to_string(),
            ));
        }
    }
}
