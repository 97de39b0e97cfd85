//! Shared-endpoint abstractions and resolution.
//!
//! Many unit ids share one physical connection. The binding reaches that
//! connection through two injected seams: [`BridgeConnection`] (the parent
//! owning the link) and [`CommunicationInterface`] (the transport handle
//! polls are registered against). [`EndpointResolver`] locates the handle
//! once and caches it for the lifetime of the polling session.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;

use regpoll_common::RegisterReadPlan;

/// One successful poll cycle: the originating plan plus the raw register
/// bytes, big-endian.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReadResult {
    /// The request this payload answers; carries the device id.
    pub plan: RegisterReadPlan,
    /// Raw register bytes, two per register.
    pub payload: Vec<u8>,
}

/// One failed poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadFailure {
    /// The request that failed.
    pub plan: RegisterReadPlan,
    /// Opaque transport error description.
    pub error: String,
}

/// Callback invoked with each successful read.
pub type ResultCallback = Arc<dyn Fn(RawReadResult) + Send + Sync>;

/// Callback invoked with each failed read.
pub type FailureCallback = Arc<dyn Fn(ReadFailure) + Send + Sync>;

/// Handle to one registered recurring poll.
///
/// Cancellation is cooperative: it stops future callbacks but does not
/// interrupt a read already in flight.
#[derive(Debug)]
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Wrap the transport task driving a poll.
    pub fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    /// Stop future poll cycles.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Wait until the underlying task has fully stopped.
    pub async fn stopped(self) {
        let _ = self.task.await;
    }
}

/// The transport capability polls are registered against.
///
/// The transport owns the recurring schedule: after registration it
/// invokes `on_result` or `on_failure` at each interval, indefinitely,
/// until the returned handle is cancelled.
pub trait CommunicationInterface: Send + Sync {
    fn register_poll(
        &self,
        plan: RegisterReadPlan,
        interval: Duration,
        initial_delay: Duration,
        on_result: ResultCallback,
        on_failure: FailureCallback,
    ) -> PollHandle;
}

/// The parent connection owning the shared link.
pub trait BridgeConnection: Send + Sync {
    /// Human-readable label used in status details.
    fn label(&self) -> String;

    /// Whether the connection is operationally ready.
    fn is_online(&self) -> bool;

    /// The communication interface, once the connection exposes one.
    fn communication_interface(&self) -> Option<Arc<dyn CommunicationInterface>>;
}

/// Why the shared endpoint could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeUnavailable {
    /// No parent connection was configured at all.
    #[error("no bridge configured")]
    NotConfigured,

    /// The parent connection exists but is not ready.
    #[error("Bridge '{label}' is offline")]
    Offline { label: String },

    /// The parent connection is ready but does not expose a communication
    /// interface yet.
    #[error("Bridge '{label}' not completely initialized")]
    NotInitialized { label: String },
}

/// Locates and caches the shared communication interface.
pub struct EndpointResolver {
    bridge: Option<Arc<dyn BridgeConnection>>,
    cached: Mutex<Option<Arc<dyn CommunicationInterface>>>,
}

impl EndpointResolver {
    /// Create a resolver for an optional parent connection.
    pub fn new(bridge: Option<Arc<dyn BridgeConnection>>) -> Self {
        Self {
            bridge,
            cached: Mutex::new(None),
        }
    }

    /// Resolve the shared communication interface.
    ///
    /// Returns the cached handle when already resolved; otherwise performs
    /// the parent lookup. The lock is held across the lookup, so
    /// concurrent callers converge on a single handle and later callers
    /// never re-invoke the lookup.
    pub fn resolve(&self) -> Result<Arc<dyn CommunicationInterface>, BridgeUnavailable> {
        let mut cached = self.cached.lock().unwrap();
        if let Some(handle) = cached.as_ref() {
            return Ok(Arc::clone(handle));
        }

        let bridge = self.bridge.as_ref().ok_or(BridgeUnavailable::NotConfigured)?;
        if !bridge.is_online() {
            return Err(BridgeUnavailable::Offline {
                label: bridge.label(),
            });
        }
        let handle = bridge
            .communication_interface()
            .ok_or_else(|| BridgeUnavailable::NotInitialized {
                label: bridge.label(),
            })?;

        *cached = Some(Arc::clone(&handle));
        Ok(handle)
    }

    /// Drop the cached handle. Called on session teardown; the next
    /// `resolve` performs a fresh lookup.
    pub fn invalidate(&self) {
        *self.cached.lock().unwrap() = None;
    }
}
