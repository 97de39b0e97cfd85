//! Modbus register-block polling binding.
//!
//! Polls a fixed register block from many unit ids sharing one serial or
//! TCP endpoint and republishes decoded values as typed measurement
//! channels:
//!
//! ```text
//! measurements/ActivePower-<device_id>
//! ```
//!
//! The host framework is represented by two injected seams: a
//! [`status::StatusSink`] receiving edge-triggered online/offline
//! transitions and a [`status::MeasurementSink`] receiving decoded
//! values. The shipped binary wires these to tracing and JSON-lines
//! stdout.

pub mod binding;
pub mod config;
pub mod endpoint;
pub mod scheduler;
pub mod status;
pub mod transport;

pub use binding::{BindingError, DRAIN_TIMEOUT, PollBinding};
pub use config::{BindingConfig, ConfigLoadError, ConnectionConfig};
pub use endpoint::{
    BridgeConnection, BridgeUnavailable, CommunicationInterface, EndpointResolver, FailureCallback,
    PollHandle, RawReadResult, ReadFailure, ResultCallback,
};
pub use scheduler::{DrainError, JobId, PollScheduler};
pub use status::{BindingState, BindingStatus, MeasurementSink, StatusDetail, StatusSink};
pub use transport::{ModbusEndpoint, TransportBridge, TransportError};
