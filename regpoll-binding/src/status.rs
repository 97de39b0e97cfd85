//! Externally visible binding status and output seams.

use serde::{Deserialize, Serialize};

use regpoll_common::Measurement;

/// Overall binding state visible to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingState {
    /// Initialization started, no poll outcome observed yet.
    Unknown,
    /// Reads are succeeding.
    Online,
    /// Reads are failing or a precondition is unmet.
    Offline,
}

/// Structured reason accompanying a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusDetail {
    /// No further detail.
    None,
    /// The parent bridge connection is missing or not usable.
    BridgeOffline,
    /// Reads or decoding are failing.
    CommunicationError,
    /// The binding configuration is invalid.
    ConfigurationError,
}

/// A status update published to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingStatus {
    /// Overall state.
    pub state: BindingState,

    /// Structured reason code.
    pub detail: StatusDetail,

    /// Human-readable description of the unmet precondition, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BindingStatus {
    /// Status published when initialization starts.
    pub fn unknown() -> Self {
        Self {
            state: BindingState::Unknown,
            detail: StatusDetail::None,
            message: None,
        }
    }

    /// Status published on a read-success transition.
    pub fn online() -> Self {
        Self {
            state: BindingState::Online,
            detail: StatusDetail::None,
            message: None,
        }
    }

    /// Offline status with a reason.
    pub fn offline(detail: StatusDetail, message: impl Into<String>) -> Self {
        Self {
            state: BindingState::Offline,
            detail,
            message: Some(message.into()),
        }
    }

    /// Offline status for an invalid configuration.
    pub fn configuration_error(message: impl Into<String>) -> Self {
        Self::offline(StatusDetail::ConfigurationError, message)
    }
}

/// Host seam receiving status updates.
///
/// Updates are only emitted on transitions; implementations do not need to
/// de-duplicate.
pub trait StatusSink: Send + Sync {
    fn update(&self, status: BindingStatus);
}

/// Host seam receiving decoded measurements.
pub trait MeasurementSink: Send + Sync {
    fn publish(&self, measurement: &Measurement);
}

/// Status sink backed by the tracing subscriber.
#[derive(Debug, Default)]
pub struct TracingStatusSink;

impl StatusSink for TracingStatusSink {
    fn update(&self, status: BindingStatus) {
        match status.state {
            BindingState::Offline => tracing::warn!(
                detail = ?status.detail,
                message = status.message.as_deref().unwrap_or(""),
                "Binding offline"
            ),
            state => tracing::info!(state = ?state, "Binding status changed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_constructors() {
        assert_eq!(BindingStatus::unknown().state, BindingState::Unknown);
        assert_eq!(BindingStatus::online().detail, StatusDetail::None);

        let offline = BindingStatus::offline(StatusDetail::BridgeOffline, "Bridge 'usb0' is offline");
        assert_eq!(offline.state, BindingState::Offline);
        assert_eq!(offline.detail, StatusDetail::BridgeOffline);
        assert_eq!(offline.message.as_deref(), Some("Bridge 'usb0' is offline"));
    }

    #[test]
    fn test_status_serialization() {
        let status = BindingStatus::configuration_error("invalid device id 'x'");
        let json = serde_json::to_string(&status).unwrap();

        assert!(json.contains("\"state\":\"offline\""));
        assert!(json.contains("\"detail\":\"configuration_error\""));
        assert!(json.contains("invalid device id 'x'"));

        let online = serde_json::to_string(&BindingStatus::online()).unwrap();
        assert!(!online.contains("message"));
    }
}
