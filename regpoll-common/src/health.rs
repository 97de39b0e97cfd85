//! Per-device read health tracking.
//!
//! The tracker is edge-triggered: [`HealthTracker::observe`] reports a
//! transition only when the outcome kind differs from the recorded one,
//! so callers can forward status updates without flooding the host on
//! every successful poll tick.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::plan::DeviceId;

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Success,
    Failure,
}

/// Recorded read status of a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStatus {
    /// No poll result observed yet.
    #[default]
    NotReceived,
    /// Last observed outcome was a successful read.
    Success,
    /// Last observed outcome was a failed read.
    Failed,
}

impl std::fmt::Display for ReadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadStatus::NotReceived => write!(f, "not_received"),
            ReadStatus::Success => write!(f, "success"),
            ReadStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Tracks read status per device.
///
/// Result and failure callbacks arrive on arbitrary transport worker
/// threads; the map is mutated under a single lock so interleaved
/// outcomes for different devices cannot lose updates.
#[derive(Debug, Default)]
pub struct HealthTracker {
    devices: Mutex<HashMap<DeviceId, ReadStatus>>,
}

impl HealthTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome for a device.
    ///
    /// Returns `Some(new_status)` when the recorded kind changed,
    /// `None` when the outcome matches what is already recorded.
    pub fn observe(&self, device_id: DeviceId, outcome: ReadOutcome) -> Option<ReadStatus> {
        let new_status = match outcome {
            ReadOutcome::Success => ReadStatus::Success,
            ReadOutcome::Failure => ReadStatus::Failed,
        };

        let mut devices = self.devices.lock().unwrap();
        let current = devices.entry(device_id).or_default();
        let previous = *current;
        if previous == new_status {
            return None;
        }
        *current = new_status;

        tracing::debug!(device = device_id, from = %previous, to = %new_status, "Read status transition");
        Some(new_status)
    }

    /// Get the recorded status for a device.
    pub fn status(&self, device_id: DeviceId) -> ReadStatus {
        self.devices
            .lock()
            .unwrap()
            .get(&device_id)
            .copied()
            .unwrap_or_default()
    }

    /// Forget all recorded statuses. Called on reinitialization so the
    /// next outcome of every device is a fresh transition.
    pub fn reset(&self) {
        self.devices.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_status_not_received() {
        let tracker = HealthTracker::new();
        assert_eq!(tracker.status(1), ReadStatus::NotReceived);
    }

    #[test]
    fn test_repeated_success_single_transition() {
        let tracker = HealthTracker::new();

        assert_eq!(
            tracker.observe(1, ReadOutcome::Success),
            Some(ReadStatus::Success)
        );
        assert_eq!(tracker.observe(1, ReadOutcome::Success), None);
        assert_eq!(tracker.observe(1, ReadOutcome::Success), None);
    }

    #[test]
    fn test_success_then_failures() {
        let tracker = HealthTracker::new();

        assert_eq!(
            tracker.observe(1, ReadOutcome::Success),
            Some(ReadStatus::Success)
        );
        assert_eq!(
            tracker.observe(1, ReadOutcome::Failure),
            Some(ReadStatus::Failed)
        );
        assert_eq!(tracker.observe(1, ReadOutcome::Failure), None);
    }

    #[test]
    fn test_first_outcome_failure() {
        let tracker = HealthTracker::new();

        assert_eq!(
            tracker.observe(1, ReadOutcome::Failure),
            Some(ReadStatus::Failed)
        );
        assert_eq!(tracker.observe(1, ReadOutcome::Failure), None);
    }

    #[test]
    fn test_devices_tracked_independently() {
        let tracker = HealthTracker::new();

        assert!(tracker.observe(1, ReadOutcome::Success).is_some());
        // A different device failing must not suppress or alter device 1.
        assert!(tracker.observe(2, ReadOutcome::Failure).is_some());
        assert_eq!(tracker.status(1), ReadStatus::Success);
        assert_eq!(tracker.status(2), ReadStatus::Failed);
        assert_eq!(tracker.observe(1, ReadOutcome::Success), None);
    }

    #[test]
    fn test_reset() {
        let tracker = HealthTracker::new();

        tracker.observe(1, ReadOutcome::Success);
        tracker.reset();

        assert_eq!(tracker.status(1), ReadStatus::NotReceived);
        assert_eq!(
            tracker.observe(1, ReadOutcome::Success),
            Some(ReadStatus::Success)
        );
    }
}
