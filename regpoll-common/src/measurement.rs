use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::plan::DeviceId;

/// A single decoded measurement emitted by the polling pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Unix epoch milliseconds when the value was decoded.
    pub timestamp: i64,

    /// Unit address of the device the value came from.
    pub device_id: DeviceId,

    /// Channel key, e.g. `measurements/ActivePower-3`.
    pub channel: String,

    /// The measured value, already scaled.
    pub value: f64,

    /// Unit of measurement.
    pub unit: Unit,
}

impl Measurement {
    /// Create a new measurement with the current timestamp.
    pub fn new(device_id: DeviceId, channel: impl Into<String>, value: f64, unit: Unit) -> Self {
        Self {
            timestamp: current_timestamp_millis(),
            device_id,
            channel: channel.into(),
            value,
            unit,
        }
    }
}

/// Unit of a decoded measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    /// Watts.
    #[serde(rename = "W")]
    Watt,
}

impl Unit {
    /// Get the unit symbol used in serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Watt => "W",
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Get the current timestamp in milliseconds since Unix epoch.
///
/// Returns 0 if system time is before Unix epoch (should never happen in practice).
pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_creation() {
        let m = Measurement::new(3, "measurements/ActivePower-3", 123.45, Unit::Watt);

        assert_eq!(m.device_id, 3);
        assert_eq!(m.channel, "measurements/ActivePower-3");
        assert_eq!(m.value, 123.45);
        assert_eq!(m.unit, Unit::Watt);
        assert!(m.timestamp > 0);
    }

    #[test]
    fn test_unit_serialization() {
        let m = Measurement::new(1, "measurements/ActivePower-1", 42.0, Unit::Watt);
        let json = serde_json::to_string(&m).unwrap();

        assert!(json.contains("\"unit\":\"W\""));
        assert!(json.contains("\"value\":42.0"));

        let back: Measurement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_unit_display() {
        assert_eq!(Unit::Watt.as_str(), "W");
        assert_eq!(Unit::Watt.to_string(), "W");
    }
}
