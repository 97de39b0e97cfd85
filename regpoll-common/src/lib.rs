//! regpoll common library
//!
//! Shared, transport-free core of the regpoll Modbus polling binding:
//!
//! - [`plan`] - device id parsing and per-device register read plans
//! - [`decode`] - raw register payload decoding into typed measurements
//! - [`health`] - per-device edge-triggered read health tracking
//! - [`channel`] - deterministic channel-key builders
//! - [`measurement`] - the decoded measurement model
//! - [`config`] - logging configuration and JSON5 helpers
//! - [`error`] - error types

pub mod channel;
pub mod config;
pub mod decode;
pub mod error;
pub mod health;
pub mod measurement;
pub mod plan;

// Re-export commonly used types at the crate root
pub use channel::{CHANNEL_GROUP, active_power_channel, channel_keys};
pub use config::{LogFormat, LoggingConfig, parse_config};
pub use decode::{DecodePlan, Field, decode};
pub use error::{ConfigError, DecodeError};
pub use health::{HealthTracker, ReadOutcome, ReadStatus};
pub use measurement::{Measurement, Unit, current_timestamp_millis};
pub use plan::{DeviceId, ReadFunction, RegisterReadPlan, build_plans, parse_device_ids};

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
pub fn init_tracing(
    config: &LoggingConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()?;
        }
    }

    Ok(())
}
