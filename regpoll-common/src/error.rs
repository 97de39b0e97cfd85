//! Error types for the polling core.

use thiserror::Error;

/// Errors produced while turning the `device_ids` configuration string
/// into read plans.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The device id list resolved to zero entries.
    #[error("device id list is empty")]
    EmptyDeviceIds,

    /// A token in the list is not a positive integer unit address.
    #[error("invalid device id '{token}': expected a positive integer (1-255)")]
    InvalidDeviceId { token: String },
}

/// Errors produced while decoding a raw register payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The payload ended before the decode plan was fully consumed.
    #[error("register payload too short: got {available} bytes, plan requires {required}")]
    BufferUnderrun { required: usize, available: usize },
}
