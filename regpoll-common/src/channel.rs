use crate::plan::DeviceId;

/// Channel group every measurement channel of this binding lives under.
pub const CHANNEL_GROUP: &str = "measurements";

/// Build the active-power channel key for a device.
///
/// # Example
/// ```
/// use regpoll_common::channel::active_power_channel;
///
/// assert_eq!(active_power_channel(7), "measurements/ActivePower-7");
/// ```
pub fn active_power_channel(device_id: DeviceId) -> String {
    format!("{}/ActivePower-{}", CHANNEL_GROUP, device_id)
}

/// Build the full channel-key set for a device.
///
/// Deterministic: the same device id always yields the same keys in the
/// same order. Currently one channel per device; the two reserved words in
/// the register block will add entries here once they are mapped.
pub fn channel_keys(device_id: DeviceId) -> Vec<String> {
    vec![active_power_channel(device_id)]
}
