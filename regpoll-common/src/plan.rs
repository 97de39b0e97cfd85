//! Device id parsing and per-device read plans.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Modbus unit address of a logical device on the shared bus (1-255).
pub type DeviceId = u8;

/// Start address of the power-meter register block.
pub const POWER_BLOCK_START: u16 = 23316;

/// Number of 16-bit registers in the power-meter block.
pub const POWER_BLOCK_COUNT: u16 = 8;

/// Transport-level retry budget carried on each read request. The polling
/// core itself never retries; this is a hint for the transport.
pub const DEFAULT_MAX_TRIES: u8 = 3;

/// Modbus read function used by a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadFunction {
    /// Function code 3, "read multiple registers".
    ReadHoldingRegisters,
    /// Function code 4.
    ReadInputRegisters,
}

impl ReadFunction {
    /// The Modbus function code on the wire.
    pub fn code(&self) -> u8 {
        match self {
            ReadFunction::ReadHoldingRegisters => 3,
            ReadFunction::ReadInputRegisters => 4,
        }
    }
}

/// One recurring read request against a single device.
///
/// Immutable once built; reinitialization builds fresh plans rather than
/// mutating registered ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterReadPlan {
    /// Unit address the request is sent to.
    pub device_id: DeviceId,
    /// First register address of the block.
    pub start: u16,
    /// Number of registers to read.
    pub count: u16,
    /// Read function to use.
    pub function: ReadFunction,
    /// Transport retry hint.
    pub max_tries: u8,
}

impl RegisterReadPlan {
    /// The fixed power-meter block read for one device.
    pub fn power_block(device_id: DeviceId) -> Self {
        Self {
            device_id,
            start: POWER_BLOCK_START,
            count: POWER_BLOCK_COUNT,
            function: ReadFunction::ReadHoldingRegisters,
            max_tries: DEFAULT_MAX_TRIES,
        }
    }
}

/// Parse a comma-separated device id list.
///
/// Tokens are trimmed and parsed as positive integers; declared order is
/// preserved because channel creation depends on it. Duplicates are not
/// rejected: they behave as independent devices sharing the same plan.
pub fn parse_device_ids(csv: &str) -> Result<Vec<DeviceId>, ConfigError> {
    if csv.trim().is_empty() {
        return Err(ConfigError::EmptyDeviceIds);
    }

    csv.split(',')
        .map(|token| {
            let token = token.trim();
            match token.parse::<DeviceId>() {
                Ok(id) if id > 0 => Ok(id),
                _ => Err(ConfigError::InvalidDeviceId {
                    token: token.to_string(),
                }),
            }
        })
        .collect()
}

/// Expand a device id list into one power-block read plan per device, in
/// declared order.
pub fn build_plans(device_ids_csv: &str) -> Result<Vec<RegisterReadPlan>, ConfigError> {
    let ids = parse_device_ids(device_ids_csv)?;
    Ok(ids.into_iter().map(RegisterReadPlan::power_block).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_order() {
        assert_eq!(parse_device_ids("1,2,3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_device_ids("3, 1 ,2").unwrap(), vec![3, 1, 2]);
    }

    #[test]
    fn test_parse_single_default() {
        assert_eq!(parse_device_ids("1").unwrap(), vec![1]);
    }

    #[test]
    fn test_parse_duplicates_allowed() {
        assert_eq!(parse_device_ids("4,4").unwrap(), vec![4, 4]);
    }

    #[test]
    fn test_parse_empty_list() {
        assert_eq!(parse_device_ids(""), Err(ConfigError::EmptyDeviceIds));
        assert_eq!(parse_device_ids("   "), Err(ConfigError::EmptyDeviceIds));
    }

    #[test]
    fn test_parse_invalid_token() {
        assert_eq!(
            parse_device_ids("1,x"),
            Err(ConfigError::InvalidDeviceId {
                token: "x".to_string()
            })
        );
        assert_eq!(
            parse_device_ids("1,,2"),
            Err(ConfigError::InvalidDeviceId {
                token: "".to_string()
            })
        );
        // Zero is not a valid unit address.
        assert_eq!(
            parse_device_ids("0"),
            Err(ConfigError::InvalidDeviceId {
                token: "0".to_string()
            })
        );
        // Out of unit address range.
        assert_eq!(
            parse_device_ids("300"),
            Err(ConfigError::InvalidDeviceId {
                token: "300".to_string()
            })
        );
    }

    #[test]
    fn test_build_plans() {
        let plans = build_plans("1,2,3").unwrap();

        assert_eq!(plans.len(), 3);
        assert_eq!(
            plans.iter().map(|p| p.device_id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        for plan in &plans {
            assert_eq!(plan.start, POWER_BLOCK_START);
            assert_eq!(plan.count, POWER_BLOCK_COUNT);
            assert_eq!(plan.function, ReadFunction::ReadHoldingRegisters);
            assert_eq!(plan.max_tries, DEFAULT_MAX_TRIES);
        }
    }

    #[test]
    fn test_build_plans_duplicates_independent() {
        let plans = build_plans("7,7").unwrap();

        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0], plans[1]);
    }

    #[test]
    fn test_function_codes() {
        assert_eq!(ReadFunction::ReadHoldingRegisters.code(), 3);
        assert_eq!(ReadFunction::ReadInputRegisters.code(), 4);
    }
}
