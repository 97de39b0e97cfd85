//! Configuration for the polling binding.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use regpoll_common::config::LoggingConfig;
use regpoll_common::error::ConfigError;
use regpoll_common::plan::parse_device_ids;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid device ids: {0}")]
    DeviceIds(#[from] ConfigError),
}

/// Complete binding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Connection to the shared endpoint.
    pub connection: ConnectionConfig,

    /// Comma-separated unit addresses to poll (default: "1").
    #[serde(default = "default_device_ids")]
    pub device_ids: String,

    /// Register-spec strings for future per-device layouts. Accepted but
    /// not yet consumed; the fixed power-block plan applies to every
    /// device.
    #[serde(default)]
    pub registers: Vec<String>,

    /// Poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Delay before the first poll of each device, in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_device_ids() -> String {
    "1".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_connect_timeout_ms() -> u64 {
    1000
}

/// Connection configuration (TCP or RTU).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectionConfig {
    /// Modbus TCP connection
    Tcp {
        /// Host address (IP or hostname)
        host: String,
        /// TCP port (default: 502)
        #[serde(default = "default_modbus_port")]
        port: u16,
    },
    /// Modbus RTU (serial) connection
    Rtu {
        /// Serial port path (e.g., "/dev/ttyUSB0" or "COM1")
        port: String,
        /// Baud rate (default: 9600)
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
        /// Data bits (default: 8)
        #[serde(default = "default_data_bits")]
        data_bits: u8,
        /// Parity: "none", "even", or "odd" (default: "none")
        #[serde(default = "default_parity")]
        parity: String,
        /// Stop bits: 1 or 2 (default: 1)
        #[serde(default = "default_stop_bits")]
        stop_bits: u8,
    },
}

impl ConnectionConfig {
    /// Label used in status details, e.g. `tcp://192.168.1.10:502`.
    pub fn label(&self) -> String {
        match self {
            ConnectionConfig::Tcp { host, port } => format!("tcp://{}:{}", host, port),
            ConnectionConfig::Rtu { port, .. } => port.clone(),
        }
    }
}

fn default_modbus_port() -> u16 {
    502
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_data_bits() -> u8 {
    8
}

fn default_parity() -> String {
    "none".to_string()
}

fn default_stop_bits() -> u8 {
    1
}

impl BindingConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = std::fs::read_to_string(path)?;
        let config: BindingConfig = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        parse_device_ids(&self.device_ids)?;

        if self.poll_interval_ms == 0 {
            return Err(ConfigLoadError::Validation(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }

        if let ConnectionConfig::Rtu { parity, .. } = &self.connection {
            match parity.to_lowercase().as_str() {
                "none" | "even" | "odd" => {}
                _ => {
                    return Err(ConfigLoadError::Validation(format!(
                        "invalid parity '{}' (use none, even, or odd)",
                        parity
                    )));
                }
            }
        }

        Ok(())
    }

    /// Poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Initial delay as a duration.
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Connection timeout as a duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tcp_config_defaults() {
        let json = r#"{
            connection: { type: "tcp", host: "192.168.1.10" }
        }"#;

        let config: BindingConfig = json5::from_str(json).unwrap();
        config.validate().unwrap();

        assert_eq!(config.device_ids, "1");
        assert!(config.registers.is_empty());
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.initial_delay_ms, 1000);

        if let ConnectionConfig::Tcp { host, port } = &config.connection {
            assert_eq!(host, "192.168.1.10");
            assert_eq!(*port, 502); // default
        } else {
            panic!("Expected TCP connection");
        }
    }

    #[test]
    fn test_parse_rtu_config() {
        let json = r#"{
            connection: {
                type: "rtu",
                port: "/dev/ttyUSB0",
                baud_rate: 19200,
                parity: "even"
            },
            device_ids: "1,5,9",
            poll_interval_ms: 500
        }"#;

        let config: BindingConfig = json5::from_str(json).unwrap();
        config.validate().unwrap();

        assert_eq!(config.device_ids, "1,5,9");
        assert_eq!(config.poll_interval(), Duration::from_millis(500));

        if let ConnectionConfig::Rtu {
            port,
            baud_rate,
            parity,
            data_bits,
            stop_bits,
        } = &config.connection
        {
            assert_eq!(port, "/dev/ttyUSB0");
            assert_eq!(*baud_rate, 19200);
            assert_eq!(parity, "even");
            assert_eq!(*data_bits, 8);
            assert_eq!(*stop_bits, 1);
        } else {
            panic!("Expected RTU connection");
        }
    }

    #[test]
    fn test_validate_bad_device_ids() {
        let json = r#"{
            connection: { type: "tcp", host: "10.0.0.2" },
            device_ids: "1,x"
        }"#;

        let config: BindingConfig = json5::from_str(json).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigLoadError::DeviceIds(_))
        ));
    }

    #[test]
    fn test_validate_zero_interval() {
        let json = r#"{
            connection: { type: "tcp", host: "10.0.0.2" },
            poll_interval_ms: 0
        }"#;

        let config: BindingConfig = json5::from_str(json).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigLoadError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_bad_parity() {
        let json = r#"{
            connection: { type: "rtu", port: "/dev/ttyUSB0", parity: "mark" }
        }"#;

        let config: BindingConfig = json5::from_str(json).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigLoadError::Validation(_))
        ));
    }

    #[test]
    fn test_registers_reserved_field_accepted() {
        let json = r#"{
            connection: { type: "tcp", host: "10.0.0.2" },
            registers: ["holding:23316:8"]
        }"#;

        let config: BindingConfig = json5::from_str(json).unwrap();
        config.validate().unwrap();
        assert_eq!(config.registers, vec!["holding:23316:8"]);
    }

    #[test]
    fn test_connection_label() {
        let tcp = ConnectionConfig::Tcp {
            host: "10.0.0.2".to_string(),
            port: 502,
        };
        assert_eq!(tcp.label(), "tcp://10.0.0.2:502");
    }
}
