//! Configuration for the DATC gripper bridge.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use datc_bridge_framework::{BridgeConfig, BridgeError, Format, LoggingConfig, ZenohConfig};
use datc_common::{BaseConfig, KEY_PREFIX, validate_segment};

use crate::command::{CommandLimits, SLAVE_ADDRESS_RANGE};

/// Complete bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatcBridgeConfig {
    /// `zenoh`, `serialization` and `logging` sections
    #[serde(flatten)]
    pub base: BaseConfig,

    pub gripper: GripperConfig,
}

impl BridgeConfig for DatcBridgeConfig {
    fn zenoh(&self) -> &ZenohConfig {
        &self.base.zenoh
    }

    fn logging(&self) -> &LoggingConfig {
        &self.base.logging
    }

    fn key_prefix(&self) -> &str {
        &self.gripper.key_prefix
    }

    fn serialization(&self) -> Format {
        self.base.serialization
    }

    fn validate(&self) -> datc_bridge_framework::Result<()> {
        self.gripper.validate().map_err(BridgeError::validation)
    }
}

/// Gripper link and behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GripperConfig {
    /// Key expression prefix (default: "datc/gripper")
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Device name used in key expressions
    #[serde(default = "default_name")]
    pub name: String,

    pub serial: SerialConfig,

    /// Modbus slave address of the gripper (1-247)
    #[serde(default = "default_slave_address")]
    pub slave_address: u8,

    /// Status polling rate
    #[serde(default = "default_poll_rate_hz")]
    pub poll_rate_hz: u32,

    /// Timeout of a single register transaction
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Delay between connection attempts while the link is down
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    #[serde(default)]
    pub registers: RegisterMap,

    #[serde(default)]
    pub limits: CommandLimits,
}

fn default_key_prefix() -> String {
    KEY_PREFIX.to_string()
}

fn default_name() -> String {
    "gripper".to_string()
}

fn default_slave_address() -> u8 {
    1
}

fn default_poll_rate_hz() -> u32 {
    100
}

fn default_timeout_ms() -> u64 {
    100
}

fn default_reconnect_interval_ms() -> u64 {
    1000
}

impl GripperConfig {
    pub fn poll_period(&self) -> Duration {
        Duration::from_secs(1) / self.poll_rate_hz.max(1)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.key_prefix.trim_matches('/').is_empty() {
            return Err("gripper.key_prefix must not be empty".to_string());
        }

        validate_segment(&self.name).map_err(|e| format!("gripper.name: {}", e))?;

        if !SLAVE_ADDRESS_RANGE.contains(&u16::from(self.slave_address)) {
            return Err(format!(
                "gripper.slave_address {} outside {:?}",
                self.slave_address, SLAVE_ADDRESS_RANGE
            ));
        }

        if !(1..=1000).contains(&self.poll_rate_hz) {
            return Err(format!(
                "gripper.poll_rate_hz must be between 1 and 1000, got {}",
                self.poll_rate_hz
            ));
        }

        if self.timeout_ms == 0 {
            return Err("gripper.timeout_ms must be positive".to_string());
        }

        self.serial.validate()?;
        self.limits.validate()
    }
}

/// Serial line settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0" or "COM1")
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_data_bits")]
    pub data_bits: u8,

    #[serde(default)]
    pub parity: Parity,

    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
}

fn default_baud_rate() -> u32 {
    38400
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

impl SerialConfig {
    fn validate(&self) -> Result<(), String> {
        if self.port.is_empty() {
            return Err("gripper.serial.port must not be empty".to_string());
        }
        if self.baud_rate == 0 {
            return Err("gripper.serial.baud_rate must be positive".to_string());
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(format!(
                "gripper.serial.data_bits must be 5-8, got {}",
                self.data_bits
            ));
        }
        if !matches!(self.stop_bits, 1 | 2) {
            return Err(format!(
                "gripper.serial.stop_bits must be 1 or 2, got {}",
                self.stop_bits
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

/// Which Modbus table the status block is read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterKind {
    #[default]
    Holding,
    Input,
}

/// Register addresses of the command and status blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterMap {
    #[serde(default)]
    pub command_base: u16,

    #[serde(default = "default_status_base")]
    pub status_base: u16,

    #[serde(default)]
    pub status_kind: RegisterKind,
}

fn default_status_base() -> u16 {
    10
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self {
            command_base: 0,
            status_base: default_status_base(),
            status_kind: RegisterKind::default(),
        }
    }
}
