use crate::domain::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound on the idle poll interval; relay latency must stay within tens of milliseconds.
pub const MAX_POLL_INTERVAL_MS: u64 = 50;

/// Tag used for operator-injected records; endpoints may not share it.
pub const OPERATOR_TAG: &str = "operator";

/// Combridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// Serial line settings shared by both endpoints
    #[serde(default)]
    pub serial: SerialSettings,
    /// First endpoint (historically the PC side)
    #[serde(default = "default_first_endpoint")]
    pub first: EndpointConfig,
    /// Second endpoint (historically the device side)
    #[serde(default = "default_second_endpoint")]
    pub second: EndpointConfig,
}

/// Global configuration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Transfer log file, opened in append mode
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    /// Idle sleep between relay polls in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Print every transfer record to the console as well
    #[serde(default = "default_echo")]
    pub echo: bool,
}

/// Serial settings applied to both endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialSettings {
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default)]
    pub parity: ParityConfig,
    #[serde(default)]
    pub flow_control: FlowControlConfig,
    /// Read timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    /// Discard input buffered before the bridge opened the port
    #[serde(default = "default_clear_on_open")]
    pub clear_on_open: bool,
}

/// One side of the bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Logical name used in log records and operator commands
    pub name: String,
    /// Serial port path (e.g. `COM1`, `/dev/ttyUSB0`)
    pub port: String,
}

/// Parity configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParityConfig {
    None,
    Odd,
    Even,
}

/// Flow control configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControlConfig {
    None,
    Hardware,
    Software,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("log.txt")
}

fn default_poll_interval() -> u64 {
    5
}

fn default_echo() -> bool {
    true
}

fn default_baud_rate() -> u32 {
    921_600
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_timeout() -> u64 {
    100
}

fn default_clear_on_open() -> bool {
    true
}

fn default_first_endpoint() -> EndpointConfig {
    EndpointConfig {
        name: "pc".to_string(),
        port: "COM1".to_string(),
    }
}

fn default_second_endpoint() -> EndpointConfig {
    EndpointConfig {
        name: "stm32".to_string(),
        port: "COM4".to_string(),
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            global: GlobalConfig::default(),
            serial: SerialSettings::default(),
            first: default_first_endpoint(),
            second: default_second_endpoint(),
        }
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: default_log_file(),
            poll_interval_ms: default_poll_interval(),
            echo: default_echo(),
        }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: ParityConfig::default(),
            flow_control: FlowControlConfig::default(),
            timeout_ms: default_timeout(),
            clear_on_open: default_clear_on_open(),
        }
    }
}

impl Default for ParityConfig {
    fn default() -> Self {
        ParityConfig::None
    }
}

impl Default for FlowControlConfig {
    fn default() -> Self {
        FlowControlConfig::None
    }
}

impl BridgeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.global.poll_interval_ms)
    }

    /// Check everything that can be checked before a device is touched.
    pub fn validate(&self) -> BridgeResult<()> {
        for endpoint in [&self.first, &self.second] {
            endpoint.validate()?;
        }

        if self.first.name.eq_ignore_ascii_case(&self.second.name) {
            return Err(BridgeError::config(format!(
                "endpoint names must differ, both are '{}'",
                self.first.name
            )));
        }

        if self.global.poll_interval_ms == 0 || self.global.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(BridgeError::config(format!(
                "poll_interval_ms must be between 1 and {}, got {}",
                MAX_POLL_INTERVAL_MS, self.global.poll_interval_ms
            )));
        }

        if self.global.log_file.as_os_str().is_empty() {
            return Err(BridgeError::config("log_file must not be empty"));
        }

        self.serial.validate()
    }
}

impl EndpointConfig {
    fn validate(&self) -> BridgeResult<()> {
        if self.name.is_empty() || self.name.chars().any(char::is_whitespace) {
            return Err(BridgeError::config(format!(
                "endpoint name '{}' must be a single non-empty word",
                self.name
            )));
        }
        if self.name.eq_ignore_ascii_case(OPERATOR_TAG) {
            return Err(BridgeError::config(format!(
                "endpoint name '{}' is reserved",
                self.name
            )));
        }
        if self.port.trim().is_empty() {
            return Err(BridgeError::config(format!(
                "endpoint '{}' has no port",
                self.name
            )));
        }
        Ok(())
    }
}

impl SerialSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self) -> BridgeResult<()> {
        if self.baud_rate == 0 {
            return Err(BridgeError::config("baud_rate must be greater than zero"));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(BridgeError::config(format!(
                "Invalid data bits: {}",
                self.data_bits
            )));
        }
        if !(1..=2).contains(&self.stop_bits) {
            return Err(BridgeError::config(format!(
                "Invalid stop bits: {}",
                self.stop_bits
            )));
        }
        if self.timeout_ms == 0 {
            return Err(BridgeError::config("timeout_ms must be greater than zero"));
        }
        Ok(())
    }
}
