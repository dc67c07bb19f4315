use crate::cli::args::OutputFormat;
use crate::core::bridge::SessionReport;
use crate::domain::config::BridgeConfig;
use serde::Serialize;
use std::io;
use tabled::{Table, Tabled};

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_config(&self, config: &BridgeConfig) -> Result<(), OutputError>;
    fn write_ports(&self, ports: &[PortEntry]) -> Result<(), OutputError>;
    fn write_session_report(&self, report: &SessionReport) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("TOML serialization error: {0}")]
    TomlError(#[from] toml::ser::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OutputError> for crate::domain::error::BridgeError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// A serial port found on the host
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct PortEntry {
    #[tabled(rename = "Port")]
    pub name: String,
    #[tabled(rename = "Type")]
    pub kind: String,
}

impl From<serialport::SerialPortInfo> for PortEntry {
    fn from(info: serialport::SerialPortInfo) -> Self {
        let kind = match info.port_type {
            serialport::SerialPortType::UsbPort(usb) => match usb.product {
                Some(product) => format!("USB ({})", product),
                None => format!("USB {:04x}:{:04x}", usb.vid, usb.pid),
            },
            serialport::SerialPortType::PciPort => "PCI".to_string(),
            serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
            serialport::SerialPortType::Unknown => "Unknown".to_string(),
        };

        Self {
            name: info.port_name,
            kind,
        }
    }
}

/// Serializable view of a finished session
#[derive(Debug, Serialize, Tabled)]
struct SessionRow {
    #[tabled(rename = "Session")]
    session_id: String,
    #[tabled(rename = "Chunks")]
    chunks: u64,
    #[tabled(rename = "First → Second")]
    first_to_second_bytes: u64,
    #[tabled(rename = "Second → First")]
    second_to_first_bytes: u64,
    #[tabled(rename = "Records")]
    records_written: u64,
}

impl From<&SessionReport> for SessionRow {
    fn from(report: &SessionReport) -> Self {
        Self {
            session_id: report.session_id.to_string(),
            chunks: report.stats.chunks,
            first_to_second_bytes: report.stats.first_to_second_bytes,
            second_to_first_bytes: report.stats.second_to_first_bytes,
            records_written: report.records_written,
        }
    }
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl OutputWriter for ConsoleWriter {
    fn write_config(&self, config: &BridgeConfig) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text | OutputFormat::Table => {
                print!("{}", toml::to_string_pretty(config)?);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(config)?);
            }
        }
        Ok(())
    }

    fn write_ports(&self, ports: &[PortEntry]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                if ports.is_empty() {
                    println!("No serial ports found");
                } else {
                    println!("Available serial ports:");
                    for port in ports {
                        println!("  {} ({})", port.name, port.kind);
                    }
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(ports)?);
            }
            OutputFormat::Table => {
                println!("{}", Table::new(ports));
            }
        }
        Ok(())
    }

    fn write_session_report(&self, report: &SessionReport) -> Result<(), OutputError> {
        let row = SessionRow::from(report);
        match self.format {
            OutputFormat::Text => {
                println!("Session {}", row.session_id);
                println!("  Chunks relayed: {}", row.chunks);
                println!("  First → second: {} bytes", row.first_to_second_bytes);
                println!("  Second → first: {} bytes", row.second_to_first_bytes);
                println!("  Log records: {}", row.records_written);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&row)?);
            }
            OutputFormat::Table => {
                println!("{}", Table::new([row]));
            }
        }
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::json!({ "message": message }));
            }
            _ => println!("{}", message),
        }
        Ok(())
    }
}
