use crate::core::bridge::transport::Transport;
use crate::domain::config::{EndpointConfig, FlowControlConfig, ParityConfig, SerialSettings};
use crate::domain::error::{BridgeError, BridgeResult};
use async_trait::async_trait;
use serialport::{ClearBuffer, SerialPort};
use std::io::{ErrorKind, Read, Write};
use tokio::sync::Mutex;

/// Serial port endpoint.
///
/// The port lives behind a lock so the relay loop and the injection channel
/// can share the handle; `None` means the handle has been closed.
pub struct SerialHandle {
    name: String,
    port_name: String,
    port: Mutex<Option<Box<dyn SerialPort>>>,
}

impl SerialHandle {
    /// Open the endpoint's port with the shared line settings
    pub fn open(endpoint: &EndpointConfig, settings: &SerialSettings) -> BridgeResult<Self> {
        let builder = serialport::new(&endpoint.port, settings.baud_rate)
            .data_bits(data_bits(settings.data_bits)?)
            .stop_bits(stop_bits(settings.stop_bits)?)
            .parity(match settings.parity {
                ParityConfig::None => serialport::Parity::None,
                ParityConfig::Even => serialport::Parity::Even,
                ParityConfig::Odd => serialport::Parity::Odd,
            })
            .flow_control(match settings.flow_control {
                FlowControlConfig::None => serialport::FlowControl::None,
                FlowControlConfig::Software => serialport::FlowControl::Software,
                FlowControlConfig::Hardware => serialport::FlowControl::Hardware,
            })
            .timeout(settings.timeout());

        let port = builder.open().map_err(|e| {
            BridgeError::connection(
                &endpoint.name,
                format!("failed to open {}: {}", endpoint.port, e),
            )
        })?;

        if settings.clear_on_open {
            port.clear(ClearBuffer::Input).map_err(|e| {
                BridgeError::connection(
                    &endpoint.name,
                    format!("failed to clear input buffer of {}: {}", endpoint.port, e),
                )
            })?;
        }

        Ok(Self {
            name: endpoint.name.clone(),
            port_name: endpoint.port.clone(),
            port: Mutex::new(Some(port)),
        })
    }

    fn fault(&self, e: impl std::fmt::Display) -> BridgeError {
        BridgeError::connection(&self.name, format!("{}: {}", self.port_name, e))
    }
}

fn data_bits(bits: u8) -> BridgeResult<serialport::DataBits> {
    match bits {
        5 => Ok(serialport::DataBits::Five),
        6 => Ok(serialport::DataBits::Six),
        7 => Ok(serialport::DataBits::Seven),
        8 => Ok(serialport::DataBits::Eight),
        _ => Err(BridgeError::config(format!("Invalid data bits: {}", bits))),
    }
}

fn stop_bits(bits: u8) -> BridgeResult<serialport::StopBits> {
    match bits {
        1 => Ok(serialport::StopBits::One),
        2 => Ok(serialport::StopBits::Two),
        _ => Err(BridgeError::config(format!("Invalid stop bits: {}", bits))),
    }
}

#[async_trait]
impl Transport for SerialHandle {
    fn name(&self) -> &str {
        &self.name
    }

    async fn bytes_available(&self) -> BridgeResult<usize> {
        let port = self.port.lock().await;
        let port = port.as_ref().ok_or_else(|| BridgeError::closed(&self.name))?;
        let count = port.bytes_to_read().map_err(|e| self.fault(e))?;
        Ok(count as usize)
    }

    async fn read_available(&self) -> BridgeResult<Vec<u8>> {
        let mut port = self.port.lock().await;
        let port = port.as_mut().ok_or_else(|| BridgeError::closed(&self.name))?;

        let available = port.bytes_to_read().map_err(|e| self.fault(e))? as usize;
        let mut buffer = vec![0u8; available];
        let mut filled = 0;
        while filled < available {
            match port.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                // Timeout is expected, return what arrived
                Err(ref e) if e.kind() == ErrorKind::TimedOut => break,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.fault(e)),
            }
        }
        buffer.truncate(filled);
        Ok(buffer)
    }

    async fn write(&self, data: &[u8]) -> BridgeResult<()> {
        let mut port = self.port.lock().await;
        let port = port.as_mut().ok_or_else(|| BridgeError::closed(&self.name))?;
        port.write_all(data).map_err(|e| self.fault(e))?;
        port.flush().map_err(|e| self.fault(e))?;
        Ok(())
    }

    async fn close(&self) {
        // Dropping the boxed port releases the device
        self.port.lock().await.take();
    }

    async fn is_open(&self) -> bool {
        self.port.lock().await.is_some()
    }
}
