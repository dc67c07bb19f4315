use crate::core::bridge::transport::Transport;
use crate::domain::error::{BridgeError, BridgeResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// In-memory endpoint for exercising the bridge without hardware.
///
/// Bytes passed to [`MemoryTransport::feed`] become readable by the relay;
/// everything written to the endpoint is captured and can be inspected.
/// Read and write failures can be scripted to simulate a faulty device.
pub struct MemoryTransport {
    name: String,
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    open: bool,
    inbound: VecDeque<u8>,
    writes: Vec<Vec<u8>>,
    read_fault: Option<String>,
    write_fault: Option<String>,
}

impl MemoryTransport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(MemoryState {
                open: true,
                ..MemoryState::default()
            }),
        }
    }

    /// Queue bytes as if they had arrived on the wire.
    pub async fn feed(&self, data: &[u8]) {
        self.state.lock().await.inbound.extend(data.iter().copied());
    }

    /// Everything written so far, concatenated.
    pub async fn written(&self) -> Vec<u8> {
        self.state.lock().await.writes.concat()
    }

    /// Individual write calls, in order.
    pub async fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().await.writes.clone()
    }

    pub async fn fail_reads(&self, message: impl Into<String>) {
        self.state.lock().await.read_fault = Some(message.into());
    }

    pub async fn fail_writes(&self, message: impl Into<String>) {
        self.state.lock().await.write_fault = Some(message.into());
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn bytes_available(&self) -> BridgeResult<usize> {
        let state = self.state.lock().await;
        if !state.open {
            return Err(BridgeError::closed(&self.name));
        }
        if let Some(fault) = &state.read_fault {
            return Err(BridgeError::connection(&self.name, fault));
        }
        Ok(state.inbound.len())
    }

    async fn read_available(&self) -> BridgeResult<Vec<u8>> {
        let mut state = self.state.lock().await;
        if !state.open {
            return Err(BridgeError::closed(&self.name));
        }
        if let Some(fault) = &state.read_fault {
            return Err(BridgeError::connection(&self.name, fault));
        }
        Ok(state.inbound.drain(..).collect())
    }

    async fn write(&self, data: &[u8]) -> BridgeResult<()> {
        let mut state = self.state.lock().await;
        if !state.open {
            return Err(BridgeError::closed(&self.name));
        }
        if let Some(fault) = &state.write_fault {
            return Err(BridgeError::connection(&self.name, fault));
        }
        state.writes.push(data.to_vec());
        Ok(())
    }

    async fn close(&self) {
        let mut state = self.state.lock().await;
        state.open = false;
        state.inbound.clear();
    }

    async fn is_open(&self) -> bool {
        self.state.lock().await.open
    }
}
