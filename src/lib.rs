//! Combridge Library
//!
//! Transparent bridge between two serial endpoints. Every byte is relayed
//! in both directions and recorded in an append-only transfer log, while an
//! operator can inject raw bytes toward either side at any time.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::bridge::{
    BridgeSupervisor, Direction, InjectionChannel, MemoryTransport, RelayLoop, TransferChunk,
    Transport,
};
pub use domain::config::BridgeConfig;
pub use domain::error::{BridgeError, BridgeResult};
pub use infrastructure::logging::TransferLog;
