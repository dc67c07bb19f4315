// Bridge module - Relay, operator injection and session supervision
pub mod chunk;
pub mod injection;
pub mod memory;
pub mod relay;
pub mod supervisor;
pub mod transport;

pub use chunk::{Direction, TransferChunk};
pub use injection::{InjectionChannel, InjectionOutcome, SendCommand};
pub use memory::MemoryTransport;
pub use relay::{RelayLoop, RelayStats};
pub use supervisor::{BridgeSupervisor, SessionReport};
pub use transport::Transport;
