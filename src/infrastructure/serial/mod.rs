// Serial module - Serial port endpoints
pub mod handle;

pub use handle::SerialHandle;
