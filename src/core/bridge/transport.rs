use crate::domain::error::BridgeResult;
use async_trait::async_trait;

/// One byte-stream endpoint of the bridge.
///
/// Implementations serialize access internally, so a handle can be shared
/// between the relay loop (which reads and writes) and the injection
/// channel (which only writes). None of these calls log; that is left to
/// the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Logical endpoint name (e.g. "pc", "stm32")
    fn name(&self) -> &str;

    /// Number of bytes ready to read. Never waits for data.
    async fn bytes_available(&self) -> BridgeResult<usize>;

    /// Read what is currently buffered, possibly nothing.
    ///
    /// Blocks at most for the configured short read timeout and never waits
    /// for bytes beyond those already available.
    async fn read_available(&self) -> BridgeResult<Vec<u8>>;

    /// Write every byte of `data`, retrying short writes until done or a hard error.
    async fn write(&self, data: &[u8]) -> BridgeResult<()>;

    /// Release the device. Calling it again is a no-op.
    async fn close(&self);

    async fn is_open(&self) -> bool;
}
