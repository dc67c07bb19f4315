use crate::core::bridge::chunk::TransferChunk;
use crate::core::bridge::transport::Transport;
use crate::domain::error::BridgeResult;
use crate::infrastructure::logging::TransferLog;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, error, info};

/// Byte and chunk counters for one relay run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub first_to_second_bytes: u64,
    pub second_to_first_bytes: u64,
    pub chunks: u64,
}

/// Forwards bytes between the two endpoints until shutdown or a fatal error.
pub struct RelayLoop {
    first: Arc<dyn Transport>,
    second: Arc<dyn Transport>,
    log: Arc<TransferLog>,
    poll_interval: Duration,
    shutdown: broadcast::Receiver<()>,
    stats: RelayStats,
}

impl RelayLoop {
    pub fn new(
        first: Arc<dyn Transport>,
        second: Arc<dyn Transport>,
        log: Arc<TransferLog>,
        poll_interval: Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            first,
            second,
            log,
            poll_interval,
            shutdown,
            stats: RelayStats::default(),
        }
    }

    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    /// Run until a shutdown signal arrives (`Ok`) or an endpoint fails (`Err`).
    ///
    /// A failure is never retried: bytes already forwarded stay forwarded.
    pub async fn run(mut self) -> BridgeResult<RelayStats> {
        info!(
            first = self.first.name(),
            second = self.second.name(),
            "relay loop started"
        );

        loop {
            match self.shutdown.try_recv() {
                Err(TryRecvError::Empty) => {}
                _ => break,
            }

            let moved = match self.step().await {
                Ok(moved) => moved,
                Err(e) => {
                    error!(error = %e, "relay loop stopped");
                    return Err(e);
                }
            };

            if !moved {
                tokio::select! {
                    _ = tokio::time::sleep(self.poll_interval) => {}
                    _ = self.shutdown.recv() => break,
                }
            }
        }

        info!(
            chunks = self.stats.chunks,
            first_to_second = self.stats.first_to_second_bytes,
            second_to_first = self.stats.second_to_first_bytes,
            "relay loop stopped on shutdown"
        );
        Ok(self.stats)
    }

    /// One polling pass over both directions. Returns whether anything moved.
    pub async fn step(&mut self) -> BridgeResult<bool> {
        let forward = pump(&*self.first, &*self.second, &self.log).await?;
        self.stats.first_to_second_bytes += forward as u64;

        let backward = pump(&*self.second, &*self.first, &self.log).await?;
        self.stats.second_to_first_bytes += backward as u64;

        self.stats.chunks += u64::from(forward > 0) + u64::from(backward > 0);
        Ok(forward > 0 || backward > 0)
    }
}

/// Move whatever `source` has buffered to `destination` and record it.
async fn pump(
    source: &dyn Transport,
    destination: &dyn Transport,
    log: &TransferLog,
) -> BridgeResult<usize> {
    if source.bytes_available().await? == 0 {
        return Ok(0);
    }

    let data = source.read_available().await?;
    if data.is_empty() {
        return Ok(0);
    }

    destination.write(&data).await?;
    let count = data.len();
    debug!(
        from = source.name(),
        to = destination.name(),
        bytes = count,
        "forwarded chunk"
    );

    log.append(TransferChunk::relayed(source.name(), destination.name(), data))
        .await?;
    Ok(count)
}
