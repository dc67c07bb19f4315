use crate::core::bridge::chunk::TransferChunk;
use crate::domain::error::{BridgeError, BridgeResult};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

const SINK_NAME: &str = "transfer log";

/// Append-only sink for transfer records.
///
/// Each [`TransferLog::append`] writes one line and flushes it while holding
/// the sink lock, so records from concurrent writers never interleave
/// mid-line and an external `tail -f` sees them immediately.
pub struct TransferLog {
    sink: Mutex<Option<Box<dyn Write + Send>>>,
    echo: bool,
    records: AtomicU64,
}

impl TransferLog {
    /// Open (or create) a log file in append mode
    pub fn open(path: &Path, echo: bool) -> BridgeResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| BridgeError::Config {
                message: format!("Failed to open transfer log {}: {}", path.display(), e),
            })?;

        Ok(Self::from_writer(file, echo))
    }

    pub fn from_writer(writer: impl Write + Send + 'static, echo: bool) -> Self {
        Self {
            sink: Mutex::new(Some(Box::new(writer))),
            echo,
            records: AtomicU64::new(0),
        }
    }

    /// Render, write and flush one record. The chunk is consumed.
    pub async fn append(&self, chunk: TransferChunk) -> BridgeResult<()> {
        let record = chunk.render();

        let mut sink = self.sink.lock().await;
        let writer = sink.as_mut().ok_or_else(|| BridgeError::closed(SINK_NAME))?;
        writeln!(writer, "{}", record)?;
        writer.flush()?;

        if self.echo {
            println!("{}", record);
        }

        self.records.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Flush and release the sink. Later appends fail with `Closed`.
    pub async fn close(&self) -> BridgeResult<()> {
        if let Some(mut writer) = self.sink.lock().await.take() {
            writer.flush()?;
        }
        Ok(())
    }

    pub async fn is_open(&self) -> bool {
        self.sink.lock().await.is_some()
    }

    pub fn records_written(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }
}
