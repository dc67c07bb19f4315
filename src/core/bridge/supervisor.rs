use crate::core::bridge::injection::InjectionChannel;
use crate::core::bridge::relay::{RelayLoop, RelayStats};
use crate::core::bridge::transport::Transport;
use crate::domain::config::BridgeConfig;
use crate::domain::error::{BridgeError, BridgeResult};
use crate::infrastructure::logging::TransferLog;
use crate::infrastructure::serial::SerialHandle;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufRead;
use tokio::sync::broadcast;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

/// Summary of a session that ended on an operator interrupt
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub stats: RelayStats,
    pub records_written: u64,
}

/// Owns one bridge session: both endpoints, the transfer log and the two
/// concurrent tasks that use them.
pub struct BridgeSupervisor {
    session_id: Uuid,
    first: Arc<dyn Transport>,
    second: Arc<dyn Transport>,
    log: Arc<TransferLog>,
    poll_interval: Duration,
}

impl BridgeSupervisor {
    /// Validate the configuration and open both serial ports and the log.
    ///
    /// Everything is open before any task starts; a failure part-way drops
    /// (and thereby closes) whatever was already opened.
    pub fn open(config: &BridgeConfig) -> BridgeResult<Self> {
        config.validate()?;

        let first = SerialHandle::open(&config.first, &config.serial)?;
        info!(endpoint = %config.first.name, port = %config.first.port, "endpoint opened");
        let second = SerialHandle::open(&config.second, &config.serial)?;
        info!(endpoint = %config.second.name, port = %config.second.port, "endpoint opened");

        let log = TransferLog::open(&config.global.log_file, config.global.echo)?;

        Ok(Self::from_parts(
            Arc::new(first),
            Arc::new(second),
            log,
            config.poll_interval(),
        ))
    }

    /// Assemble a supervisor from already-open parts.
    pub fn from_parts(
        first: Arc<dyn Transport>,
        second: Arc<dyn Transport>,
        log: TransferLog,
        poll_interval: Duration,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            first,
            second,
            log: Arc::new(log),
            poll_interval,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn endpoint_names(&self) -> (&str, &str) {
        (self.first.name(), self.second.name())
    }

    /// Run the session until `shutdown_signal` completes or the relay fails.
    ///
    /// Either way both endpoints and the log are closed before returning. An
    /// interrupt yields `Ok`; a relay failure is returned as the error after
    /// cleanup.
    pub async fn run<R, S>(self, operator_input: R, shutdown_signal: S) -> BridgeResult<SessionReport>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        S: Future<Output = ()>,
    {
        let span = tracing::info_span!("bridge", session = %self.session_id);
        self.supervise(operator_input, shutdown_signal)
            .instrument(span)
            .await
    }

    async fn supervise<R, S>(self, operator_input: R, shutdown_signal: S) -> BridgeResult<SessionReport>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        S: Future<Output = ()>,
    {
        info!(
            first = self.first.name(),
            second = self.second.name(),
            "bridge session started"
        );

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let injection = InjectionChannel::new(
            self.first.clone(),
            self.second.clone(),
            self.log.clone(),
            shutdown_tx.subscribe(),
        );
        let injection_task = tokio::spawn(
            async move {
                if let Err(e) = injection.run(operator_input).await {
                    warn!(error = %e, "injection channel stopped");
                }
            }
            .in_current_span(),
        );

        let relay = RelayLoop::new(
            self.first.clone(),
            self.second.clone(),
            self.log.clone(),
            self.poll_interval,
            shutdown_rx,
        );
        let mut relay_task = tokio::spawn(relay.run().in_current_span());

        tokio::pin!(shutdown_signal);
        let joined = tokio::select! {
            _ = &mut shutdown_signal => {
                info!("shutdown signal received");
                // The relay may already have exited; a send error is fine
                let _ = shutdown_tx.send(());
                (&mut relay_task).await
            }
            joined = &mut relay_task => joined,
        };

        let outcome = match joined {
            Ok(result) => result,
            Err(e) => Err(BridgeError::Task(format!("relay loop: {}", e))),
        };
        // Tell the injection channel before its endpoints go away
        let _ = shutdown_tx.send(());

        self.shutdown(injection_task).await;

        match outcome {
            Ok(stats) => Ok(SessionReport {
                session_id: self.session_id,
                stats,
                records_written: self.log.records_written(),
            }),
            Err(e) => {
                error!(error = %e, "bridge session failed");
                Err(e)
            }
        }
    }

    /// Close both endpoints and the log, and stop the injection task.
    async fn shutdown(&self, injection_task: tokio::task::JoinHandle<()>) {
        self.first.close().await;
        self.second.close().await;
        injection_task.abort();

        if let Err(e) = self.log.close().await {
            warn!(error = %e, "failed to flush transfer log");
        }
        info!("bridge session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bridge::memory::MemoryTransport;
    use crate::domain::config::EndpointConfig;
    use tokio::sync::oneshot;

    fn parts() -> (Arc<MemoryTransport>, Arc<MemoryTransport>, BridgeSupervisor) {
        let pc = Arc::new(MemoryTransport::new("pc"));
        let stm32 = Arc::new(MemoryTransport::new("stm32"));
        let supervisor = BridgeSupervisor::from_parts(
            pc.clone(),
            stm32.clone(),
            TransferLog::from_writer(std::io::sink(), false),
            Duration::from_millis(1),
        );
        (pc, stm32, supervisor)
    }

    fn no_input() -> tokio::io::BufReader<tokio::io::Empty> {
        tokio::io::BufReader::new(tokio::io::empty())
    }

    #[tokio::test]
    async fn test_interrupt_closes_everything() {
        let (pc, stm32, supervisor) = parts();
        assert_eq!(supervisor.endpoint_names(), ("pc", "stm32"));
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let session = tokio::spawn(supervisor.run(no_input(), async move {
            let _ = stop_rx.await;
        }));

        pc.feed(b"ping").await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop_tx.send(()).unwrap();

        let report = session.await.unwrap().unwrap();
        assert_eq!(report.stats.first_to_second_bytes, 4);
        assert_eq!(report.records_written, 1);
        assert_eq!(stm32.written().await, b"ping".to_vec());
        assert!(!pc.is_open().await);
        assert!(!stm32.is_open().await);
    }

    #[tokio::test]
    async fn test_relay_failure_shuts_down_session() {
        let (pc, stm32, supervisor) = parts();
        stm32.fail_writes("hardware fault").await;
        pc.feed(&[0x01]).await;

        let err = supervisor
            .run(no_input(), std::future::pending::<()>())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("hardware fault"));
        assert!(!pc.is_open().await);
        assert!(!stm32.is_open().await);
    }

    #[test]
    fn test_open_rejects_invalid_config_before_touching_ports() {
        let mut config = BridgeConfig::default();
        config.second = EndpointConfig {
            name: "pc".to_string(),
            port: "/dev/null".to_string(),
        };
        let err = BridgeSupervisor::open(&config).err().unwrap();
        assert!(matches!(err, BridgeError::Config { .. }));
    }

    #[test]
    fn test_open_fails_when_port_missing() {
        let mut config = BridgeConfig::default();
        config.first.port = "/dev/combridge-missing-a".to_string();
        config.second.port = "/dev/combridge-missing-b".to_string();
        let err = BridgeSupervisor::open(&config).err().unwrap();
        assert!(matches!(err, BridgeError::Connection { ref endpoint, .. } if endpoint == "pc"));
    }
}
