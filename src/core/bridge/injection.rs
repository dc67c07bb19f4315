use crate::core::bridge::chunk::TransferChunk;
use crate::core::bridge::transport::Transport;
use crate::domain::error::{BridgeError, BridgeResult};
use crate::infrastructure::logging::TransferLog;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, info, warn};

const VERB: &str = "send";

/// A parsed `send <target> <hex>` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendCommand {
    pub target: String,
    pub payload: Vec<u8>,
}

/// Parse one operator line.
///
/// Lines that do not start with the `send` verb are not commands and yield
/// `Ok(None)`. A `send` line with the wrong shape or a bad payload is
/// `InvalidInput`.
pub fn parse_command(line: &str) -> BridgeResult<Option<SendCommand>> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.first() {
        Some(verb) if verb.eq_ignore_ascii_case(VERB) => {}
        _ => return Ok(None),
    }

    let [_, target, payload] = tokens.as_slice() else {
        return Err(BridgeError::InvalidInput(
            "expected exactly: send <target> <hex_bytes>".to_string(),
        ));
    };

    Ok(Some(SendCommand {
        target: (*target).to_string(),
        payload: decode_hex(payload)?,
    }))
}

/// Decode an even-length hex string without separators.
pub fn decode_hex(text: &str) -> BridgeResult<Vec<u8>> {
    hex::decode(text)
        .map_err(|e| BridgeError::InvalidInput(format!("bad hex payload '{}': {}", text, e)))
}

/// What happened to one operator line
#[derive(Debug)]
pub enum InjectionOutcome {
    /// Not a command; nothing happens
    Ignored,
    /// Bytes were written to the target endpoint
    Injected { target: String, hex: String },
    /// The line was malformed or named an unknown target
    Rejected(BridgeError),
    /// The target refused the write or is closed; the operator may retry
    WriteFailed(BridgeError),
    /// The target is closed and the bridge has been told to stop
    ShuttingDown,
}

impl InjectionOutcome {
    /// Operator-facing feedback, if any
    pub fn message(&self) -> Option<String> {
        match self {
            InjectionOutcome::Ignored => None,
            InjectionOutcome::Injected { target, hex } => {
                Some(format!("[You → {}]  HEX: {}", target.to_uppercase(), hex))
            }
            InjectionOutcome::Rejected(e) => Some(e.to_string()),
            InjectionOutcome::WriteFailed(e) => Some(format!("Error sending bytes: {}", e)),
            InjectionOutcome::ShuttingDown => Some("Bridge is shutting down".to_string()),
        }
    }
}

/// Operator-driven writes to either endpoint, running beside the relay loop.
///
/// A write to a closed endpoint only ends the channel once the bridge-wide
/// shutdown has been signalled; before that it is an ordinary write failure.
pub struct InjectionChannel {
    endpoints: [Arc<dyn Transport>; 2],
    log: Arc<TransferLog>,
    shutdown: broadcast::Receiver<()>,
    stopping: bool,
}

impl InjectionChannel {
    pub fn new(
        first: Arc<dyn Transport>,
        second: Arc<dyn Transport>,
        log: Arc<TransferLog>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            endpoints: [first, second],
            log,
            shutdown,
            stopping: false,
        }
    }

    pub fn usage(&self) -> String {
        let [first, second] = &self.endpoints;
        format!(
            "Type: send [{}|{}] [hex_bytes]  — e.g., send {} 01ffbe",
            first.name(),
            second.name(),
            second.name()
        )
    }

    fn resolve(&self, target: &str) -> Option<&Arc<dyn Transport>> {
        self.endpoints
            .iter()
            .find(|endpoint| endpoint.name().eq_ignore_ascii_case(target))
    }

    /// Whether shutdown has been signalled, without waiting for it
    fn shutdown_signalled(&mut self) -> bool {
        if !self.stopping {
            self.stopping = match self.shutdown.try_recv() {
                Err(TryRecvError::Empty) => false,
                // A message, a lagged receiver or a dropped sender all mean stop
                Ok(()) | Err(TryRecvError::Lagged(_)) | Err(TryRecvError::Closed) => true,
            };
        }
        self.stopping
    }

    /// Handle one operator line: at most one write and one log record.
    pub async fn handle_line(&mut self, line: &str) -> InjectionOutcome {
        let command = match parse_command(line) {
            Ok(Some(command)) => command,
            Ok(None) => return InjectionOutcome::Ignored,
            Err(e) => return InjectionOutcome::Rejected(e),
        };

        let Some(endpoint) = self.resolve(&command.target).cloned() else {
            let [first, second] = &self.endpoints;
            return InjectionOutcome::Rejected(BridgeError::InvalidInput(format!(
                "unknown target '{}'; use '{}' or '{}'",
                command.target,
                first.name(),
                second.name()
            )));
        };

        if let Err(e) = endpoint.write(&command.payload).await {
            if e.is_closed() && self.shutdown_signalled() {
                return InjectionOutcome::ShuttingDown;
            }
            warn!(target_endpoint = endpoint.name(), error = %e, "injection write failed");
            return InjectionOutcome::WriteFailed(e);
        }

        let chunk = TransferChunk::injected(endpoint.name(), command.payload);
        let hex = chunk.hex();
        debug!(target_endpoint = endpoint.name(), bytes = chunk.data().len(), "injected bytes");
        if let Err(e) = self.log.append(chunk).await {
            warn!(error = %e, "failed to record injected bytes");
        }

        InjectionOutcome::Injected {
            target: endpoint.name().to_string(),
            hex,
        }
    }

    /// Read operator lines until input ends or the bridge shuts down.
    pub async fn run<R>(mut self, input: R) -> BridgeResult<()>
    where
        R: AsyncBufRead + Unpin,
    {
        println!("{}", self.usage());
        let mut lines = input.lines();

        loop {
            prompt();
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = self.shutdown.recv() => {
                    debug!("injection channel stopping");
                    return Ok(());
                }
            };
            let Some(line) = line else {
                info!("operator input closed");
                return Ok(());
            };

            let outcome = self.handle_line(&line).await;
            if let Some(message) = outcome.message() {
                println!("{}", message);
            }
            if matches!(outcome, InjectionOutcome::ShuttingDown) {
                return Ok(());
            }
        }
    }
}

fn prompt() {
    print!("> ");
    // A failed prompt flush only affects cosmetics
    let _ = std::io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bridge::memory::MemoryTransport;

    struct Fixture {
        pc: Arc<MemoryTransport>,
        stm32: Arc<MemoryTransport>,
        log: Arc<TransferLog>,
        stop: broadcast::Sender<()>,
        channel: InjectionChannel,
    }

    fn fixture() -> Fixture {
        let pc = Arc::new(MemoryTransport::new("pc"));
        let stm32 = Arc::new(MemoryTransport::new("stm32"));
        let log = Arc::new(TransferLog::from_writer(std::io::sink(), false));
        let (stop, stop_rx) = broadcast::channel(1);
        let channel = InjectionChannel::new(pc.clone(), stm32.clone(), log.clone(), stop_rx);
        Fixture {
            pc,
            stm32,
            log,
            stop,
            channel,
        }
    }

    #[test]
    fn test_parse_send_command() {
        let command = parse_command("send stm32 01ffbe").unwrap().unwrap();
        assert_eq!(command.target, "stm32");
        assert_eq!(command.payload, vec![0x01, 0xFF, 0xBE]);

        let command = parse_command("  SEND   PC   DEADbeef ").unwrap().unwrap();
        assert_eq!(command.target, "PC");
        assert_eq!(command.payload, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_non_commands_are_ignored() {
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(parse_command("hello world").unwrap(), None);
        assert_eq!(parse_command("sendpc 01").unwrap(), None);
    }

    #[test]
    fn test_malformed_send_is_invalid_input() {
        for line in ["send", "send pc", "send pc 01 02", "send pc 0", "send pc 0g", "send pc 01-02"] {
            let err = parse_command(line).unwrap_err();
            assert!(err.is_invalid_input(), "{} should be invalid", line);
        }
    }

    #[tokio::test]
    async fn test_injects_exact_bytes_once() {
        let mut f = fixture();
        let outcome = f.channel.handle_line("send stm32 01ffbe").await;

        assert!(matches!(outcome, InjectionOutcome::Injected { ref hex, .. } if hex == "01ffbe"));
        assert_eq!(f.stm32.writes().await, vec![vec![0x01, 0xFF, 0xBE]]);
        assert!(f.pc.writes().await.is_empty());
        assert_eq!(f.log.records_written(), 1);
        assert_eq!(outcome.message().unwrap(), "[You → STM32]  HEX: 01ffbe");
    }

    #[tokio::test]
    async fn test_target_is_case_insensitive() {
        let mut f = fixture();
        f.channel.handle_line("Send PC 0a").await;
        assert_eq!(f.pc.written().await, vec![0x0A]);
    }

    #[tokio::test]
    async fn test_unknown_target_rejected() {
        let mut f = fixture();
        let outcome = f.channel.handle_line("send xyz 01").await;

        let message = outcome.message().unwrap();
        assert!(message.contains("unknown target"));
        assert!(matches!(outcome, InjectionOutcome::Rejected(ref e) if e.is_invalid_input()));
        assert!(f.pc.writes().await.is_empty());
        assert!(f.stm32.writes().await.is_empty());
        assert_eq!(f.log.records_written(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_not_fatal() {
        let mut f = fixture();
        f.stm32.fail_writes("device busy").await;

        let outcome = f.channel.handle_line("send stm32 01").await;
        assert!(matches!(outcome, InjectionOutcome::WriteFailed(_)));
        assert_eq!(f.log.records_written(), 0);

        let outcome = f.channel.handle_line("send pc 02").await;
        assert!(matches!(outcome, InjectionOutcome::Injected { .. }));
    }

    #[tokio::test]
    async fn test_closed_target_without_shutdown_is_write_failure() {
        let mut f = fixture();
        f.pc.close().await;

        let outcome = f.channel.handle_line("send pc 01").await;
        assert!(matches!(outcome, InjectionOutcome::WriteFailed(ref e) if e.is_closed()));
        assert!(outcome.message().unwrap().contains("'pc' is closed"));
        assert_eq!(f.log.records_written(), 0);
    }

    #[tokio::test]
    async fn test_closed_target_after_shutdown_means_shutting_down() {
        let mut f = fixture();
        f.stop.send(()).unwrap();
        f.pc.close().await;

        let outcome = f.channel.handle_line("send pc 01").await;
        assert!(matches!(outcome, InjectionOutcome::ShuttingDown));
    }

    #[tokio::test]
    async fn test_run_processes_lines_until_eof() {
        let f = fixture();
        let input = tokio_test::io::Builder::new()
            .read(b"send stm32 01ffbe\n")
            .read(b"send xyz 01\n")
            .read(b"just chatting\n")
            .read(b"send pc 0d0a\n")
            .build();

        f.channel
            .run(tokio::io::BufReader::new(input))
            .await
            .unwrap();

        assert_eq!(f.stm32.written().await, vec![0x01, 0xFF, 0xBE]);
        assert_eq!(f.pc.written().await, b"\r\n".to_vec());
        assert_eq!(f.log.records_written(), 2);
    }

    #[tokio::test]
    async fn test_run_keeps_serving_open_endpoint_when_other_is_closed() {
        let f = fixture();
        f.pc.close().await;
        let input = tokio_test::io::Builder::new()
            .read(b"send pc 01\nsend stm32 02\n")
            .build();

        f.channel
            .run(tokio::io::BufReader::new(input))
            .await
            .unwrap();

        assert!(f.stm32.is_open().await);
        assert_eq!(f.stm32.writes().await, vec![vec![0x02]]);
        assert_eq!(f.log.records_written(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        let f = fixture();
        let (_operator, operator_side) = tokio::io::duplex(64);
        let stop = f.stop.clone();
        let task = tokio::spawn(f.channel.run(tokio::io::BufReader::new(operator_side)));

        stop.send(()).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .expect("injection channel ignored shutdown")
            .unwrap()
            .unwrap();
        assert!(f.pc.writes().await.is_empty());
    }
}
