// Logging module - Diagnostic tracing and the transfer record sink
pub mod transfer_log;

pub use transfer_log::TransferLog;

use crate::domain::error::{BridgeError, BridgeResult};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize diagnostic logging to stderr.
///
/// `RUST_LOG` takes precedence; otherwise `log_level` applies to this crate
/// and `verbose` forces debug output.
pub fn init_logging(log_level: &str, verbose: bool) -> BridgeResult<()> {
    let default_directive = if verbose {
        "combridge=debug,warn".to_string()
    } else {
        format!("combridge={},warn", log_level)
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&default_directive))
        .map_err(|e| BridgeError::Config {
            message: format!("Invalid log level '{}': {}", log_level, e),
        })?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()
        .map_err(|e| BridgeError::Config {
            message: format!("Failed to initialize logging: {}", e),
        })?;

    tracing::debug!("Combridge logging system initialized");
    Ok(())
}
