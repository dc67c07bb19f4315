use thiserror::Error;

/// Combridge unified error type
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection error on '{endpoint}': {message}")]
    Connection { endpoint: String, message: String },

    #[error("'{endpoint}' is closed")]
    Closed { endpoint: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Output error: {0}")]
    Output(String),
}

impl BridgeError {
    pub fn connection(endpoint: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Connection {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    pub fn closed(endpoint: impl Into<String>) -> Self {
        Self::Closed {
            endpoint: endpoint.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True when the failure only means the resource was already shut down.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
