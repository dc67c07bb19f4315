// Domain module - Configuration model and error taxonomy
pub mod config;
pub mod error;
