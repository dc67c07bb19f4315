use crate::domain::config::{BridgeConfig, FlowControlConfig, ParityConfig};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Command line arguments for Combridge
#[derive(Parser, Debug)]
#[command(
    name = "combridge",
    version = env!("CARGO_PKG_VERSION"),
    about = "Transparent serial bridge with transfer logging",
    long_about = "A man-in-the-middle bridge between two serial ports: relays every byte in both directions, logs each transfer with a timestamp, and lets the operator inject raw bytes toward either side."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress diagnostic logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path (replaces the global and project files)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the bridge between two serial ports
    Bridge(BridgeArgs),
    /// List available serial ports
    Ports,
    /// Configuration management commands
    Config(ConfigArgs),
    /// Display version information
    Version,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
}

/// Bridge arguments; each one overrides the matching configuration value
#[derive(ClapArgs, Debug, Default)]
pub struct BridgeArgs {
    /// Port of the first endpoint
    #[arg(long)]
    pub first_port: Option<String>,

    /// Port of the second endpoint
    #[arg(long)]
    pub second_port: Option<String>,

    /// Name of the first endpoint
    #[arg(long)]
    pub first_name: Option<String>,

    /// Name of the second endpoint
    #[arg(long)]
    pub second_name: Option<String>,

    /// Baud rate for both ports
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Parity (none, even, odd)
    #[arg(long, value_enum)]
    pub parity: Option<ParityArg>,

    /// Flow control (none, software, hardware)
    #[arg(long, value_enum)]
    pub flow_control: Option<FlowControlArg>,

    /// Transfer log file
    #[arg(short, long)]
    pub log_file: Option<PathBuf>,

    /// Idle poll interval in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Do not print transfer records to the console
    #[arg(long)]
    pub no_echo: bool,
}

/// Configuration management arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Create a default project configuration
    Init {
        /// Directory to create `.combridge/config.toml` in
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Validate configuration
    Validate {
        /// Configuration file path
        file: Option<PathBuf>,
    },
}

/// Parity configuration argument
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ParityArg {
    None,
    Even,
    Odd,
}

/// Flow control configuration argument
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum FlowControlArg {
    None,
    Software,
    Hardware,
}

impl BridgeArgs {
    /// Overlay the flags that were given onto `config`
    pub fn apply_to(&self, config: &mut BridgeConfig) {
        if let Some(port) = &self.first_port {
            config.first.port = port.clone();
        }
        if let Some(port) = &self.second_port {
            config.second.port = port.clone();
        }
        if let Some(name) = &self.first_name {
            config.first.name = name.clone();
        }
        if let Some(name) = &self.second_name {
            config.second.name = name.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(parity) = self.parity {
            config.serial.parity = parity.into();
        }
        if let Some(flow_control) = self.flow_control {
            config.serial.flow_control = flow_control.into();
        }
        if let Some(log_file) = &self.log_file {
            config.global.log_file = log_file.clone();
        }
        if let Some(interval) = self.poll_interval_ms {
            config.global.poll_interval_ms = interval;
        }
        if self.no_echo {
            config.global.echo = false;
        }
    }
}

impl From<ParityArg> for ParityConfig {
    fn from(parity: ParityArg) -> Self {
        match parity {
            ParityArg::None => Self::None,
            ParityArg::Even => Self::Even,
            ParityArg::Odd => Self::Odd,
        }
    }
}

impl From<FlowControlArg> for FlowControlConfig {
    fn from(flow_control: FlowControlArg) -> Self {
        match flow_control {
            FlowControlArg::None => Self::None,
            FlowControlArg::Software => Self::Software,
            FlowControlArg::Hardware => Self::Hardware,
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Text
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_bridge_flags_override_config() {
        let args = Args::parse_from([
            "combridge",
            "bridge",
            "--first-port",
            "/dev/ttyUSB0",
            "--second-name",
            "rw",
            "--baud",
            "115200",
            "--parity",
            "even",
            "--no-echo",
        ]);

        let Command::Bridge(bridge) = args.command else {
            panic!("expected bridge command");
        };

        let mut config = BridgeConfig::default();
        bridge.apply_to(&mut config);
        assert_eq!(config.first.port, "/dev/ttyUSB0");
        assert_eq!(config.first.name, "pc");
        assert_eq!(config.second.name, "rw");
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.serial.parity, ParityConfig::Even);
        assert!(!config.global.echo);
    }

    #[test]
    fn test_no_flags_leave_config_untouched() {
        let mut config = BridgeConfig::default();
        BridgeArgs::default().apply_to(&mut config);
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from(["combridge", "ports", "-o", "json", "-q"]);
        assert!(matches!(args.command, Command::Ports));
        assert_eq!(args.output, OutputFormat::Json);
        assert!(args.quiet);
    }
}
