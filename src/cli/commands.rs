use crate::cli::args::{Args, BridgeArgs, Command, ConfigCommand};
use crate::cli::output::{ConsoleWriter, OutputWriter, PortEntry};
use crate::core::bridge::BridgeSupervisor;
use crate::domain::config::BridgeConfig;
use crate::domain::error::BridgeError;
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::init_logging;
use std::path::PathBuf;
use tracing::info;

/// Execute CLI command
pub async fn execute_command(args: Args) -> Result<(), BridgeError> {
    let writer = ConsoleWriter::new(args.output);

    // Load configuration using ConfigManager
    let config_manager = ConfigManager::new();
    let config = if let Some(config_path) = &args.config {
        config_manager.load_config_from_path(config_path)?
    } else {
        config_manager.load_config()?
    };

    // Initialize logging
    if !args.quiet {
        init_logging(&config.global.log_level, args.verbose)?;
    }

    match args.command {
        Command::Bridge(bridge_args) => execute_bridge_command(bridge_args, &writer, config).await,
        Command::Ports => execute_ports_command(&writer),
        Command::Config(config_args) => {
            execute_config_command(config_args.command, &writer, &config, &config_manager)
        }
        Command::Version => {
            writer.write_message(&format!("combridge {}", env!("CARGO_PKG_VERSION")))?;
            Ok(())
        }
    }
}

async fn execute_bridge_command(
    args: BridgeArgs,
    writer: &ConsoleWriter,
    mut config: BridgeConfig,
) -> Result<(), BridgeError> {
    args.apply_to(&mut config);

    let supervisor = BridgeSupervisor::open(&config)?;
    let (first, second) = supervisor.endpoint_names();
    writer.write_message(&format!(
        "Bridge started: Logging {} <--> {}",
        config.first.port, config.second.port
    ))?;
    info!(
        session = %supervisor.session_id(),
        first,
        second,
        log_file = %config.global.log_file.display(),
        "bridge running"
    );

    let operator_input = tokio::io::BufReader::new(tokio::io::stdin());
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for interrupt");
            std::future::pending::<()>().await;
        }
    };

    let report = supervisor.run(operator_input, shutdown_signal).await?;
    writer.write_message("\nBridge stopped by user.")?;
    writer.write_session_report(&report)?;
    Ok(())
}

fn execute_ports_command(writer: &ConsoleWriter) -> Result<(), BridgeError> {
    let ports = serialport::available_ports()?;
    let entries: Vec<PortEntry> = ports.into_iter().map(PortEntry::from).collect();
    writer.write_ports(&entries)?;
    Ok(())
}

fn execute_config_command(
    command: ConfigCommand,
    writer: &ConsoleWriter,
    config: &BridgeConfig,
    config_manager: &ConfigManager,
) -> Result<(), BridgeError> {
    match command {
        ConfigCommand::Show => {
            writer.write_config(config)?;
            Ok(())
        }
        ConfigCommand::Init { dir } => {
            let dir = match dir {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            };
            let path = config_manager.init_project_config(&dir)?;
            writer.write_message(&format!("Created {}", path.display()))?;
            Ok(())
        }
        ConfigCommand::Validate { file } => {
            let (source, candidate) = match file {
                Some(path) => {
                    let candidate = config_manager.load_config_from_path(&path)?;
                    (path, candidate)
                }
                None => (PathBuf::from("<effective configuration>"), config.clone()),
            };
            candidate.validate()?;
            writer.write_message(&format!("{} is valid", source.display()))?;
            Ok(())
        }
    }
}
