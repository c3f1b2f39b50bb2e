//! Watchpost CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use watchpost::cli::{Cli, Commands};
use watchpost::infrastructure::config::ConfigLoader;
use watchpost::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let loaded = ConfigLoader::load_optional(cli.config.as_deref());

    let log_config = loaded
        .as_ref()
        .map_or_else(|_| LogConfig::default(), |config| LogConfig::from(&config.logging));
    let logger = match LoggerImpl::init(&log_config) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("Warning: logging disabled: {err:#}");
            None
        }
    };

    let json = cli.json;
    let result = match cli.command {
        // init must work even when the existing configuration is broken
        Commands::Init(args) => watchpost::cli::commands::init::execute(args, json).await,
        command => match loaded {
            Ok(config) => dispatch(command, config, json).await,
            Err(err) => Err(err.context("Failed to load configuration")),
        },
    };

    let status = match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            watchpost::cli::handle_error(&err, json);
            ExitCode::FAILURE
        }
    };
    // Flush buffered file logs before the process exits.
    drop(logger);
    status
}

async fn dispatch(command: Commands, config: watchpost::Config, json: bool) -> anyhow::Result<()> {
    use watchpost::cli::commands::{config as config_cmd, narrate, reset, run, status};

    match command {
        Commands::Run(args) => run::execute(args, config, json).await,
        Commands::Status(args) => status::execute(args, config, json).await,
        Commands::Narrate(args) => narrate::execute(args, config, json).await,
        Commands::Reset(args) => reset::execute(args, config, json).await,
        Commands::Config(args) => config_cmd::execute(args, config, json).await,
        Commands::Init(args) => watchpost::cli::commands::init::execute(args, json).await,
    }
}
