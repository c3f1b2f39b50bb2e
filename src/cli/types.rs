//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::{
    config::ConfigArgs, init::InitArgs, narrate::NarrateArgs, reset::ResetArgs, run::RunArgs,
    status::StatusArgs,
};

#[derive(Parser, Debug)]
#[command(name = "watchpost")]
#[command(about = "Watchpost - autonomous telemetry dashboard engine", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .watchpost/config.yaml and local.yaml)
    #[arg(short, long, global = true, env = "WATCHPOST_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the dashboard engine until Ctrl-C or a tick limit
    Run(RunArgs),

    /// Show the persisted session without modifying it
    Status(StatusArgs),

    /// Run one narrative cycle now
    Narrate(NarrateArgs),

    /// Reset the persisted session to defaults
    Reset(ResetArgs),

    /// Write a default configuration file
    Init(InitArgs),

    /// Print the effective configuration
    Config(ConfigArgs),
}
