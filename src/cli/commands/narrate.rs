//! Implementation of the `watchpost narrate` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::application::{Engine, EngineOptions};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, CycleOutcome};

#[derive(Args, Debug)]
pub struct NarrateArgs {
    /// Skip the narrator and pick a local message
    #[arg(long)]
    pub offline: bool,
}

#[derive(Debug, Serialize)]
pub struct NarrateOutput {
    #[serde(flatten)]
    pub outcome: CycleOutcome,
    pub displayed_message: String,
}

impl CommandOutput for NarrateOutput {
    fn to_human(&self) -> String {
        match &self.outcome {
            CycleOutcome::Applied { message } => message.clone(),
            CycleOutcome::FellBack { message, reason } => {
                format!("{message}\n(local message: {reason})")
            }
            CycleOutcome::Skipped => format!(
                "{}\n(another narrative cycle was already running)",
                self.displayed_message
            ),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: NarrateArgs, config: Config, json_mode: bool) -> Result<()> {
    let engine = Engine::build(config, EngineOptions { offline: args.offline })
        .context("Failed to open session")?;

    let outcome = engine.trigger.run_cycle().await;
    let output_data = NarrateOutput {
        outcome,
        displayed_message: engine.session.displayed_message().await,
    };
    output(&output_data, json_mode);
    Ok(())
}
