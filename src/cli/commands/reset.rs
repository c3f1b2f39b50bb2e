//! Implementation of the `watchpost reset` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::application::{Engine, EngineOptions};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct ResetArgs {}

#[derive(Debug, Serialize)]
pub struct ResetOutput {
    pub success: bool,
    pub message: String,
    pub state_path: PathBuf,
}

impl CommandOutput for ResetOutput {
    fn to_human(&self) -> String {
        format!("{} ({})", self.message, self.state_path.display())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(_args: ResetArgs, config: Config, json_mode: bool) -> Result<()> {
    let state_path = config.state_path.clone();
    let engine = Engine::build(config, EngineOptions { offline: true })
        .context("Failed to open session")?;
    engine.session.reset().await.context("Failed to reset session")?;

    let output_data = ResetOutput {
        success: true,
        message: "Session reset to defaults.".to_string(),
        state_path,
    };
    output(&output_data, json_mode);
    Ok(())
}
