//! Implementation of the `watchpost run` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

use crate::application::{Engine, EngineOptions};
use crate::cli::display::render_dashboard;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, DashboardView};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Stop after this many ticks (runs until Ctrl-C when omitted)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub ticks: Option<u64>,

    /// Never contact the narrator; use local messages only
    #[arg(long)]
    pub offline: bool,
}

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub ticks: u64,
    pub interrupted: bool,
    /// Downtime credited at startup, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciled_downtime_secs: Option<u64>,
    pub dashboard: DashboardView,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        if let Some(secs) = self.reconciled_downtime_secs {
            lines.push(format!("Reconciled {secs}s of downtime at startup."));
        }
        lines.push(format!(
            "{} after {} tick(s).\n",
            if self.interrupted { "Interrupted" } else { "Stopped" },
            self.ticks
        ));
        lines.push(render_dashboard(&self.dashboard, 10));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: RunArgs, config: Config, json_mode: bool) -> Result<()> {
    // Leave an in-flight narrator call time to finish before exiting.
    let grace = Duration::from_secs(config.narrative.timeout_secs.saturating_add(1));

    let engine = Engine::build(config, EngineOptions { offline: args.offline })
        .context("Failed to open session")?;
    let reconciled_downtime_secs = engine
        .reconciliation
        .applied
        .then_some(engine.reconciliation.downtime_secs);

    let mut handle = match args.ticks {
        Some(limit) => engine.scheduler.start_for(limit)?,
        None => engine.scheduler.start()?,
    };
    if !json_mode {
        eprintln!("Watchpost running. Press Ctrl-C to stop.");
    }

    let interrupted = tokio::select! {
        joined = &mut handle => {
            joined.context("Scheduler task failed")?;
            false
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            true
        }
    };

    if interrupted {
        info!("interrupt received, stopping scheduler");
        engine.scheduler.stop();
        handle.await.context("Scheduler task failed")?;
    }
    engine.shutdown(grace).await;

    let output_data = RunOutput {
        ticks: engine.scheduler.ticks(),
        interrupted,
        reconciled_downtime_secs,
        dashboard: engine.session.dashboard().await,
    };
    output(&output_data, json_mode);
    Ok(())
}
