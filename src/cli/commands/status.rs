//! Implementation of the `watchpost status` command.
//!
//! Read-only: the snapshot is decoded and inspected but never written, so
//! the downtime shown is what the next start would reconcile.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::adapters::storage::JsonFileSessionStore;
use crate::cli::display::render_dashboard;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{format_uptime, Config, DashboardView, SessionState};
use crate::domain::ports::{LoadedSnapshot, SessionStore};
use crate::services::DowntimeReconciler;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Number of log entries to show
    #[arg(short, long, default_value = "10")]
    pub limit: usize,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotCondition {
    Ok,
    Absent,
    Corrupt,
}

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub state_path: PathBuf,
    pub snapshot: SnapshotCondition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active: Option<String>,
    pub pending_downtime_secs: u64,
    pub will_reconcile: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard: Option<DashboardView>,
    #[serde(skip)]
    pub limit: usize,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("Session file: {}", self.state_path.display())];
        match self.snapshot {
            SnapshotCondition::Absent => {
                lines.push("No session recorded yet. `watchpost run` starts one.".to_string());
            }
            SnapshotCondition::Corrupt => {
                lines.push(
                    "Session file is unreadable; the next start will begin from defaults."
                        .to_string(),
                );
            }
            SnapshotCondition::Ok => {
                if let Some(last) = &self.last_active {
                    lines.push(format!("Last active: {last}"));
                }
                if self.will_reconcile {
                    lines.push(format!(
                        "Offline for {}; this will be reconciled on the next start.",
                        format_uptime(self.pending_downtime_secs)
                    ));
                }
            }
        }
        if let Some(dashboard) = &self.dashboard {
            lines.push(String::new());
            lines.push(render_dashboard(dashboard, self.limit));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Inspect a loaded snapshot without modifying it.
pub fn inspect(
    loaded: LoadedSnapshot,
    config: &Config,
    now: chrono::DateTime<Utc>,
    limit: usize,
) -> StatusOutput {
    let base = StatusOutput {
        state_path: config.state_path.clone(),
        snapshot: SnapshotCondition::Absent,
        last_active: None,
        pending_downtime_secs: 0,
        will_reconcile: false,
        dashboard: None,
        limit,
    };

    match loaded {
        LoadedSnapshot::Absent => base,
        LoadedSnapshot::Corrupt { .. } => StatusOutput {
            snapshot: SnapshotCondition::Corrupt,
            ..base
        },
        LoadedSnapshot::Decoded(mut state) => {
            state.normalize(config.evolution.event_log_capacity);
            let pending = DowntimeReconciler::downtime_secs(&state, now);
            StatusOutput {
                snapshot: SnapshotCondition::Ok,
                last_active: state.last_active_at().map(|t| t.to_rfc3339()),
                pending_downtime_secs: pending,
                will_reconcile: pending > config.evolution.downtime_threshold_secs,
                dashboard: Some(DashboardView::new(&state, headline(&state))),
                ..base
            }
        }
    }
}

/// The displayed message is not persisted; show the newest event instead.
fn headline(state: &SessionState) -> String {
    state
        .event_log
        .latest()
        .map_or_else(|| "No activity recorded.".to_string(), |e| e.message.clone())
}

pub async fn execute(args: StatusArgs, config: Config, json_mode: bool) -> Result<()> {
    let store = JsonFileSessionStore::new(&config.state_path);
    let loaded = store
        .load()
        .with_context(|| format!("Failed to read session from {}", store.describe()))?;

    let output_data = inspect(loaded, &config, Utc::now(), args.limit);
    output(&output_data, json_mode);
    Ok(())
}
