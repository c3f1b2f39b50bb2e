//! Session state domain model.
//!
//! `SessionState` is the unit of persistence. Its serialized form is a flat
//! camelCase JSON document; missing fields take their defaults so older or
//! partially written snapshots still load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event_log::{EventLog, LogEntry};

/// Upper bound shared by every percentage gauge.
pub const PERCENT_MAX: f64 = 100.0;

const DEFAULT_PRECISION_RATE: f64 = 87.5;

/// Persisted session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionState {
    /// Seconds of simulated activity, including reconciled downtime.
    pub uptime_seconds: u64,
    /// Epoch milliseconds of the last save. Zero means unknown.
    pub last_active_timestamp: i64,
    pub total_processed: u64,
    pub precision_rate: f64,
    pub coverage_index: f64,
    pub lock_strength: f64,
    pub event_log: EventLog,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            uptime_seconds: 0,
            last_active_timestamp: 0,
            total_processed: 0,
            precision_rate: DEFAULT_PRECISION_RATE,
            coverage_index: 0.0,
            lock_strength: 0.0,
            event_log: EventLog::default(),
        }
    }
}

impl SessionState {
    /// Fresh state whose log uses the given capacity.
    pub fn with_log_capacity(capacity: usize) -> Self {
        Self {
            event_log: EventLog::with_capacity(capacity),
            ..Default::default()
        }
    }

    /// Bring a decoded state back inside its invariants.
    ///
    /// Percentages are clamped into `[0, 100]` (non-finite values reset to
    /// the default) and the log is trimmed to `log_capacity`.
    pub fn normalize(&mut self, log_capacity: usize) {
        let defaults = Self::default();
        self.precision_rate = clamp_percent(self.precision_rate, defaults.precision_rate);
        self.coverage_index = clamp_percent(self.coverage_index, defaults.coverage_index);
        self.lock_strength = clamp_percent(self.lock_strength, defaults.lock_strength);
        self.event_log.set_capacity(log_capacity);
    }

    /// Time of the last save, if known.
    pub fn last_active_at(&self) -> Option<DateTime<Utc>> {
        if self.last_active_timestamp <= 0 {
            return None;
        }
        DateTime::from_timestamp_millis(self.last_active_timestamp)
    }

    pub fn phase(&self) -> Phase {
        Phase::from_gauges(self.coverage_index, self.lock_strength)
    }

    pub fn uptime_label(&self) -> String {
        format_uptime(self.uptime_seconds)
    }
}

fn clamp_percent(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, PERCENT_MAX)
    } else {
        fallback
    }
}

/// Operational phase derived from the coverage and lock gauges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Scanning,
    Acquisition,
    Tracking,
    Locked,
}

impl Phase {
    pub fn from_gauges(coverage: f64, lock: f64) -> Self {
        if coverage >= PERCENT_MAX && lock >= PERCENT_MAX {
            Self::Locked
        } else if lock >= 60.0 {
            Self::Tracking
        } else if coverage >= 30.0 {
            Self::Acquisition
        } else {
            Self::Scanning
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scanning => "SCANNING",
            Self::Acquisition => "ACQUISITION",
            Self::Tracking => "TRACKING",
            Self::Locked => "LOCKED",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format seconds as `HH:MM:SS`, prefixed with `Nd ` past one day.
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;
    if days > 0 {
        format!("{days}d {hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    }
}

/// Read-only projection of the session for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub message: String,
    pub uptime: String,
    pub uptime_seconds: u64,
    pub total_processed: u64,
    pub precision_rate: f64,
    pub coverage_index: f64,
    pub lock_strength: f64,
    pub phase: Phase,
    pub event_log: Vec<LogEntry>,
}

impl DashboardView {
    pub fn new(state: &SessionState, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            uptime: state.uptime_label(),
            uptime_seconds: state.uptime_seconds,
            total_processed: state.total_processed,
            precision_rate: state.precision_rate,
            coverage_index: state.coverage_index,
            lock_strength: state.lock_strength,
            phase: state.phase(),
            event_log: state.event_log.entries().to_vec(),
        }
    }
}
