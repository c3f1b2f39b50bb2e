//! Downtime reconciliation.
//!
//! When a session is restored, the time since its last save is credited in
//! one batched step instead of replaying every missed tick.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domain::models::session::format_uptime;
use crate::domain::models::{LogLevel, SessionState};
use crate::domain::ports::LoadedSnapshot;
use crate::services::metric_evolution::{catch_up, EvolutionParams};

/// Result of reconciling a persisted state against the current time.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub state: SessionState,
    /// Whole seconds between the last save and `now` (zero if unknown).
    pub downtime_secs: u64,
    /// Whether the catch-up adjustment was applied.
    pub applied: bool,
}

/// Reconciler configuration.
#[derive(Debug, Clone)]
pub struct DowntimeReconciler {
    params: EvolutionParams,
    threshold_secs: u64,
    log_capacity: usize,
}

impl DowntimeReconciler {
    pub fn new(params: EvolutionParams, threshold_secs: u64, log_capacity: usize) -> Self {
        Self {
            params,
            threshold_secs,
            log_capacity,
        }
    }

    /// Whole seconds elapsed since the state was last saved.
    pub fn downtime_secs(state: &SessionState, now: DateTime<Utc>) -> u64 {
        if state.last_active_timestamp <= 0 {
            return 0;
        }
        let elapsed_ms = now.timestamp_millis().saturating_sub(state.last_active_timestamp);
        u64::try_from(elapsed_ms / 1000).unwrap_or(0)
    }

    /// Credit the downtime of a decoded state.
    ///
    /// Downtime above the threshold is applied with a single closed-form
    /// catch-up and reported by exactly one log entry. Anything at or below
    /// the threshold leaves the state untouched.
    pub fn reconcile(&self, persisted: SessionState, now: DateTime<Utc>) -> Reconciliation {
        let downtime_secs = Self::downtime_secs(&persisted, now);
        if downtime_secs <= self.threshold_secs {
            return Reconciliation {
                state: persisted,
                downtime_secs,
                applied: false,
            };
        }

        let mut state = catch_up(persisted, &self.params, downtime_secs);
        state.event_log.append_at(
            format!(
                "Resumed after {} offline; reconciled {} seconds of activity",
                format_uptime(downtime_secs),
                downtime_secs
            ),
            LogLevel::Info,
            now,
        );
        info!(downtime_secs, uptime = state.uptime_seconds, "downtime reconciled");

        Reconciliation {
            state,
            downtime_secs,
            applied: true,
        }
    }

    /// Build the startup state from whatever the store returned.
    ///
    /// Never fails: a corrupt snapshot is discarded in favour of the default
    /// state plus one warning entry.
    pub fn restore(&self, loaded: LoadedSnapshot, now: DateTime<Utc>) -> Reconciliation {
        match loaded {
            LoadedSnapshot::Decoded(mut state) => {
                state.normalize(self.log_capacity);
                self.reconcile(state, now)
            }
            LoadedSnapshot::Absent => {
                let mut state = SessionState::with_log_capacity(self.log_capacity);
                state
                    .event_log
                    .append_at("New session initialized", LogLevel::Info, now);
                info!("no persisted session found, starting fresh");
                Reconciliation {
                    state,
                    downtime_secs: 0,
                    applied: false,
                }
            }
            LoadedSnapshot::Corrupt { reason } => {
                let mut state = SessionState::with_log_capacity(self.log_capacity);
                state.event_log.append_at(
                    "Persisted session was unreadable; starting from defaults",
                    LogLevel::Warning,
                    now,
                );
                warn!(%reason, "discarding corrupt session snapshot");
                Reconciliation {
                    state,
                    downtime_secs: 0,
                    applied: false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reconciler() -> DowntimeReconciler {
        DowntimeReconciler::new(EvolutionParams::default(), 5, 50)
    }

    fn saved_at(now: DateTime<Utc>, secs_ago: i64) -> SessionState {
        SessionState {
            uptime_seconds: 100,
            total_processed: 1_000,
            last_active_timestamp: (now - Duration::seconds(secs_ago)).timestamp_millis(),
            ..Default::default()
        }
    }

    #[test]
    fn test_below_threshold_is_noop() {
        let now = Utc::now();
        let persisted = saved_at(now, 5);
        let result = reconciler().reconcile(persisted.clone(), now);
        assert!(!result.applied);
        assert_eq!(result.downtime_secs, 5);
        assert_eq!(result.state, persisted);
    }

    #[test]
    fn test_above_threshold_applies_once() {
        let now = Utc::now();
        let result = reconciler().reconcile(saved_at(now, 3_600), now);
        assert!(result.applied);
        assert_eq!(result.downtime_secs, 3_600);
        assert_eq!(result.state.uptime_seconds, 3_700);
        assert_eq!(
            result.state.total_processed,
            1_000 + EvolutionParams::default().mean_processed() * 3_600
        );
        assert_eq!(result.state.event_log.len(), 1);
        assert!(result.state.event_log.entries()[0].message.contains("01:00:00"));
    }

    #[test]
    fn test_future_timestamp_counts_as_zero() {
        let now = Utc::now();
        let result = reconciler().reconcile(saved_at(now, -120), now);
        assert_eq!(result.downtime_secs, 0);
        assert!(!result.applied);
    }

    #[test]
    fn test_unknown_timestamp_counts_as_zero() {
        let state = SessionState::default();
        assert_eq!(DowntimeReconciler::downtime_secs(&state, Utc::now()), 0);
    }

    #[test]
    fn test_restore_corrupt_logs_one_warning() {
        let result = reconciler().restore(
            LoadedSnapshot::Corrupt {
                reason: "EOF".to_string(),
            },
            Utc::now(),
        );
        let mut expected = SessionState::default();
        expected.event_log = result.state.event_log.clone();
        assert_eq!(result.state, expected);
        assert_eq!(result.state.event_log.len(), 1);
        assert_eq!(result.state.event_log.entries()[0].level, LogLevel::Warning);
    }

    #[test]
    fn test_restore_absent_starts_fresh() {
        let result = reconciler().restore(LoadedSnapshot::Absent, Utc::now());
        assert_eq!(result.state.uptime_seconds, 0);
        assert_eq!(result.state.event_log.len(), 1);
        assert_eq!(result.state.event_log.entries()[0].level, LogLevel::Info);
    }

    #[test]
    fn test_restore_decoded_normalizes_then_reconciles() {
        let now = Utc::now();
        let mut persisted = saved_at(now, 60);
        persisted.coverage_index = 250.0;
        let result = reconciler().restore(LoadedSnapshot::Decoded(persisted), now);
        assert!(result.applied);
        assert!((result.state.coverage_index - 100.0).abs() < f64::EPSILON);
    }
}
