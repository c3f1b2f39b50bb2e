//! Session state owner.
//!
//! Every mutation of the session goes through [`SessionService::mutate`],
//! which applies the change, stamps the save time and persists the whole
//! state before releasing the lock. The displayed message lives here too
//! but is not persisted.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::errors::DomainResult;
use crate::domain::models::{DashboardView, LogLevel, SessionState};
use crate::domain::ports::{Clock, SessionStore};
use crate::services::downtime_reconciler::{DowntimeReconciler, Reconciliation};

/// Owner of the in-memory session.
pub struct SessionService {
    state: RwLock<SessionState>,
    displayed_message: RwLock<String>,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    log_capacity: usize,
}

impl SessionService {
    /// Load the persisted session once, reconcile downtime and persist the
    /// result. Returns the service together with the reconciliation report.
    pub fn open(
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        reconciler: &DowntimeReconciler,
        log_capacity: usize,
        initial_message: String,
    ) -> DomainResult<(Self, Reconciliation)> {
        let loaded = store.load()?;
        let reconciliation = reconciler.restore(loaded, clock.now());

        let mut state = reconciliation.state.clone();
        state.last_active_timestamp = clock.now_millis();
        store.save(&state)?;

        info!(
            store = %store.describe(),
            uptime = state.uptime_seconds,
            downtime_secs = reconciliation.downtime_secs,
            "session opened"
        );

        let service = Self {
            state: RwLock::new(state),
            displayed_message: RwLock::new(initial_message),
            store,
            clock,
            log_capacity,
        };
        Ok((service, reconciliation))
    }

    /// Apply `f` to the state and persist the result.
    ///
    /// The write lock is held across the save, so saves are serialized and
    /// each one writes a complete state. If the save fails the in-memory
    /// change is kept and the error is returned.
    pub async fn mutate<F, R>(&self, f: F) -> DomainResult<R>
    where
        F: FnOnce(&mut SessionState) -> R,
    {
        let mut state = self.state.write().await;
        let result = f(&mut *state);
        state.last_active_timestamp = self.clock.now_millis();
        self.store.save(&state)?;
        debug!(uptime = state.uptime_seconds, "session persisted");
        Ok(result)
    }

    /// Append an entry to the event log and persist.
    pub async fn log(&self, message: impl Into<String>, level: LogLevel) -> DomainResult<()> {
        let message = message.into();
        let now = self.clock.now();
        self.mutate(|state| {
            state.event_log.append_at(message, level, now);
        })
        .await
    }

    /// Replace the state with a fresh default. The only operation allowed to
    /// move the counters backwards.
    pub async fn reset(&self) -> DomainResult<()> {
        let now = self.clock.now();
        let capacity = self.log_capacity;
        self.mutate(|state| {
            *state = SessionState::with_log_capacity(capacity);
            state
                .event_log
                .append_at("Session reset to defaults", LogLevel::Info, now);
        })
        .await?;
        info!("session reset");
        Ok(())
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn displayed_message(&self) -> String {
        self.displayed_message.read().await.clone()
    }

    /// Replace the displayed message. Blank messages are ignored so the
    /// dashboard never shows an empty status.
    pub async fn set_displayed_message(&self, message: impl Into<String>) {
        let message = message.into();
        if message.trim().is_empty() {
            return;
        }
        *self.displayed_message.write().await = message;
    }

    pub async fn dashboard(&self) -> DashboardView {
        let state = self.state.read().await;
        let message = self.displayed_message.read().await;
        DashboardView::new(&state, message.as_str())
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
