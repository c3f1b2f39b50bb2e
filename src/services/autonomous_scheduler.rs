//! Autonomous scheduler.
//!
//! Drives the metric evolution once per period and asks the narrative
//! trigger for a cycle every `narrative_every` ticks. Tick processing is
//! awaited inside the timer loop, so ticks never overlap; a slow tick delays
//! the next one instead of bursting.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CycleOutcome, SchedulerConfig};
use crate::services::metric_evolution::{tick, DriftSource, EvolutionParams};
use crate::services::narrative_trigger::NarrativeTrigger;
use crate::services::session_service::SessionService;

/// Tick processing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

impl SchedulerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
        }
    }

    const fn to_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Running => 1,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            _ => Self::Idle,
        }
    }
}

/// What a tick did about the narrative cycle.
#[derive(Debug)]
pub enum NarrativeDispatch {
    /// A cycle was spawned.
    Started(JoinHandle<CycleOutcome>),
    /// A cycle was due but the previous one is still running.
    SkippedInFlight,
}

/// Result of one tick.
#[derive(Debug)]
pub struct TickReport {
    /// Process-local tick number, starting at 1.
    pub tick: u64,
    pub uptime_seconds: u64,
    /// False when the snapshot save failed; the in-memory state still advanced.
    pub persisted: bool,
    /// Set only on ticks where a narrative cycle was due.
    pub narrative: Option<NarrativeDispatch>,
}

/// Returns the tick state to idle when dropped.
struct TickGuard<'a>(&'a AtomicU8);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(SchedulerState::Idle.to_u8(), Ordering::Release);
    }
}

/// Timer-driven evolution loop.
pub struct AutonomousScheduler {
    session: Arc<SessionService>,
    trigger: Arc<NarrativeTrigger>,
    params: EvolutionParams,
    drift: Mutex<Box<dyn DriftSource + Send>>,
    tick_interval: Duration,
    narrative_every: u64,
    state: AtomicU8,
    ticks: AtomicU64,
    active: AtomicBool,
    /// Stop requests. Each run subscribes afresh, so a request sent while
    /// no loop is running never reaches a later run.
    stop_tx: watch::Sender<bool>,
}

impl AutonomousScheduler {
    pub fn new(
        session: Arc<SessionService>,
        trigger: Arc<NarrativeTrigger>,
        params: EvolutionParams,
        drift: Box<dyn DriftSource + Send>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            session,
            trigger,
            params,
            drift: Mutex::new(drift),
            tick_interval: Duration::from_millis(config.tick_interval_ms.max(1)),
            narrative_every: config.narrative_every_ticks.max(1),
            state: AtomicU8::new(SchedulerState::Idle.to_u8()),
            ticks: AtomicU64::new(0),
            active: AtomicBool::new(false),
            stop_tx: watch::Sender::new(false),
        }
    }

    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Ticks processed since this scheduler was created.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Whether the timer loop is running.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn trigger(&self) -> &Arc<NarrativeTrigger> {
        &self.trigger
    }

    /// Process one tick.
    ///
    /// Fails only when another tick is already being processed. A failed
    /// save is logged and reported in the result.
    pub async fn tick_once(&self) -> DomainResult<TickReport> {
        self.state
            .compare_exchange(
                SchedulerState::Idle.to_u8(),
                SchedulerState::Running.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| DomainError::InvalidStateTransition {
                from: SchedulerState::Running.as_str().to_string(),
                to: SchedulerState::Running.as_str().to_string(),
                reason: "a tick is already being processed".to_string(),
            })?;

        let (uptime_seconds, persisted) = {
            let _guard = TickGuard(&self.state);
            let mut drift = self.drift.lock().await;
            let params = &self.params;
            let result = self
                .session
                .mutate(|state| {
                    *state = tick(std::mem::take(state), params, &mut **drift);
                    state.uptime_seconds
                })
                .await;
            match result {
                Ok(uptime) => (uptime, true),
                Err(e) => {
                    warn!(error = %e, "failed to persist session after tick");
                    (self.session.snapshot().await.uptime_seconds, false)
                }
            }
        };

        let tick = self.ticks.fetch_add(1, Ordering::AcqRel) + 1;
        let narrative = (tick % self.narrative_every == 0).then(|| match self.trigger.try_spawn() {
            Some(handle) => {
                debug!(tick, "narrative cycle started");
                NarrativeDispatch::Started(handle)
            }
            None => {
                debug!(tick, "narrative cycle still in flight, not starting another");
                NarrativeDispatch::SkippedInFlight
            }
        });

        Ok(TickReport {
            tick,
            uptime_seconds,
            persisted,
            narrative,
        })
    }

    /// Start the timer loop. Returns a JoinHandle.
    pub fn start(self: &Arc<Self>) -> DomainResult<JoinHandle<()>> {
        self.spawn_loop(None)
    }

    /// Start the timer loop and stop on its own after `limit` ticks.
    pub fn start_for(self: &Arc<Self>, limit: u64) -> DomainResult<JoinHandle<()>> {
        self.spawn_loop(Some(limit))
    }

    fn spawn_loop(self: &Arc<Self>, limit: Option<u64>) -> DomainResult<JoinHandle<()>> {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DomainError::InvalidStateTransition {
                from: "active".to_string(),
                to: "active".to_string(),
                reason: "scheduler loop already started".to_string(),
            });
        }
        self.stop_tx.send_replace(false);
        let mut stop_rx = self.stop_tx.subscribe();

        let this = Arc::clone(self);
        Ok(tokio::spawn(async move {
            let mut timer = interval(this.tick_interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first interval tick completes immediately.
            timer.tick().await;
            info!(
                interval_ms = this.tick_interval.as_millis() as u64,
                narrative_every = this.narrative_every,
                "scheduler started"
            );

            let mut processed = 0u64;
            loop {
                tokio::select! {
                    _ = timer.tick() => {}
                    _ = stop_rx.changed() => {}
                }
                if *stop_rx.borrow_and_update() {
                    break;
                }

                match this.tick_once().await {
                    Ok(report) => {
                        debug!(tick = report.tick, uptime = report.uptime_seconds, "tick processed");
                    }
                    Err(e) => warn!(error = %e, "tick skipped"),
                }

                processed += 1;
                if limit.is_some_and(|limit| processed >= limit) {
                    break;
                }
            }

            this.active.store(false, Ordering::Release);
            info!(ticks = processed, "scheduler stopped");
        }))
    }

    /// Ask the running timer loop to exit. The loop wakes immediately.
    /// Without a running loop this does nothing.
    pub fn stop(&self) {
        if self.is_active() {
            self.stop_tx.send_replace(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::ManualClock;
    use crate::adapters::narrators::MockNarrator;
    use crate::adapters::storage::InMemorySessionStore;
    use crate::services::downtime_reconciler::DowntimeReconciler;
    use crate::services::fallback_selector::FallbackSelector;
    use crate::services::metric_evolution::ExpectedDrift;
    use crate::services::narrative_trigger::TriggerSettings;

    fn scheduler(store: Arc<InMemorySessionStore>, every: u64) -> Arc<AutonomousScheduler> {
        let reconciler = DowntimeReconciler::new(EvolutionParams::default(), 5, 50);
        let (session, _) = SessionService::open(
            store,
            Arc::new(ManualClock::at_millis(1_700_000_000_000)),
            &reconciler,
            50,
            "Standing by.".to_string(),
        )
        .unwrap();
        let session = Arc::new(session);
        let trigger = Arc::new(NarrativeTrigger::new(
            session.clone(),
            Some(Arc::new(MockNarrator::replying("Narrated."))),
            FallbackSelector::default(),
            TriggerSettings::default(),
        ));
        Arc::new(AutonomousScheduler::new(
            session,
            trigger,
            EvolutionParams::default(),
            Box::new(ExpectedDrift),
            &SchedulerConfig {
                tick_interval_ms: 10,
                narrative_every_ticks: every,
            },
        ))
    }

    #[tokio::test]
    async fn test_tick_once_advances_and_returns_to_idle() {
        let scheduler = scheduler(Arc::new(InMemorySessionStore::new()), 15);
        let report = scheduler.tick_once().await.unwrap();
        assert_eq!(report.tick, 1);
        assert_eq!(report.uptime_seconds, 1);
        assert!(report.persisted);
        assert!(report.narrative.is_none());
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn test_narrative_due_every_k_ticks() {
        let scheduler = scheduler(Arc::new(InMemorySessionStore::new()), 3);
        let mut dispatched = Vec::new();
        for _ in 0..6 {
            let report = scheduler.tick_once().await.unwrap();
            if let Some(NarrativeDispatch::Started(handle)) = report.narrative {
                handle.await.unwrap();
                dispatched.push(report.tick);
            }
        }
        assert_eq!(dispatched, vec![3, 6]);
    }

    #[tokio::test]
    async fn test_save_failure_does_not_stop_ticking() {
        let store = Arc::new(InMemorySessionStore::new());
        let scheduler = scheduler(store.clone(), 15);
        store.fail_saves(true);

        let first = scheduler.tick_once().await.unwrap();
        let second = scheduler.tick_once().await.unwrap();
        assert!(!first.persisted);
        assert_eq!(second.uptime_seconds, 2);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_for_runs_exactly_limit_ticks() {
        let scheduler = scheduler(Arc::new(InMemorySessionStore::new()), 100);
        let handle = scheduler.start_for(4).unwrap();
        assert!(scheduler.start().is_err());
        handle.await.unwrap();
        assert_eq!(scheduler.ticks(), 4);
        assert!(!scheduler.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_loop() {
        let scheduler = scheduler(Arc::new(InMemorySessionStore::new()), 100);
        let handle = scheduler.start().unwrap();
        tokio::time::sleep(Duration::from_millis(55)).await;
        scheduler.stop();
        handle.await.unwrap();
        assert!(!scheduler.is_active());
        let ticks = scheduler.ticks();
        assert!((4..=6).contains(&ticks), "unexpected tick count {ticks}");

        // A stopped scheduler can be started again.
        let handle = scheduler.start_for(1).unwrap();
        handle.await.unwrap();
        assert_eq!(scheduler.ticks(), ticks + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_after_loop_ended_does_not_leak_into_next_run() {
        let scheduler = scheduler(Arc::new(InMemorySessionStore::new()), 100);
        scheduler.start_for(2).unwrap().await.unwrap();
        scheduler.stop();

        let handle = scheduler.start().unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(scheduler.ticks(), 2, "restart must wait one full period");
        assert!(scheduler.is_active());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(scheduler.ticks(), 3);

        scheduler.stop();
        handle.await.unwrap();
        assert!(!scheduler.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_start_is_ignored() {
        let scheduler = scheduler(Arc::new(InMemorySessionStore::new()), 100);
        scheduler.stop();

        let handle = scheduler.start_for(3).unwrap();
        handle.await.unwrap();
        assert_eq!(scheduler.ticks(), 3);
    }
}
