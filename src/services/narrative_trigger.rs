//! Narrative trigger.
//!
//! Runs one narrative cycle at a time: capture a frame, build the context,
//! ask the narrator, then apply its text or fall back to a local message.
//! Every cycle ends with a non-empty displayed message and one log entry
//! describing what happened.
//!
//! Single-flight is enforced with an atomic flag taken synchronously before
//! any work starts. The flag lives in a guard that is released on drop, so a
//! cancelled or panicking cycle can never wedge the trigger.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::models::{
    CapturedFrame, CycleOutcome, FallbackReason, LogLevel, NarrativeConfig, NarrativeContext,
    NarrativePhase,
};
use crate::domain::ports::{FrameSource, Narrator, NarratorError};
use crate::services::fallback_selector::FallbackSelector;
use crate::services::session_service::SessionService;

/// Timing and context settings of the trigger.
#[derive(Debug, Clone)]
pub struct TriggerSettings {
    pub target: String,
    pub narrator_timeout: Duration,
    pub capture_timeout: Duration,
    pub recent_events: usize,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self::from(&NarrativeConfig::default())
    }
}

impl From<&NarrativeConfig> for TriggerSettings {
    fn from(config: &NarrativeConfig) -> Self {
        Self {
            target: config.target.clone(),
            narrator_timeout: Duration::from_secs(config.timeout_secs),
            capture_timeout: Duration::from_secs(config.capture_timeout_secs),
            recent_events: config.recent_events,
        }
    }
}

/// Holds the single-flight flag for the duration of a cycle.
struct FlightGuard {
    in_flight: Arc<AtomicBool>,
    phase: Arc<AtomicU8>,
}

impl FlightGuard {
    fn enter(&self, phase: NarrativePhase) {
        self.phase.store(phase.to_u8(), Ordering::SeqCst);
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.phase
            .store(NarrativePhase::Ready.to_u8(), Ordering::SeqCst);
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Single-flight narrative cycle runner.
pub struct NarrativeTrigger {
    session: Arc<SessionService>,
    narrator: Option<Arc<dyn Narrator>>,
    frames: Option<Arc<dyn FrameSource>>,
    fallback: FallbackSelector,
    settings: TriggerSettings,
    in_flight: Arc<AtomicBool>,
    phase: Arc<AtomicU8>,
}

impl NarrativeTrigger {
    /// Create a trigger. Without a narrator every cycle falls back.
    pub fn new(
        session: Arc<SessionService>,
        narrator: Option<Arc<dyn Narrator>>,
        fallback: FallbackSelector,
        settings: TriggerSettings,
    ) -> Self {
        Self {
            session,
            narrator,
            frames: None,
            fallback,
            settings,
            in_flight: Arc::new(AtomicBool::new(false)),
            phase: Arc::new(AtomicU8::new(NarrativePhase::Ready.to_u8())),
        }
    }

    /// Attach a frame source.
    pub fn with_frame_source(mut self, frames: Arc<dyn FrameSource>) -> Self {
        self.frames = Some(frames);
        self
    }

    pub fn phase(&self) -> NarrativePhase {
        NarrativePhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn fallback(&self) -> &FallbackSelector {
        &self.fallback
    }

    fn try_acquire(&self) -> Option<FlightGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard {
                in_flight: self.in_flight.clone(),
                phase: self.phase.clone(),
            })
    }

    /// Spawn a cycle on the runtime.
    ///
    /// The flag is taken before spawning, so a second call made while the
    /// first cycle is still running returns `None` immediately.
    pub fn try_spawn(self: &Arc<Self>) -> Option<JoinHandle<CycleOutcome>> {
        let guard = self.try_acquire()?;
        let this = Arc::clone(self);
        Some(tokio::spawn(async move { this.cycle(guard).await }))
    }

    /// Run a cycle on the current task.
    pub async fn run_cycle(&self) -> CycleOutcome {
        match self.try_acquire() {
            Some(guard) => self.cycle(guard).await,
            None => {
                debug!("narrative cycle already in flight, skipping");
                CycleOutcome::Skipped
            }
        }
    }

    async fn cycle(&self, guard: FlightGuard) -> CycleOutcome {
        guard.enter(NarrativePhase::Capturing);
        let frame = self.capture_frame().await;
        let context = self.build_context(frame).await;

        guard.enter(NarrativePhase::Requesting);
        match self.request(&context).await {
            Ok(message) => {
                guard.enter(NarrativePhase::Applying);
                self.session.set_displayed_message(message.clone()).await;
                self.append(format!("Narrative updated: {message}"), LogLevel::Success)
                    .await;
                info!(chars = message.len(), "narrative applied");
                CycleOutcome::Applied { message }
            }
            Err(reason) => {
                guard.enter(NarrativePhase::FallingBack);
                let message = self.fallback.select();
                self.session.set_displayed_message(message.clone()).await;
                let level = match reason {
                    FallbackReason::Offline(_) => LogLevel::Warning,
                    _ => LogLevel::Error,
                };
                self.append(
                    format!("Narrative unavailable ({reason}); using local message"),
                    level,
                )
                .await;
                warn!(%reason, "narrative fell back to local message");
                CycleOutcome::FellBack { message, reason }
            }
        }
    }

    /// Best-effort capture. Problems are logged and the cycle continues.
    async fn capture_frame(&self) -> Option<CapturedFrame> {
        let frames = self.frames.as_ref()?;
        let problem = match timeout(self.settings.capture_timeout, frames.capture()).await {
            Ok(Ok(Some(frame))) => return Some(frame),
            Ok(Ok(None)) => "no frame available".to_string(),
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!(
                "timed out after {}ms",
                self.settings.capture_timeout.as_millis()
            ),
        };
        self.append(
            format!("Visual capture unavailable ({problem}); continuing without visual"),
            LogLevel::Warning,
        )
        .await;
        None
    }

    async fn build_context(&self, frame: Option<CapturedFrame>) -> NarrativeContext {
        let state = self.session.snapshot().await;
        let now = self.session.clock().now();
        NarrativeContext {
            target: self.settings.target.clone(),
            uptime: state.uptime_label(),
            current_time: now.format("%H:%M:%S").to_string(),
            phase: state.phase().as_str().to_string(),
            recent_events: state
                .event_log
                .recent_messages(self.settings.recent_events)
                .join("; "),
            coverage_index: state.coverage_index,
            lock_strength: state.lock_strength,
            frame,
        }
    }

    /// Ask the narrator, bounded by the narrator timeout.
    async fn request(&self, context: &NarrativeContext) -> Result<String, FallbackReason> {
        let narrator = self
            .narrator
            .as_ref()
            .ok_or_else(|| FallbackReason::Offline("no narrator configured".to_string()))?;

        let text = match timeout(self.settings.narrator_timeout, narrator.narrate(context)).await {
            Err(_) => return Err(FallbackReason::TimedOut),
            Ok(result) => result.map_err(fallback_reason)?,
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(FallbackReason::UnusableResponse("blank text".to_string()));
        }
        Ok(text.to_string())
    }

    /// Append to the event log. A failed save is reported but never aborts
    /// the cycle; the entry stays in memory.
    async fn append(&self, message: String, level: LogLevel) {
        if let Err(e) = self.session.log(message, level).await {
            warn!(error = %e, "failed to persist narrative log entry");
        }
    }
}

fn fallback_reason(err: NarratorError) -> FallbackReason {
    match err {
        NarratorError::Unavailable(detail) => FallbackReason::Offline(detail),
        NarratorError::Timeout => FallbackReason::TimedOut,
        NarratorError::Rejected { .. } => FallbackReason::NarratorError(err.to_string()),
        NarratorError::Malformed(_) | NarratorError::Empty => {
            FallbackReason::UnusableResponse(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::capture::{MockCapture, MockFrameSource};
    use crate::adapters::clock::ManualClock;
    use crate::adapters::narrators::{MockNarrator, MockReply};
    use crate::adapters::storage::InMemorySessionStore;
    use crate::services::downtime_reconciler::DowntimeReconciler;
    use crate::services::metric_evolution::EvolutionParams;

    fn session() -> Arc<SessionService> {
        let reconciler = DowntimeReconciler::new(EvolutionParams::default(), 5, 50);
        let (service, _) = SessionService::open(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(ManualClock::at_millis(1_700_000_000_000)),
            &reconciler,
            50,
            "Standing by.".to_string(),
        )
        .unwrap();
        Arc::new(service)
    }

    fn trigger(session: Arc<SessionService>, narrator: Option<Arc<dyn Narrator>>) -> NarrativeTrigger {
        NarrativeTrigger::new(
            session,
            narrator,
            FallbackSelector::new(["Local A", "Local B"]).unwrap(),
            TriggerSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_success_applies_trimmed_text() {
        let session = session();
        let narrator = Arc::new(MockNarrator::replying("  Target holding.  "));
        let trigger = trigger(session.clone(), Some(narrator));

        let outcome = trigger.run_cycle().await;
        assert_eq!(
            outcome,
            CycleOutcome::Applied {
                message: "Target holding.".to_string()
            }
        );
        assert_eq!(session.displayed_message().await, "Target holding.");
        let state = session.snapshot().await;
        assert_eq!(state.event_log.latest().unwrap().level, LogLevel::Success);
        assert_eq!(trigger.phase(), NarrativePhase::Ready);
        assert!(!trigger.is_in_flight());
    }

    #[tokio::test]
    async fn test_offline_falls_back_with_warning() {
        let session = session();
        let narrator = Arc::new(MockNarrator::new(MockReply::Offline));
        let trigger = trigger(session.clone(), Some(narrator));

        let outcome = trigger.run_cycle().await;
        assert!(matches!(
            outcome,
            CycleOutcome::FellBack {
                reason: FallbackReason::Offline(_),
                ..
            }
        ));
        let shown = session.displayed_message().await;
        assert!(trigger.fallback().contains(&shown));
        let latest = session.snapshot().await.event_log.latest().cloned().unwrap();
        assert_eq!(latest.level, LogLevel::Warning);
    }

    #[tokio::test]
    async fn test_error_status_falls_back_with_error() {
        let session = session();
        let trigger = trigger(session.clone(), Some(Arc::new(MockNarrator::new(MockReply::Status(500)))));

        trigger.run_cycle().await;
        let latest = session.snapshot().await.event_log.latest().cloned().unwrap();
        assert_eq!(latest.level, LogLevel::Error);
        assert_ne!(session.displayed_message().await, "Standing by.");
    }

    #[tokio::test]
    async fn test_blank_reply_is_unusable() {
        let trigger = trigger(session(), Some(Arc::new(MockNarrator::replying("   "))));
        assert!(matches!(
            trigger.run_cycle().await,
            CycleOutcome::FellBack {
                reason: FallbackReason::UnusableResponse(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_no_narrator_is_offline() {
        let trigger = trigger(session(), None);
        assert!(matches!(
            trigger.run_cycle().await,
            CycleOutcome::FellBack {
                reason: FallbackReason::Offline(_),
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_narrator_times_out() {
        let session = session();
        let narrator = Arc::new(MockNarrator::replying("late").with_delay(Duration::from_secs(60)));
        let trigger = trigger(session.clone(), Some(narrator));

        assert!(matches!(
            trigger.run_cycle().await,
            CycleOutcome::FellBack {
                reason: FallbackReason::TimedOut,
                ..
            }
        ));
        assert!(!trigger.is_in_flight());
    }

    #[tokio::test]
    async fn test_second_cycle_skipped_while_in_flight() {
        let narrator = Arc::new(MockNarrator::replying("ok").with_delay(Duration::from_millis(200)));
        let trigger = Arc::new(trigger(session(), Some(narrator.clone())));

        let first = trigger.try_spawn().expect("first cycle should start");
        assert!(trigger.is_in_flight());
        assert!(trigger.try_spawn().is_none());
        assert_eq!(trigger.run_cycle().await, CycleOutcome::Skipped);

        assert!(matches!(first.await.unwrap(), CycleOutcome::Applied { .. }));
        assert_eq!(narrator.calls(), 1);
        assert!(trigger.try_spawn().is_some());
    }

    #[tokio::test]
    async fn test_capture_failure_logs_warning_and_continues() {
        let session = session();
        let frames = Arc::new(MockFrameSource::new(MockCapture::Fail("camera busy".to_string())));
        let trigger = trigger(session.clone(), Some(Arc::new(MockNarrator::replying("ok"))))
            .with_frame_source(frames.clone());

        assert!(matches!(trigger.run_cycle().await, CycleOutcome::Applied { .. }));
        let entries = session.snapshot().await.event_log.entries().to_vec();
        assert_eq!(entries[0].level, LogLevel::Success);
        assert_eq!(entries[1].level, LogLevel::Warning);
        assert!(entries[1].message.contains("camera busy"));
        assert_eq!(frames.calls(), 1);
    }

    #[tokio::test]
    async fn test_frame_reaches_narrator() {
        let frame = CapturedFrame {
            media_type: "image/jpeg".to_string(),
            data: "AAAA".to_string(),
        };
        let narrator = Arc::new(MockNarrator::replying("ok"));
        let trigger = trigger(session(), Some(narrator.clone()))
            .with_frame_source(Arc::new(MockFrameSource::new(MockCapture::Frame(frame.clone()))));

        trigger.run_cycle().await;
        let contexts = narrator.contexts().await;
        assert_eq!(contexts[0].frame.as_ref(), Some(&frame));
        assert_eq!(contexts[0].target, "Primary target");
    }

    #[test]
    fn test_fallback_reason_mapping() {
        assert!(matches!(
            fallback_reason(NarratorError::Timeout),
            FallbackReason::TimedOut
        ));
        assert!(matches!(
            fallback_reason(NarratorError::Empty),
            FallbackReason::UnusableResponse(_)
        ));
        assert!(matches!(
            fallback_reason(NarratorError::Unavailable("dns".to_string())),
            FallbackReason::Offline(_)
        ));
    }
}
