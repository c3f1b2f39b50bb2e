//! Engine wiring.
//!
//! Builds the session, narrative trigger and scheduler from a [`Config`] and
//! a set of port implementations. [`Engine::build`] picks the production
//! adapters; [`Engine::assemble`] takes them from the caller.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::adapters::capture::FileFrameSource;
use crate::adapters::clock::SystemClock;
use crate::adapters::narrators::AnthropicNarrator;
use crate::adapters::storage::JsonFileSessionStore;
use crate::domain::errors::DomainResult;
use crate::domain::models::Config;
use crate::domain::ports::{Clock, FrameSource, Narrator, SessionStore};
use crate::services::{
    AutonomousScheduler, DowntimeReconciler, DriftSource, EvolutionParams, FallbackSelector,
    NarrativeTrigger, RandomDrift, Reconciliation, SessionService, TriggerSettings,
};

/// How the production engine is built.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    /// Never contact the narrator; every cycle uses a local message.
    pub offline: bool,
}

/// Port implementations the engine runs on.
pub struct EngineParts {
    pub store: Arc<dyn SessionStore>,
    pub clock: Arc<dyn Clock>,
    pub narrator: Option<Arc<dyn Narrator>>,
    pub frames: Option<Arc<dyn FrameSource>>,
    pub drift: Box<dyn DriftSource + Send>,
}

/// A fully wired engine.
pub struct Engine {
    pub config: Config,
    pub session: Arc<SessionService>,
    pub trigger: Arc<NarrativeTrigger>,
    pub scheduler: Arc<AutonomousScheduler>,
    /// What happened while restoring the persisted session.
    pub reconciliation: Reconciliation,
}

impl Engine {
    /// Wire the production adapters.
    pub fn build(config: Config, options: EngineOptions) -> DomainResult<Self> {
        let narrator: Option<Arc<dyn Narrator>> = if options.offline || !config.narrative.enabled {
            info!(offline = options.offline, "narrator disabled, using local messages only");
            None
        } else {
            let narrator = AnthropicNarrator::new(
                config.narrator.clone(),
                Duration::from_secs(config.narrative.timeout_secs),
            )?;
            if !narrator.has_api_key() {
                warn!("no narrator API key configured; narrative cycles will fall back");
            }
            Some(Arc::new(narrator))
        };

        let frames = FileFrameSource::from_config(&config.capture)
            .map(|source| Arc::new(source) as Arc<dyn FrameSource>);

        let parts = EngineParts {
            store: Arc::new(JsonFileSessionStore::new(&config.state_path)),
            clock: Arc::new(SystemClock),
            narrator,
            frames,
            drift: Box::new(RandomDrift::new(StdRng::from_entropy())),
        };
        Self::assemble(config, parts)
    }

    /// Wire the given adapters. Loads and reconciles the persisted session.
    pub fn assemble(config: Config, parts: EngineParts) -> DomainResult<Self> {
        let params = EvolutionParams::from(&config.evolution);
        let capacity = config.evolution.event_log_capacity;
        let reconciler = DowntimeReconciler::new(
            params.clone(),
            config.evolution.downtime_threshold_secs,
            capacity,
        );
        let fallback = FallbackSelector::from_config(&config.narrative.fallback_messages)?;

        let (session, reconciliation) = SessionService::open(
            parts.store,
            parts.clock,
            &reconciler,
            capacity,
            fallback.select(),
        )?;
        let session = Arc::new(session);

        let mut trigger = NarrativeTrigger::new(
            session.clone(),
            parts.narrator,
            fallback,
            TriggerSettings::from(&config.narrative),
        );
        if let Some(frames) = parts.frames {
            trigger = trigger.with_frame_source(frames);
        }
        let trigger = Arc::new(trigger);

        let scheduler = Arc::new(AutonomousScheduler::new(
            session.clone(),
            trigger.clone(),
            params,
            parts.drift,
            &config.scheduler,
        ));

        Ok(Self {
            config,
            session,
            trigger,
            scheduler,
            reconciliation,
        })
    }

    /// Stop the scheduler and give an in-flight narrative cycle up to
    /// `grace` to finish. Returns false if the cycle was still running.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.scheduler.stop();
        let deadline = Instant::now() + grace;
        while self.trigger.is_in_flight() {
            if Instant::now() >= deadline {
                warn!("narrative cycle still in flight at shutdown");
                return false;
            }
            sleep(Duration::from_millis(25)).await;
        }
        true
    }
}
