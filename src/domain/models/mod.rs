pub mod config;
pub mod event_log;
pub mod narrative;
pub mod session;

pub use config::{
    CaptureConfig, Config, EvolutionConfig, LoggingConfig, NarrativeConfig, NarratorConfig,
    SchedulerConfig,
};
pub use event_log::{EventLog, LogEntry, LogLevel};
pub use narrative::{CapturedFrame, CycleOutcome, FallbackReason, NarrativeContext, NarrativePhase};
pub use session::{format_uptime, DashboardView, Phase, SessionState};
