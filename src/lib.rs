//! Watchpost - autonomous telemetry dashboard engine
//!
//! Watchpost keeps a simulated monitoring session alive: a once-per-second
//! tick evolves the session metrics, every save is persisted so the session
//! survives restarts, and a narrator periodically rewrites the status
//! message shown on the dashboard, falling back to local messages when it
//! is unreachable.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Session model, event log and port traits
//! - **Adapters** (`adapters`): Storage, narrator, capture and clock implementations
//! - **Service Layer** (`services`): Metric evolution, reconciliation, scheduling
//! - **Application Layer** (`application`): Engine wiring
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use watchpost::application::{Engine, EngineOptions};
//! use watchpost::infrastructure::config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = Engine::build(ConfigLoader::load()?, EngineOptions::default())?;
//!     engine.scheduler.start_for(60)?.await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{Engine, EngineOptions, EngineParts};
pub use domain::models::{
    Config, CycleOutcome, DashboardView, EventLog, FallbackReason, LogEntry, LogLevel,
    NarrativePhase, Phase, SessionState,
};
pub use domain::ports::{Clock, FrameSource, LoadedSnapshot, Narrator, SessionStore};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{AutonomousScheduler, FallbackSelector, NarrativeTrigger, SessionService};
