//! Common test utilities for integration tests
//!
//! Provides shared fixtures for building an engine on test doubles.

use std::sync::Arc;

use watchpost::adapters::clock::ManualClock;
use watchpost::domain::models::{Config, LogLevel, SessionState};
use watchpost::domain::ports::{Narrator, SessionStore};
use watchpost::services::ExpectedDrift;
use watchpost::{Engine, EngineParts};

/// Epoch milliseconds every fixture clock starts at.
#[allow(dead_code)]
pub const START_MILLIS: i64 = 1_700_000_000_000;

/// A manual clock at [`START_MILLIS`].
#[allow(dead_code)]
pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at_millis(START_MILLIS))
}

/// Build an engine with deterministic drift and no frame source.
#[allow(dead_code)]
pub fn engine(
    config: Config,
    store: Arc<dyn SessionStore>,
    clock: Arc<ManualClock>,
    narrator: Option<Arc<dyn Narrator>>,
) -> Engine {
    Engine::assemble(
        config,
        EngineParts {
            store,
            clock,
            narrator,
            frames: None,
            drift: Box::new(ExpectedDrift),
        },
    )
    .expect("engine should assemble")
}

/// Number of entries at `level` in the log.
#[allow(dead_code)]
pub fn count_level(state: &SessionState, level: LogLevel) -> usize {
    state
        .event_log
        .entries()
        .iter()
        .filter(|entry| entry.level == level)
        .count()
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
