//! Metric evolution unit.
//!
//! Pure functions that advance the simulated telemetry. `tick` applies one
//! scheduler period; `catch_up` applies the expected effect of many periods
//! in a single O(1) step and is what downtime reconciliation uses.

use rand::Rng;

use crate::domain::models::config::EvolutionConfig;
use crate::domain::models::session::{SessionState, PERCENT_MAX};

/// Bounds of the per-tick drift.
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionParams {
    pub processed_min: u64,
    pub processed_max: u64,
    pub precision_step_max: f64,
    pub coverage_step_max: f64,
    pub lock_step_max: f64,
}

impl Default for EvolutionParams {
    fn default() -> Self {
        Self::from(&EvolutionConfig::default())
    }
}

impl From<&EvolutionConfig> for EvolutionParams {
    fn from(config: &EvolutionConfig) -> Self {
        Self {
            processed_min: config.processed_min.min(config.processed_max),
            processed_max: config.processed_max.max(config.processed_min),
            precision_step_max: sanitize_step(config.precision_step_max),
            coverage_step_max: sanitize_step(config.coverage_step_max),
            lock_step_max: sanitize_step(config.lock_step_max),
        }
    }
}

fn sanitize_step(step: f64) -> f64 {
    if step.is_finite() {
        step.clamp(0.0, PERCENT_MAX)
    } else {
        0.0
    }
}

impl EvolutionParams {
    /// Mean processed increment of one tick.
    pub fn mean_processed(&self) -> u64 {
        self.processed_min + (self.processed_max - self.processed_min) / 2
    }
}

/// Source of per-tick jitter.
pub trait DriftSource {
    /// Processed increment in `[min, max]`.
    fn processed(&mut self, min: u64, max: u64) -> u64;

    /// Gauge step in `[0, max]`.
    fn step(&mut self, max: f64) -> f64;
}

/// Uniform jitter drawn from a `rand` generator.
#[derive(Debug, Clone)]
pub struct RandomDrift<R> {
    rng: R,
}

impl<R: Rng> RandomDrift<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> DriftSource for RandomDrift<R> {
    fn processed(&mut self, min: u64, max: u64) -> u64 {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    fn step(&mut self, max: f64) -> f64 {
        if max <= 0.0 {
            return 0.0;
        }
        self.rng.gen_range(0.0..=max)
    }
}

/// Jitter fixed at the mean draw.
///
/// Running `n` ticks with this source is exactly what `catch_up` computes
/// for `n` seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpectedDrift;

impl DriftSource for ExpectedDrift {
    fn processed(&mut self, min: u64, max: u64) -> u64 {
        if min >= max {
            return min;
        }
        min + (max - min) / 2
    }

    fn step(&mut self, max: f64) -> f64 {
        max.max(0.0) / 2.0
    }
}

/// Advance the state by one scheduler period.
pub fn tick<D>(mut state: SessionState, params: &EvolutionParams, drift: &mut D) -> SessionState
where
    D: DriftSource + ?Sized,
{
    state.uptime_seconds = state.uptime_seconds.saturating_add(1);
    state.total_processed = state
        .total_processed
        .saturating_add(drift.processed(params.processed_min, params.processed_max));
    state.precision_rate = raise(state.precision_rate, drift.step(params.precision_step_max));
    state.coverage_index = raise(state.coverage_index, drift.step(params.coverage_step_max));
    state.lock_strength = raise(state.lock_strength, drift.step(params.lock_step_max));
    state
}

/// Apply the expected effect of `seconds` ticks in one step.
pub fn catch_up(mut state: SessionState, params: &EvolutionParams, seconds: u64) -> SessionState {
    if seconds == 0 {
        return state;
    }
    let mut drift = ExpectedDrift;
    #[allow(clippy::cast_precision_loss)]
    let periods = seconds as f64;

    state.uptime_seconds = state.uptime_seconds.saturating_add(seconds);
    state.total_processed = state
        .total_processed
        .saturating_add(params.mean_processed().saturating_mul(seconds));
    state.precision_rate = raise(
        state.precision_rate,
        drift.step(params.precision_step_max) * periods,
    );
    state.coverage_index = raise(
        state.coverage_index,
        drift.step(params.coverage_step_max) * periods,
    );
    state.lock_strength = raise(state.lock_strength, drift.step(params.lock_step_max) * periods);
    state
}

/// Saturating increase of a percentage gauge.
fn raise(value: f64, delta: f64) -> f64 {
    let base = if value.is_finite() { value } else { 0.0 };
    let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
    (base + delta).clamp(0.0, PERCENT_MAX)
}
