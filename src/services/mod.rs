//! Engine services.

pub mod autonomous_scheduler;
pub mod downtime_reconciler;
pub mod fallback_selector;
pub mod metric_evolution;
pub mod narrative_trigger;
pub mod session_service;

pub use autonomous_scheduler::{AutonomousScheduler, NarrativeDispatch, SchedulerState, TickReport};
pub use downtime_reconciler::{DowntimeReconciler, Reconciliation};
pub use fallback_selector::FallbackSelector;
pub use metric_evolution::{catch_up, tick, DriftSource, EvolutionParams, ExpectedDrift, RandomDrift};
pub use narrative_trigger::{NarrativeTrigger, TriggerSettings};
pub use session_service::SessionService;
