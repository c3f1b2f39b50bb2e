//! Clock port - source of wall-clock time.

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Injected so downtime reconciliation and save stamps can be driven
/// deterministically in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current time in epoch milliseconds.
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}
