//! Human-readable rendering helpers.

pub mod table;

pub use table::{event_log_table, metrics_table, render_dashboard};
