//! Dashboard rendering with comfy-table.

use comfy_table::{presets, Cell, CellAlignment, Color, ContentArrangement, Table};
use std::env;

use crate::domain::models::{DashboardView, LogEntry, LogLevel, Phase};

/// Check if color output is supported
fn supports_color() -> bool {
    // Respect NO_COLOR environment variable
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

fn level_color(level: LogLevel) -> Color {
    match level {
        LogLevel::Info => Color::Cyan,
        LogLevel::Success => Color::Green,
        LogLevel::Warning => Color::Yellow,
        LogLevel::Error => Color::Red,
        LogLevel::Critical => Color::Magenta,
    }
}

fn phase_color(phase: Phase) -> Color {
    match phase {
        Phase::Scanning => Color::DarkGrey,
        Phase::Acquisition => Color::Yellow,
        Phase::Tracking => Color::Cyan,
        Phase::Locked => Color::Green,
    }
}

fn colored(cell: Cell, color: Color) -> Cell {
    if supports_color() {
        cell.fg(color)
    } else {
        cell
    }
}

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Key/value table of the dashboard gauges.
pub fn metrics_table(view: &DashboardView) -> Table {
    let mut table = base_table();
    table.set_header(vec!["Metric", "Value"]);

    let right = |text: String| Cell::new(text).set_alignment(CellAlignment::Right);
    table.add_row(vec![Cell::new("Uptime"), right(view.uptime.clone())]);
    table.add_row(vec![
        Cell::new("Processed"),
        right(view.total_processed.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("Precision"),
        right(format!("{:.2}%", view.precision_rate)),
    ]);
    table.add_row(vec![
        Cell::new("Coverage"),
        right(format!("{:.2}%", view.coverage_index)),
    ]);
    table.add_row(vec![
        Cell::new("Lock"),
        right(format!("{:.2}%", view.lock_strength)),
    ]);
    table.add_row(vec![
        Cell::new("Phase"),
        colored(
            Cell::new(view.phase.as_str()).set_alignment(CellAlignment::Right),
            phase_color(view.phase),
        ),
    ]);
    table
}

/// The newest `limit` log entries, newest first.
pub fn event_log_table(entries: &[LogEntry], limit: usize) -> Table {
    let mut table = base_table();
    table.set_header(vec!["Time", "Level", "Message"]);
    for entry in entries.iter().take(limit) {
        table.add_row(vec![
            Cell::new(&entry.timestamp),
            colored(Cell::new(entry.level.as_str()), level_color(entry.level)),
            Cell::new(&entry.message),
        ]);
    }
    table
}

/// Full human-readable dashboard.
pub fn render_dashboard(view: &DashboardView, log_limit: usize) -> String {
    let mut out = format!("> {}\n\n{}", view.message, metrics_table(view));
    if view.event_log.is_empty() {
        out.push_str("\n\nNo events recorded.");
    } else {
        out.push_str(&format!(
            "\n\nRecent events ({} of {}):\n{}",
            view.event_log.len().min(log_limit),
            view.event_log.len(),
            event_log_table(&view.event_log, log_limit)
        ));
    }
    out
}
