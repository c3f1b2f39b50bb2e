//! Command-line interface.

pub mod commands;
pub mod display;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};

/// Render a command error for the terminal.
pub fn render_error(err: &anyhow::Error, json_mode: bool) -> String {
    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        serde_json::to_string_pretty(&body).unwrap_or_default()
    } else {
        format!("Error: {err:#}")
    }
}

/// Print a command error. JSON goes to stdout, text to stderr.
///
/// The caller decides the exit status, so guards held by `main` (such as
/// the log writer) still flush on the way out.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) {
    let rendered = render_error(err, json_mode);
    if json_mode {
        println!("{rendered}");
    } else {
        eprintln!("{rendered}");
    }
}
