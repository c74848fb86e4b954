//! CLI module - command-line front-end
//!
//! Subcommand handlers and rendering of progress and results.

pub mod commands;
pub mod report;

pub use commands::{inspect_page, list_targets, show_config};
pub use report::{render_event, render_result, render_targets};
