//! promptpilot - queue-driven prompt submission over the DevTools protocol
//!
//! Attaches to a running browser's remote-debugging endpoint, finds the
//! platform tab and submits each queued prompt through the page's own UI,
//! retrying and escalating when the page's framework resists.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **CDP**: Target discovery, WebSocket transport and session setup
//! - **Script**: Typed page scripts and their evaluation
//! - **Interaction**: Field filling and control activation
//! - **Automation**: Queue loading, per-item retries and the run loop
//! - **CLI**: Subcommands and report rendering
//!
//! # Usage
//!
//! ```rust,no_run
//! use promptpilot::automation::{run, CancelFlag, Progress};
//! use promptpilot::Config;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::load().unwrap();
//!     let result = run(&config, CancelFlag::new(), Progress::silent())
//!         .await
//!         .unwrap();
//!     println!("{}/{} submitted", result.succeeded, result.total);
//! }
//! ```

pub mod automation;
pub mod cdp;
pub mod cli;
pub mod core;
pub mod interaction;
pub mod script;

#[cfg(test)]
mod testing;

// Re-export commonly used items
pub use automation::{run, run_blocking, CancelFlag, Progress, RunEvent};
pub use core::{Config, PilotError, Result, RunResult};
