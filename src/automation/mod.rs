//! Queue automation
//!
//! Loading the queue, retrying single items and driving the whole run.

pub mod coordinator;
pub mod orchestrator;
pub mod progress;
pub mod queue;

pub use coordinator::{run, run_blocking, RunCoordinator};
pub use orchestrator::ItemOrchestrator;
pub use progress::{CancelFlag, Progress, ProgressCallback, RunEvent};
pub use queue::{load_items, parse_items};
