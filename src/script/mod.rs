//! Page scripting
//!
//! Typed scripts, the runner that evaluates them over the protocol, and the
//! page snapshot used for diagnostics.

pub mod builder;
pub mod runner;
pub mod snapshot;

pub use builder::Script;
pub use runner::{decode, Evaluator, ScriptRunner};
pub use snapshot::PageSnapshot;
