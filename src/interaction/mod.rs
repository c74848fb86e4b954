//! Page interaction
//!
//! Filling framework-managed fields and getting the submit control to act.

pub mod activation;
pub mod input;

pub use activation::{Activation, ActivationEngine, ESCALATION};
pub use input::InputSimulator;
