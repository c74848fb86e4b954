//! Core module - shared infrastructure for promptpilot
//!
//! This module contains foundational types, configuration, and error handling
//! used throughout the application.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{PilotError, Result};
pub use types::*;
