//! Custom error types for promptpilot
//!
//! Provides a unified error handling system across all modules.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for promptpilot operations
#[derive(Error, Debug)]
pub enum PilotError {
    /// The DevTools introspection endpoint could not be reached at all
    #[error("DevTools endpoint {endpoint} unreachable: {reason}. Is the browser running with --remote-debugging-port?")]
    DiscoveryUnavailable { endpoint: String, reason: String },

    /// The endpoint answered but no target could be selected or created
    #[error("No usable browser target: {0}")]
    NoTarget(String),

    /// The protocol connection is closed or dropped
    #[error("DevTools connection closed")]
    TransportClosed,

    /// The protocol returned an error object for a command
    #[error("DevTools error {code}: {message}")]
    RemoteEvaluation {
        code: i64,
        message: String,
        data: Option<String>,
    },

    /// The evaluated expression itself threw
    #[error("Script fault: {message}")]
    ScriptFault { message: String },

    /// Every activation strategy ran without an observable effect
    #[error("No activation strategy took effect on '{selector}'")]
    ActivationExhausted { selector: String },

    /// Queue source absent, unreadable or empty
    #[error("No items to process from {path}: {reason}")]
    QueueSourceMissing { path: PathBuf, reason: String },

    /// A command got no response within the configured timeout
    #[error("Command '{method}' timed out after {duration:?}")]
    CommandTimeout { method: String, duration: Duration },

    /// Unexpected message shape or serialization failure on the wire
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for promptpilot operations
pub type Result<T> = std::result::Result<T, PilotError>;

impl PilotError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a script fault
    pub fn script(msg: impl Into<String>) -> Self {
        Self::ScriptFault {
            message: msg.into(),
        }
    }

    /// Whether the error leaves the session unusable.
    ///
    /// Fatal errors end the run; everything else is contained by the
    /// per-item retry loop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DiscoveryUnavailable { .. }
                | Self::NoTarget(_)
                | Self::TransportClosed
                | Self::QueueSourceMissing { .. }
                | Self::Config(_)
        )
    }

    /// Whether the error means "the page isn't there yet" rather than a fault
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::ScriptFault { .. })
    }
}
