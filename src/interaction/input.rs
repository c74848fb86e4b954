//! Text entry into framework-managed fields
//!
//! Frameworks that wrap a field's `value` accessor ignore plain assignments.
//! The simulator writes through the native setter and replays the event
//! sequence the framework listens for, then re-reads the field.

use serde::Deserialize;

use crate::core::config::TimingConfig;
use crate::core::Result;
use crate::script::{decode, Evaluator, Script};

/// Characters of the payload the read-back must contain
pub const VERIFY_PREFIX_CHARS: usize = 20;

#[derive(Debug, Deserialize)]
struct FieldProbe {
    found: bool,
    #[serde(default)]
    tag: String,
    #[serde(default)]
    value: String,
    #[serde(default)]
    placeholder: String,
}

#[derive(Debug, Deserialize)]
struct WriteOutcome {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    length: usize,
}

#[derive(Debug, Deserialize)]
struct Verification {
    found: bool,
    #[serde(default)]
    length: usize,
    #[serde(default)]
    matches: bool,
}

/// Fills one field the way a person typing would look to the framework
pub struct InputSimulator<'a> {
    eval: &'a dyn Evaluator,
    timing: &'a TimingConfig,
}

impl<'a> InputSimulator<'a> {
    pub fn new(eval: &'a dyn Evaluator, timing: &'a TimingConfig) -> Self {
        Self { eval, timing }
    }

    async fn run<T: for<'de> Deserialize<'de>>(&self, script: Script) -> Result<T> {
        let value = self.eval.run(&script).await?;
        decode(&script, value)
    }

    /// Fill `selector` with `text`.
    ///
    /// Returns `false` on a hard fault (element missing, no native setter).
    /// A read-back that doesn't match is logged and still returns `true`.
    pub async fn fill(&self, selector: &str, text: &str) -> Result<bool> {
        let probe: FieldProbe = self
            .run(Script::InspectField {
                selector: selector.to_string(),
            })
            .await?;

        if !probe.found {
            tracing::warn!(selector, "field not found");
            return Ok(false);
        }
        tracing::debug!(
            selector,
            tag = %probe.tag,
            current = %probe.value,
            placeholder = %probe.placeholder,
            "field before fill"
        );

        let cleared: WriteOutcome = self
            .run(Script::FocusAndClear {
                selector: selector.to_string(),
            })
            .await?;
        if !cleared.ok {
            tracing::warn!(
                selector,
                error = cleared.error.as_deref().unwrap_or("unknown"),
                "failed to clear field"
            );
            return Ok(false);
        }

        let written: WriteOutcome = self
            .run(Script::SetValue {
                selector: selector.to_string(),
                text: text.to_string(),
            })
            .await?;
        if !written.ok {
            tracing::warn!(
                selector,
                error = written.error.as_deref().unwrap_or("unknown"),
                "failed to set field value"
            );
            return Ok(false);
        }
        tracing::debug!(selector, length = written.length, "value written");

        self.eval
            .run(&Script::TrailingEvents {
                selector: selector.to_string(),
                reassert_ms: self.timing.reassert_ms,
            })
            .await?;

        tokio::time::sleep(self.timing.fill_settle_delay()).await;

        let prefix: String = text.chars().take(VERIFY_PREFIX_CHARS).collect();
        let check: Verification = self
            .run(Script::VerifyValue {
                selector: selector.to_string(),
                prefix,
            })
            .await?;

        if check.found && check.matches {
            tracing::info!(selector, chars = check.length, "text filled");
        } else {
            // Re-render timing makes this unreliable; the activation step
            // fails on its own if the field really is empty.
            tracing::warn!(
                selector,
                found = check.found,
                chars = check.length,
                "fill verification did not match"
            );
        }

        Ok(true)
    }
}
