//! Shared types used across promptpilot modules
//!
//! Contains the queue item, selector sets, per-attempt records and the
//! aggregate run result.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::{PilotError, Result};

/// One unit of work from the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Zero-based position in the queue
    pub index: usize,
    /// Text payload to submit
    pub text: String,
}

impl Item {
    /// Create a new item
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Leading characters of the payload, for log lines
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.text.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{}...", head)
        } else {
            head
        }
    }
}

/// Logical UI role a selector set resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorRole {
    /// The text field receiving the payload
    Input,
    /// The submit affordance
    Control,
}

impl fmt::Display for SelectorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorRole::Input => write!(f, "input field"),
            SelectorRole::Control => write!(f, "activation control"),
        }
    }
}

/// Ordered, non-empty list of candidate selectors for one role.
///
/// Order is priority: the first candidate resolving to an element wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorSet {
    role: SelectorRole,
    candidates: Vec<String>,
}

impl SelectorSet {
    /// Build a selector set, dropping blank entries
    pub fn new(role: SelectorRole, candidates: Vec<String>) -> Result<Self> {
        let candidates: Vec<String> = candidates
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        if candidates.is_empty() {
            return Err(PilotError::config(format!(
                "selector list for the {} is empty",
                role
            )));
        }

        Ok(Self { role, candidates })
    }

    /// Role this set resolves
    pub fn role(&self) -> SelectorRole {
        self.role
    }

    /// Candidates in priority order
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Technique that got the control to act
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationMethod {
    /// Plain click on a control that became actionable on its own
    NativeClick,
    /// Disabled state forced off, then the control's own click
    ForcedClick,
    /// Parent force-enabled, inner glyph clicked
    InnerElementClick,
    /// Synthesized press/release/click at the control's center
    PointerSequence,
    /// Enclosing form submitted, or a submit event on the control
    FormSubmit,
}

impl fmt::Display for ActivationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationMethod::NativeClick => write!(f, "native click"),
            ActivationMethod::ForcedClick => write!(f, "forced click"),
            ActivationMethod::InnerElementClick => write!(f, "inner element click"),
            ActivationMethod::PointerSequence => write!(f, "pointer sequence"),
            ActivationMethod::FormSubmit => write!(f, "form submit"),
        }
    }
}

/// Three-way outcome of one interaction stage.
///
/// `NotReadyYet` is normal control flow (element missing, control never
/// took effect); `Fault` carries an item-local error. Session-fatal errors
/// never end up here, they travel as `Err`.
#[derive(Debug)]
pub enum Readiness<T> {
    Ready(T),
    NotReadyYet(String),
    Fault(PilotError),
}

impl<T> Readiness<T> {
    /// Sort an error into `NotReadyYet`/`Fault`, passing fatal errors through
    pub fn from_error(err: PilotError) -> Result<Self> {
        if err.is_fatal() {
            Err(err)
        } else if err.is_not_ready() {
            Ok(Self::NotReadyYet(err.to_string()))
        } else {
            Ok(Self::Fault(err))
        }
    }
}

/// How one attempt ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded,
    NotReady(String),
    Fault(String),
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Succeeded)
    }
}

/// Record of one retry round of one item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Queue position of the item
    pub item: usize,
    /// 1-based attempt number
    pub attempt: u32,
    /// Input selector that resolved, if any
    pub input_selector: Option<String>,
    /// Control selector that resolved, if any
    pub control_selector: Option<String>,
    /// Activation technique that took effect, if any
    pub method: Option<ActivationMethod>,
    pub outcome: AttemptOutcome,
    pub elapsed: Duration,
}

impl AttemptRecord {
    /// Start an empty record for the given attempt
    pub fn new(item: usize, attempt: u32) -> Self {
        Self {
            item,
            attempt,
            input_selector: None,
            control_selector: None,
            method: None,
            outcome: AttemptOutcome::NotReady(String::new()),
            elapsed: Duration::ZERO,
        }
    }
}

/// Everything that happened to one item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemReport {
    pub item: Item,
    pub succeeded: bool,
    pub attempts: Vec<AttemptRecord>,
}

/// Aggregate outcome of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Items in the queue
    pub total: usize,
    /// Items that reached activation and settled
    pub succeeded: usize,
    /// Indices of items that exhausted their attempts
    pub failed: Vec<usize>,
    /// Indices never started because the run was cancelled
    pub skipped: Vec<usize>,
    /// Whether the run stopped on a cancellation request
    pub cancelled: bool,
}

impl RunResult {
    /// Fold item reports into a result; items without a report count as skipped
    pub fn from_reports(total: usize, reports: &[ItemReport], cancelled: bool) -> Self {
        let succeeded = reports.iter().filter(|r| r.succeeded).count();
        let failed = reports
            .iter()
            .filter(|r| !r.succeeded)
            .map(|r| r.item.index)
            .collect();
        let skipped = (reports.len()..total).collect();

        Self {
            total,
            succeeded: succeeded.min(total),
            failed,
            skipped,
            cancelled,
        }
    }

    /// Fraction of items that succeeded
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.total as f64
    }

    /// Whether at least half the items succeeded
    pub fn is_success(&self) -> bool {
        self.total > 0 && self.succeeded * 2 >= self.total
    }
}
