//! Run progress and cancellation
//!
//! Front-ends observe a run through [`RunEvent`]s and stop it between items
//! through a [`CancelFlag`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::{AttemptRecord, Item, ItemReport};

/// Something that happened during a run
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// An item is about to be processed
    ItemStarted { item: Item, total: usize },
    /// One retry round finished
    AttemptFinished(AttemptRecord),
    /// An item finished, successfully or not
    ItemFinished(ItemReport),
    /// The run stopped early; `remaining` items were never started
    Cancelled { remaining: usize },
}

/// Callback receiving run events
pub type ProgressCallback = Box<dyn Fn(&RunEvent) + Send + Sync>;

/// Optional progress sink
#[derive(Default)]
pub struct Progress {
    callback: Option<ProgressCallback>,
}

impl Progress {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    /// A sink that drops every event
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: RunEvent) {
        if let Some(callback) = &self.callback {
            callback(&event);
        }
    }
}

/// Cloneable cancellation request, checked between items
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
