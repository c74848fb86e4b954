//! Run coordination
//!
//! Drives the queue strictly in order, one item at a time, with a pacing
//! delay between items. Cancellation is honoured between items only.

use crate::automation::orchestrator::ItemOrchestrator;
use crate::automation::progress::{CancelFlag, Progress, RunEvent};
use crate::automation::queue::load_items;
use crate::cdp::Session;
use crate::core::{Config, Item, Result, RunResult};
use crate::script::Evaluator;

/// Sequential driver over a loaded queue
pub struct RunCoordinator<'a> {
    eval: &'a dyn Evaluator,
    config: &'a Config,
    progress: Progress,
    cancel: CancelFlag,
}

impl<'a> RunCoordinator<'a> {
    pub fn new(eval: &'a dyn Evaluator, config: &'a Config) -> Self {
        Self {
            eval,
            config,
            progress: Progress::silent(),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Process every item and aggregate the outcome.
    ///
    /// Item failures are recorded and the queue continues; a session-fatal
    /// error stops the run and is returned instead of a result.
    pub async fn drive(&self, items: &[Item]) -> Result<RunResult> {
        let orchestrator = ItemOrchestrator::new(self.eval, self.config)?;
        let total = items.len();
        let mut reports = Vec::with_capacity(total);
        let mut cancelled = false;

        for (position, item) in items.iter().enumerate() {
            if self.cancel.is_cancelled() {
                let remaining = total - position;
                tracing::warn!(remaining, "run cancelled");
                self.progress.emit(RunEvent::Cancelled { remaining });
                cancelled = true;
                break;
            }

            tracing::info!(item = item.index, "item {}/{}", position + 1, total);
            self.progress.emit(RunEvent::ItemStarted {
                item: item.clone(),
                total,
            });

            let report = orchestrator.process(item, &self.progress).await?;
            self.progress.emit(RunEvent::ItemFinished(report.clone()));
            reports.push(report);

            if position + 1 < total {
                tokio::time::sleep(self.config.timing.pacing_delay()).await;
            }
        }

        let result = RunResult::from_reports(total, &reports, cancelled);
        tracing::info!(
            succeeded = result.succeeded,
            total = result.total,
            ratio = result.ratio(),
            passed = result.is_success(),
            "run finished"
        );
        Ok(result)
    }
}

/// Load the queue, attach to the browser and process every item.
///
/// The session is closed however the loop ends.
pub async fn run(config: &Config, cancel: CancelFlag, progress: Progress) -> Result<RunResult> {
    config.validate()?;
    let items = load_items(&config.queue.path)?;

    let session = Session::start(config).await?;
    let runner = session.runner();

    let outcome = RunCoordinator::new(&runner, config)
        .with_progress(progress)
        .with_cancel(cancel)
        .drive(&items)
        .await;

    session.close().await;
    outcome
}

/// [`run`] on a private runtime, for callers without one
pub fn run_blocking(config: &Config) -> Result<RunResult> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(config, CancelFlag::new(), Progress::silent()))
}
