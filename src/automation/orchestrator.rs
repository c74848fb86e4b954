//! Per-item retry orchestration
//!
//! One item goes through up to `retry_attempts` rounds of
//! locate input → fill → locate control → activate → settle. Nothing found in
//! one round is trusted in the next, since the page may have re-rendered.
//! Item-local faults are contained here; session-fatal errors propagate.

use std::time::Instant;

use crate::automation::progress::{Progress, RunEvent};
use crate::core::{
    ActivationMethod, AttemptOutcome, AttemptRecord, Config, Item, ItemReport, PilotError,
    Readiness, Result, SelectorRole, SelectorSet,
};
use crate::interaction::{Activation, ActivationEngine, InputSimulator};
use crate::script::{Evaluator, PageSnapshot};

/// Characters of an item shown in log lines
const PREVIEW_CHARS: usize = 50;

/// Drives single items through the interaction sequence
pub struct ItemOrchestrator<'a> {
    eval: &'a dyn Evaluator,
    config: &'a Config,
    inputs: SelectorSet,
    controls: SelectorSet,
}

impl<'a> ItemOrchestrator<'a> {
    pub fn new(eval: &'a dyn Evaluator, config: &'a Config) -> Result<Self> {
        Ok(Self {
            eval,
            config,
            inputs: config.selector_set(SelectorRole::Input)?,
            controls: config.selector_set(SelectorRole::Control)?,
        })
    }

    /// First candidate that currently resolves, in priority order.
    ///
    /// A candidate whose lookup throws (unsupported selector syntax) counts
    /// as absent. When nothing resolves the page is inspected and logged.
    pub async fn locate(&self, set: &SelectorSet) -> Result<Readiness<String>> {
        for candidate in set.candidates() {
            match self.eval.element_exists(candidate).await {
                Ok(true) => {
                    tracing::debug!(role = %set.role(), selector = %candidate, "selector resolved");
                    return Ok(Readiness::Ready(candidate.clone()));
                }
                Ok(false) => continue,
                Err(err) => match Readiness::<String>::from_error(err)? {
                    Readiness::Fault(err) => return Ok(Readiness::Fault(err)),
                    _ => {
                        tracing::debug!(selector = %candidate, "selector lookup threw, skipping");
                        continue;
                    }
                },
            }
        }

        self.diagnose(set.role()).await?;
        Ok(Readiness::NotReadyYet(format!(
            "no {} selector matched ({} candidates)",
            set.role(),
            set.len()
        )))
    }

    async fn diagnose(&self, role: SelectorRole) -> Result<()> {
        match PageSnapshot::capture(self.eval).await {
            Ok(snapshot) => {
                tracing::warn!(
                    %role,
                    "no selector matched, current page:\n{}",
                    snapshot.format_for_display()
                );
                Ok(())
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                tracing::debug!(error = %err, "page inspection failed");
                Ok(())
            }
        }
    }

    /// One round for one item
    async fn attempt(
        &self,
        item: &Item,
        record: &mut AttemptRecord,
    ) -> Result<Readiness<ActivationMethod>> {
        let input = match self.locate(&self.inputs).await? {
            Readiness::Ready(selector) => selector,
            Readiness::NotReadyYet(reason) => return Ok(Readiness::NotReadyYet(reason)),
            Readiness::Fault(err) => return Ok(Readiness::Fault(err)),
        };
        record.input_selector = Some(input.clone());

        let simulator = InputSimulator::new(self.eval, &self.config.timing);
        match simulator.fill(&input, &item.text).await {
            Ok(true) => {}
            Ok(false) => {
                return Ok(Readiness::NotReadyYet(format!(
                    "field '{}' did not accept text",
                    input
                )))
            }
            Err(err) => return Readiness::from_error(err),
        }

        tokio::time::sleep(self.config.timing.post_fill_delay()).await;

        let control = match self.locate(&self.controls).await? {
            Readiness::Ready(selector) => selector,
            Readiness::NotReadyYet(reason) => return Ok(Readiness::NotReadyYet(reason)),
            Readiness::Fault(err) => return Ok(Readiness::Fault(err)),
        };
        record.control_selector = Some(control.clone());

        let engine = ActivationEngine::new(self.eval, self.config);
        match engine.activate(&control).await {
            Ok(Activation::Activated(method)) => Ok(Readiness::Ready(method)),
            Ok(Activation::Failed) => Ok(Readiness::NotReadyYet(
                PilotError::ActivationExhausted { selector: control }.to_string(),
            )),
            Err(err) => Readiness::from_error(err),
        }
    }

    /// Process one item to success or retry exhaustion
    pub async fn process(&self, item: &Item, progress: &Progress) -> Result<ItemReport> {
        let rounds = self.config.timing.retry_attempts;
        let mut attempts = Vec::new();

        tracing::info!(
            item = item.index,
            text = %item.preview(PREVIEW_CHARS),
            "processing item"
        );

        for attempt in 1..=rounds {
            let started = Instant::now();
            let mut record = AttemptRecord::new(item.index, attempt);

            let readiness = self.attempt(item, &mut record).await?;
            record.outcome = match readiness {
                Readiness::Ready(method) => {
                    record.method = Some(method);
                    tracing::info!(
                        item = item.index,
                        attempt,
                        %method,
                        settle = ?self.config.timing.settle_delay(),
                        "submitted, waiting for generation"
                    );
                    tokio::time::sleep(self.config.timing.settle_delay()).await;
                    AttemptOutcome::Succeeded
                }
                Readiness::NotReadyYet(reason) => {
                    tracing::warn!(item = item.index, attempt, %reason, "not ready");
                    AttemptOutcome::NotReady(reason)
                }
                Readiness::Fault(err) => {
                    tracing::warn!(item = item.index, attempt, error = %err, "attempt faulted");
                    AttemptOutcome::Fault(err.to_string())
                }
            };
            record.elapsed = started.elapsed();

            let succeeded = record.outcome.is_success();
            progress.emit(RunEvent::AttemptFinished(record.clone()));
            attempts.push(record);

            if succeeded {
                return Ok(ItemReport {
                    item: item.clone(),
                    succeeded: true,
                    attempts,
                });
            }

            if attempt < rounds {
                tokio::time::sleep(self.config.timing.retry_delay()).await;
            }
        }

        tracing::error!(item = item.index, rounds, "item failed after all attempts");
        Ok(ItemReport {
            item: item.clone(),
            succeeded: false,
            attempts,
        })
    }
}
