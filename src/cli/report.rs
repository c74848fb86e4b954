//! Human-readable rendering of run progress and results

use crate::automation::RunEvent;
use crate::cdp::TargetInfo;
use crate::core::{AttemptOutcome, RunResult};

const RULE: &str = "─────────────────────────────────────────────";

/// Characters of an item shown in progress lines
const PREVIEW_CHARS: usize = 60;

/// One progress line for an event
pub fn render_event(event: &RunEvent) -> String {
    match event {
        RunEvent::ItemStarted { item, total } => format!(
            "[{}/{}] {}",
            item.index + 1,
            total,
            item.preview(PREVIEW_CHARS)
        ),
        RunEvent::AttemptFinished(record) => match &record.outcome {
            AttemptOutcome::Succeeded => format!(
                "    attempt {}: submitted via {} ({:.1}s)",
                record.attempt,
                record
                    .method
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                record.elapsed.as_secs_f64()
            ),
            AttemptOutcome::NotReady(reason) => {
                format!("    attempt {}: not ready: {}", record.attempt, reason)
            }
            AttemptOutcome::Fault(error) => {
                format!("    attempt {}: fault: {}", record.attempt, error)
            }
        },
        RunEvent::ItemFinished(report) => {
            let verdict = if report.succeeded { "done" } else { "FAILED" };
            format!("    {}", verdict)
        }
        RunEvent::Cancelled { remaining } => {
            format!("Cancelled, {} item(s) not started", remaining)
        }
    }
}

/// Final summary of a run
pub fn render_result(result: &RunResult) -> String {
    let mut output = String::new();
    output.push_str(RULE);
    output.push('\n');
    output.push_str(&format!(
        "Succeeded: {}/{} ({:.0}%)\n",
        result.succeeded,
        result.total,
        result.ratio() * 100.0
    ));

    if !result.failed.is_empty() {
        output.push_str(&format!("Failed items: {}\n", join_positions(&result.failed)));
    }
    if !result.skipped.is_empty() {
        output.push_str(&format!(
            "Skipped items: {}\n",
            join_positions(&result.skipped)
        ));
    }

    output.push_str(&format!(
        "Verdict: {}\n",
        if result.is_success() { "PASS" } else { "FAIL" }
    ));
    output.push_str(RULE);
    output
}

/// 1-based positions for display
fn join_positions(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|i| (i + 1).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Table of discovered targets
pub fn render_targets(targets: &[TargetInfo]) -> String {
    if targets.is_empty() {
        return "No targets.".to_string();
    }

    let mut output = format!("Targets ({}):\n", targets.len());
    for (i, target) in targets.iter().enumerate() {
        output.push_str(&format!(
            "  {}. [{}] {}\n     {}{}\n",
            i + 1,
            target.target_type,
            target.title,
            target.url,
            if target.is_connectable() {
                ""
            } else {
                " (not connectable)"
            }
        ));
    }
    output
}
