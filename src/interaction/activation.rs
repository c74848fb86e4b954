//! Control activation
//!
//! Waits for the submit control to become actionable and clicks it. If it
//! never does, runs a fixed escalation of increasingly invasive strategies
//! and stops at the first one with an observable effect on the page.

use serde::Deserialize;

use crate::core::config::{Config, SelectorConfig, TimingConfig};
use crate::core::{ActivationMethod, Result};
use crate::script::{decode, Evaluator, Script};

/// Escalation order, least invasive first
pub const ESCALATION: [ActivationMethod; 4] = [
    ActivationMethod::ForcedClick,
    ActivationMethod::InnerElementClick,
    ActivationMethod::PointerSequence,
    ActivationMethod::FormSubmit,
];

/// Polls between probe log lines
const PROBE_LOG_EVERY: u64 = 10;

/// Terminal state of one activation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Activated(ActivationMethod),
    Failed,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ControlState {
    found: bool,
    #[serde(default)]
    disabled: bool,
    #[serde(default)]
    visible: bool,
    #[serde(default = "valid_by_default")]
    form_valid: bool,
    #[serde(default)]
    pointer_events: String,
    #[serde(default)]
    text: String,
}

fn valid_by_default() -> bool {
    true
}

impl ControlState {
    fn is_actionable(&self, require_valid_form: bool) -> bool {
        self.found
            && !self.disabled
            && self.visible
            && self.pointer_events != "none"
            && (!require_valid_form || self.form_valid)
    }
}

#[derive(Debug, Deserialize)]
struct StrategyOutcome {
    applied: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SideEffect {
    #[serde(default)]
    loading: bool,
    #[serde(default)]
    control_changed: bool,
    #[serde(default)]
    url_changed: bool,
    #[serde(default)]
    observed: bool,
}

/// Drives one control from "maybe disabled" to "action accepted"
pub struct ActivationEngine<'a> {
    eval: &'a dyn Evaluator,
    timing: &'a TimingConfig,
    selectors: &'a SelectorConfig,
    require_valid_form: bool,
}

impl<'a> ActivationEngine<'a> {
    pub fn new(eval: &'a dyn Evaluator, config: &'a Config) -> Self {
        Self {
            eval,
            timing: &config.timing,
            selectors: &config.selectors,
            require_valid_form: config.platform.require_valid_form,
        }
    }

    /// Activate the control at `selector`
    pub async fn activate(&self, selector: &str) -> Result<Activation> {
        let baseline = match self.probe(selector).await? {
            Probe::Actionable(text) => {
                if self.eval.click(selector).await? {
                    tracing::info!(selector, "control activated");
                    return Ok(Activation::Activated(ActivationMethod::NativeClick));
                }
                tracing::warn!(selector, "click was refused, escalating");
                Some(text)
            }
            Probe::TimedOut(text) => {
                tracing::warn!(
                    selector,
                    waited = ?self.timing.enable_timeout(),
                    "control never became actionable, escalating"
                );
                text
            }
        };

        self.escalate(selector, baseline).await
    }

    async fn control_state(&self, selector: &str) -> Result<ControlState> {
        let script = Script::ControlState {
            selector: selector.to_string(),
        };
        let value = self.eval.run(&script).await?;
        decode(&script, value)
    }

    async fn probe(&self, selector: &str) -> Result<Probe> {
        let polls = self.timing.enable_polls();
        let mut last_text = None;

        for poll in 0..polls {
            let state = self.control_state(selector).await?;
            if state.is_actionable(self.require_valid_form) {
                return Ok(Probe::Actionable(state.text));
            }
            if state.found {
                last_text = Some(state.text.clone());
            }

            if poll % PROBE_LOG_EVERY == 0 {
                tracing::debug!(
                    selector,
                    poll,
                    found = state.found,
                    disabled = state.disabled,
                    visible = state.visible,
                    form_valid = state.form_valid,
                    "waiting for control"
                );
            }

            if poll + 1 < polls {
                tokio::time::sleep(self.timing.enable_poll()).await;
            }
        }

        Ok(Probe::TimedOut(last_text))
    }

    fn strategy(&self, method: ActivationMethod, selector: &str) -> Script {
        let selector = selector.to_string();
        match method {
            ActivationMethod::NativeClick => Script::Click { selector },
            ActivationMethod::ForcedClick => Script::ForceClick { selector },
            ActivationMethod::InnerElementClick => Script::InnerElementClick {
                selector,
                inner: self.selectors.inner_icon.clone(),
            },
            ActivationMethod::PointerSequence => Script::PointerSequence { selector },
            ActivationMethod::FormSubmit => Script::SubmitForm { selector },
        }
    }

    async fn side_effect(&self, selector: &str, baseline: Option<&str>) -> Result<SideEffect> {
        let script = Script::SideEffect {
            selector: selector.to_string(),
            baseline_text: baseline.map(str::to_string),
            loading: self.selectors.loading_indicators.clone(),
            url_markers: self.selectors.result_url_markers.clone(),
        };
        let value = self.eval.run(&script).await?;
        decode(&script, value)
    }

    async fn escalate(&self, selector: &str, baseline: Option<String>) -> Result<Activation> {
        for method in ESCALATION {
            let script = self.strategy(method, selector);
            let applied = match self.eval.run(&script).await {
                Ok(value) => decode::<StrategyOutcome>(&script, value)?,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    tracing::warn!(selector, %method, error = %err, "strategy failed");
                    continue;
                }
            };

            if !applied.applied {
                tracing::debug!(
                    selector,
                    %method,
                    reason = applied.error.as_deref().unwrap_or("unknown"),
                    "strategy not applicable"
                );
                continue;
            }

            tokio::time::sleep(self.timing.strategy_pause()).await;

            let effect = self.side_effect(selector, baseline.as_deref()).await?;
            if effect.observed {
                tracing::info!(
                    selector,
                    %method,
                    loading = effect.loading,
                    control_changed = effect.control_changed,
                    url_changed = effect.url_changed,
                    "control activated"
                );
                return Ok(Activation::Activated(method));
            }
            tracing::debug!(selector, %method, "no observable effect");
        }

        tracing::warn!(selector, "all activation strategies exhausted");
        Ok(Activation::Failed)
    }
}

/// Both variants carry the control's text as the change baseline
enum Probe {
    Actionable(String),
    TimedOut(Option<String>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PilotError;
    use crate::testing::FakePage;
    use serde_json::{json, Value};

    fn config() -> Config {
        Config {
            timing: TimingConfig::immediate(),
            ..Config::default()
        }
    }

    fn disabled() -> Value {
        json!({
            "found": true,
            "disabled": true,
            "visible": true,
            "formValid": true,
            "pointerEvents": "auto",
            "text": "arrow_forward"
        })
    }

    fn strategies(names: &[&'static str]) -> Vec<&'static str> {
        names
            .iter()
            .copied()
            .filter(|n| {
                matches!(
                    *n,
                    "force_click" | "inner_element_click" | "pointer_sequence" | "submit_form"
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_actionable_control_is_clicked() {
        let page = FakePage::new(|script: &Script| match script {
            Script::ControlState { .. } => Ok(json!({
                "found": true, "disabled": false, "visible": true, "text": "Go"
            })),
            Script::Click { .. } => Ok(json!(true)),
            other => panic!("unexpected {}", other.name()),
        });
        let config = config();
        let result = ActivationEngine::new(&page, &config)
            .activate("button")
            .await
            .unwrap();

        assert_eq!(result, Activation::Activated(ActivationMethod::NativeClick));
        assert_eq!(page.names(), vec!["control_state", "click"]);
    }

    #[tokio::test]
    async fn test_stops_at_first_effective_strategy() {
        let page = FakePage::new(|script: &Script| match script {
            Script::ControlState { .. } => Ok(disabled()),
            Script::ForceClick { .. } => Ok(json!({ "applied": true })),
            Script::SideEffect { .. } => Ok(json!({ "loading": true, "observed": true })),
            other => panic!("strategy after success: {}", other.name()),
        });
        let config = config();
        let result = ActivationEngine::new(&page, &config)
            .activate("button")
            .await
            .unwrap();

        assert_eq!(result, Activation::Activated(ActivationMethod::ForcedClick));
        assert!(!page.names().contains(&"pointer_sequence"));
    }

    #[tokio::test]
    async fn test_strategies_run_in_order_until_exhausted() {
        let page = FakePage::new(|script: &Script| match script {
            Script::ControlState { .. } => Ok(disabled()),
            Script::SideEffect { .. } => Ok(json!({ "observed": false })),
            _ => Ok(json!({ "applied": true })),
        });
        let config = config();
        let result = ActivationEngine::new(&page, &config)
            .activate("button")
            .await
            .unwrap();

        assert_eq!(result, Activation::Failed);
        assert_eq!(
            strategies(&page.names()),
            vec![
                "force_click",
                "inner_element_click",
                "pointer_sequence",
                "submit_form"
            ]
        );
    }

    #[tokio::test]
    async fn test_third_strategy_wins() {
        // The loading indicator only shows up once the pointer sequence ran.
        let mut pointer_seen = false;
        let page = FakePage::new(move |script: &Script| match script {
            Script::ControlState { .. } => Ok(disabled()),
            Script::SideEffect { .. } => Ok(json!({ "loading": pointer_seen, "observed": pointer_seen })),
            Script::PointerSequence { .. } => {
                pointer_seen = true;
                Ok(json!({ "applied": true }))
            }
            Script::SubmitForm { .. } => panic!("form submitted after success"),
            _ => Ok(json!({ "applied": true })),
        });
        let config = config();
        let result = ActivationEngine::new(&page, &config)
            .activate("button")
            .await
            .unwrap();

        assert_eq!(
            result,
            Activation::Activated(ActivationMethod::PointerSequence)
        );
        assert_eq!(
            strategies(&page.names()),
            vec!["force_click", "inner_element_click", "pointer_sequence"]
        );
    }

    #[tokio::test]
    async fn test_inner_click_uses_configured_glyph() {
        let page = FakePage::new(|script: &Script| match script {
            Script::ControlState { .. } => Ok(disabled()),
            Script::ForceClick { .. } => Ok(json!({ "applied": true })),
            Script::InnerElementClick { .. } => Ok(json!({ "applied": true })),
            Script::SideEffect { .. } => Ok(json!({ "observed": false })),
            _ => Ok(json!({ "applied": false, "error": "control not found" })),
        });
        let mut config = config();
        config.selectors.inner_icon = "svg.icon".to_string();
        ActivationEngine::new(&page, &config)
            .activate("button")
            .await
            .unwrap();

        let inner = page
            .calls()
            .into_iter()
            .find_map(|s| match s {
                Script::InnerElementClick { inner, .. } => Some(inner),
                _ => None,
            })
            .unwrap();
        assert_eq!(inner, "svg.icon");
    }

    #[tokio::test]
    async fn test_side_effect_uses_control_text_baseline() {
        let page = FakePage::new(|script: &Script| match script {
            Script::ControlState { .. } => Ok(disabled()),
            Script::SideEffect { .. } => Ok(json!({ "observed": true, "controlChanged": true })),
            _ => Ok(json!({ "applied": true })),
        });
        let config = config();
        ActivationEngine::new(&page, &config)
            .activate("button")
            .await
            .unwrap();

        let baseline = page
            .calls()
            .into_iter()
            .find_map(|s| match s {
                Script::SideEffect { baseline_text, .. } => Some(baseline_text),
                _ => None,
            })
            .unwrap();
        assert_eq!(baseline.as_deref(), Some("arrow_forward"));
    }

    #[tokio::test]
    async fn test_refused_click_keeps_control_text_baseline() {
        let page = FakePage::new(|script: &Script| match script {
            Script::ControlState { .. } => Ok(json!({
                "found": true, "disabled": false, "visible": true, "text": "Generate"
            })),
            Script::Click { .. } => Ok(json!(false)),
            Script::SideEffect { .. } => Ok(json!({ "observed": true, "controlChanged": true })),
            _ => Ok(json!({ "applied": true })),
        });
        let config = config();
        let result = ActivationEngine::new(&page, &config)
            .activate("button")
            .await
            .unwrap();
        assert_eq!(result, Activation::Activated(ActivationMethod::ForcedClick));

        let baseline = page
            .calls()
            .into_iter()
            .find_map(|s| match s {
                Script::SideEffect { baseline_text, .. } => Some(baseline_text),
                _ => None,
            })
            .unwrap();
        assert_eq!(baseline.as_deref(), Some("Generate"));
    }

    #[tokio::test]
    async fn test_strategy_fault_moves_to_next() {
        let page = FakePage::new(|script: &Script| match script {
            Script::ControlState { .. } => Ok(disabled()),
            Script::ForceClick { .. } => Err(PilotError::script("TypeError: el.click")),
            Script::InnerElementClick { .. } => Ok(json!({ "applied": true })),
            Script::SideEffect { .. } => Ok(json!({ "observed": true })),
            other => panic!("unexpected {}", other.name()),
        });
        let config = config();
        let result = ActivationEngine::new(&page, &config)
            .activate("button")
            .await
            .unwrap();
        assert_eq!(
            result,
            Activation::Activated(ActivationMethod::InnerElementClick)
        );
    }

    #[tokio::test]
    async fn test_transport_loss_aborts_escalation() {
        let page = FakePage::new(|script: &Script| match script {
            Script::ControlState { .. } => Ok(disabled()),
            _ => Err(PilotError::TransportClosed),
        });
        let config = config();
        let err = ActivationEngine::new(&page, &config)
            .activate("button")
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_form_validity_only_when_required() {
        let state = ControlState {
            found: true,
            visible: true,
            form_valid: false,
            ..ControlState::default()
        };
        assert!(state.is_actionable(false));
        assert!(!state.is_actionable(true));
    }

    #[test]
    fn test_pointer_events_none_is_not_actionable() {
        let state = ControlState {
            found: true,
            visible: true,
            form_valid: true,
            pointer_events: "none".to_string(),
            ..ControlState::default()
        };
        assert!(!state.is_actionable(false));
    }
}
