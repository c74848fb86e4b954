//! Remote script execution
//!
//! Wraps `Runtime.evaluate`, unwraps by-value results and turns exceptions
//! thrown inside the page into [`PilotError::ScriptFault`], distinct from
//! protocol-level [`PilotError::RemoteEvaluation`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cdp::Protocol;
use crate::core::{PilotError, Result};
use crate::script::builder::Script;

/// Runs page scripts; the seam the interaction layer is written against
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Evaluate a script and return its by-value result
    async fn run(&self, script: &Script) -> Result<Value>;

    /// Whether the selector currently resolves to an element
    async fn element_exists(&self, selector: &str) -> Result<bool> {
        let value = self
            .run(&Script::ElementExists {
                selector: selector.to_string(),
            })
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Click an element; `false` if it is absent or disabled
    async fn click(&self, selector: &str) -> Result<bool> {
        let value = self
            .run(&Script::Click {
                selector: selector.to_string(),
            })
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }
}

/// Decode a script's result into its expected shape
pub fn decode<T: DeserializeOwned>(script: &Script, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        PilotError::script(format!(
            "{} returned an unexpected result: {}",
            script.name(),
            e
        ))
    })
}

/// Extract a readable message from `exceptionDetails`
fn exception_message(details: &Value) -> String {
    details
        .get("exception")
        .and_then(|e| e.get("description"))
        .and_then(Value::as_str)
        .or_else(|| details.get("text").and_then(Value::as_str))
        .unwrap_or("unknown exception")
        .to_string()
}

/// [`Evaluator`] over a live protocol connection
#[derive(Clone)]
pub struct ScriptRunner {
    protocol: Arc<dyn Protocol>,
}

impl ScriptRunner {
    pub fn new(protocol: Arc<dyn Protocol>) -> Self {
        Self { protocol }
    }

    /// Evaluate a raw expression and return its value
    pub async fn evaluate(&self, expression: &str) -> Result<Value> {
        let result = self
            .protocol
            .send(
                "Runtime.evaluate",
                serde_json::json!({
                    "expression": expression,
                    "returnByValue": true,
                }),
            )
            .await?;

        if let Some(details) = result.get("exceptionDetails") {
            return Err(PilotError::ScriptFault {
                message: exception_message(details),
            });
        }

        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }
}

#[async_trait]
impl Evaluator for ScriptRunner {
    async fn run(&self, script: &Script) -> Result<Value> {
        tracing::trace!(script = script.name(), "evaluating");
        self.evaluate(&script.render()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Protocol that returns canned results and records what was sent
    struct CannedProtocol {
        reply: Result<Value>,
        sent: Mutex<Vec<(String, Value)>>,
    }

    impl CannedProtocol {
        fn ok(reply: Value) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply),
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Protocol for CannedProtocol {
        async fn send(&self, method: &str, params: Value) -> Result<Value> {
            self.sent.lock().unwrap().push((method.to_string(), params));
            match &self.reply {
                Ok(v) => Ok(v.clone()),
                Err(_) => Err(PilotError::RemoteEvaluation {
                    code: -32000,
                    message: "Cannot find context with specified id".to_string(),
                    data: None,
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_evaluate_unwraps_value() {
        let protocol = CannedProtocol::ok(json!({
            "result": { "type": "object", "value": { "found": true } }
        }));
        let runner = ScriptRunner::new(protocol.clone());

        let value = runner.evaluate("1").await.unwrap();
        assert_eq!(value, json!({ "found": true }));

        let sent = protocol.sent.lock().unwrap();
        assert_eq!(sent[0].0, "Runtime.evaluate");
        assert_eq!(sent[0].1["returnByValue"], true);
        assert_eq!(sent[0].1["expression"], "1");
    }

    #[tokio::test]
    async fn test_undefined_result_is_null() {
        let runner = ScriptRunner::new(CannedProtocol::ok(json!({
            "result": { "type": "undefined" }
        })));
        assert_eq!(runner.evaluate("void 0").await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_exception_becomes_script_fault() {
        let runner = ScriptRunner::new(CannedProtocol::ok(json!({
            "result": { "type": "object", "subtype": "error" },
            "exceptionDetails": {
                "text": "Uncaught",
                "exception": { "description": "TypeError: Cannot read properties of null" }
            }
        })));

        match runner.evaluate("null.x").await {
            Err(PilotError::ScriptFault { message }) => {
                assert!(message.starts_with("TypeError"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_protocol_error_passes_through() {
        let protocol = Arc::new(CannedProtocol {
            reply: Err(PilotError::TransportClosed),
            sent: Mutex::new(Vec::new()),
        });
        let runner = ScriptRunner::new(protocol);
        assert!(matches!(
            runner.evaluate("1").await,
            Err(PilotError::RemoteEvaluation { .. })
        ));
    }

    #[tokio::test]
    async fn test_click_false_is_not_an_error() {
        let runner = ScriptRunner::new(CannedProtocol::ok(json!({
            "result": { "type": "boolean", "value": false }
        })));
        assert!(!runner.click("button[disabled]").await.unwrap());
        assert!(!runner.element_exists("#nothing").await.unwrap());
    }

    #[test]
    fn test_decode_mismatch_is_script_fault() {
        #[derive(serde::Deserialize, Debug)]
        struct Shape {
            #[allow(dead_code)]
            found: bool,
        }
        let err = decode::<Shape>(&Script::InspectPage, Value::Null).unwrap_err();
        assert!(err.is_not_ready());
    }
}
