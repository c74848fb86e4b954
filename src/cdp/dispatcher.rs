//! Command/response correlation
//!
//! Allocates request ids, keeps the table of outstanding commands and routes
//! inbound frames to the caller waiting on the matching id. Frames without a
//! matching id (events, late responses) are dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{oneshot, Mutex};

use crate::core::{PilotError, Result};

/// Outbound command envelope
#[derive(Debug, Clone, Serialize)]
pub struct CommandEnvelope<'a> {
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

/// Error object carried by a response
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl From<ResponseError> for PilotError {
    fn from(err: ResponseError) -> Self {
        PilotError::RemoteEvaluation {
            code: err.code,
            message: err.message,
            data: err.data.map(|d| match d {
                Value::String(s) => s,
                other => other.to_string(),
            }),
        }
    }
}

/// What happened to one inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameDisposition {
    /// Delivered to the caller waiting on this id
    Delivered(u64),
    /// Carried an id nobody is waiting for
    Unmatched(u64),
    /// Event notification, discarded
    Event(String),
    /// Not a JSON object we understand
    Malformed,
}

/// Receiving half handed to the caller of [`Dispatcher::register`]
pub type ResponseReceiver = oneshot::Receiver<Result<Value>>;

/// Pending-command table for one connection
pub struct Dispatcher {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<Result<Value>>>>,
    closed: AtomicBool,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Reserve the next id and register a waiter for it
    pub async fn register(&self) -> Result<(u64, ResponseReceiver)> {
        // Checked under the lock so close() can't drain between check and insert
        let mut pending = self.pending.lock().await;
        if self.is_closed() {
            return Err(PilotError::TransportClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        pending.insert(id, tx);
        Ok((id, rx))
    }

    /// Serialize a command envelope
    pub fn envelope(id: u64, method: &str, params: Value) -> Result<String> {
        serde_json::to_string(&CommandEnvelope { id, method, params })
            .map_err(|e| PilotError::protocol(format!("failed to serialize command: {}", e)))
    }

    /// Drop a waiter (timeout, failed write)
    pub async fn cancel(&self, id: u64) {
        self.pending.lock().await.remove(&id);
    }

    /// Route one inbound text frame
    pub async fn dispatch(&self, text: &str) -> FrameDisposition {
        let frame: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse frame as JSON");
                return FrameDisposition::Malformed;
            }
        };

        if let Some(id) = frame.get("id").and_then(Value::as_u64) {
            let waiter = self.pending.lock().await.remove(&id);
            let Some(tx) = waiter else {
                tracing::debug!(id, "response for unknown command id");
                return FrameDisposition::Unmatched(id);
            };

            let outcome = match frame.get("error") {
                Some(err) => match serde_json::from_value::<ResponseError>(err.clone()) {
                    Ok(err) => Err(err.into()),
                    Err(_) => Err(PilotError::RemoteEvaluation {
                        code: -1,
                        message: err.to_string(),
                        data: None,
                    }),
                },
                None => Ok(frame.get("result").cloned().unwrap_or(Value::Null)),
            };

            // The caller may have given up already
            let _ = tx.send(outcome);
            return FrameDisposition::Delivered(id);
        }

        match frame.get("method").and_then(Value::as_str) {
            Some(method) => FrameDisposition::Event(method.to_string()),
            None => FrameDisposition::Malformed,
        }
    }

    /// Refuse new commands and fail every outstanding one with `TransportClosed`
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let mut pending = self.pending.lock().await;
        for (_, tx) in pending.drain() {
            let _ = tx.send(Err(PilotError::TransportClosed));
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of commands awaiting a response
    pub async fn outstanding(&self) -> usize {
        self.pending.lock().await.len()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(id: u64, value: i64) -> String {
        json!({ "id": id, "result": { "value": value } }).to_string()
    }

    #[test]
    fn test_envelope_shape() {
        let text = Dispatcher::envelope(7, "Runtime.evaluate", json!({"expression": "1 + 1"})).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["method"], "Runtime.evaluate");
        assert_eq!(value["params"]["expression"], "1 + 1");
    }

    #[tokio::test]
    async fn test_ids_are_unique_and_increasing() {
        let dispatcher = Dispatcher::new();
        let (a, _ra) = dispatcher.register().await.unwrap();
        let (b, _rb) = dispatcher.register().await.unwrap();
        let (c, _rc) = dispatcher.register().await.unwrap();
        assert_eq!((a, b, c), (1, 2, 3));
        assert_eq!(dispatcher.outstanding().await, 3);
    }

    #[tokio::test]
    async fn test_out_of_order_responses_reach_their_callers() {
        let dispatcher = Dispatcher::new();
        let mut receivers = Vec::new();
        for _ in 0..5 {
            receivers.push(dispatcher.register().await.unwrap());
        }

        for id in [4u64, 1, 5, 3, 2] {
            let disposition = dispatcher.dispatch(&response(id, id as i64 * 10)).await;
            assert_eq!(disposition, FrameDisposition::Delivered(id));
        }

        for (id, rx) in receivers {
            let value = rx.await.unwrap().unwrap();
            assert_eq!(value["value"], id as i64 * 10);
        }
        assert_eq!(dispatcher.outstanding().await, 0);
    }

    #[tokio::test]
    async fn test_error_object_becomes_remote_evaluation_error() {
        let dispatcher = Dispatcher::new();
        let (id, rx) = dispatcher.register().await.unwrap();
        let frame = json!({
            "id": id,
            "error": { "code": -32601, "message": "'Foo.bar' wasn't found" }
        });
        dispatcher.dispatch(&frame.to_string()).await;

        match rx.await.unwrap() {
            Err(PilotError::RemoteEvaluation { code, message, .. }) => {
                assert_eq!(code, -32601);
                assert!(message.contains("Foo.bar"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_events_and_strays_are_discarded() {
        let dispatcher = Dispatcher::new();
        let (_id, _rx) = dispatcher.register().await.unwrap();

        let event = json!({"method": "Runtime.consoleAPICalled", "params": {}}).to_string();
        assert_eq!(
            dispatcher.dispatch(&event).await,
            FrameDisposition::Event("Runtime.consoleAPICalled".into())
        );
        assert_eq!(dispatcher.dispatch(&response(99, 0)).await, FrameDisposition::Unmatched(99));
        assert_eq!(dispatcher.dispatch("not json").await, FrameDisposition::Malformed);
        assert_eq!(dispatcher.outstanding().await, 1);
    }

    #[tokio::test]
    async fn test_close_fails_pending_and_refuses_new() {
        let dispatcher = Dispatcher::new();
        let (_id, rx) = dispatcher.register().await.unwrap();
        dispatcher.close().await;

        assert!(matches!(rx.await.unwrap(), Err(PilotError::TransportClosed)));
        assert!(matches!(dispatcher.register().await, Err(PilotError::TransportClosed)));
    }

    #[tokio::test]
    async fn test_cancel_removes_waiter() {
        let dispatcher = Dispatcher::new();
        let (id, _rx) = dispatcher.register().await.unwrap();
        dispatcher.cancel(id).await;
        assert_eq!(dispatcher.dispatch(&response(id, 1)).await, FrameDisposition::Unmatched(id));
    }
}
