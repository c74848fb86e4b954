//! Scripted page for unit tests

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::Result;
use crate::script::{Evaluator, Script};

/// Evaluator answering every script through a handler, recording each call
pub(crate) struct FakePage<F> {
    handler: Mutex<F>,
    calls: Mutex<Vec<Script>>,
}

impl<F> FakePage<F>
where
    F: FnMut(&Script) -> Result<Value> + Send,
{
    pub(crate) fn new(handler: F) -> Self {
        Self {
            handler: Mutex::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Script> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn names(&self) -> Vec<&'static str> {
        self.calls().iter().map(Script::name).collect()
    }
}

#[async_trait]
impl<F> Evaluator for FakePage<F>
where
    F: FnMut(&Script) -> Result<Value> + Send,
{
    async fn run(&self, script: &Script) -> Result<Value> {
        self.calls.lock().unwrap().push(script.clone());
        let mut handler = self.handler.lock().unwrap();
        (*handler)(script)
    }
}
