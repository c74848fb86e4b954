//! Shared helpers for integration tests
#![allow(dead_code)]

use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use promptpilot::script::{Evaluator, Script};
use promptpilot::Result;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;

/// Port with nothing listening on it
pub fn dead_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// Accept one WebSocket connection and hand it to `handler`; returns its URL
pub async fn ws_peer<F, Fut>(handler: F) -> String
where
    F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        handler(ws).await;
    });
    format!("ws://{}/devtools/page/TEST", addr)
}

/// Minimal HTTP server answering each connection with the next canned
/// response. Returns the port and the request lines it saw.
pub async fn http_responder(responses: Vec<(u16, String)>) -> (u16, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();

    tokio::spawn(async move {
        for (status, body) in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let text = String::from_utf8_lossy(&request);
            let line = text.lines().next().unwrap_or_default().to_string();
            log.lock().unwrap().push(line);

            let reason = match status {
                200 => "OK",
                405 => "Method Not Allowed",
                _ => "Error",
            };
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (port, seen)
}

type Handler = Box<dyn FnMut(&Script) -> Result<Value> + Send>;

/// Evaluator answering by script kind, recording every call
pub struct ScriptedPage {
    handler: Mutex<Handler>,
    calls: Mutex<Vec<Script>>,
}

impl ScriptedPage {
    pub fn new(handler: impl FnMut(&Script) -> Result<Value> + Send + 'static) -> Self {
        Self {
            handler: Mutex::new(Box::new(handler)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Script> {
        self.calls.lock().unwrap().clone()
    }

    /// Selectors probed with `ElementExists`, in order
    pub fn probed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|s| match s {
                Script::ElementExists { selector } => Some(selector),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Evaluator for ScriptedPage {
    async fn run(&self, script: &Script) -> Result<Value> {
        self.calls.lock().unwrap().push(script.clone());
        let mut handler = self.handler.lock().unwrap();
        (*handler)(script)
    }
}
