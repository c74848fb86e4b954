//! WebSocket transport for one DevTools target
//!
//! Owns the duplex connection, writes command envelopes and runs a background
//! read loop that feeds every inbound frame to the [`Dispatcher`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::cdp::dispatcher::{Dispatcher, FrameDisposition};
use crate::core::{PilotError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Anything that can carry a protocol command and hand back its result
#[async_trait]
pub trait Protocol: Send + Sync {
    /// Send a command and wait for the matching response's `result`
    async fn send(&self, method: &str, params: Value) -> Result<Value>;
}

/// Client for one target's DevTools WebSocket
pub struct CdpClient {
    dispatcher: Arc<Dispatcher>,
    /// Write half; `None` once closed
    writer: Mutex<Option<WsSink>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    command_timeout: Option<Duration>,
}

impl CdpClient {
    /// Open the WebSocket and start the read loop
    pub async fn connect(ws_url: &str, command_timeout: Option<Duration>) -> Result<Self> {
        tracing::info!(url = ws_url, "connecting to DevTools WebSocket");

        let (stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| PilotError::NoTarget(format!("WebSocket connect to {} failed: {}", ws_url, e)))?;

        let (writer, reader) = stream.split();
        let dispatcher = Arc::new(Dispatcher::new());

        let loop_dispatcher = Arc::clone(&dispatcher);
        let handle = tokio::spawn(async move {
            Self::read_loop(reader, loop_dispatcher).await;
        });

        Ok(Self {
            dispatcher,
            writer: Mutex::new(Some(writer)),
            reader: Mutex::new(Some(handle)),
            command_timeout,
        })
    }

    /// Enable a protocol domain ("Runtime", "DOM", "Page")
    pub async fn enable_domain(&self, domain: &str) -> Result<()> {
        self.send(&format!("{}.enable", domain), serde_json::json!({}))
            .await?;
        Ok(())
    }

    /// Navigate the tab
    pub async fn navigate(&self, url: &str) -> Result<()> {
        let result = self
            .send("Page.navigate", serde_json::json!({ "url": url }))
            .await?;

        if let Some(error) = result.get("errorText").and_then(Value::as_str) {
            return Err(PilotError::RemoteEvaluation {
                code: -1,
                message: format!("navigation to {} failed: {}", url, error),
                data: None,
            });
        }
        Ok(())
    }

    /// Release the connection.
    ///
    /// Idempotent; outstanding commands fail with `TransportClosed`.
    pub async fn close(&self) {
        self.dispatcher.close().await;

        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.close().await {
                tracing::debug!(error = %e, "WebSocket close handshake failed");
            }
            tracing::info!("DevTools connection closed");
        }

        if let Some(handle) = self.reader.lock().await.take() {
            handle.abort();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.dispatcher.is_closed()
    }

    async fn read_loop(mut reader: WsSource, dispatcher: Arc<Dispatcher>) {
        while let Some(message) = reader.next().await {
            let text = match message {
                Ok(Message::Text(t)) => t.to_string(),
                Ok(Message::Binary(b)) => match String::from_utf8(b.to_vec()) {
                    Ok(s) => s,
                    Err(_) => continue,
                },
                Ok(Message::Close(_)) => {
                    tracing::info!("WebSocket closed by remote");
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "WebSocket read error, stopping reader");
                    break;
                }
            };

            if let FrameDisposition::Event(method) = dispatcher.dispatch(&text).await {
                tracing::trace!(method = %method, "discarding event");
            }
        }

        dispatcher.close().await;
    }
}

#[async_trait]
impl Protocol for CdpClient {
    async fn send(&self, method: &str, params: Value) -> Result<Value> {
        let (id, rx) = self.dispatcher.register().await?;
        let frame = Dispatcher::envelope(id, method, params)?;

        tracing::debug!(id, method, "sending CDP command");

        {
            let mut guard = self.writer.lock().await;
            let Some(writer) = guard.as_mut() else {
                self.dispatcher.cancel(id).await;
                return Err(PilotError::TransportClosed);
            };
            if let Err(e) = writer.send(Message::Text(frame.into())).await {
                tracing::warn!(id, method, error = %e, "failed to write command");
                self.dispatcher.cancel(id).await;
                return Err(PilotError::TransportClosed);
            }
        }

        let outcome = match self.command_timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    self.dispatcher.cancel(id).await;
                    return Err(PilotError::CommandTimeout {
                        method: method.to_string(),
                        duration: limit,
                    });
                }
            },
            None => rx.await,
        };

        // A dropped sender means the table was torn down
        outcome.map_err(|_| PilotError::TransportClosed)?
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        if let Some(handle) = self.reader.get_mut().take() {
            handle.abort();
        }
    }
}
