//! WebSocket connection to the signaling relay.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use duocall_server::infrastructure::dto::websocket::{ClientMessage, ServerMessage};

use crate::error::ClientError;

const WRITER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Relay connection split into a reader task and a writer task.
///
/// Outgoing envelopes go through [`WebSocketSignaling::sender`]; incoming ones are read with
/// [`WebSocketSignaling::recv`].
pub struct WebSocketSignaling {
    outbound: mpsc::UnboundedSender<ClientMessage>,
    inbound: mpsc::UnboundedReceiver<ServerMessage>,
    shutdown: Option<oneshot::Sender<()>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl WebSocketSignaling {
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let (ws_stream, _response) = connect_async(url)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        tracing::info!("Connected to signaling relay at {}", url);

        let (mut write, mut read) = ws_stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let (inbound_tx, inbound) = mpsc::unbounded_channel::<ServerMessage>();
        let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();

        let reader = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(message) => {
                            if inbound_tx.send(message).is_err() {
                                break;
                            }
                        }
                        Err(e) => tracing::warn!("Ignoring malformed relay message: {}", e),
                    },
                    Ok(Message::Close(_)) => {
                        tracing::info!("Relay closed the connection");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("WebSocket read error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
        });

        let writer = tokio::spawn(async move {
            let mut shutting_down = false;
            loop {
                let message = if shutting_down {
                    outbound_rx.recv().await
                } else {
                    tokio::select! {
                        message = outbound_rx.recv() => message,
                        _ = &mut shutdown_rx => {
                            // flush whatever was queued before the shutdown request
                            shutting_down = true;
                            outbound_rx.close();
                            outbound_rx.recv().await
                        }
                    }
                };
                let Some(message) = message else {
                    break;
                };

                let json = match serde_json::to_string(&message) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!("Failed to serialize message: {}", e);
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(json.into())).await {
                    tracing::warn!("Failed to send message: {}", e);
                    return;
                }
            }

            if let Err(e) = write.send(Message::Close(None)).await {
                tracing::debug!("Failed to send close frame: {}", e);
            }
        });

        Ok(Self {
            outbound,
            inbound,
            shutdown: Some(shutdown),
            reader,
            writer,
        })
    }

    /// Handle for sending envelopes to the relay
    pub fn sender(&self) -> mpsc::UnboundedSender<ClientMessage> {
        self.outbound.clone()
    }

    /// Next envelope from the relay, or `None` once the connection is gone
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.inbound.recv().await
    }

    pub fn inbound(&mut self) -> &mut mpsc::UnboundedReceiver<ServerMessage> {
        &mut self.inbound
    }

    /// Flush queued envelopes, send a close frame and stop both tasks.
    pub async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        match tokio::time::timeout(WRITER_SHUTDOWN_TIMEOUT, &mut self.writer).await {
            Ok(_) => tracing::debug!("Signaling writer finished"),
            Err(_) => {
                tracing::warn!("Signaling writer did not finish in time");
                self.writer.abort();
            }
        }
        self.reader.abort();
    }
}
