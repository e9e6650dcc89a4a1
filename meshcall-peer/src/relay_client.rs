use crate::error::SessionError;
use crate::session::SignalingOutput;
use anyhow::Result;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use meshcall_core::{ClientMessage, ServerMessage};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// WebSocket connection to the relay.
///
/// Incoming messages are delivered through the receiver returned by [`RelayClient::connect`];
/// it yields `None` once the connection is gone.
pub struct RelayClient {
    sender: mpsc::Sender<ClientMessage>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl RelayClient {
    pub async fn connect(url: &str) -> Result<(Self, mpsc::Receiver<ServerMessage>)> {
        let (ws_stream, _) = connect_async(url).await?;
        info!("Connected to relay at {}", url);

        let (mut write, mut read) = ws_stream.split();

        let (tx, mut rx) = mpsc::channel::<ClientMessage>(100);
        let (incoming_tx, incoming_rx) = mpsc::channel::<ServerMessage>(256);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = rx.recv() => {
                        let Some(msg) = msg else { break };
                        let json = match serde_json::to_string(&msg) {
                            Ok(j) => j,
                            Err(e) => {
                                error!("Failed to serialize message: {}", e);
                                continue;
                            }
                        };

                        if write.send(Message::Text(json.into())).await.is_err() {
                            error!("Failed to send WebSocket message");
                            break;
                        }
                    }
                    _ = &mut shutdown_rx => break,
                }
            }

            let _ = write.close().await;
            debug!("Relay writer finished");
        });

        let reader = tokio::spawn(async move {
            while let Some(result) = read.next().await {
                match result {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerMessage>(text.as_str()) {
                            Ok(msg) => {
                                if incoming_tx.send(msg).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                let err = SessionError::MalformedMessage(e.to_string());
                                warn!("Dropping relay message: {}", err);
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!("WebSocket closed by relay");
                        break;
                    }
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
        });

        let client = Self {
            sender: tx,
            shutdown: Mutex::new(Some(shutdown_tx)),
            reader: Mutex::new(Some(reader)),
        };

        Ok((client, incoming_rx))
    }
}

#[async_trait]
impl SignalingOutput for RelayClient {
    async fn send(&self, msg: ClientMessage) -> Result<(), SessionError> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| SessionError::TransportLost("relay connection closed".to_owned()))
    }

    async fn disconnect(&self) {
        if let Some(tx) = self.shutdown.lock().await.take() {
            let _ = tx.send(());
        }
        if let Some(reader) = self.reader.lock().await.take() {
            reader.abort();
        }
    }
}
