use crate::relay::SignalingOutput;
use async_trait::async_trait;
use dashmap::DashMap;
use meshcall_core::{IceServerConfig, ParticipantId, ServerMessage};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, warn};

struct SignalingInner {
    peers: DashMap<ParticipantId, mpsc::Sender<String>>,
    ice_servers: Vec<IceServerConfig>,
}

/// Connection table of the relay: one bounded outbound queue per open socket.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                peers: DashMap::new(),
                ice_servers,
            }),
        }
    }

    pub fn get_ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    pub fn add_peer(&self, participant: ParticipantId, tx: mpsc::Sender<String>) {
        self.inner.peers.insert(participant, tx);
    }

    pub fn remove_peer(&self, participant: &ParticipantId) {
        self.inner.peers.remove(participant);
    }

    fn send_text(&self, participant: &ParticipantId, json: String) {
        let Some(peer) = self.inner.peers.get(participant) else {
            debug!(%participant, "Skipping message for disconnected participant");
            return;
        };

        match peer.try_send(json) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(%participant, "Outbound queue full, dropping message");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(%participant, "Outbound queue closed");
            }
        }
    }
}

#[async_trait]
impl SignalingOutput for SignalingService {
    async fn deliver(&self, to: &ParticipantId, msg: ServerMessage) {
        match serde_json::to_string(&msg) {
            Ok(json) => self.send_text(to, json),
            Err(e) => error!("Failed to serialize server message: {}", e),
        }
    }

    async fn broadcast(&self, to: &[ParticipantId], msg: ServerMessage) {
        let json = match serde_json::to_string(&msg) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize server message: {}", e);
                return;
            }
        };

        for participant in to {
            self.send_text(participant, json.clone());
        }
    }
}
