use async_trait::async_trait;
use meshcall_core::{ClientMessage, ParticipantId, SdpKind, SignalPayload};
use meshcall_peer::{SessionError, SignalingOutput};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock SignalingOutput that captures everything a session sends to the relay.
#[derive(Clone, Default)]
pub struct MockSignaling {
    sent: Arc<Mutex<Vec<ClientMessage>>>,
    disconnects: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl MockSignaling {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<ClientMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Signals addressed to `remote`, oldest first.
    pub fn signals_to(&self, remote: &ParticipantId) -> Vec<SignalPayload> {
        self.sent()
            .into_iter()
            .filter_map(|msg| match msg {
                ClientMessage::Signal { to, payload } if to == *remote => Some(payload),
                _ => None,
            })
            .collect()
    }

    pub fn descriptions_to(&self, remote: &ParticipantId, kind: SdpKind) -> usize {
        self.signals_to(remote)
            .iter()
            .filter(|p| matches!(p, SignalPayload::Description(d) if d.kind == kind))
            .count()
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Make every further send fail as if the relay went away.
    pub fn break_connection(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SignalingOutput for MockSignaling {
    async fn send(&self, msg: ClientMessage) -> Result<(), SessionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SessionError::TransportLost("mock relay closed".to_owned()));
        }
        tracing::debug!("[MockSignaling] send {:?}", msg);
        self.sent.lock().unwrap().push(msg);
        Ok(())
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }
}
