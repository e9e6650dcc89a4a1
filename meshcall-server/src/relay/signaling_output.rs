use async_trait::async_trait;
use meshcall_core::{ParticipantId, ServerMessage};

/// Outbound side of the relay. Rooms push every notification through this trait, which keeps
/// them independent of the WebSocket layer and lets tests capture traffic.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Queue `msg` for one participant. Must not block on a slow recipient.
    async fn deliver(&self, to: &ParticipantId, msg: ServerMessage);

    async fn broadcast(&self, to: &[ParticipantId], msg: ServerMessage) {
        for participant in to {
            self.deliver(participant, msg.clone()).await;
        }
    }
}
