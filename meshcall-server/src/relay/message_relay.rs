use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::registry::{RoomCommand, RoomRegistry};
use crate::relay::SignalingOutput;
use meshcall_core::{
    CaptionPayload, ClientMessage, ParticipantId, RoomCode, ServerMessage, SignalPayload,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Routes client messages to the right room or participant.
#[derive(Clone)]
pub struct Relay {
    registry: RoomRegistry,
    output: Arc<dyn SignalingOutput>,
}

impl Relay {
    pub fn new(output: Arc<dyn SignalingOutput>, config: &RelayConfig) -> Self {
        Self {
            registry: RoomRegistry::new(
                output.clone(),
                config.chat_history_limit,
                config.room_command_buffer,
            ),
            output,
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub async fn handle_client_message(
        &self,
        from: ParticipantId,
        msg: ClientMessage,
    ) -> Result<(), RelayError> {
        match msg {
            ClientMessage::Join { room } => self.join(from, room).await.map(|_| ()),
            ClientMessage::Leave => {
                self.leave(from).await;
                Ok(())
            }
            ClientMessage::Signal { to, payload } => self.relay_signal(from, to, payload).await,
            ClientMessage::Chat { text, sender } => self.relay_chat(from, text, sender).await,
            ClientMessage::Caption { payload } => self.relay_caption(from, payload).await,
        }
    }

    /// Join `room`. A participant already in another room leaves it first.
    pub async fn join(
        &self,
        participant: ParticipantId,
        room: RoomCode,
    ) -> Result<Vec<ParticipantId>, RelayError> {
        if let Some(current) = self.registry.find_room_of(&participant) {
            if current != room {
                info!(%participant, from = %current, to = %room, "Switching rooms");
                self.registry.leave(participant).await;
            }
        }

        self.registry.join(&room, participant).await
    }

    pub async fn leave(&self, participant: ParticipantId) -> Option<Vec<ParticipantId>> {
        self.registry.leave(participant).await
    }

    /// Unicast a negotiation payload. The payload is forwarded as is.
    pub async fn relay_signal(
        &self,
        from: ParticipantId,
        to: ParticipantId,
        payload: SignalPayload,
    ) -> Result<(), RelayError> {
        if from == to {
            return Err(RelayError::SelfSignal(from));
        }

        debug!(%from, %to, "Relaying signal");
        self.output
            .deliver(&to, ServerMessage::Signal { from, payload })
            .await;
        Ok(())
    }

    pub async fn relay_chat(
        &self,
        from: ParticipantId,
        text: String,
        sender: String,
    ) -> Result<(), RelayError> {
        self.registry
            .dispatch(&from, RoomCommand::Chat { from, text, sender })
            .await
    }

    pub async fn relay_caption(
        &self,
        from: ParticipantId,
        payload: CaptionPayload,
    ) -> Result<(), RelayError> {
        self.registry
            .dispatch(&from, RoomCommand::Caption { from, payload })
            .await
    }

    pub async fn handle_disconnect(&self, participant: ParticipantId) {
        if let Some(remaining) = self.registry.leave(participant).await {
            info!(
                %participant,
                remaining = remaining.len(),
                "Disconnected participant removed from room"
            );
        }
    }
}
