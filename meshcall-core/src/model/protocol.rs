use crate::model::caption::{CaptionEvent, CaptionPayload};
use crate::model::participant::ParticipantId;
use crate::model::room::RoomCode;
use crate::model::signaling::{IceServerConfig, SignalPayload};
use serde::{Deserialize, Serialize};

/// Messages a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum ClientMessage {
    Join {
        room: RoomCode,
    },
    Leave,
    Signal {
        to: ParticipantId,
        payload: SignalPayload,
    },
    Chat {
        text: String,
        sender: String,
    },
    Caption {
        payload: CaptionPayload,
    },
}

/// Messages the relay sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum ServerMessage {
    Welcome {
        participant_id: ParticipantId,
        ice_servers: Vec<IceServerConfig>,
    },
    Signal {
        from: ParticipantId,
        payload: SignalPayload,
    },
    Joined {
        participant: ParticipantId,
        roster: Vec<ParticipantId>,
    },
    Left {
        participant: ParticipantId,
    },
    Chat {
        text: String,
        sender: String,
        from: ParticipantId,
    },
    Caption {
        event: CaptionEvent,
    },
    Error {
        message: String,
    },
}
