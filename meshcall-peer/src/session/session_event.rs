use crate::caption::Landmark;
use crate::error::SessionError;
use crate::link::LinkState;
use crate::media::{LocalTrack, MediaUpdate, RemoteTrack};
use meshcall_core::{CaptionEvent, MediaKind, ParticipantId, RoomCode};

/// Membership changes announced by the relay.
#[derive(Debug, Clone, PartialEq)]
pub enum RosterEvent {
    Joined {
        participant: ParticipantId,
        roster: Vec<ParticipantId>,
    },
    Left {
        participant: ParticipantId,
    },
}

/// Everything the presentation layer needs to render a call.
pub enum SessionEvent {
    /// The relay accepted the connection and assigned our id.
    Connected { participant_id: ParticipantId },
    RosterChanged { roster: Vec<ParticipantId> },
    LinkState {
        remote: ParticipantId,
        state: LinkState,
    },
    Track {
        remote: ParticipantId,
        track: RemoteTrack,
    },
    Caption(CaptionEvent),
    Chat {
        text: String,
        sender: String,
        from: ParticipantId,
    },
    ScreenShare { active: bool },
    Error(SessionError),
    /// Terminal. Nothing follows.
    Closed,
}

/// Requests from the application to a running [`CallEngine`](crate::CallEngine).
#[derive(Debug)]
pub enum SessionCommand {
    Join(RoomCode),
    Leave,
    Chat(String),
    PublishCaption { text: String, score: Option<f32> },
    /// Landmarks of the current camera frame, for the prediction service.
    Landmarks {
        hand: Vec<Landmark>,
        face: Vec<Landmark>,
    },
    Media { kind: MediaKind, update: MediaUpdate },
    StartScreenShare(LocalTrack),
    StopScreenShare,
    Teardown,
}
