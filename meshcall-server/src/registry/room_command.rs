use meshcall_core::{CaptionPayload, ParticipantId};
use tokio::sync::oneshot;

/// Commands processed by a room actor, one at a time and in arrival order.
#[derive(Debug)]
pub enum RoomCommand {
    /// Add a participant and announce it to the whole roster.
    Join {
        participant: ParticipantId,
        reply: oneshot::Sender<JoinReply>,
    },

    /// Remove a participant. Replies `None` when it was not a member.
    Leave {
        participant: ParticipantId,
        reply: oneshot::Sender<Option<Vec<ParticipantId>>>,
    },

    Chat {
        from: ParticipantId,
        text: String,
        sender: String,
    },

    Caption {
        from: ParticipantId,
        payload: CaptionPayload,
    },

    Roster {
        reply: oneshot::Sender<Vec<ParticipantId>>,
    },
}

#[derive(Debug, PartialEq, Eq)]
pub enum JoinReply {
    Joined(Vec<ParticipantId>),
    /// The room emptied and shut down before the join was processed.
    Closed,
}
