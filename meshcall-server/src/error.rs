use meshcall_core::{ParticipantId, RoomCode};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("participant {0} is not in a room")]
    NotInRoom(ParticipantId),

    #[error("room {0} is unavailable, try again")]
    RoomUnavailable(RoomCode),

    #[error("participant {0} cannot signal itself")]
    SelfSignal(ParticipantId),
}
