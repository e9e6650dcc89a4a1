mod caption;
mod media;
mod packet;
mod participant;
mod protocol;
mod room;
mod signaling;

pub use caption::{CaptionEvent, CaptionPayload, DEFAULT_SENDER_LABEL};
pub use media::{MediaKind, TrackSource};
pub use packet::{Packet, PacketError};
pub use participant::ParticipantId;
pub use protocol::{ClientMessage, ServerMessage};
pub use room::{InvalidRoomCode, RoomCode};
pub use signaling::{IceCandidate, IceServerConfig, SdpKind, SessionDescription, SignalPayload};
