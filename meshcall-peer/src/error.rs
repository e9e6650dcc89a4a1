use meshcall_core::{MediaKind, ParticipantId};
use thiserror::Error;

/// Errors surfaced by a [`PeerSession`](crate::PeerSession).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    /// The relay connection is gone. The whole session is torn down.
    #[error("relay connection lost: {0}")]
    TransportLost(String),

    /// Only the link to `peer` is affected.
    #[error("negotiation with {peer} failed: {reason}")]
    NegotiationFailed { peer: ParticipantId, reason: String },

    /// The session carries on without this kind of media.
    #[error("{kind:?} unavailable: {reason}")]
    MediaUnavailable { kind: MediaKind, reason: String },

    #[error("malformed message: {0}")]
    MalformedMessage(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Rtc(#[from] webrtc::Error),

    #[error("caption channel is not open")]
    ChannelNotOpen,

    #[error("transport closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}
