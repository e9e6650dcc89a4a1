use crate::media::RemoteTrack;
use bytes::Bytes;
use meshcall_core::IceCandidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    /// May still recover.
    Disconnected,
    Failed,
    Closed,
}

/// Events a transport produces for the link that owns it.
pub enum TransportEvent {
    /// A local ICE candidate that must reach the remote side through the relay.
    CandidateGenerated(IceCandidate),

    StateChanged(ConnectionState),

    TrackReceived(RemoteTrack),

    /// The caption channel is open in either direction.
    CaptionChannelOpen,

    CaptionChannelClosed,

    /// Raw caption packet from the remote side.
    CaptionData(Bytes),
}
