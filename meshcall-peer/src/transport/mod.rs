mod transport_event;
mod webrtc_transport;

pub use transport_event::{ConnectionState, TransportEvent};
pub use webrtc_transport::{WebRtcConnector, WebRtcRemoteTrack, WebRtcTransport};

use crate::error::TransportError;
use crate::media::LocalTrack;
use async_trait::async_trait;
use bytes::Bytes;
use meshcall_core::{IceCandidate, IceServerConfig, MediaKind, ParticipantId, SessionDescription};
use tokio::sync::mpsc;

/// Creates one transport per remote participant.
#[async_trait]
pub trait PeerConnector: Send + Sync {
    /// Build a connection to `remote`. Everything the transport observes afterwards is pushed
    /// into `events`.
    async fn connect(
        &self,
        remote: ParticipantId,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>, TransportError>;

    /// Replace the ICE servers used for connections created from now on.
    fn set_ice_servers(&self, _servers: Vec<IceServerConfig>) {}
}

/// One point-to-point connection, as seen by a peer link.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Create an offer and apply it as the local description.
    async fn create_offer(&self) -> Result<SessionDescription, TransportError>;

    /// Create an answer to the applied remote offer and apply it as the local description.
    async fn create_answer(&self) -> Result<SessionDescription, TransportError>;

    async fn set_remote_description(&self, desc: SessionDescription)
    -> Result<(), TransportError>;

    /// Drop a local offer that lost an offer collision.
    async fn rollback_local(&self) -> Result<(), TransportError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError>;

    /// Attach, swap or (with `None`) detach the outgoing track of `kind`.
    async fn set_local_track(
        &self,
        kind: MediaKind,
        track: Option<LocalTrack>,
    ) -> Result<(), TransportError>;

    /// Create the caption data channel. Only the offering side calls this.
    async fn open_caption_channel(&self) -> Result<(), TransportError>;

    async fn send_caption(&self, data: Bytes) -> Result<(), TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}
