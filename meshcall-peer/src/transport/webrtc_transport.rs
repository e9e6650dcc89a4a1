use crate::error::TransportError;
use crate::media::{LocalTrack, RemoteMedia};
use crate::transport::{ConnectionState, PeerConnector, PeerTransport, TransportEvent};
use async_trait::async_trait;
use bytes::Bytes;
use meshcall_core::{
    IceCandidate, IceServerConfig, MediaKind, ParticipantId, SdpKind, SessionDescription,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

const CAPTION_CHANNEL_LABEL: &str = "captions";
const USERNAME_FRAGMENT_KEY: &str = "usernameFragment";

/// [`PeerConnector`] backed by webrtc-rs.
pub struct WebRtcConnector {
    ice_servers: RwLock<Vec<IceServerConfig>>,
}

impl WebRtcConnector {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            ice_servers: RwLock::new(ice_servers),
        }
    }

    fn rtc_ice_servers(&self) -> Vec<RTCIceServer> {
        let servers = match self.ice_servers.read() {
            Ok(servers) => servers.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };

        servers
            .into_iter()
            .map(|server| RTCIceServer {
                urls: server.urls,
                username: server.username.unwrap_or_default(),
                credential: server.credential.unwrap_or_default(),
                ..Default::default()
            })
            .collect()
    }
}

#[async_trait]
impl PeerConnector for WebRtcConnector {
    async fn connect(
        &self,
        remote: ParticipantId,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>, TransportError> {
        let transport = WebRtcTransport::new(remote, self.rtc_ice_servers(), events).await?;
        Ok(Box::new(transport))
    }

    fn set_ice_servers(&self, servers: Vec<IceServerConfig>) {
        match self.ice_servers.write() {
            Ok(mut current) => *current = servers,
            Err(poisoned) => *poisoned.into_inner() = servers,
        }
    }
}

pub struct WebRtcTransport {
    remote: ParticipantId,
    peer_connection: Arc<RTCPeerConnection>,
    senders: Mutex<HashMap<MediaKind, Arc<RTCRtpSender>>>,
    caption_channel: Arc<Mutex<Option<Arc<RTCDataChannel>>>>,
    events: mpsc::Sender<TransportEvent>,
}

impl WebRtcTransport {
    pub async fn new(
        remote: ParticipantId,
        ice_servers: Vec<RTCIceServer>,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Self, TransportError> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);
        let caption_channel = Arc::new(Mutex::new(None));

        let state_tx = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();

                Box::pin(async move {
                    info!(%remote, "Peer connection state changed: {:?}", s);
                    let state = match s {
                        RTCPeerConnectionState::New | RTCPeerConnectionState::Unspecified => {
                            ConnectionState::New
                        }
                        RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
                        RTCPeerConnectionState::Connected => ConnectionState::Connected,
                        RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
                        RTCPeerConnectionState::Failed => ConnectionState::Failed,
                        RTCPeerConnectionState::Closed => ConnectionState::Closed,
                    };
                    let _ = tx.send(TransportEvent::StateChanged(state)).await;
                })
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let mut candidate = IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                    ..IceCandidate::default()
                };
                if let Some(ufrag) = init.username_fragment {
                    candidate
                        .extra
                        .insert(USERNAME_FRAGMENT_KEY.to_owned(), ufrag.into());
                }
                let _ = tx.send(TransportEvent::CandidateGenerated(candidate)).await;
            })
        }));

        let track_tx = events.clone();
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();

                Box::pin(async move {
                    debug!(%remote, "Remote track received: {}", track.id());
                    let track: Arc<dyn RemoteMedia> = Arc::new(WebRtcRemoteTrack(track));
                    let _ = tx.send(TransportEvent::TrackReceived(track)).await;
                })
            },
        ));

        // The answering side learns about the caption channel here.
        let dc_tx = events.clone();
        let dc_slot = caption_channel.clone();
        peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let tx = dc_tx.clone();
            let slot = dc_slot.clone();

            Box::pin(async move {
                if dc.label() != CAPTION_CHANNEL_LABEL {
                    warn!(%remote, "Ignoring unexpected data channel '{}'", dc.label());
                    return;
                }

                debug!(%remote, "Caption channel announced by remote");
                wire_caption_channel(&dc, tx);
                *slot.lock().await = Some(dc);
            })
        }));

        Ok(Self {
            remote,
            peer_connection,
            senders: Mutex::new(HashMap::new()),
            caption_channel,
            events,
        })
    }
}

fn wire_caption_channel(dc: &Arc<RTCDataChannel>, events: mpsc::Sender<TransportEvent>) {
    let open_tx = events.clone();
    dc.on_open(Box::new(move || {
        let tx = open_tx.clone();
        Box::pin(async move {
            let _ = tx.send(TransportEvent::CaptionChannelOpen).await;
        })
    }));

    let close_tx = events.clone();
    dc.on_close(Box::new(move || {
        let tx = close_tx.clone();
        Box::pin(async move {
            let _ = tx.send(TransportEvent::CaptionChannelClosed).await;
        })
    }));

    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = events.clone();
        Box::pin(async move {
            let _ = tx.send(TransportEvent::CaptionData(msg.data)).await;
        })
    }));
}

fn to_rtc_description(desc: SessionDescription) -> Result<RTCSessionDescription, TransportError> {
    let rtc = match desc.kind {
        SdpKind::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpKind::Answer => RTCSessionDescription::answer(desc.sdp)?,
        SdpKind::Rollback => rollback_description(),
    };
    Ok(rtc)
}

fn rollback_description() -> RTCSessionDescription {
    let mut rollback = RTCSessionDescription::default();
    rollback.sdp_type = RTCSdpType::Rollback;
    rollback
}

#[async_trait]
impl PeerTransport for WebRtcTransport {
    async fn create_offer(&self) -> Result<SessionDescription, TransportError> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError> {
        let desc = to_rtc_description(desc)?;
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn rollback_local(&self) -> Result<(), TransportError> {
        self.peer_connection
            .set_local_description(rollback_description())
            .await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate
                .extra
                .get(USERNAME_FRAGMENT_KEY)
                .and_then(|v| v.as_str())
                .map(str::to_owned),
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn set_local_track(
        &self,
        kind: MediaKind,
        track: Option<LocalTrack>,
    ) -> Result<(), TransportError> {
        let mut senders = self.senders.lock().await;

        match (track, senders.get(&kind).cloned()) {
            (Some(track), Some(sender)) => {
                debug!(remote = %self.remote, "Replacing {:?} track with {}", kind, track.id());
                sender.replace_track(Some(track.track)).await?;
            }
            (Some(track), None) => {
                debug!(remote = %self.remote, "Adding {:?} track {}", kind, track.id());
                let sender = self.peer_connection.add_track(track.track).await?;
                senders.insert(kind, sender);
            }
            (None, Some(sender)) => {
                debug!(remote = %self.remote, "Removing {:?} track", kind);
                self.peer_connection.remove_track(&sender).await?;
                senders.remove(&kind);
            }
            (None, None) => {}
        }

        Ok(())
    }

    async fn open_caption_channel(&self) -> Result<(), TransportError> {
        let init = RTCDataChannelInit {
            ordered: Some(true),
            ..Default::default()
        };
        let dc = self
            .peer_connection
            .create_data_channel(CAPTION_CHANNEL_LABEL, Some(init))
            .await?;

        wire_caption_channel(&dc, self.events.clone());
        *self.caption_channel.lock().await = Some(dc);
        Ok(())
    }

    async fn send_caption(&self, data: Bytes) -> Result<(), TransportError> {
        let dc = self
            .caption_channel
            .lock()
            .await
            .clone()
            .ok_or(TransportError::ChannelNotOpen)?;

        dc.send(&data).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        if let Some(dc) = self.caption_channel.lock().await.take() {
            let _ = dc.close().await;
        }
        self.senders.lock().await.clear();
        self.peer_connection.close().await?;
        Ok(())
    }
}

/// Remote track surfaced to the presentation layer.
pub struct WebRtcRemoteTrack(pub Arc<TrackRemote>);

impl RemoteMedia for WebRtcRemoteTrack {
    fn id(&self) -> String {
        self.0.id()
    }

    fn stream_id(&self) -> String {
        self.0.stream_id()
    }

    fn kind(&self) -> MediaKind {
        match self.0.kind() {
            RTPCodecType::Audio => MediaKind::Audio,
            _ => MediaKind::Video,
        }
    }
}
