use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::link::{
    CloseReason, LinkCommand, LinkEvent, LinkEventKind, LinkParams, LinkState, PeerLink,
    PeerLinkHandle, Role,
};
use crate::media::{LocalTrack, MediaUpdate, RemoteTrack};
use crate::session::{LocalMedia, RosterEvent, SessionEvent, SignalingOutput};
use crate::transport::PeerConnector;
use bytes::Bytes;
use futures::future::join_all;
use meshcall_core::utils::now_millis;
use meshcall_core::{
    CaptionEvent, ClientMessage, MediaKind, Packet, ParticipantId, RoomCode, SdpKind,
    ServerMessage, SignalPayload,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Per-client orchestrator: one [`PeerLink`] per other member of the room.
///
/// The session reacts to relay messages, local media changes and link events. It never awaits a
/// link; every request to a link is queued, so one slow or failing peer cannot hold up the rest.
pub struct PeerSession {
    config: SessionConfig,
    local_id: Option<ParticipantId>,
    room: Option<RoomCode>,
    roster: Vec<ParticipantId>,

    links: HashMap<ParticipantId, PeerLinkHandle>,
    next_serial: u64,

    connector: Arc<dyn PeerConnector>,
    signaling: Arc<dyn SignalingOutput>,
    media: LocalMedia,

    link_events_tx: mpsc::UnboundedSender<LinkEvent>,
    link_events_rx: mpsc::UnboundedReceiver<LinkEvent>,
    events: mpsc::UnboundedSender<SessionEvent>,

    torn_down: bool,
}

impl PeerSession {
    pub fn new(
        config: SessionConfig,
        connector: Arc<dyn PeerConnector>,
        signaling: Arc<dyn SignalingOutput>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (link_events_tx, link_events_rx) = mpsc::unbounded_channel();
        let (events, events_rx) = mpsc::unbounded_channel();

        connector.set_ice_servers(config.ice_servers.clone());

        let session = Self {
            config,
            local_id: None,
            room: None,
            roster: Vec::new(),
            links: HashMap::new(),
            next_serial: 0,
            connector,
            signaling,
            media: LocalMedia::new(),
            link_events_tx,
            link_events_rx,
            events,
            torn_down: false,
        };

        (session, events_rx)
    }

    pub fn local_id(&self) -> Option<ParticipantId> {
        self.local_id
    }

    pub fn room(&self) -> Option<&RoomCode> {
        self.room.as_ref()
    }

    pub fn roster(&self) -> &[ParticipantId] {
        &self.roster
    }

    pub fn media(&self) -> &LocalMedia {
        &self.media
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn has_link(&self, remote: &ParticipantId) -> bool {
        self.links.contains_key(remote)
    }

    pub fn link_role(&self, remote: &ParticipantId) -> Option<Role> {
        self.links.get(remote).map(|link| link.role())
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub async fn handle_server_message(&mut self, msg: ServerMessage) {
        if self.torn_down {
            return;
        }

        match msg {
            ServerMessage::Welcome {
                participant_id,
                ice_servers,
            } => {
                info!(%participant_id, "Connected to relay");
                self.local_id = Some(participant_id);
                if !ice_servers.is_empty() {
                    self.connector.set_ice_servers(ice_servers);
                }
                self.emit(SessionEvent::Connected { participant_id });
            }

            ServerMessage::Joined {
                participant,
                roster,
            } => {
                self.on_roster_event(RosterEvent::Joined {
                    participant,
                    roster,
                });
            }

            ServerMessage::Left { participant } => {
                self.on_roster_event(RosterEvent::Left { participant });
            }

            ServerMessage::Signal { from, payload } => self.on_signal(from, payload),

            ServerMessage::Chat { text, sender, from } => {
                self.emit(SessionEvent::Chat { text, sender, from });
            }

            ServerMessage::Caption { event } => {
                self.emit(SessionEvent::Caption(event));
            }

            ServerMessage::Error { message } => {
                warn!("Relay reported an error: {}", message);
                self.emit(SessionEvent::Error(SessionError::MalformedMessage(message)));
            }
        }
    }

    /// Keep the set of links equal to the roster minus ourselves.
    pub fn on_roster_event(&mut self, event: RosterEvent) {
        if self.torn_down {
            return;
        }
        let Some(local) = self.local_id else {
            warn!("Roster event before welcome, ignoring");
            return;
        };

        match event {
            RosterEvent::Joined {
                participant,
                roster,
            } => {
                if !roster.contains(&local) {
                    debug!(%participant, "Roster of a room we are not in, ignoring");
                    return;
                }

                self.roster = roster;
                self.reconcile_links(local);
                self.emit(SessionEvent::RosterChanged {
                    roster: self.roster.clone(),
                });
            }

            RosterEvent::Left { participant } => {
                if participant == local {
                    return;
                }

                self.roster.retain(|p| *p != participant);
                self.close_link(&participant);
                self.emit(SessionEvent::RosterChanged {
                    roster: self.roster.clone(),
                });
            }
        }
    }

    fn reconcile_links(&mut self, local: ParticipantId) {
        let stale: Vec<ParticipantId> = self
            .links
            .keys()
            .filter(|remote| !self.roster.contains(*remote))
            .copied()
            .collect();
        for remote in stale {
            self.close_link(&remote);
        }

        let missing: Vec<ParticipantId> = self
            .roster
            .iter()
            .filter(|p| **p != local && !self.links.contains_key(*p))
            .copied()
            .collect();
        for remote in missing {
            let role = Role::for_roster(&self.roster, local, remote);
            self.open_link(local, remote, role);
        }
    }

    fn on_signal(&mut self, from: ParticipantId, payload: SignalPayload) {
        let Some(local) = self.local_id else {
            warn!(%from, "Signal before welcome, ignoring");
            return;
        };
        if from == local {
            return;
        }

        if !self.links.contains_key(&from) {
            let is_offer = matches!(
                &payload,
                SignalPayload::Description(desc) if desc.kind == SdpKind::Offer
            );
            if !is_offer {
                debug!(%from, "Signal for unknown link, dropping");
                return;
            }
            if !self.roster.contains(&from) {
                debug!(%from, "Offer from outside the room, dropping");
                return;
            }
            self.open_link(local, from, Role::Answerer);
        }

        if let Some(link) = self.links.get(&from) {
            link.send(LinkCommand::Signal(payload));
        }
    }

    fn open_link(&mut self, local: ParticipantId, remote: ParticipantId, role: Role) {
        let serial = self.next_serial;
        self.next_serial += 1;

        debug!(%remote, ?role, serial, "Opening peer link");
        let params = LinkParams {
            local,
            remote,
            role,
            serial,
            negotiation_timeout: self.config.negotiation_timeout,
            caption_queue_limit: self.config.caption_queue_limit,
            tracks: self.media.active_tracks(),
        };

        let handle = PeerLink::spawn(
            params,
            self.connector.clone(),
            self.signaling.clone(),
            self.link_events_tx.clone(),
        );
        self.links.insert(remote, handle);
    }

    fn close_link(&mut self, remote: &ParticipantId) {
        if let Some(mut link) = self.links.remove(remote) {
            debug!(%remote, "Closing peer link");
            link.close();
            self.emit(SessionEvent::LinkState {
                remote: *remote,
                state: LinkState::Closed,
            });
        }
    }

    /// Apply a local media change and push the resulting outgoing track to every link.
    pub fn on_local_media_changed(
        &mut self,
        kind: MediaKind,
        update: MediaUpdate,
    ) -> Result<(), SessionError> {
        let before = self.media.effective_id(kind);

        let result = match update {
            MediaUpdate::Track(track) => {
                self.media.set_capture(kind, Some(track));
                Ok(())
            }
            MediaUpdate::Enabled(enabled) => {
                self.media.set_enabled(kind, enabled);
                Ok(())
            }
            MediaUpdate::Removed => {
                self.media.set_capture(kind, None);
                Ok(())
            }
            MediaUpdate::Unavailable(reason) => {
                warn!(?kind, "Local media unavailable: {}", reason);
                self.media.set_capture(kind, None);
                let err = SessionError::MediaUnavailable { kind, reason };
                self.emit(SessionEvent::Error(err.clone()));
                Err(err)
            }
        };

        if self.media.effective_id(kind) != before {
            self.push_track(kind);
        }

        result
    }

    pub fn start_screen_share(&mut self, track: LocalTrack) {
        let before = self.media.effective_id(MediaKind::Video);
        self.media.set_screen(Some(track));

        if self.media.effective_id(MediaKind::Video) != before {
            self.push_track(MediaKind::Video);
        }
        self.emit(SessionEvent::ScreenShare { active: true });
    }

    /// Go back to the camera, or to no video when the camera is off.
    pub fn stop_screen_share(&mut self) {
        if !self.media.is_sharing_screen() {
            return;
        }

        self.media.set_screen(None);
        self.push_track(MediaKind::Video);
        self.emit(SessionEvent::ScreenShare { active: false });
    }

    fn push_track(&self, kind: MediaKind) {
        let track = self.media.effective(kind);
        for link in self.links.values() {
            let cmd = LinkCommand::SetTrack {
                kind,
                track: track.clone(),
            };
            if !link.send(cmd) {
                debug!(remote = %link.remote(), "Link gone, skipping track update");
            }
        }
    }

    /// Broadcast `event` on every caption channel. Links whose channel is not open yet queue it.
    pub fn send_caption(&self, event: &CaptionEvent) -> Result<(), SessionError> {
        let data = Packet::Caption(event.clone())
            .encode()
            .map_err(|e| SessionError::MalformedMessage(e.to_string()))?;
        let data = Bytes::from(data);

        for link in self.links.values() {
            link.send(LinkCommand::SendCaption(data.clone()));
        }
        Ok(())
    }

    /// Caption our own recognized text and share it with the room.
    pub async fn publish_caption(
        &mut self,
        text: String,
        score: Option<f32>,
    ) -> Result<(), SessionError> {
        let Some(origin) = self.local_id else {
            debug!("Not connected yet, dropping caption");
            return Ok(());
        };

        let event = CaptionEvent {
            text,
            score: score.filter(|s| s.is_finite()),
            sender: self.config.display_name.clone(),
            timestamp: now_millis(),
            origin,
        };

        self.send_caption(&event)?;
        if self.config.caption_relay_fallback {
            let payload = (&event).into();
            self.signaling
                .send(ClientMessage::Caption { payload })
                .await?;
        }

        self.emit(SessionEvent::Caption(event));
        Ok(())
    }

    pub async fn send_chat(&self, text: String) -> Result<(), SessionError> {
        let msg = ClientMessage::Chat {
            text,
            sender: self.config.display_name.clone(),
        };
        self.signaling.send(msg).await
    }

    /// Ask the relay to put us in `room`. Links of a previous room are dropped right away.
    pub async fn join(&mut self, room: RoomCode) -> Result<(), SessionError> {
        if self.room.as_ref().is_some_and(|current| *current != room) {
            self.close_all_links();
        }

        info!(%room, "Joining room");
        self.room = Some(room.clone());
        self.signaling.send(ClientMessage::Join { room }).await
    }

    pub async fn leave_room(&mut self) -> Result<(), SessionError> {
        self.close_all_links();
        self.room = None;
        self.emit(SessionEvent::RosterChanged { roster: Vec::new() });
        self.signaling.send(ClientMessage::Leave).await
    }

    fn close_all_links(&mut self) {
        let remotes: Vec<ParticipantId> = self.links.keys().copied().collect();
        for remote in remotes {
            self.close_link(&remote);
        }
        self.roster.clear();
    }

    pub fn on_incoming_track(&self, remote: ParticipantId, track: RemoteTrack) {
        debug!(%remote, "Incoming {:?} track {}", track.kind(), track.id());
        self.emit(SessionEvent::Track { remote, track });
    }

    pub async fn next_link_event(&mut self) -> Option<LinkEvent> {
        self.link_events_rx.recv().await
    }

    pub fn handle_link_event(&mut self, event: LinkEvent) {
        let LinkEvent {
            remote,
            serial,
            kind,
        } = event;

        let current = self
            .links
            .get(&remote)
            .is_some_and(|link| link.serial() == serial);
        if !current {
            return;
        }

        match kind {
            LinkEventKind::State(state) => {
                self.emit(SessionEvent::LinkState { remote, state });
            }

            LinkEventKind::Track(track) => self.on_incoming_track(remote, track),

            LinkEventKind::Caption(event) => self.emit(SessionEvent::Caption(event)),

            LinkEventKind::Closed(reason) => {
                self.links.remove(&remote);
                self.emit(SessionEvent::LinkState {
                    remote,
                    state: LinkState::Closed,
                });

                let reason = match reason {
                    CloseReason::NegotiationFailed(reason) => Some(reason),
                    CloseReason::TimedOut => Some("negotiation timed out".to_owned()),
                    CloseReason::TransportFailed => Some("transport failed".to_owned()),
                    CloseReason::Requested => None,
                };
                if let Some(reason) = reason {
                    warn!(%remote, "Peer link failed: {}", reason);
                    self.emit(SessionEvent::Error(SessionError::NegotiationFailed {
                        peer: remote,
                        reason,
                    }));
                }
            }
        }
    }

    /// The relay is gone: every link goes down with it.
    pub async fn on_transport_lost(&mut self, reason: impl Into<String>) {
        if self.torn_down {
            return;
        }

        let reason = reason.into();
        warn!("Relay connection lost: {}", reason);
        self.emit(SessionEvent::Error(SessionError::TransportLost(reason)));
        self.teardown().await;
    }

    /// Close every link, release local media and disconnect from the relay. Safe to call more
    /// than once.
    pub async fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        info!(links = self.links.len(), "Tearing down session");

        let links: Vec<PeerLinkHandle> = self.links.drain().map(|(_, link)| link).collect();
        let remotes: Vec<ParticipantId> = links.iter().map(|link| link.remote()).collect();
        join_all(links.into_iter().map(|link| link.shutdown())).await;

        for remote in remotes {
            self.emit(SessionEvent::LinkState {
                remote,
                state: LinkState::Closed,
            });
        }

        self.media.release();
        self.roster.clear();
        self.room = None;
        self.signaling.disconnect().await;

        self.emit(SessionEvent::Closed);
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}
