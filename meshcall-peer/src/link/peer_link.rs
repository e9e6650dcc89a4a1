use crate::caption::CaptionChannel;
use crate::link::{CandidateBuffer, CloseReason, LinkState, Role};
use crate::media::{LocalTrack, RemoteTrack};
use crate::session::SignalingOutput;
use crate::transport::{ConnectionState, PeerConnector, PeerTransport, TransportEvent};
use bytes::Bytes;
use meshcall_core::{
    CaptionEvent, ClientMessage, IceCandidate, MediaKind, Packet, ParticipantId, SdpKind,
    SessionDescription, SignalPayload,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Requests from the session to one link.
pub enum LinkCommand {
    /// Negotiation payload relayed from the remote participant.
    Signal(SignalPayload),
    /// New effective outgoing track for `kind`. `None` stops sending that kind.
    SetTrack {
        kind: MediaKind,
        track: Option<LocalTrack>,
    },
    /// Encoded caption packet for the remote participant.
    SendCaption(Bytes),
}

pub struct LinkEvent {
    pub remote: ParticipantId,
    /// Tells apart successive links to the same participant.
    pub serial: u64,
    pub kind: LinkEventKind,
}

pub enum LinkEventKind {
    State(LinkState),
    Track(RemoteTrack),
    Caption(CaptionEvent),
    Closed(CloseReason),
}

#[derive(Clone)]
pub struct LinkParams {
    pub local: ParticipantId,
    pub remote: ParticipantId,
    pub role: Role,
    pub serial: u64,
    pub negotiation_timeout: Duration,
    pub caption_queue_limit: usize,
    /// Outgoing tracks attached before the first offer or answer.
    pub tracks: HashMap<MediaKind, LocalTrack>,
}

/// Session-side handle to a running [`PeerLink`].
pub struct PeerLinkHandle {
    remote: ParticipantId,
    role: Role,
    serial: u64,
    commands: mpsc::UnboundedSender<LinkCommand>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PeerLinkHandle {
    pub fn remote(&self) -> ParticipantId {
        self.remote
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Queue a command without waiting. `false` once the link has stopped.
    pub fn send(&self, cmd: LinkCommand) -> bool {
        self.commands.send(cmd).is_ok()
    }

    /// Ask the link to stop. Whatever it is awaiting is abandoned.
    pub fn close(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }

    /// Close and wait until the link has released its transport.
    pub async fn shutdown(mut self) {
        self.close();
        let _ = (&mut self.task).await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Actor driving the connection to one remote participant.
///
/// Commands, relayed signals and transport events are handled one at a time in arrival order.
/// At most one offer is outstanding; media changes during a cycle collapse into a single
/// follow-up offer.
pub struct PeerLink {
    local: ParticipantId,
    remote: ParticipantId,
    role: Role,
    serial: u64,
    state: LinkState,

    connector: Arc<dyn PeerConnector>,
    transport: Option<Arc<dyn PeerTransport>>,
    signaling: Arc<dyn SignalingOutput>,
    events: mpsc::UnboundedSender<LinkEvent>,

    commands: mpsc::UnboundedReceiver<LinkCommand>,
    transport_tx: mpsc::Sender<TransportEvent>,
    transport_rx: mpsc::Receiver<TransportEvent>,

    tracks: HashMap<MediaKind, LocalTrack>,
    candidates: CandidateBuffer,
    caption: CaptionChannel,

    remote_applied: bool,
    offer_in_flight: bool,
    renegotiate_pending: bool,
    transport_connected: bool,

    negotiation_timeout: Duration,
    deadline: Option<Instant>,
}

type Step = Result<(), CloseReason>;

fn negotiation_failed(e: impl std::fmt::Display) -> CloseReason {
    CloseReason::NegotiationFailed(e.to_string())
}

async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl PeerLink {
    pub fn spawn(
        params: LinkParams,
        connector: Arc<dyn PeerConnector>,
        signaling: Arc<dyn SignalingOutput>,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> PeerLinkHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (transport_tx, transport_rx) = mpsc::channel(256);

        let link = PeerLink {
            local: params.local,
            remote: params.remote,
            role: params.role,
            serial: params.serial,
            state: LinkState::Idle,
            connector,
            transport: None,
            signaling,
            events,
            commands: cmd_rx,
            transport_tx,
            transport_rx,
            tracks: params.tracks,
            candidates: CandidateBuffer::new(),
            caption: CaptionChannel::new(params.caption_queue_limit),
            remote_applied: false,
            offer_in_flight: false,
            renegotiate_pending: false,
            transport_connected: false,
            negotiation_timeout: params.negotiation_timeout,
            deadline: None,
        };

        let task = tokio::spawn(link.run(shutdown_rx));

        PeerLinkHandle {
            remote: params.remote,
            role: params.role,
            serial: params.serial,
            commands: cmd_tx,
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        info!(local = %self.local, remote = %self.remote, role = ?self.role, "Peer link started");

        let reason = tokio::select! {
            biased;
            _ = &mut shutdown => CloseReason::Requested,
            reason = self.drive() => reason,
        };

        self.release(reason).await;
    }

    async fn drive(&mut self) -> CloseReason {
        if let Err(reason) = self.start().await {
            return reason;
        }

        loop {
            let deadline = self.deadline;

            let step = tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => Err(CloseReason::Requested),
                },
                Some(event) = self.transport_rx.recv() => self.handle_transport_event(event).await,
                _ = wait_deadline(deadline) => {
                    warn!(remote = %self.remote, "Negotiation timed out");
                    Err(CloseReason::TimedOut)
                }
            };

            if let Err(reason) = step {
                return reason;
            }
        }
    }

    async fn start(&mut self) -> Step {
        let transport: Arc<dyn PeerTransport> = self
            .connector
            .connect(self.remote, self.transport_tx.clone())
            .await
            .map_err(negotiation_failed)?
            .into();
        self.transport = Some(transport.clone());
        self.enter_negotiating();

        let tracks: Vec<(MediaKind, LocalTrack)> = self
            .tracks
            .iter()
            .map(|(kind, track)| (*kind, track.clone()))
            .collect();
        for (kind, track) in tracks {
            if let Err(e) = transport.set_local_track(kind, Some(track)).await {
                warn!(remote = %self.remote, "Failed to attach {:?} track: {}", kind, e);
            }
        }

        if self.role == Role::Offerer {
            if let Err(e) = transport.open_caption_channel().await {
                warn!(remote = %self.remote, "Failed to open caption channel: {}", e);
            }
            self.start_offer().await?;
        }

        Ok(())
    }

    fn transport(&self) -> Result<Arc<dyn PeerTransport>, CloseReason> {
        self.transport
            .clone()
            .ok_or_else(|| negotiation_failed("transport missing"))
    }

    async fn handle_command(&mut self, cmd: LinkCommand) -> Step {
        match cmd {
            LinkCommand::Signal(payload) => self.handle_signal(payload).await,

            LinkCommand::SetTrack { kind, track } => {
                match &track {
                    Some(track) => self.tracks.insert(kind, track.clone()),
                    None => self.tracks.remove(&kind),
                };

                let transport = self.transport()?;
                if let Err(e) = transport.set_local_track(kind, track).await {
                    warn!(remote = %self.remote, "Failed to update {:?} track: {}", kind, e);
                    return Ok(());
                }

                self.request_negotiation().await
            }

            LinkCommand::SendCaption(data) => {
                if let Some(data) = self.caption.submit(data) {
                    let transport = self.transport()?;
                    if let Err(e) = transport.send_caption(data).await {
                        warn!(remote = %self.remote, "Failed to send caption: {}", e);
                    }
                }
                Ok(())
            }
        }
    }

    async fn handle_signal(&mut self, payload: SignalPayload) -> Step {
        match payload {
            SignalPayload::Description(desc) => match desc.kind {
                SdpKind::Offer => self.on_remote_offer(desc).await,
                SdpKind::Answer => self.on_remote_answer(desc).await,
                SdpKind::Rollback => {
                    debug!(remote = %self.remote, "Ignoring remote rollback");
                    Ok(())
                }
            },

            SignalPayload::Candidate(candidate) => {
                if self.remote_applied {
                    self.apply_candidate(candidate).await
                } else {
                    self.candidates.push(candidate);
                    Ok(())
                }
            }
        }
    }

    async fn on_remote_offer(&mut self, desc: SessionDescription) -> Step {
        let transport = self.transport()?;

        if self.offer_in_flight {
            match self.role {
                Role::Offerer => {
                    debug!(remote = %self.remote, "Ignoring colliding offer");
                    return Ok(());
                }
                Role::Answerer => {
                    debug!(remote = %self.remote, "Offer collision, rolling back local offer");
                    transport.rollback_local().await.map_err(negotiation_failed)?;
                    self.offer_in_flight = false;
                    self.renegotiate_pending = true;
                }
            }
        }

        self.enter_negotiating();
        transport
            .set_remote_description(desc)
            .await
            .map_err(negotiation_failed)?;
        self.remote_applied = true;
        self.flush_candidates().await?;

        let answer = transport.create_answer().await.map_err(negotiation_failed)?;
        self.send_signal(SignalPayload::Description(answer)).await;

        if self.renegotiate_pending {
            self.start_offer().await
        } else {
            self.maybe_connected();
            Ok(())
        }
    }

    async fn on_remote_answer(&mut self, desc: SessionDescription) -> Step {
        if !self.offer_in_flight {
            warn!(remote = %self.remote, "Answer without a pending offer, ignoring");
            return Ok(());
        }

        let transport = self.transport()?;
        transport
            .set_remote_description(desc)
            .await
            .map_err(negotiation_failed)?;
        self.offer_in_flight = false;
        self.remote_applied = true;
        self.flush_candidates().await?;

        if self.renegotiate_pending {
            self.start_offer().await
        } else {
            self.maybe_connected();
            Ok(())
        }
    }

    async fn apply_candidate(&mut self, candidate: IceCandidate) -> Step {
        let transport = self.transport()?;
        if let Err(e) = transport.add_ice_candidate(candidate).await {
            warn!(remote = %self.remote, "Failed to add ICE candidate: {}", e);
        }
        Ok(())
    }

    async fn flush_candidates(&mut self) -> Step {
        let pending = self.candidates.drain();
        if !pending.is_empty() {
            debug!(remote = %self.remote, count = pending.len(), "Applying buffered candidates");
        }
        for candidate in pending {
            self.apply_candidate(candidate).await?;
        }
        Ok(())
    }

    /// Renegotiate after a local change, or remember to once the current cycle is over.
    async fn request_negotiation(&mut self) -> Step {
        let awaiting_first_offer = self.role == Role::Answerer && !self.remote_applied;
        if self.offer_in_flight || awaiting_first_offer {
            self.renegotiate_pending = true;
            return Ok(());
        }

        self.start_offer().await
    }

    async fn start_offer(&mut self) -> Step {
        let transport = self.transport()?;
        self.renegotiate_pending = false;
        self.enter_negotiating();

        let offer = transport.create_offer().await.map_err(negotiation_failed)?;
        self.offer_in_flight = true;
        debug!(remote = %self.remote, "Sending offer");
        self.send_signal(SignalPayload::Description(offer)).await;
        Ok(())
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) -> Step {
        match event {
            TransportEvent::CandidateGenerated(candidate) => {
                self.send_signal(SignalPayload::Candidate(candidate)).await;
            }

            TransportEvent::StateChanged(state) => match state {
                ConnectionState::Connected => {
                    self.transport_connected = true;
                    self.maybe_connected();
                }
                ConnectionState::Disconnected => {
                    warn!(remote = %self.remote, "Transport disconnected, waiting for recovery");
                    self.transport_connected = false;
                }
                ConnectionState::Failed | ConnectionState::Closed => {
                    return Err(CloseReason::TransportFailed);
                }
                ConnectionState::New | ConnectionState::Connecting => {}
            },

            TransportEvent::TrackReceived(track) => {
                self.emit(LinkEventKind::Track(track));
            }

            TransportEvent::CaptionChannelOpen => {
                let transport = self.transport()?;
                for data in self.caption.open() {
                    if let Err(e) = transport.send_caption(data).await {
                        warn!(remote = %self.remote, "Failed to flush caption: {}", e);
                    }
                }
            }

            TransportEvent::CaptionChannelClosed => self.caption.close(),

            TransportEvent::CaptionData(data) => match Packet::decode(&data) {
                Ok(Packet::Caption(mut event)) => {
                    event.origin = self.remote;
                    self.emit(LinkEventKind::Caption(event));
                }
                Err(e) => warn!(remote = %self.remote, "Malformed caption packet: {}", e),
            },
        }

        Ok(())
    }

    async fn send_signal(&self, payload: SignalPayload) {
        let msg = ClientMessage::Signal {
            to: self.remote,
            payload,
        };
        if let Err(e) = self.signaling.send(msg).await {
            warn!(remote = %self.remote, "Failed to send signal: {}", e);
        }
    }

    fn enter_negotiating(&mut self) {
        if self.deadline.is_none() {
            self.deadline = Some(Instant::now() + self.negotiation_timeout);
        }
        self.set_state(LinkState::Negotiating);
    }

    fn maybe_connected(&mut self) {
        let settled = self.remote_applied && !self.offer_in_flight && !self.renegotiate_pending;
        if settled && self.transport_connected {
            self.deadline = None;
            self.set_state(LinkState::Connected);
        }
    }

    fn set_state(&mut self, state: LinkState) {
        if self.state != state {
            debug!(remote = %self.remote, "Link state {:?} -> {:?}", self.state, state);
            self.state = state;
            self.emit(LinkEventKind::State(state));
        }
    }

    fn emit(&self, kind: LinkEventKind) {
        let _ = self.events.send(LinkEvent {
            remote: self.remote,
            serial: self.serial,
            kind,
        });
    }

    async fn release(&mut self, reason: CloseReason) {
        info!(remote = %self.remote, ?reason, "Peer link closed");

        self.deadline = None;
        self.candidates.clear();
        self.caption.clear();
        self.tracks.clear();

        if let Some(transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                debug!(remote = %self.remote, "Error while closing transport: {}", e);
            }
        }

        self.state = LinkState::Closed;
        self.emit(LinkEventKind::Closed(reason));
    }
}
