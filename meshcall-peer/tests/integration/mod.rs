pub mod session_tests;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::Level;

use meshcall_core::{ParticipantId, ServerMessage};
use meshcall_peer::link::{
    LinkEvent, LinkEventKind, LinkParams, LinkState, PeerLink, PeerLinkHandle, Role,
};
use meshcall_peer::{PeerSession, SessionConfig, SessionEvent};

use crate::utils::{MockConnector, MockSignaling};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub struct TestLink {
    pub handle: PeerLinkHandle,
    pub events: mpsc::UnboundedReceiver<LinkEvent>,
    pub remote: ParticipantId,
}

pub fn spawn_link(role: Role, connector: &MockConnector, signaling: &MockSignaling) -> TestLink {
    let (events_tx, events) = mpsc::unbounded_channel();
    let remote = ParticipantId::new();

    let params = LinkParams {
        local: ParticipantId::new(),
        remote,
        role,
        serial: 0,
        negotiation_timeout: Duration::from_secs(15),
        caption_queue_limit: 8,
        tracks: HashMap::new(),
    };

    let handle = PeerLink::spawn(
        params,
        Arc::new(connector.clone()),
        Arc::new(signaling.clone()),
        events_tx,
    );

    TestLink {
        handle,
        events,
        remote,
    }
}

/// Wait for the next link event matching `pred`, skipping others.
pub async fn expect_link_event<F>(
    events: &mut mpsc::UnboundedReceiver<LinkEvent>,
    timeout: Duration,
    mut pred: F,
) -> Option<LinkEventKind>
where
    F: FnMut(&LinkEventKind) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let event = tokio::time::timeout_at(deadline, events.recv()).await.ok()??;
        if pred(&event.kind) {
            return Some(event.kind);
        }
    }
}

pub async fn expect_state(
    events: &mut mpsc::UnboundedReceiver<LinkEvent>,
    state: LinkState,
) -> bool {
    expect_link_event(events, Duration::from_secs(1), |kind| {
        matches!(kind, LinkEventKind::State(s) if *s == state)
    })
    .await
    .is_some()
}

pub struct TestSession {
    pub session: PeerSession,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
    pub connector: MockConnector,
    pub signaling: MockSignaling,
    pub local: ParticipantId,
}

pub async fn create_session(local: ParticipantId) -> TestSession {
    create_session_with(local, SessionConfig::default(), MockConnector::new()).await
}

pub async fn create_session_with(
    local: ParticipantId,
    config: SessionConfig,
    connector: MockConnector,
) -> TestSession {
    let signaling = MockSignaling::new();
    let (mut session, events) = PeerSession::new(
        config,
        Arc::new(connector.clone()),
        Arc::new(signaling.clone()),
    );

    session
        .handle_server_message(ServerMessage::Welcome {
            participant_id: local,
            ice_servers: Vec::new(),
        })
        .await;

    TestSession {
        session,
        events,
        connector,
        signaling,
        local,
    }
}

impl TestSession {
    /// Hand pending link events to the session until it goes quiet.
    pub async fn pump(&mut self) {
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_millis(50), self.session.next_link_event()).await
        {
            self.session.handle_link_event(event);
        }
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

/// Latest reported state per remote, from a batch of session events.
pub fn latest_link_states(events: &[SessionEvent]) -> HashMap<ParticipantId, LinkState> {
    let mut states = HashMap::new();
    for event in events {
        if let SessionEvent::LinkState { remote, state } = event {
            states.insert(*remote, *state);
        }
    }
    states
}
