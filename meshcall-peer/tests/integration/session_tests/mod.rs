mod test_captions;

use meshcall_core::{ParticipantId, ServerMessage, SessionDescription, SignalPayload};
use meshcall_peer::link::LinkState;
use std::collections::HashMap;

use crate::integration::{TestSession, latest_link_states};

/// Relay every signal `from` addressed to `to` that was not delivered yet.
pub async fn relay_signals(from: &TestSession, to: &mut TestSession, delivered: &mut usize) {
    let pending = from.signaling.signals_to(&to.local);
    for payload in pending.into_iter().skip(*delivered) {
        *delivered += 1;
        to.session
            .handle_server_message(ServerMessage::Signal {
                from: from.local,
                payload,
            })
            .await;
    }
}

/// Run the relay between two sessions until both go quiet, returning the last link state
/// each side reported for the other.
pub async fn settle(a: &mut TestSession, b: &mut TestSession) -> (Option<LinkState>, Option<LinkState>) {
    let mut a_to_b = 0;
    let mut b_to_a = 0;
    let mut a_states = HashMap::new();
    let mut b_states = HashMap::new();

    for _ in 0..6 {
        a.pump().await;
        relay_signals(a, b, &mut a_to_b).await;
        b.pump().await;
        relay_signals(b, a, &mut b_to_a).await;

        a_states.extend(latest_link_states(&a.drain_events()));
        b_states.extend(latest_link_states(&b.drain_events()));
    }

    (a_states.get(&b.local).copied(), b_states.get(&a.local).copied())
}

/// Announce `roster` to `session` as if its last member just joined.
pub async fn announce(session: &mut TestSession, roster: &[ParticipantId]) {
    let Some(participant) = roster.last().copied() else {
        return;
    };
    session
        .session
        .handle_server_message(ServerMessage::Joined {
            participant,
            roster: roster.to_vec(),
        })
        .await;
}

/// Answer every offer the session sent to `remote` that is still unanswered.
pub async fn answer_offers(session: &mut TestSession, remote: ParticipantId, answered: &mut usize) {
    let transport = session.connector.wait_for_transport(&remote).await;
    while *answered < transport.offers() {
        *answered += 1;
        session
            .session
            .handle_server_message(ServerMessage::Signal {
                from: remote,
                payload: SignalPayload::Description(SessionDescription::answer("remote-answer")),
            })
            .await;
        session.pump().await;
    }
}
