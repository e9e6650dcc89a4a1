use meshcall_core::{IceCandidate, ParticipantId, ServerMessage, SessionDescription, SignalPayload};
use meshcall_server::RelayError;

use crate::integration::{create_test_relay, init_tracing};

#[tokio::test]
async fn test_signal_forwarded_unmodified() {
    init_tracing();

    let (relay, signaling) = create_test_relay();
    let a = ParticipantId::new();
    let b = ParticipantId::new();

    let offer = SignalPayload::Description(SessionDescription::offer("v=0 offer".to_string()));
    let candidate = SignalPayload::Candidate(IceCandidate {
        candidate: "candidate:1 1 udp 1 10.0.0.1 5000 typ host".to_string(),
        sdp_mid: Some("0".to_string()),
        sdp_m_line_index: Some(0),
        ..IceCandidate::default()
    });

    relay.relay_signal(a, b, offer.clone()).await.unwrap();
    relay.relay_signal(a, b, candidate.clone()).await.unwrap();

    assert_eq!(
        signaling.messages_for(&b).await,
        vec![
            ServerMessage::Signal {
                from: a,
                payload: offer,
            },
            ServerMessage::Signal {
                from: a,
                payload: candidate,
            },
        ]
    );
    assert!(signaling.messages_for(&a).await.is_empty());
}

#[tokio::test]
async fn test_signal_to_self_is_rejected() {
    init_tracing();

    let (relay, signaling) = create_test_relay();
    let a = ParticipantId::new();
    let payload = SignalPayload::Description(SessionDescription::answer("v=0".to_string()));

    assert_eq!(
        relay.relay_signal(a, a, payload).await,
        Err(RelayError::SelfSignal(a))
    );
    assert!(signaling.messages_for(&a).await.is_empty());
}
