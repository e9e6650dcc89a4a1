use meshcall_core::{CaptionEvent, ClientMessage, Packet, ParticipantId, ServerMessage};
use meshcall_peer::{SessionConfig, SessionEvent};
use std::collections::HashMap;

use super::{announce, answer_offers};
use crate::integration::{create_session_with, init_tracing};
use crate::utils::{MockConnector, wait_until};

fn named(name: &str) -> SessionConfig {
    SessionConfig {
        display_name: name.to_owned(),
        ..SessionConfig::default()
    }
}

#[tokio::test]
async fn test_caption_broadcast_reaches_every_link() {
    init_tracing();

    let local = ParticipantId::new();
    let remotes = [ParticipantId::new(), ParticipantId::new()];
    let mut s = create_session_with(local, named("Ana"), MockConnector::new()).await;

    announce(&mut s, &[remotes[0], remotes[1], local]).await;
    let mut answered = HashMap::new();
    for remote in &remotes {
        let transport = s.connector.wait_for_transport(remote).await;
        assert!(wait_until(|| transport.offers() == 1).await);
        answer_offers(&mut s, *remote, answered.entry(*remote).or_default()).await;
    }

    s.session
        .publish_caption("HELLO".to_owned(), Some(0.92))
        .await
        .unwrap();

    let events = s.drain_events();
    let local_caption = events.iter().find_map(|e| match e {
        SessionEvent::Caption(event) => Some(event.clone()),
        _ => None,
    });
    let local_caption = local_caption.expect("local caption event");
    assert_eq!(local_caption.text, "HELLO");
    assert_eq!(local_caption.sender, "Ana");
    assert_eq!(local_caption.origin, local);

    for remote in &remotes {
        let transport = s.connector.transport(remote).unwrap();
        assert!(wait_until(|| transport.sent_captions().len() == 1).await);

        let packet = Packet::decode(&transport.sent_captions()[0]).unwrap();
        let Packet::Caption(sent) = packet;
        assert_eq!(sent, local_caption);
    }

    // Peer-to-peer only unless the relay fallback is switched on.
    assert!(!s
        .signaling
        .sent()
        .iter()
        .any(|m| matches!(m, ClientMessage::Caption { .. })));
}

#[tokio::test]
async fn test_relay_fallback_also_sends_caption_to_relay() {
    init_tracing();

    let config = SessionConfig {
        caption_relay_fallback: true,
        ..named("Ana")
    };
    let mut s = create_session_with(ParticipantId::new(), config, MockConnector::new()).await;

    s.session
        .publish_caption("THANKS".to_owned(), Some(f32::NAN))
        .await
        .unwrap();

    let relayed = s.signaling.sent().into_iter().find_map(|m| match m {
        ClientMessage::Caption { payload } => Some(payload),
        _ => None,
    });
    let relayed = relayed.expect("caption sent to relay");
    assert_eq!(relayed.text.as_deref(), Some("THANKS"));
    assert_eq!(relayed.sender.as_deref(), Some("Ana"));
    assert_eq!(relayed.score, None);
}

#[tokio::test]
async fn test_captions_and_chat_from_relay_are_surfaced() {
    init_tracing();

    let local = ParticipantId::new();
    let other = ParticipantId::new();
    let mut s = create_session_with(local, named("Ana"), MockConnector::new()).await;
    s.drain_events();

    let event = CaptionEvent {
        text: "YES".to_owned(),
        score: None,
        sender: "Bo".to_owned(),
        timestamp: 7,
        origin: other,
    };
    s.session
        .handle_server_message(ServerMessage::Caption {
            event: event.clone(),
        })
        .await;
    s.session
        .handle_server_message(ServerMessage::Chat {
            text: "hi".to_owned(),
            sender: "Bo".to_owned(),
            from: other,
        })
        .await;

    let events = s.drain_events();
    assert!(matches!(&events[0], SessionEvent::Caption(e) if *e == event));
    assert!(matches!(
        &events[1],
        SessionEvent::Chat { text, from, .. } if text == "hi" && *from == other
    ));

    s.session.send_chat("hello".to_owned()).await.unwrap();
    assert!(matches!(
        s.signaling.sent().last(),
        Some(ClientMessage::Chat { text, sender }) if text == "hello" && sender == "Ana"
    ));
}
