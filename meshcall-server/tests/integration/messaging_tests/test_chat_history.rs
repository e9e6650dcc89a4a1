use meshcall_core::{ParticipantId, ServerMessage};
use meshcall_server::{RelayConfig, RelayError};

use crate::integration::{create_test_relay, create_test_relay_with, init_tracing, room};

fn chat_texts(messages: &[ServerMessage]) -> Vec<String> {
    messages
        .iter()
        .filter_map(|m| match m {
            ServerMessage::Chat { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_chat_reaches_every_member_including_sender() {
    init_tracing();

    let (relay, signaling) = create_test_relay();
    let code = room("abc");
    let a = ParticipantId::new();
    let b = ParticipantId::new();

    relay.join(a, code.clone()).await.unwrap();
    relay.join(b, code.clone()).await.unwrap();

    relay
        .relay_chat(a, "hello".to_string(), "Alice".to_string())
        .await
        .unwrap();

    let to_b = signaling.wait_for_messages(&b, 2, 1000).await;
    assert_eq!(
        to_b.last(),
        Some(&ServerMessage::Chat {
            text: "hello".to_string(),
            sender: "Alice".to_string(),
            from: a,
        })
    );

    let to_a = signaling.wait_for_messages(&a, 3, 1000).await;
    assert_eq!(chat_texts(&to_a), vec!["hello"]);
}

#[tokio::test]
async fn test_late_joiner_receives_history_after_joined() {
    init_tracing();

    let (relay, signaling) = create_test_relay();
    let code = room("abc");
    let a = ParticipantId::new();
    let b = ParticipantId::new();

    relay.join(a, code.clone()).await.unwrap();
    for text in ["one", "two"] {
        relay
            .relay_chat(a, text.to_string(), "Alice".to_string())
            .await
            .unwrap();
    }

    relay.join(b, code.clone()).await.unwrap();

    let to_b = signaling.messages_for(&b).await;
    assert!(matches!(to_b[0], ServerMessage::Joined { participant, .. } if participant == b));
    assert_eq!(chat_texts(&to_b), vec!["one", "two"]);
}

#[tokio::test]
async fn test_history_is_capped() {
    init_tracing();

    let config = RelayConfig {
        chat_history_limit: 2,
        ..RelayConfig::default()
    };
    let (relay, signaling) = create_test_relay_with(config);
    let code = room("abc");
    let a = ParticipantId::new();
    let b = ParticipantId::new();

    relay.join(a, code.clone()).await.unwrap();
    for text in ["one", "two", "three"] {
        relay
            .relay_chat(a, text.to_string(), "Alice".to_string())
            .await
            .unwrap();
    }
    relay.join(b, code.clone()).await.unwrap();

    assert_eq!(chat_texts(&signaling.messages_for(&b).await), vec!["two", "three"]);
}

#[tokio::test]
async fn test_chat_outside_room_is_rejected() {
    init_tracing();

    let (relay, _signaling) = create_test_relay();
    let a = ParticipantId::new();

    let result = relay
        .relay_chat(a, "hello".to_string(), "Alice".to_string())
        .await;

    assert_eq!(result, Err(RelayError::NotInRoom(a)));
}
