use meshcall_core::{ParticipantId, ServerMessage};

use crate::integration::{create_test_relay, init_tracing, room};

#[tokio::test]
async fn test_roster_follows_join_order() {
    init_tracing();

    let (relay, _signaling) = create_test_relay();
    let code = room("abc");

    let a = ParticipantId::new();
    let b = ParticipantId::new();
    let c = ParticipantId::new();

    assert_eq!(relay.join(a, code.clone()).await.unwrap(), vec![a]);
    assert_eq!(relay.join(b, code.clone()).await.unwrap(), vec![a, b]);
    assert_eq!(relay.join(c, code.clone()).await.unwrap(), vec![a, b, c]);

    assert_eq!(relay.leave(b).await, Some(vec![a, c]));
    assert_eq!(relay.registry().roster(&code).await, vec![a, c]);
}

#[tokio::test]
async fn test_join_notifies_whole_roster_including_joiner() {
    init_tracing();

    let (relay, signaling) = create_test_relay();
    let code = room("abc");

    let a = ParticipantId::new();
    let b = ParticipantId::new();

    relay.join(a, code.clone()).await.unwrap();
    relay.join(b, code.clone()).await.unwrap();

    let expected = ServerMessage::Joined {
        participant: b,
        roster: vec![a, b],
    };

    let to_a = signaling.messages_for(&a).await;
    assert_eq!(
        to_a,
        vec![
            ServerMessage::Joined {
                participant: a,
                roster: vec![a],
            },
            expected.clone(),
        ]
    );
    assert_eq!(signaling.messages_for(&b).await, vec![expected]);
}

#[tokio::test]
async fn test_repeated_join_answers_only_the_joiner() {
    init_tracing();

    let (relay, signaling) = create_test_relay();
    let code = room("abc");

    let a = ParticipantId::new();
    let b = ParticipantId::new();

    relay.join(a, code.clone()).await.unwrap();
    relay.join(b, code.clone()).await.unwrap();
    let before = signaling.messages_for(&a).await.len();

    let roster = relay.join(b, code.clone()).await.unwrap();

    assert_eq!(roster, vec![a, b]);
    assert_eq!(signaling.messages_for(&a).await.len(), before);
    assert_eq!(signaling.messages_for(&b).await.len(), 2);
}
