use meshcall_core::{ParticipantId, ServerMessage};

use crate::integration::{create_test_relay, init_tracing, room};

#[tokio::test]
async fn test_disconnect_notifies_remaining_members() {
    init_tracing();

    let (relay, signaling) = create_test_relay();
    let code = room("abc");
    let a = ParticipantId::new();
    let b = ParticipantId::new();

    relay.join(a, code.clone()).await.unwrap();
    relay.join(b, code.clone()).await.unwrap();

    relay.handle_disconnect(b).await;

    assert_eq!(
        signaling.messages_for(&a).await.last(),
        Some(&ServerMessage::Left { participant: b })
    );
    assert_eq!(relay.registry().roster(&code).await, vec![a]);
    assert_eq!(relay.registry().find_room_of(&b), None);

    // A second disconnect for the same connection changes nothing.
    relay.handle_disconnect(b).await;
    assert_eq!(signaling.count_left(&a, &b).await, 1);
}

#[tokio::test]
async fn test_disconnect_outside_room_is_silent() {
    init_tracing();

    let (relay, signaling) = create_test_relay();
    let a = ParticipantId::new();

    relay.handle_disconnect(a).await;

    assert!(signaling.messages_for(&a).await.is_empty());
}
