use meshcall_core::{CaptionPayload, DEFAULT_SENDER_LABEL, ParticipantId, ServerMessage};

use crate::integration::{create_test_relay, init_tracing, room};

#[tokio::test]
async fn test_caption_goes_to_others_with_forced_origin() {
    init_tracing();

    let (relay, signaling) = create_test_relay();
    let code = room("abc");
    let a = ParticipantId::new();
    let b = ParticipantId::new();
    let c = ParticipantId::new();

    for p in [a, b, c] {
        relay.join(p, code.clone()).await.unwrap();
    }
    let a_before = signaling.messages_for(&a).await.len();

    let payload: CaptionPayload =
        serde_json::from_str(r#"{"text":"hello","score":"high"}"#).unwrap();
    relay.relay_caption(a, payload).await.unwrap();

    // The room handles commands in order, so the caption is out once the roster query returns.
    relay.registry().roster(&code).await;

    for other in [b, c] {
        let messages = signaling.messages_for(&other).await;
        let event = messages
            .iter()
            .find_map(|m| match m {
                ServerMessage::Caption { event } => Some(event.clone()),
                _ => None,
            })
            .expect("caption delivered");

        assert_eq!(event.text, "hello");
        assert_eq!(event.score, None);
        assert_eq!(event.sender, DEFAULT_SENDER_LABEL);
        assert_eq!(event.origin, a);
        assert!(event.timestamp > 0);
    }

    assert_eq!(signaling.messages_for(&a).await.len(), a_before);
}
