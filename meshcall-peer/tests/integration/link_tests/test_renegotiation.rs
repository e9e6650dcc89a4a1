use meshcall_core::{MediaKind, SdpKind, SessionDescription, SignalPayload, TrackSource};
use meshcall_peer::link::{LinkCommand, LinkState, Role};

use crate::integration::{expect_state, init_tracing, spawn_link};
use crate::utils::{MockConnector, MockSignaling, local_track, wait_until};

fn answer() -> LinkCommand {
    LinkCommand::Signal(SignalPayload::Description(SessionDescription::answer(
        "remote-answer",
    )))
}

#[tokio::test]
async fn test_offerer_connects_after_answer() {
    init_tracing();

    let connector = MockConnector::new();
    let signaling = MockSignaling::new();
    let mut link = spawn_link(Role::Offerer, &connector, &signaling);

    assert!(expect_state(&mut link.events, LinkState::Negotiating).await);
    assert!(wait_until(|| signaling.descriptions_to(&link.remote, SdpKind::Offer) == 1).await);

    link.handle.send(answer());
    assert!(expect_state(&mut link.events, LinkState::Connected).await);
}

#[tokio::test]
async fn test_back_to_back_changes_keep_one_offer_in_flight() {
    init_tracing();

    let connector = MockConnector::new();
    let signaling = MockSignaling::new();
    let mut link = spawn_link(Role::Offerer, &connector, &signaling);

    let transport = connector.wait_for_transport(&link.remote).await;
    assert!(wait_until(|| transport.offers() == 1).await);

    for id in ["cam-1", "cam-2", "cam-3"] {
        link.handle.send(LinkCommand::SetTrack {
            kind: MediaKind::Video,
            track: Some(local_track(TrackSource::Camera, id)),
        });
    }
    assert!(wait_until(|| transport.video_tracks().len() == 3).await);
    assert_eq!(transport.offers(), 1);

    // The answer to the first offer releases exactly one follow-up cycle.
    link.handle.send(answer());
    assert!(wait_until(|| transport.offers() == 2).await);

    link.handle.send(answer());
    assert!(expect_state(&mut link.events, LinkState::Connected).await);
    assert_eq!(transport.offers(), 2);
}

#[tokio::test]
async fn test_change_on_connected_link_renegotiates() {
    init_tracing();

    let connector = MockConnector::new();
    let signaling = MockSignaling::new();
    let mut link = spawn_link(Role::Offerer, &connector, &signaling);

    let transport = connector.wait_for_transport(&link.remote).await;
    assert!(wait_until(|| transport.offers() == 1).await);
    link.handle.send(answer());
    assert!(expect_state(&mut link.events, LinkState::Connected).await);

    link.handle.send(LinkCommand::SetTrack {
        kind: MediaKind::Audio,
        track: Some(local_track(TrackSource::Microphone, "mic")),
    });

    assert!(expect_state(&mut link.events, LinkState::Negotiating).await);
    assert!(wait_until(|| transport.offers() == 2).await);

    link.handle.send(answer());
    assert!(expect_state(&mut link.events, LinkState::Connected).await);
}

#[tokio::test]
async fn test_answerer_defers_changes_until_first_offer() {
    init_tracing();

    let connector = MockConnector::new();
    let signaling = MockSignaling::new();
    let mut link = spawn_link(Role::Answerer, &connector, &signaling);

    let transport = connector.wait_for_transport(&link.remote).await;
    link.handle.send(LinkCommand::SetTrack {
        kind: MediaKind::Video,
        track: Some(local_track(TrackSource::Camera, "cam")),
    });
    assert!(wait_until(|| transport.video_tracks().len() == 1).await);
    assert_eq!(transport.offers(), 0);

    link.handle.send(LinkCommand::Signal(SignalPayload::Description(
        SessionDescription::offer("remote-offer"),
    )));

    // Answer first, then our own pending change goes out as an offer.
    assert!(wait_until(|| transport.offers() == 1).await);
    assert_eq!(signaling.descriptions_to(&link.remote, SdpKind::Answer), 1);

    link.handle.send(answer());
    assert!(expect_state(&mut link.events, LinkState::Connected).await);
}
