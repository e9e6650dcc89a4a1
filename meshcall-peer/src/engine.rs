use crate::caption::{CaptionFilter, Landmark, LandmarkFrame, LandmarkThrottle, Prediction};
use crate::config::{EngineConfig, SessionConfig};
use crate::error::SessionError;
use crate::relay_client::RelayClient;
use crate::session::{PeerSession, SessionCommand, SessionEvent, SignalingOutput};
use crate::transport::{PeerConnector, WebRtcConnector};
use meshcall_core::{RoomCode, ServerMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Runs one participant's call: relay traffic, peer links, application commands and the
/// caption pipeline, all from a single task.
pub struct CallEngine {
    room: RoomCode,
    session_config: SessionConfig,
    session: PeerSession,
    incoming: mpsc::Receiver<ServerMessage>,
    commands_tx: mpsc::UnboundedSender<SessionCommand>,
    commands_rx: mpsc::UnboundedReceiver<SessionCommand>,
    frames: Option<mpsc::Sender<LandmarkFrame>>,
    predictions: Option<mpsc::Receiver<Prediction>>,
}

impl CallEngine {
    /// Connect to the relay with a webrtc-rs connector.
    pub async fn connect(
        config: EngineConfig,
    ) -> anyhow::Result<(Self, mpsc::UnboundedReceiver<SessionEvent>)> {
        let (client, incoming) = RelayClient::connect(&config.relay_url).await?;
        let connector = Arc::new(WebRtcConnector::new(config.session.ice_servers.clone()));

        Ok(Self::with_parts(
            config.room,
            config.session,
            connector,
            Arc::new(client),
            incoming,
        ))
    }

    pub fn with_parts(
        room: RoomCode,
        session_config: SessionConfig,
        connector: Arc<dyn PeerConnector>,
        signaling: Arc<dyn SignalingOutput>,
        incoming: mpsc::Receiver<ServerMessage>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (session, events) = PeerSession::new(session_config.clone(), connector, signaling);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let engine = Self {
            room,
            session_config,
            session,
            incoming,
            commands_tx,
            commands_rx,
            frames: None,
            predictions: None,
        };

        (engine, events)
    }

    pub fn commands(&self) -> mpsc::UnboundedSender<SessionCommand> {
        self.commands_tx.clone()
    }

    /// Wire the external prediction service: landmark frames go out on `frames`, results come
    /// back on `predictions`. Accepted results are published as captions.
    pub fn set_prediction_service(
        &mut self,
        frames: mpsc::Sender<LandmarkFrame>,
        predictions: mpsc::Receiver<Prediction>,
    ) {
        self.frames = Some(frames);
        self.predictions = Some(predictions);
    }

    /// Join the configured room and run until teardown or relay loss. The engine stops on its
    /// own once every command sender is dropped.
    pub async fn run(self) {
        let CallEngine {
            room,
            session_config,
            mut session,
            mut incoming,
            commands_tx,
            mut commands_rx,
            frames,
            mut predictions,
        } = self;
        drop(commands_tx);

        let mut throttle = LandmarkThrottle::new(session_config.caption.frame_interval);
        let mut filter = CaptionFilter::new(session_config.caption);

        if let Err(e) = session.join(room).await {
            session.on_transport_lost(e.to_string()).await;
            return;
        }

        while !session.is_torn_down() {
            tokio::select! {
                msg = incoming.recv() => match msg {
                    Some(msg) => session.handle_server_message(msg).await,
                    None => session.on_transport_lost("relay connection closed").await,
                },

                Some(event) = session.next_link_event() => session.handle_link_event(event),

                cmd = commands_rx.recv() => match cmd {
                    Some(SessionCommand::Landmarks { hand, face }) => {
                        submit_landmarks(frames.as_ref(), &mut throttle, &hand, &face);
                    }
                    Some(cmd) => handle_command(&mut session, cmd).await,
                    None => session.teardown().await,
                },

                prediction = next_prediction(&mut predictions) => {
                    if let Some(caption) = filter.accept(&prediction, Instant::now()) {
                        let cmd = SessionCommand::PublishCaption {
                            text: caption.label,
                            score: Some(caption.score),
                        };
                        handle_command(&mut session, cmd).await;
                    }
                }
            }
        }

        info!("Call engine stopped");
    }
}

fn submit_landmarks(
    frames: Option<&mpsc::Sender<LandmarkFrame>>,
    throttle: &mut LandmarkThrottle,
    hand: &[Landmark],
    face: &[Landmark],
) {
    let Some(frames) = frames else { return };
    let Some(frame) = LandmarkFrame::from_landmarks(hand, face) else {
        return;
    };
    if !throttle.ready(Instant::now()) {
        return;
    }

    if frames.try_send(frame).is_err() {
        debug!("Prediction service busy, dropping landmark frame");
    }
}

async fn next_prediction(predictions: &mut Option<mpsc::Receiver<Prediction>>) -> Prediction {
    if let Some(rx) = predictions {
        if let Some(prediction) = rx.recv().await {
            return prediction;
        }
    }
    std::future::pending().await
}

async fn handle_command(session: &mut PeerSession, cmd: SessionCommand) {
    let result = match cmd {
        SessionCommand::Join(room) => session.join(room).await,
        SessionCommand::Leave => session.leave_room().await,
        SessionCommand::Chat(text) => session.send_chat(text).await,
        SessionCommand::PublishCaption { text, score } => {
            session.publish_caption(text, score).await
        }
        SessionCommand::Media { kind, update } => {
            // Already surfaced as a session event, the call goes on without it.
            let _ = session.on_local_media_changed(kind, update);
            Ok(())
        }
        SessionCommand::StartScreenShare(track) => {
            session.start_screen_share(track);
            Ok(())
        }
        SessionCommand::StopScreenShare => {
            session.stop_screen_share();
            Ok(())
        }
        SessionCommand::Landmarks { .. } => Ok(()),
        SessionCommand::Teardown => {
            session.teardown().await;
            Ok(())
        }
    };

    match result {
        Ok(()) => {}
        Err(SessionError::TransportLost(reason)) => session.on_transport_lost(reason).await,
        Err(e) => warn!("Command failed: {}", e),
    }
}
