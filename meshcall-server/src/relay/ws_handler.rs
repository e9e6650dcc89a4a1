use crate::config::RelayConfig;
use crate::relay::{Relay, SignalingOutput, SignalingService};
use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::HeaderValue;
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, Stream, StreamExt};
use meshcall_core::{ClientMessage, ParticipantId, ServerMessage};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub relay: Relay,
    pub signaling: SignalingService,
    pub outbound_buffer: usize,
}

impl AppState {
    pub fn new(config: &RelayConfig) -> Self {
        let signaling = SignalingService::new(config.ice_servers.clone());
        let output: Arc<dyn SignalingOutput> = Arc::new(signaling.clone());

        Self {
            relay: Relay::new(output, config),
            signaling,
            outbound_buffer: config.outbound_buffer.max(1),
        }
    }
}

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::new().allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid allowed origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new().allow_origin(AllowOrigin::list(origins))
}

/// Bind `config.bind` and run the relay until the listener fails.
pub async fn serve(config: RelayConfig) -> anyhow::Result<()> {
    let state = AppState::new(&config);
    let app = router(state, &config.allowed_origins);

    let listener = TcpListener::bind(config.bind).await?;
    info!("Relay listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let participant = ParticipantId::new();
    info!(%participant, "New WebSocket connection");

    let (mut sender, receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(state.outbound_buffer);

    state.signaling.add_peer(participant, tx);

    let welcome = ServerMessage::Welcome {
        participant_id: participant,
        ice_servers: state.signaling.get_ice_servers(),
    };
    state.signaling.deliver(&participant, welcome).await;

    let mut send_task = tokio::spawn(async move {
        while let Some(json) = rx.recv().await {
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let (stop_tx, stop_rx) = oneshot::channel();
    let mut recv_task = tokio::spawn(pump_incoming(receiver, stop_rx, state.clone(), participant));

    tokio::select! {
        _ = (&mut send_task) => {
            // Let the message in hand finish so a half-done join is visible to the cleanup below.
            let _ = stop_tx.send(());
            let _ = recv_task.await;
        }
        _ = (&mut recv_task) => send_task.abort(),
    };

    state.signaling.remove_peer(&participant);
    state.relay.handle_disconnect(participant).await;
    info!(%participant, "WebSocket disconnected");
}

/// Handle client frames until the socket ends or `stop` fires. A frame already being handled is
/// always finished.
async fn pump_incoming<S, E>(
    mut receiver: S,
    mut stop: oneshot::Receiver<()>,
    state: AppState,
    participant: ParticipantId,
) where
    S: Stream<Item = Result<Message, E>> + Unpin,
{
    loop {
        let msg = tokio::select! {
            biased;
            _ = &mut stop => break,
            msg = receiver.next() => msg,
        };

        match msg {
            Some(Ok(Message::Text(text))) => {
                handle_text(&state, participant, text.as_str()).await;
            }
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
            Some(Ok(_)) => {}
        }
    }
}

async fn handle_text(state: &AppState, participant: ParticipantId, text: &str) {
    let msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(%participant, "Malformed client message: {}", e);
            let reply = ServerMessage::Error {
                message: format!("malformed message: {e}"),
            };
            state.signaling.deliver(&participant, reply).await;
            return;
        }
    };

    if let Err(e) = state.relay.handle_client_message(participant, msg).await {
        warn!(%participant, "Rejected client message: {}", e);
        let reply = ServerMessage::Error {
            message: e.to_string(),
        };
        state.signaling.deliver(&participant, reply).await;
    }
}
