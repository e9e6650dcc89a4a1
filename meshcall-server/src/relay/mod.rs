mod message_relay;
mod signaling_output;
mod signaling_service;
mod ws_handler;

pub use message_relay::Relay;
pub use signaling_output::SignalingOutput;
pub use signaling_service::SignalingService;
pub use ws_handler::{AppState, router, serve, ws_handler};
