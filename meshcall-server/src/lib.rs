mod config;
mod error;
mod registry;
mod relay;

pub use config::RelayConfig;
pub use error::RelayError;
pub use registry::{RoomCommand, RoomRegistry};
pub use relay::{AppState, Relay, SignalingOutput, SignalingService, router, serve, ws_handler};
