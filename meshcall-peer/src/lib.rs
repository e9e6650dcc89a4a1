pub mod caption;
mod config;
mod engine;
mod error;
pub mod link;
mod media;
mod relay_client;
pub mod session;
pub mod transport;

pub use config::{CaptionFilterConfig, EngineConfig, SessionConfig};
pub use engine::CallEngine;
pub use error::{SessionError, TransportError};
pub use media::{LocalTrack, MediaUpdate, RemoteMedia, RemoteTrack};
pub use relay_client::RelayClient;
pub use session::{PeerSession, SessionCommand, SessionEvent, SignalingOutput};
