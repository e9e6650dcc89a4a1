use meshcall_core::{IceServerConfig, RoomCode};
use std::time::Duration;

/// Gates applied to predictions before they become captions.
#[derive(Debug, Clone)]
pub struct CaptionFilterConfig {
    pub min_score: f32,
    /// Consecutive qualifying predictions with the same label needed before broadcasting.
    pub stable_hits: u32,
    /// Minimum time between two broadcasts.
    pub cooldown: Duration,
    pub ignored_labels: Vec<String>,
    /// Minimum time between two landmark frames sent to the prediction service.
    pub frame_interval: Duration,
}

impl Default for CaptionFilterConfig {
    fn default() -> Self {
        Self {
            min_score: 0.6,
            stable_hits: 2,
            cooldown: Duration::from_millis(200),
            ignored_labels: vec!["unknown".to_owned()],
            frame_interval: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub display_name: String,
    /// Used until the relay's `Welcome` provides its own list.
    pub ice_servers: Vec<IceServerConfig>,
    /// A link still negotiating after this long is closed.
    pub negotiation_timeout: Duration,
    /// Captions kept per link while its caption channel is not open yet.
    pub caption_queue_limit: usize,
    /// Also send captions through the relay, for peers whose data channel is unavailable.
    pub caption_relay_fallback: bool,
    pub caption: CaptionFilterConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            display_name: "Guest".to_owned(),
            ice_servers: IceServerConfig::default_stun(),
            negotiation_timeout: Duration::from_secs(15),
            caption_queue_limit: 32,
            caption_relay_fallback: false,
            caption: CaptionFilterConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// WebSocket URL of the relay, e.g. `ws://localhost:8000/ws`.
    pub relay_url: String,
    pub room: RoomCode,
    pub session: SessionConfig,
}
