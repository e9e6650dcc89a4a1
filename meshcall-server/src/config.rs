use meshcall_core::IceServerConfig;
use std::net::SocketAddr;

/// Relay settings. Every field has a working default; the CLI overrides them.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    /// Handed to every client in `Welcome`.
    pub ice_servers: Vec<IceServerConfig>,
    /// Chat messages retained per room for late joiners.
    pub chat_history_limit: usize,
    /// Per-connection outbound queue. Messages for a full queue are dropped.
    pub outbound_buffer: usize,
    pub room_command_buffer: usize,
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            ice_servers: IceServerConfig::default_stun(),
            chat_history_limit: 100,
            outbound_buffer: 256,
            room_command_buffer: 100,
            allowed_origins: Vec::new(),
        }
    }
}
