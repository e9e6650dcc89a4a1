pub use meshcall_core::model::{ParticipantId, RoomCode};

pub mod model {
    pub use meshcall_core::model::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use meshcall_server::*;
}

#[cfg(feature = "peer")]
pub mod peer {
    pub use meshcall_peer::*;
}
