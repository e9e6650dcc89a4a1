mod local_media;
mod peer_session;
mod session_event;
mod signaling_output;

pub use local_media::LocalMedia;
pub use peer_session::PeerSession;
pub use session_event::{RosterEvent, SessionCommand, SessionEvent};
pub use signaling_output::SignalingOutput;
