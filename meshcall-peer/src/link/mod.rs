mod candidate_buffer;
mod link_state;
mod peer_link;

pub use candidate_buffer::CandidateBuffer;
pub use link_state::{CloseReason, LinkState, Role};
pub use peer_link::{LinkCommand, LinkEvent, LinkEventKind, LinkParams, PeerLink, PeerLinkHandle};
