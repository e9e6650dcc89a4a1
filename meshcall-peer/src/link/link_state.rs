use meshcall_core::ParticipantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Negotiating,
    Connected,
    Closed,
}

/// Which side sends the first offer and creates the caption channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Offerer,
    Answerer,
}

impl Role {
    /// The participant further down the roster dials everybody who joined before it.
    pub fn for_roster(roster: &[ParticipantId], local: ParticipantId, remote: ParticipantId) -> Self {
        let position = |id| roster.iter().position(|p| *p == id);

        match (position(local), position(remote)) {
            (Some(l), Some(r)) if l > r => Role::Offerer,
            (Some(_), Some(_)) => Role::Answerer,
            // Not both in the roster yet: fall back to comparing ids so both sides agree.
            _ if local > remote => Role::Offerer,
            _ => Role::Answerer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    Requested,
    NegotiationFailed(String),
    TransportFailed,
    TimedOut,
}
