use meshcall_core::IceCandidate;

/// Remote candidates that arrived before the remote description. Kept in arrival order.
#[derive(Debug, Default)]
pub struct CandidateBuffer {
    pending: Vec<IceCandidate>,
}

impl CandidateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate: IceCandidate) {
        self.pending.push(candidate);
    }

    /// Everything buffered so far, oldest first. The buffer is left empty.
    pub fn drain(&mut self) -> Vec<IceCandidate> {
        std::mem::take(&mut self.pending)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
