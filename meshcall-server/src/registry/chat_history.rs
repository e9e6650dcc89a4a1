use meshcall_core::ParticipantId;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ChatEntry {
    pub text: String,
    pub sender: String,
    pub from: ParticipantId,
}

/// Ring buffer of the most recent chat messages of one room.
#[derive(Debug)]
pub(crate) struct ChatHistory {
    entries: VecDeque<ChatEntry>,
    limit: usize,
}

impl ChatHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit.min(64)),
            limit,
        }
    }

    pub fn push(&mut self, entry: ChatEntry) {
        if self.limit == 0 {
            return;
        }
        if self.entries.len() == self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
