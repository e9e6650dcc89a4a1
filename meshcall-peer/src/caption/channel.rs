use bytes::Bytes;
use std::collections::VecDeque;

/// Outgoing side of one link's caption channel.
///
/// Captions sent before the channel opens wait in a bounded queue and go out in order once it
/// does. When the queue is full the oldest caption is dropped, since a stale caption is worth
/// less than a fresh one.
#[derive(Debug)]
pub struct CaptionChannel {
    open: bool,
    pending: VecDeque<Bytes>,
    limit: usize,
}

impl CaptionChannel {
    pub fn new(limit: usize) -> Self {
        Self {
            open: false,
            pending: VecDeque::new(),
            limit,
        }
    }

    /// Queue `data` unless the channel is open. Returns the data to send right away, if any.
    pub fn submit(&mut self, data: Bytes) -> Option<Bytes> {
        if self.open {
            return Some(data);
        }

        if self.limit == 0 {
            return None;
        }
        if self.pending.len() == self.limit {
            self.pending.pop_front();
        }
        self.pending.push_back(data);
        None
    }

    /// Mark the channel open and hand back everything queued, oldest first.
    pub fn open(&mut self) -> Vec<Bytes> {
        self.open = true;
        self.pending.drain(..).collect()
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn clear(&mut self) {
        self.open = false;
        self.pending.clear();
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
