//! Buffer for remote ICE candidates that arrive before the remote description.

use std::collections::VecDeque;

use duocall_server::infrastructure::dto::websocket::IceCandidate;

/// FIFO of pending remote candidates.
///
/// Draining hands every buffered candidate out exactly once, in arrival order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CandidateBuffer {
    pending: VecDeque<IceCandidate>,
}

impl CandidateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate: IceCandidate) {
        self.pending.push_back(candidate);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take every buffered candidate, oldest first, leaving the buffer empty
    pub fn drain(&mut self) -> Vec<IceCandidate> {
        self.pending.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
