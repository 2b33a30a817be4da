//! Negotiation phase and per-peer negotiation state.

use std::fmt;

use super::candidate_buffer::CandidateBuffer;

/// Where the local client is in the call lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// `join` sent, waiting for `joined`
    Joining,
    /// In a room, alone
    WaitingForPeer,
    /// Offer/answer exchange in progress
    Negotiating,
    Connected,
    /// The peer left; the room is still alive
    Disconnected,
    /// Connectivity failed after the automatic restart
    Failed,
    Ended,
}

impl Phase {
    /// In a room on the relay
    pub fn in_room(self) -> bool {
        matches!(
            self,
            Phase::WaitingForPeer
                | Phase::Negotiating
                | Phase::Connected
                | Phase::Disconnected
                | Phase::Failed
        )
    }

    /// No further negotiation happens without a rejoin.
    ///
    /// `Disconnected` is not terminal: the next peer brings the room back to negotiating.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Failed | Phase::Ended)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Idle => "idle",
            Phase::Joining => "joining",
            Phase::WaitingForPeer => "waiting for peer",
            Phase::Negotiating => "negotiating",
            Phase::Connected => "connected",
            Phase::Disconnected => "disconnected",
            Phase::Failed => "failed",
            Phase::Ended => "ended",
        };
        f.write_str(label)
    }
}

/// Negotiation flags for the current peer
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NegotiationState {
    pub local_description_set: bool,
    /// Candidates are applied directly only once this is set
    pub remote_description_set: bool,
    pub buffer: CandidateBuffer,
    pub peer_id: Option<String>,
    pub peer_name: Option<String>,
    /// At most one automatic ICE restart per peer
    pub restart_attempted: bool,
}

impl NegotiationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the peer and everything negotiated with it
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Adopt a new peer, dropping anything negotiated with a previous one
    pub fn set_peer(&mut self, peer_id: impl Into<String>, peer_name: Option<String>) {
        let peer_id = peer_id.into();
        if self.peer_id.as_ref().is_some_and(|current| *current != peer_id) {
            self.reset();
        }
        self.peer_id = Some(peer_id);
        if peer_name.is_some() {
            self.peer_name = peer_name;
        }
    }
}
