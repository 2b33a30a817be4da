//! Capabilities the negotiation logic is written against.
//!
//! The state machine never touches a WebRTC stack directly: it drives a [`PeerConnection`]
//! built by a [`PeerConnectionFactory`], obtains tracks from a [`MediaSource`] and hands
//! envelopes to a [`SignalSink`]. Callbacks of the underlying stack arrive as [`PeerEvent`]s.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use duocall_server::infrastructure::dto::websocket::{
    ClientMessage, IceCandidate, SessionDescription,
};
use tokio::sync::mpsc;

use crate::domain::{MediaConstraints, MediaKind};
use crate::error::{MediaError, PeerError, SignalError};

/// Options for [`PeerConnection::create_offer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OfferOptions {
    pub ice_restart: bool,
    pub receive_audio: bool,
    pub receive_video: bool,
}

impl OfferOptions {
    /// Initial offer: receive both audio and video from the peer
    pub fn initial() -> Self {
        Self {
            ice_restart: false,
            receive_audio: true,
            receive_video: true,
        }
    }

    pub fn ice_restart() -> Self {
        Self {
            ice_restart: true,
            ..Self::initial()
        }
    }
}

/// Aggregate connectivity state reported by the peer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl fmt::Display for PeerConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PeerConnectionState::New => "new",
            PeerConnectionState::Connecting => "connecting",
            PeerConnectionState::Connected => "connected",
            PeerConnectionState::Disconnected => "disconnected",
            PeerConnectionState::Failed => "failed",
            PeerConnectionState::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// Asynchronous notifications from a peer connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// A locally gathered network-path candidate
    LocalCandidate(IceCandidate),
    ConnectionStateChanged(PeerConnectionState),
    /// The peer started sending a track
    RemoteTrack { kind: MediaKind, track_id: String },
}

/// A [`PeerEvent`] stamped with the generation of the peer connection that raised it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEventEnvelope {
    pub generation: u64,
    pub event: PeerEvent,
}

/// Event sender handed to one peer connection.
///
/// All peer connections of a session share one channel; each gets its own generation so
/// that events still queued from a closed connection can be told apart.
#[derive(Debug, Clone)]
pub struct PeerEventSender {
    generation: u64,
    tx: mpsc::UnboundedSender<PeerEventEnvelope>,
}

impl PeerEventSender {
    /// A new channel; the returned sender is generation 0
    pub fn channel() -> (Self, PeerEventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { generation: 0, tx }, rx)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Sender on the same channel for the next peer connection
    pub fn next_generation(&self) -> Self {
        Self {
            generation: self.generation + 1,
            tx: self.tx.clone(),
        }
    }

    /// Returns `false` once the receiving side is gone
    pub fn send(&self, event: PeerEvent) -> bool {
        self.tx
            .send(PeerEventEnvelope {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

pub type PeerEventReceiver = mpsc::UnboundedReceiver<PeerEventEnvelope>;

/// A local media track
pub trait MediaTrack: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;
    fn kind(&self) -> MediaKind;
    /// Release the underlying device. Stopping twice is harmless.
    fn stop(&self);
}

/// One WebRTC peer connection
#[async_trait]
pub trait PeerConnection: Send + Sync {
    type Track: MediaTrack + 'static;

    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription, PeerError>;
    async fn create_answer(&self) -> Result<SessionDescription, PeerError>;
    async fn set_local_description(&self, description: SessionDescription) -> Result<(), PeerError>;
    async fn set_remote_description(&self, description: SessionDescription)
    -> Result<(), PeerError>;
    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), PeerError>;

    /// Attach a track on a new sender
    async fn add_track(&self, track: Arc<Self::Track>) -> Result<(), PeerError>;

    /// Swap the track on the existing sender of `kind` without renegotiating.
    ///
    /// Returns `false` when no sender of that kind exists.
    async fn replace_track(
        &self,
        kind: MediaKind,
        track: Option<Arc<Self::Track>>,
    ) -> Result<bool, PeerError>;

    async fn close(&self) -> Result<(), PeerError>;
}

/// Builds peer connections bound to an event channel
#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    type Peer: PeerConnection;

    async fn create(&self, events: PeerEventSender) -> Result<Self::Peer, PeerError>;
}

/// Local capture devices
#[async_trait]
pub trait MediaSource: Send + Sync {
    type Track: MediaTrack + 'static;

    async fn acquire(&self, constraints: &MediaConstraints)
    -> Result<Vec<Arc<Self::Track>>, MediaError>;
    async fn acquire_screen(&self) -> Result<Arc<Self::Track>, MediaError>;
}

/// Outbound half of the signaling channel
pub trait SignalSink: Send + Sync {
    fn send(&self, message: ClientMessage) -> Result<(), SignalError>;
}

impl SignalSink for mpsc::UnboundedSender<ClientMessage> {
    fn send(&self, message: ClientMessage) -> Result<(), SignalError> {
        mpsc::UnboundedSender::send(self, message).map_err(|_| SignalError::Closed)
    }
}
