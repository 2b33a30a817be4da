//! Error types for the duocall client.

use std::fmt;

use thiserror::Error;

/// Failure reported by the peer-connection capability
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerError {
    #[error("failed to create session description: {0}")]
    CreateDescription(String),

    #[error("failed to apply session description: {0}")]
    ApplyDescription(String),

    #[error("failed to add ICE candidate: {0}")]
    Candidate(String),

    #[error("failed to attach media track: {0}")]
    Track(String),

    #[error("peer connection is closed")]
    Closed,

    #[error("peer connection error: {0}")]
    Other(String),
}

/// Failure while acquiring local media
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("no {0} device available")]
    NotFound(String),

    #[error("media device '{0}' is unavailable")]
    DeviceUnavailable(String),

    #[error("media access denied: {0}")]
    PermissionDenied(String),
}

/// Failure while handing an envelope to the signaling channel
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("signaling channel is closed")]
    Closed,
}

/// Failure of one negotiation step
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    #[error("cannot {operation} while {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: String,
    },

    #[error("no peer connection")]
    NoPeerConnection,

    #[error("peer is not known yet")]
    UnknownPeer,

    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error(transparent)]
    Signal(#[from] SignalError),

    /// The single automatic ICE restart could not be started
    #[error("ICE restart failed: {0}")]
    RestartFailed(String),
}

/// Client-level errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The signaling channel could not be opened or was lost
    #[error("Connection error: {0}")]
    Connection(String),

    /// Local media could not be acquired, so the session never started
    #[error("Could not access camera/microphone: {0}")]
    MediaAcquisition(#[from] MediaError),

    #[error("Negotiation failed: {0}")]
    Negotiation(#[from] NegotiationError),

    /// The relay refused the join
    #[error("Join rejected: {0}")]
    JoinRejected(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Cannot share screen: {0}")]
    ScreenShare(String),
}

/// Severity of a user-visible notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(label)
    }
}

/// A message for the local user. No structured error codes cross the relay boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserNotice {
    pub severity: Severity,
    pub message: String,
}

impl UserNotice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for UserNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}
