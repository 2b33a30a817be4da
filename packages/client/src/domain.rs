//! Client-side domain types.

use std::fmt;

use crate::error::UserNotice;

/// Kind of a media track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => f.write_str("audio"),
            MediaKind::Video => f.write_str("video"),
        }
    }
}

/// Which local media to acquire
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
    /// Specific input devices; `None` picks the default device
    pub audio_device: Option<String>,
    pub video_device: Option<String>,
}

impl MediaConstraints {
    pub fn audio_video() -> Self {
        Self {
            audio: true,
            video: true,
            ..Self::default()
        }
    }

    pub fn audio_only() -> Self {
        Self {
            audio: true,
            ..Self::default()
        }
    }

    /// A single track of `kind` from the given device
    pub fn device(kind: MediaKind, device_id: impl Into<String>) -> Self {
        let device_id = Some(device_id.into());
        match kind {
            MediaKind::Audio => Self {
                audio: true,
                audio_device: device_id,
                ..Self::default()
            },
            MediaKind::Video => Self {
                video: true,
                video_device: device_id,
                ..Self::default()
            },
        }
    }
}

/// A chat message received from the peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub sender_name: String,
    pub message: String,
    /// Unix timestamp (milliseconds) stamped by the sender
    pub timestamp: i64,
}

/// Something the UI should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    Joined { room_id: String, participants: usize },
    /// The relay refused the join (for example, the room is full)
    JoinRejected { message: String },
    PeerJoined { peer_name: String },
    PeerLeft { peer_id: String },
    Connected,
    RemoteTrack { kind: MediaKind },
    Chat(ChatEntry),
    Typing { is_typing: bool },
    RemoteScreenShare { is_sharing: bool },
    CallEnded { creator_name: String },
    Notice(UserNotice),
}

impl From<UserNotice> for SessionNotice {
    fn from(notice: UserNotice) -> Self {
        Self::Notice(notice)
    }
}
