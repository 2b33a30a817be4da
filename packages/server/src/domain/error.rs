//! ドメイン層のエラー型

use thiserror::Error;

/// 値オブジェクトの検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
}

/// Room エンティティの不変条件違反
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// 定員に達している
    #[error("Room is full. Only {capacity} participants allowed.")]
    Full { capacity: usize },

    /// 同じ参加者 ID がすでに Room に存在する
    #[error("Participant '{0}' is already in the room")]
    DuplicateParticipant(String),
}

/// Repository のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Room '{0}' not found")]
    RoomNotFound(String),

    #[error("Participant '{0}' not found")]
    ParticipantNotFound(String),

    #[error(transparent)]
    Room(#[from] RoomError),
}

/// メッセージ送信のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("Client '{0}' not found")]
    ClientNotFound(String),

    #[error("Failed to push message: {0}")]
    PushFailed(String),

    #[error("Failed to encode message: {0}")]
    Encode(String),
}

/// ICE サーバー取得のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IceServerError {
    #[error("ICE server request failed: {0}")]
    Request(String),

    #[error("ICE server request returned status {0}")]
    Status(u16),

    #[error("Invalid ICE server response: {0}")]
    InvalidResponse(String),
}
