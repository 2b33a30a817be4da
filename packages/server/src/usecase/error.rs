//! UseCase 層のエラー型

use thiserror::Error;

use crate::domain::{MessagePushError, RepositoryError, RoomError};

/// join のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    /// この接続はすでに Room に参加している
    #[error("connection is already in room '{0}'")]
    AlreadyJoined(String),

    /// end-call 済みの接続
    #[error("connection has already ended the call")]
    ConnectionEnded,

    /// Room が参加を拒否した（定員超過・ID 重複）
    #[error(transparent)]
    Rejected(RoomError),

    #[error(transparent)]
    Repository(RepositoryError),
}

/// 中継のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// 送信者が Room に参加していない
    #[error("sender is not in a room")]
    NotInRoom,

    #[error(transparent)]
    Push(#[from] MessagePushError),
}

/// end-call のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndCallError {
    #[error("sender is not in a room")]
    NotInRoom,

    #[error("connection has already ended the call")]
    AlreadyEnded,
}
