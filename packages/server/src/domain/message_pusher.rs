//! MessagePusher trait 定義
//!
//! 接続中のクライアントへメッセージを届けるためのインターフェース。
//! 具体的な実装（WebSocket）は Infrastructure 層が提供します。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    error::MessagePushError,
    signal::RelayedSignal,
    value_object::{ConnectionId, DisplayName, ParticipantId, RoomId},
};

/// クライアントへの送信チャンネル（エンコード済みのテキストフレーム）
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// リレーサーバー自身が発行する通知
#[derive(Debug, Clone, PartialEq)]
pub enum RelayNotice {
    /// join 成功（送信者のみ）
    Joined {
        room_id: RoomId,
        participant_id: ParticipantId,
        participants: usize,
    },
    /// 後から参加した側に既存の参加者を通知する。受け取った側が offer を作る。
    Ready {
        peer_id: ParticipantId,
        peer_name: DisplayName,
    },
    /// 既存の参加者に新しい参加者を通知する。受け取った側は offer を待つ。
    PeerJoined {
        peer_id: ParticipantId,
        peer_name: DisplayName,
    },
    PeerLeft {
        peer_id: ParticipantId,
    },
    CallEndedByCreator {
        creator_name: String,
    },
    Error {
        message: String,
    },
}

/// クライアントへ送るメッセージ
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Notice(RelayNotice),
    Signal(RelayedSignal),
}

impl From<RelayNotice> for OutboundMessage {
    fn from(notice: RelayNotice) -> Self {
        Self::Notice(notice)
    }
}

impl From<RelayedSignal> for OutboundMessage {
    fn from(signal: RelayedSignal) -> Self {
        Self::Signal(signal)
    }
}

/// MessagePusher trait
///
/// 接続ハンドル（ConnectionId）と送信チャンネルの対応を管理し、メッセージを届ける。
/// 配送は fire-and-forget で、相手の受信確認は待たない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続を登録
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// 接続の登録を解除
    async fn unregister_client(&self, connection_id: &ConnectionId);

    /// 特定の接続にメッセージを送信
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        message: &OutboundMessage,
    ) -> Result<(), MessagePushError>;

    /// 複数の接続にメッセージを送信
    ///
    /// 一部の送信失敗は他の宛先への配送を妨げない。
    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        message: &OutboundMessage,
    ) -> Result<(), MessagePushError>;
}
