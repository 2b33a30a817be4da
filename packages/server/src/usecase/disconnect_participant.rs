//! UseCase: 接続の切断
//!
//! トランスポートレベルの切断は leave と同じ扱いになります。
//! ただし end-call 済みの接続では leave を行わず、peer-left は送信しません。

use std::sync::Arc;

use crate::domain::{Connection, MessagePusher};

use super::leave_room::{LeaveOutcome, LeaveRoomUseCase};

/// 切断の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// end-call 済みのため leave を抑止した
    Suppressed,
    Left(LeaveOutcome),
}

/// 切断のユースケース
pub struct DisconnectParticipantUseCase {
    leave_room: Arc<LeaveRoomUseCase>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectParticipantUseCase {
    /// 新しい DisconnectParticipantUseCase を作成
    pub fn new(leave_room: Arc<LeaveRoomUseCase>, message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self {
            leave_room,
            message_pusher,
        }
    }

    /// 切断を実行
    ///
    /// どの場合も接続の送信チャンネルは MessagePusher から登録解除される。
    pub async fn execute(&self, mut connection: Connection) -> DisconnectOutcome {
        let outcome = if connection.is_ended() {
            DisconnectOutcome::Suppressed
        } else {
            DisconnectOutcome::Left(self.leave_room.execute(&mut connection).await)
        };

        self.message_pusher.unregister_client(connection.id()).await;

        outcome
    }
}
