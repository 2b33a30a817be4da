//! UseCase: 通話の終了（end-call）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - EndCallUseCase::execute() メソッド
//! - 他の参加者全員への call-ended-by-creator の送信と Room の削除
//!
//! ### なぜこのテストが必要か
//! - 通知は Room の削除より先にキューに積まれている必要がある
//! - end-call 後の切断で peer-left が重ねて送られないこと（接続が Ended になること）を保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：2 人の Room での end-call、1 人だけの Room での end-call
//! - 異常系：join していない接続、end-call 済みの接続

use std::sync::Arc;

use crate::domain::{
    Connection, ConnectionId, ConnectionState, MessagePusher, OutboundMessage, RelayNotice,
    RoomId, RoomRepository,
};

use super::error::EndCallError;

/// 参加者名が分からない場合に使う名前
const FALLBACK_CREATOR_NAME: &str = "Room creator";

/// end-call の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndCallOutcome {
    pub room_id: RoomId,
    /// call-ended-by-creator を送信した接続の数
    pub notified: usize,
}

/// 通話終了のユースケース
pub struct EndCallUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RoomRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl EndCallUseCase {
    /// 新しい EndCallUseCase を作成
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// end-call を実行
    ///
    /// 1. 送信者以外の参加者全員に call-ended-by-creator を送信
    /// 2. 人数に関係なく Room を削除
    /// 3. 接続を Ended にする（以後の切断では leave を行わない）
    pub async fn execute(
        &self,
        connection: &mut Connection,
    ) -> Result<EndCallOutcome, EndCallError> {
        let membership = match connection.state() {
            ConnectionState::Active(membership) => membership.clone(),
            ConnectionState::Idle => return Err(EndCallError::NotInRoom),
            ConnectionState::Ended => return Err(EndCallError::AlreadyEnded),
        };
        let sender_connection = *connection.id();

        let mut notified: Vec<ConnectionId> = Vec::new();

        // 1. 通知
        if let Some(room) = self.repository.get_room(&membership.room_id).await {
            let creator_name = room
                .find_participant(&membership.participant_id)
                .map(|p| p.display_name.as_str().to_string())
                .unwrap_or_else(|| FALLBACK_CREATOR_NAME.to_string());
            let targets: Vec<ConnectionId> = room
                .participants
                .iter()
                .map(|p| p.connection_id)
                .filter(|id| id != &sender_connection)
                .collect();
            self.notify(&targets, &creator_name).await;
            notified.extend(targets);

            // 2. Room の削除
            //    通知から削除までの間に参加した参加者にも通知する
            if let Some(deleted) = self.repository.delete_room(&membership.room_id).await {
                let late: Vec<ConnectionId> = deleted
                    .participants
                    .iter()
                    .map(|p| p.connection_id)
                    .filter(|id| id != &sender_connection && !notified.contains(id))
                    .collect();
                if !late.is_empty() {
                    self.notify(&late, &creator_name).await;
                    notified.extend(late);
                }
            }
        }

        // 3. 接続を Ended に
        connection.end();

        tracing::info!(
            "'{}' ended the call in room '{}' ({} participant(s) notified)",
            membership.participant_id,
            membership.room_id,
            notified.len()
        );

        Ok(EndCallOutcome {
            room_id: membership.room_id,
            notified: notified.len(),
        })
    }

    async fn notify(&self, targets: &[ConnectionId], creator_name: &str) {
        let notice = OutboundMessage::Notice(RelayNotice::CallEndedByCreator {
            creator_name: creator_name.to_string(),
        });
        if let Err(e) = self
            .message_pusher
            .broadcast(targets.to_vec(), &notice)
            .await
        {
            tracing::warn!("Failed to broadcast call-ended-by-creator: {}", e);
        }
    }
}
