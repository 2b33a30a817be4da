//! UseCase: Room からの退出（leave）
//!
//! 退出した参加者を Room から削除し、残っている参加者に peer-left を送信します。
//! Room が空になった場合は Room ごと削除されます。何度呼んでも安全です。

use std::sync::Arc;

use crate::domain::{
    Connection, MessagePusher, OutboundMessage, ParticipantId, RelayNotice, RepositoryError,
    RoomId, RoomRepository,
};

/// leave の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Room に参加していなかった
    NotInRoom,
    Left {
        room_id: RoomId,
        participant_id: ParticipantId,
        /// peer-left を送信した参加者
        notified: Vec<ParticipantId>,
        room_deleted: bool,
    },
}

/// Room 退出のユースケース
pub struct LeaveRoomUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RoomRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl LeaveRoomUseCase {
    /// 新しい LeaveRoomUseCase を作成
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// leave を実行
    ///
    /// 接続は Active から Idle に戻り、同じ接続から再び join できる。
    pub async fn execute(&self, connection: &mut Connection) -> LeaveOutcome {
        let Some(membership) = connection.release() else {
            return LeaveOutcome::NotInRoom;
        };

        // 同じ参加者 ID で別の接続が参加し直している場合は削除しない
        let still_member = self
            .repository
            .get_room(&membership.room_id)
            .await
            .and_then(|room| {
                room.find_participant(&membership.participant_id)
                    .map(|p| &p.connection_id == connection.id())
            })
            .unwrap_or(false);

        let removed = if still_member {
            self.repository
                .remove_participant(&membership.room_id, &membership.participant_id)
                .await
        } else {
            Err(RepositoryError::ParticipantNotFound(
                membership.participant_id.as_str().to_string(),
            ))
        };

        let removed = match removed {
            Ok(removed) => removed,
            Err(e) => {
                // Room はすでに削除されている（相手の end-call など）
                tracing::debug!(
                    "'{}' left room '{}' which no longer holds it: {}",
                    membership.participant_id,
                    membership.room_id,
                    e
                );
                return LeaveOutcome::Left {
                    room_id: membership.room_id,
                    participant_id: membership.participant_id,
                    notified: Vec::new(),
                    room_deleted: false,
                };
            }
        };

        let notice = OutboundMessage::Notice(RelayNotice::PeerLeft {
            peer_id: membership.participant_id.clone(),
        });
        let targets = removed
            .remaining
            .iter()
            .map(|p| p.connection_id)
            .collect::<Vec<_>>();
        if let Err(e) = self.message_pusher.broadcast(targets, &notice).await {
            tracing::warn!("Failed to broadcast peer-left: {}", e);
        }

        tracing::info!(
            "'{}' left room '{}'{}",
            membership.participant_id,
            membership.room_id,
            if removed.room_deleted {
                " (room deleted)"
            } else {
                ""
            }
        );

        LeaveOutcome::Left {
            room_id: membership.room_id,
            participant_id: membership.participant_id,
            notified: removed.remaining.into_iter().map(|p| p.id).collect(),
            room_deleted: removed.room_deleted,
        }
    }
}
