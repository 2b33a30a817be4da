//! UseCase: シグナリングメッセージの中継
//!
//! offer / answer / ice-candidate / chat-message / typing-indicator / screen-share-state を
//! 同じ Room の `target` に転送します。`from` は常にサーバーが送信者の ID で上書きします。

use std::sync::Arc;

use crate::domain::{
    Connection, MessagePusher, OutboundMessage, ParticipantId, RelayedSignal, RoomRepository,
    SignalKind, SignalPayload,
};

use super::error::RelayError;

/// 中継の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// 宛先に送信した
    Delivered { to: ParticipantId },
    /// 宛先が Room にいない（相手が退出済み）ため破棄した
    Dropped,
}

/// 中継のユースケース
pub struct RelaySignalUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RoomRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl RelaySignalUseCase {
    /// 新しい RelaySignalUseCase を作成
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// 中継を実行
    ///
    /// 送信者がこの接続のまま Room に参加していることを確認してから、宛先を解決する。
    pub async fn execute(
        &self,
        connection: &Connection,
        kind: SignalKind,
        target: Option<String>,
        payload: SignalPayload,
    ) -> Result<RelayOutcome, RelayError> {
        let membership = connection.membership().ok_or(RelayError::NotInRoom)?;

        let room = self
            .repository
            .get_room(&membership.room_id)
            .await
            .ok_or(RelayError::NotInRoom)?;

        let sender = room
            .find_participant(&membership.participant_id)
            .filter(|p| &p.connection_id == connection.id())
            .ok_or(RelayError::NotInRoom)?;

        let Some(recipient) = target
            .and_then(|target| ParticipantId::new(target).ok())
            .and_then(|target| room.find_participant(&target))
        else {
            tracing::debug!(
                "Dropped {:?} from '{}': target is not in room '{}'",
                kind,
                sender.id,
                room.id
            );
            return Ok(RelayOutcome::Dropped);
        };

        let message = OutboundMessage::Signal(RelayedSignal {
            kind,
            from: sender.id.clone(),
            payload,
        });
        self.message_pusher
            .push_to(&recipient.connection_id, &message)
            .await?;

        tracing::debug!("Relayed {:?} from '{}' to '{}'", kind, sender.id, recipient.id);

        Ok(RelayOutcome::Delivered {
            to: recipient.id.clone(),
        })
    }
}
