//! UseCase: Room への参加（join）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() メソッド
//! - joined / ready / peer-joined の送り分けと、定員超過時の error 応答
//!
//! ### なぜこのテストが必要か
//! - 後から参加した側だけが offer を作る（ready を受け取る）という非対称性が
//!   2 人のクライアントが同時に offer を作る競合を防いでいる
//! - 定員超過の参加者は登録されず、以後の中継の対象にもならないことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：1 人目・2 人目の参加
//! - 異常系：3 人目の参加、同じ接続からの 2 回目の join、ID の重複

use std::sync::Arc;

use duocall_shared::time::Clock;

use crate::domain::{
    Connection, ConnectionId, DisplayName, Membership, MessagePusher, OutboundMessage,
    Participant, ParticipantId, RelayNotice, RepositoryError, RoomId, RoomRepository, Timestamp,
    ValueObjectError,
};

use super::error::JoinError;

/// join リクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub room_id: RoomId,
    pub display_name: DisplayName,
    pub participant_id: ParticipantId,
}

impl JoinRequest {
    /// wire 上の文字列から join リクエストを組み立てる
    pub fn parse(
        room_id: String,
        user_name: String,
        client_id: String,
    ) -> Result<Self, ValueObjectError> {
        Ok(Self {
            room_id: RoomId::new(room_id)?,
            display_name: DisplayName::new(user_name)?,
            participant_id: ParticipantId::new(client_id)?,
        })
    }
}

/// join の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// 参加後の人数
    pub occupancy: usize,
    /// 先に参加していた相手（Room が満員になった場合）
    pub peer: Option<ParticipantId>,
}

/// Room 参加のユースケース
pub struct JoinRoomUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RoomRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl JoinRoomUseCase {
    /// 新しい JoinRoomUseCase を作成
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            clock,
        }
    }

    /// join を実行
    ///
    /// # Returns
    ///
    /// * `Ok(JoinOutcome)` - 参加成功。送信者には joined（満員になった場合は続けて ready）、
    ///   先にいた参加者には peer-joined を送信済み
    /// * `Err(JoinError)` - 参加失敗。送信者には error を送信済み（ConnectionEnded を除く）
    pub async fn execute(
        &self,
        connection: &mut Connection,
        request: JoinRequest,
    ) -> Result<JoinOutcome, JoinError> {
        if connection.is_ended() {
            return Err(JoinError::ConnectionEnded);
        }

        // 1. 二重参加のチェック
        //    相手の end-call で Room が消えている場合は所属情報が古いだけなので解放する
        if let Some(membership) = connection.membership().cloned() {
            if self.is_member(&membership, connection.id()).await {
                let room_id = membership.room_id.as_str().to_string();
                self.reject(
                    connection.id(),
                    format!("Already joined room '{}'. Leave it first.", room_id),
                )
                .await;
                return Err(JoinError::AlreadyJoined(room_id));
            }
            connection.release();
        }

        // 2. Room テーブルに参加者を追加（定員チェックと登録はアトミック）
        let participant = Participant::new(
            request.participant_id.clone(),
            request.display_name.clone(),
            *connection.id(),
            Timestamp::new(self.clock.now_millis()),
        );
        let room = match self
            .repository
            .add_participant(&request.room_id, participant)
            .await
        {
            Ok(room) => room,
            Err(RepositoryError::Room(e)) => {
                tracing::info!(
                    "Rejected '{}' joining room '{}': {}",
                    request.participant_id,
                    request.room_id,
                    e
                );
                self.reject(connection.id(), e.to_string()).await;
                return Err(JoinError::Rejected(e));
            }
            Err(e) => {
                self.reject(connection.id(), e.to_string()).await;
                return Err(JoinError::Repository(e));
            }
        };

        connection.activate(Membership {
            room_id: request.room_id.clone(),
            participant_id: request.participant_id.clone(),
            display_name: request.display_name.clone(),
        });

        // 3. 送信者に joined を送信
        self.push(
            connection.id(),
            RelayNotice::Joined {
                room_id: request.room_id.clone(),
                participant_id: request.participant_id.clone(),
                participants: room.occupancy(),
            },
        )
        .await;

        // 4. 満員になったら、後から来た側に ready、先にいた側に peer-joined
        let peer = if room.is_full() {
            room.peers_of(&request.participant_id).next().cloned()
        } else {
            None
        };
        if let Some(peer) = &peer {
            self.push(
                connection.id(),
                RelayNotice::Ready {
                    peer_id: peer.id.clone(),
                    peer_name: peer.display_name.clone(),
                },
            )
            .await;
            self.push(
                &peer.connection_id,
                RelayNotice::PeerJoined {
                    peer_id: request.participant_id.clone(),
                    peer_name: request.display_name.clone(),
                },
            )
            .await;
        }

        tracing::info!(
            "'{}' joined room '{}' ({}/{})",
            request.participant_id,
            request.room_id,
            room.occupancy(),
            room.capacity
        );

        Ok(JoinOutcome {
            occupancy: room.occupancy(),
            peer: peer.map(|p| p.id),
        })
    }

    /// 送信者に error を返す
    pub async fn reject(&self, connection_id: &ConnectionId, message: String) {
        self.push(connection_id, RelayNotice::Error { message }).await;
    }

    async fn is_member(&self, membership: &Membership, connection_id: &ConnectionId) -> bool {
        self.repository
            .get_room(&membership.room_id)
            .await
            .and_then(|room| {
                room.find_participant(&membership.participant_id)
                    .map(|p| &p.connection_id == connection_id)
            })
            .unwrap_or(false)
    }

    async fn push(&self, connection_id: &ConnectionId, notice: RelayNotice) {
        if let Err(e) = self
            .message_pusher
            .push_to(connection_id, &OutboundMessage::Notice(notice))
            .await
        {
            tracing::warn!("Failed to push to connection '{}': {}", connection_id, e);
        }
    }
}
