//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{Participant, ParticipantId, RepositoryError, Room, RoomId};

/// 参加者削除の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedParticipant {
    /// 削除された参加者
    pub participant: Participant,
    /// Room に残っている参加者（参加順）
    pub remaining: Vec<Participant>,
    /// Room が空になり削除されたか
    pub room_deleted: bool,
}

/// Room Repository trait
///
/// Room テーブル（RoomId → Room）へのインターフェース。
/// 各メソッドはテーブル全体に対してアトミックに実行される。
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// 参加者を追加
    ///
    /// Room が存在しなければ作成する。定員超過の場合は登録せずにエラーを返す。
    /// 成功時は追加後の Room のスナップショットを返す。
    async fn add_participant(
        &self,
        room_id: &RoomId,
        participant: Participant,
    ) -> Result<Room, RepositoryError>;

    /// 参加者を削除
    ///
    /// Room が空になった場合は Room ごと削除する。
    async fn remove_participant(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
    ) -> Result<RemovedParticipant, RepositoryError>;

    /// Room のスナップショットを取得
    async fn get_room(&self, room_id: &RoomId) -> Option<Room>;

    /// Room を参加者ごと削除
    async fn delete_room(&self, room_id: &RoomId) -> Option<Room>;

    /// 存在する Room の数
    async fn count_rooms(&self) -> usize;
}
