//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! RoomId → Room の HashMap をインメモリの Room テーブルとして使用します。
//!
//! テーブル全体を 1 つの Mutex で保護します。参加者は Room あたり最大 2 人のため、
//! Room 単位のロックに分割する必要はありません。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Participant, ParticipantId, RemovedParticipant, RepositoryError, Room, RoomId,
    RoomRepository,
};

/// インメモリ Room Repository 実装
#[derive(Default)]
pub struct InMemoryRoomRepository {
    /// Room テーブル
    rooms: Mutex<HashMap<RoomId, Room>>,
}

impl InMemoryRoomRepository {
    /// 新しい InMemoryRoomRepository を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn add_participant(
        &self,
        room_id: &RoomId,
        participant: Participant,
    ) -> Result<Room, RepositoryError> {
        let mut rooms = self.rooms.lock().await;

        let created_at = participant.joined_at;
        let room = rooms
            .entry(room_id.clone())
            .or_insert_with(|| Room::new(room_id.clone(), created_at));

        if let Err(e) = room.add_participant(participant) {
            // 参加を拒否した結果 Room が空のまま残らないようにする
            if room.is_empty() {
                rooms.remove(room_id);
            }
            return Err(e.into());
        }

        Ok(room.clone())
    }

    async fn remove_participant(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
    ) -> Result<RemovedParticipant, RepositoryError> {
        let mut rooms = self.rooms.lock().await;

        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.as_str().to_string()))?;

        let participant = room.remove_participant(participant_id).ok_or_else(|| {
            RepositoryError::ParticipantNotFound(participant_id.as_str().to_string())
        })?;

        let remaining = room.participants.clone();
        let room_deleted = room.is_empty();
        if room_deleted {
            rooms.remove(room_id);
            tracing::debug!("Room '{}' is empty and has been deleted", room_id);
        }

        Ok(RemovedParticipant {
            participant,
            remaining,
            room_deleted,
        })
    }

    async fn get_room(&self, room_id: &RoomId) -> Option<Room> {
        let rooms = self.rooms.lock().await;
        rooms.get(room_id).cloned()
    }

    async fn delete_room(&self, room_id: &RoomId) -> Option<Room> {
        let mut rooms = self.rooms.lock().await;
        rooms.remove(room_id)
    }

    async fn count_rooms(&self) -> usize {
        let rooms = self.rooms.lock().await;
        rooms.len()
    }
}
