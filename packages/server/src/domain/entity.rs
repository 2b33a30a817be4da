//! エンティティ
//!
//! Room は参加順に並んだ参加者を最大 `capacity` 人まで保持する。

use super::{
    error::RoomError,
    value_object::{ConnectionId, DisplayName, ParticipantId, ROOM_CAPACITY, RoomId, Timestamp},
};

/// Room の参加者
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: DisplayName,
    /// この参加者へメッセージを届けるための接続ハンドル
    pub connection_id: ConnectionId,
    pub joined_at: Timestamp,
}

impl Participant {
    pub fn new(
        id: ParticipantId,
        display_name: DisplayName,
        connection_id: ConnectionId,
        joined_at: Timestamp,
    ) -> Self {
        Self {
            id,
            display_name,
            connection_id,
            joined_at,
        }
    }
}

/// 通話 Room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    /// 参加順
    pub participants: Vec<Participant>,
    pub capacity: usize,
    pub created_at: Timestamp,
}

impl Room {
    /// 定員 2 人の Room を作成
    pub fn new(id: RoomId, created_at: Timestamp) -> Self {
        Self::with_capacity(id, created_at, ROOM_CAPACITY)
    }

    pub fn with_capacity(id: RoomId, created_at: Timestamp, capacity: usize) -> Self {
        Self {
            id,
            participants: Vec::with_capacity(capacity),
            capacity,
            created_at,
        }
    }

    /// 参加者を追加
    ///
    /// 定員に達している場合や同じ ID の参加者がいる場合は追加せずにエラーを返す。
    pub fn add_participant(&mut self, participant: Participant) -> Result<(), RoomError> {
        if self.is_full() {
            return Err(RoomError::Full {
                capacity: self.capacity,
            });
        }
        if self.find_participant(&participant.id).is_some() {
            return Err(RoomError::DuplicateParticipant(
                participant.id.as_str().to_string(),
            ));
        }
        self.participants.push(participant);
        Ok(())
    }

    /// 参加者を削除し、削除した参加者を返す
    pub fn remove_participant(&mut self, participant_id: &ParticipantId) -> Option<Participant> {
        let index = self
            .participants
            .iter()
            .position(|p| &p.id == participant_id)?;
        Some(self.participants.remove(index))
    }

    pub fn find_participant(&self, participant_id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == participant_id)
    }

    /// 指定した参加者以外の参加者（参加順）
    pub fn peers_of<'a>(
        &'a self,
        participant_id: &'a ParticipantId,
    ) -> impl Iterator<Item = &'a Participant> + 'a {
        self.participants
            .iter()
            .filter(move |p| &p.id != participant_id)
    }

    pub fn occupancy(&self) -> usize {
        self.participants.len()
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}
