//! 接続ごとのライフサイクル
//!
//! 1 つの WebSocket 接続が、どの Room にどの参加者として所属しているかを保持します。
//! 接続を処理するタスクが所有し、ユースケースには `&mut` で渡されます。

use super::value_object::{ConnectionId, DisplayName, ParticipantId, RoomId};

/// Room への所属情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub room_id: RoomId,
    pub participant_id: ParticipantId,
    pub display_name: DisplayName,
}

/// 接続の状態
///
/// `Ended` は end-call を処理した後の終端状態で、切断時の leave 処理を抑止する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// 接続済みだが Room に参加していない
    Idle,
    /// Room に参加中
    Active(Membership),
    /// end-call 済み
    Ended,
}

/// 1 つの接続
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    state: ConnectionState,
}

impl Connection {
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            state: ConnectionState::Idle,
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn membership(&self) -> Option<&Membership> {
        match &self.state {
            ConnectionState::Active(membership) => Some(membership),
            _ => None,
        }
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.state, ConnectionState::Ended)
    }

    /// Idle → Active
    ///
    /// Idle 以外からは遷移せず false を返す。
    pub fn activate(&mut self, membership: Membership) -> bool {
        if !matches!(self.state, ConnectionState::Idle) {
            return false;
        }
        self.state = ConnectionState::Active(membership);
        true
    }

    /// Active → Idle
    ///
    /// 所属していた Room の情報を返す。Active 以外では何もしない。
    pub fn release(&mut self) -> Option<Membership> {
        if !matches!(self.state, ConnectionState::Active(_)) {
            return None;
        }
        match std::mem::replace(&mut self.state, ConnectionState::Idle) {
            ConnectionState::Active(membership) => Some(membership),
            _ => None,
        }
    }

    /// 任意の状態 → Ended
    pub fn end(&mut self) -> Option<Membership> {
        match std::mem::replace(&mut self.state, ConnectionState::Ended) {
            ConnectionState::Active(membership) => Some(membership),
            _ => None,
        }
    }
}
