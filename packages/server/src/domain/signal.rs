//! 中継されるシグナリングメッセージ
//!
//! offer / answer / ice-candidate などの中身はサーバーでは解釈せず、
//! 宛先の解決と送信者 ID の付与だけを行う。

use serde_json::{Map, Value};

use super::value_object::ParticipantId;

/// 中継対象のメッセージ種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
    ChatMessage,
    TypingIndicator,
    ScreenShareState,
}

/// 中継されるメッセージ本体（送信されたフィールドをそのまま保持する）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalPayload(Map<String, Value>);

impl SignalPayload {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

/// 宛先の参加者に届けるメッセージ
#[derive(Debug, Clone, PartialEq)]
pub struct RelayedSignal {
    pub kind: SignalKind,
    /// サーバーが付与する送信者 ID
    pub from: ParticipantId,
    pub payload: SignalPayload,
}
