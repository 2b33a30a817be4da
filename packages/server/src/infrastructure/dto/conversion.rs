//! Conversion logic between DTOs and domain types.

use serde_json::Value;

use crate::domain::{OutboundMessage, RelayNotice, SignalKind};
use crate::infrastructure::dto::websocket::{self as dto, relayed_fields};

// ========================================
// Wire type names
// ========================================

/// Map an envelope `type` to a pass-through kind.
pub fn signal_kind_from_type(value: &str) -> Option<SignalKind> {
    match value {
        "offer" => Some(SignalKind::Offer),
        "answer" => Some(SignalKind::Answer),
        "ice-candidate" => Some(SignalKind::IceCandidate),
        "chat-message" => Some(SignalKind::ChatMessage),
        "typing-indicator" => Some(SignalKind::TypingIndicator),
        "screen-share-state" => Some(SignalKind::ScreenShareState),
        _ => None,
    }
}

pub fn signal_kind_type(kind: SignalKind) -> &'static str {
    match kind {
        SignalKind::Offer => "offer",
        SignalKind::Answer => "answer",
        SignalKind::IceCandidate => "ice-candidate",
        SignalKind::ChatMessage => "chat-message",
        SignalKind::TypingIndicator => "typing-indicator",
        SignalKind::ScreenShareState => "screen-share-state",
    }
}

// ========================================
// Domain → DTO
// ========================================

impl From<RelayNotice> for dto::ServerMessage {
    fn from(notice: RelayNotice) -> Self {
        match notice {
            RelayNotice::Joined {
                room_id,
                participant_id,
                participants,
            } => Self::Joined {
                room_id: room_id.into_string(),
                client_id: participant_id.into_string(),
                participants,
            },
            RelayNotice::Ready { peer_id, peer_name } => Self::Ready {
                peer_id: peer_id.into_string(),
                peer_name: peer_name.into_string(),
            },
            RelayNotice::PeerJoined { peer_id, peer_name } => Self::PeerJoined {
                peer_id: peer_id.into_string(),
                peer_name: peer_name.into_string(),
            },
            RelayNotice::PeerLeft { peer_id } => Self::PeerLeft {
                peer_id: peer_id.into_string(),
            },
            RelayNotice::CallEndedByCreator { creator_name } => {
                Self::CallEndedByCreator { creator_name }
            }
            RelayNotice::Error { message } => Self::Error { message },
        }
    }
}

/// Encode an outbound message as a JSON text frame.
///
/// Relayed signals keep the sender's fields verbatim, with `type` and `from` stamped in.
pub fn encode_outbound(message: &OutboundMessage) -> Result<String, serde_json::Error> {
    match message {
        OutboundMessage::Notice(notice) => {
            serde_json::to_string(&dto::ServerMessage::from(notice.clone()))
        }
        OutboundMessage::Signal(signal) => {
            let fields = relayed_fields(signal.kind, signal.from.as_str(), &signal.payload);
            serde_json::to_string(&Value::Object(fields))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DisplayName, ParticipantId, RelayedSignal, RoomId, SignalPayload};
    use serde_json::json;

    #[test]
    fn test_signal_kind_type_names() {
        // テスト項目: すべての中継種別が wire 上の type 名と相互に変換できる
        // given (前提条件):
        let kinds = [
            SignalKind::Offer,
            SignalKind::Answer,
            SignalKind::IceCandidate,
            SignalKind::ChatMessage,
            SignalKind::TypingIndicator,
            SignalKind::ScreenShareState,
        ];

        // when (操作) / then (期待する結果):
        for kind in kinds {
            assert_eq!(signal_kind_from_type(signal_kind_type(kind)), Some(kind));
        }
        assert_eq!(signal_kind_from_type("join"), None);
    }

    #[test]
    fn test_encode_notice() {
        // テスト項目: ready 通知が peerId / peerName を持つ JSON になる
        // given (前提条件):
        let message = OutboundMessage::Notice(RelayNotice::Ready {
            peer_id: ParticipantId::new("a".to_string()).unwrap(),
            peer_name: DisplayName::new("Alice".to_string()).unwrap(),
        });

        // when (操作):
        let text = encode_outbound(&message).unwrap();

        // then (期待する結果):
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({"type": "ready", "peerId": "a", "peerName": "Alice"})
        );
    }

    #[test]
    fn test_encode_joined_notice() {
        // テスト項目: joined 通知が roomId / clientId / participants を持つ JSON になる
        // given (前提条件):
        let message = OutboundMessage::Notice(RelayNotice::Joined {
            room_id: RoomId::new("r1".to_string()).unwrap(),
            participant_id: ParticipantId::new("a".to_string()).unwrap(),
            participants: 1,
        });

        // when (操作):
        let text = encode_outbound(&message).unwrap();

        // then (期待する結果):
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({"type": "joined", "roomId": "r1", "clientId": "a", "participants": 1})
        );
    }

    #[test]
    fn test_encode_signal_stamps_from() {
        // テスト項目: 中継メッセージは元のフィールドを保ったまま type と from が付与される
        // given (前提条件):
        let payload = json!({"isSharing": true, "target": "b"});
        let Value::Object(fields) = payload else {
            unreachable!()
        };
        let message = OutboundMessage::Signal(RelayedSignal {
            kind: SignalKind::ScreenShareState,
            from: ParticipantId::new("a".to_string()).unwrap(),
            payload: SignalPayload::new(fields),
        });

        // when (操作):
        let text = encode_outbound(&message).unwrap();

        // then (期待する結果):
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({"type": "screen-share-state", "isSharing": true, "target": "b", "from": "a"})
        );
    }
}
