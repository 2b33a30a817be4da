//! WebSocket envelope DTOs.
//!
//! Every envelope is a JSON object tagged by its `type` field. The relay parses inbound
//! envelopes loosely (`InboundEnvelope`) so that pass-through kinds keep every field the
//! sender put in them; clients use the typed `ClientMessage` / `ServerMessage` enums.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::{SignalKind, SignalPayload};

use super::conversion::signal_kind_from_type;

// ========================================
// Typed envelopes
// ========================================

/// Kind of a session description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

/// Session description as exchanged in `offer` / `answer` envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

/// ICE candidate as exchanged in `ice-candidate` envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

/// Fields of a `join` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinMessage {
    pub room_id: String,
    pub user_name: String,
    pub client_id: String,
}

/// Envelopes sent by a client to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    Join {
        room_id: String,
        user_name: String,
        client_id: String,
    },
    Offer {
        offer: SessionDescription,
        target: String,
    },
    Answer {
        answer: SessionDescription,
        target: String,
    },
    IceCandidate {
        candidate: IceCandidate,
        target: String,
    },
    ChatMessage {
        message: String,
        sender_name: String,
        timestamp: i64,
        target: String,
    },
    TypingIndicator {
        is_typing: bool,
        target: String,
    },
    ScreenShareState {
        is_sharing: bool,
        target: String,
    },
    Leave,
    EndCall,
}

/// Envelopes sent by the relay to a client.
///
/// Relayed kinds carry the sender id in `from`; any `target` field left in the relayed
/// payload is ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    Joined {
        room_id: String,
        client_id: String,
        participants: usize,
    },
    Ready {
        peer_id: String,
        peer_name: String,
    },
    PeerJoined {
        peer_id: String,
        peer_name: String,
    },
    PeerLeft {
        peer_id: String,
    },
    CallEndedByCreator {
        creator_name: String,
    },
    Error {
        message: String,
    },
    Offer {
        offer: SessionDescription,
        from: String,
    },
    Answer {
        answer: SessionDescription,
        from: String,
    },
    IceCandidate {
        candidate: IceCandidate,
        from: String,
    },
    ChatMessage {
        message: String,
        sender_name: String,
        timestamp: i64,
        from: String,
    },
    TypingIndicator {
        is_typing: bool,
        from: String,
    },
    ScreenShareState {
        is_sharing: bool,
        from: String,
    },
}

// ========================================
// Inbound parsing (relay side)
// ========================================

/// Reasons an inbound text frame is not a usable envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("envelope is not a JSON object")]
    NotAnObject,

    #[error("envelope has no string `type` field")]
    MissingType,

    #[error("unknown envelope type '{0}'")]
    UnknownType(String),
}

/// An envelope as seen by the relay.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEnvelope {
    Join(JoinMessage),
    /// Pass-through kinds. `payload` holds every field except `type` and `from`.
    Signal {
        kind: SignalKind,
        target: Option<String>,
        payload: SignalPayload,
    },
    Leave,
    EndCall,
}

impl InboundEnvelope {
    /// Parse a text frame received from a client.
    ///
    /// A `from` field supplied by the sender is discarded; the relay stamps its own.
    pub fn parse(text: &str) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut fields) = value else {
            return Err(EnvelopeError::NotAnObject);
        };

        let kind = match fields.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => return Err(EnvelopeError::MissingType),
        };

        match kind.as_str() {
            "join" => {
                let join: JoinMessage = serde_json::from_value(Value::Object(fields))?;
                Ok(Self::Join(join))
            }
            "leave" => Ok(Self::Leave),
            "end-call" => Ok(Self::EndCall),
            other => {
                let kind = signal_kind_from_type(other)
                    .ok_or_else(|| EnvelopeError::UnknownType(other.to_string()))?;
                fields.remove("from");
                let target = fields
                    .get("target")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Ok(Self::Signal {
                    kind,
                    target,
                    payload: SignalPayload::new(fields),
                })
            }
        }
    }

    /// Wire name of the envelope kind, for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::Signal { kind, .. } => super::conversion::signal_kind_type(*kind),
            Self::Leave => "leave",
            Self::EndCall => "end-call",
        }
    }
}

/// Fields of a relayed envelope, with `type` and `from` stamped in.
pub(crate) fn relayed_fields(
    kind: SignalKind,
    from: &str,
    payload: &SignalPayload,
) -> Map<String, Value> {
    let mut fields = payload.fields().clone();
    fields.insert(
        "type".to_string(),
        Value::String(super::conversion::signal_kind_type(kind).to_string()),
    );
    fields.insert("from".to_string(), Value::String(from.to_string()));
    fields
}
