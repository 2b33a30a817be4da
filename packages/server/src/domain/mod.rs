//! ドメイン層
//!
//! Room / Participant などのエンティティ、値オブジェクト、
//! および Infrastructure 層が実装する trait（Repository, MessagePusher, IceServerProvider）を定義します。

pub mod connection;
pub mod entity;
pub mod error;
pub mod ice;
pub mod message_pusher;
pub mod repository;
pub mod signal;
pub mod value_object;

pub use connection::{Connection, ConnectionState, Membership};
pub use entity::{Participant, Room};
pub use error::{
    IceServerError, MessagePushError, RepositoryError, RoomError, ValueObjectError,
};
pub use ice::{IceServer, IceServerProvider, default_stun_servers};
pub use message_pusher::{MessagePusher, OutboundMessage, PusherChannel, RelayNotice};
pub use repository::{RemovedParticipant, RoomRepository};
pub use signal::{RelayedSignal, SignalKind, SignalPayload};
pub use value_object::{
    ConnectionId, DisplayName, ParticipantId, ROOM_CAPACITY, RoomId, Timestamp,
};
