//! UseCase 層
//!
//! 1 つの受信エンベロープ（または接続イベント）に対して 1 つのユースケースが対応します。
//! 各ユースケースは Repository / MessagePusher などの trait にのみ依存します。

pub mod disconnect_participant;
pub mod end_call;
pub mod error;
pub mod get_ice_servers;
pub mod join_room;
pub mod leave_room;
pub mod open_connection;
pub mod relay_signal;

#[cfg(test)]
pub(crate) mod test_support;

pub use disconnect_participant::{DisconnectOutcome, DisconnectParticipantUseCase};
pub use end_call::{EndCallOutcome, EndCallUseCase};
pub use error::{EndCallError, JoinError, RelayError};
pub use get_ice_servers::GetIceServersUseCase;
pub use join_room::{JoinOutcome, JoinRequest, JoinRoomUseCase};
pub use leave_room::{LeaveOutcome, LeaveRoomUseCase};
pub use open_connection::OpenConnectionUseCase;
pub use relay_signal::{RelayOutcome, RelaySignalUseCase};
