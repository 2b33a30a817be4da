//! Shared application state.

use std::sync::Arc;

use crate::usecase::{
    DisconnectParticipantUseCase, EndCallUseCase, GetIceServersUseCase, JoinRoomUseCase,
    LeaveRoomUseCase, OpenConnectionUseCase, RelaySignalUseCase,
};

/// Shared application state
pub struct AppState {
    /// OpenConnectionUseCase（接続受付のユースケース）
    pub open_connection_usecase: Arc<OpenConnectionUseCase>,
    /// JoinRoomUseCase（Room 参加のユースケース）
    pub join_room_usecase: Arc<JoinRoomUseCase>,
    /// RelaySignalUseCase（中継のユースケース）
    pub relay_signal_usecase: Arc<RelaySignalUseCase>,
    /// LeaveRoomUseCase（Room 退出のユースケース）
    pub leave_room_usecase: Arc<LeaveRoomUseCase>,
    /// EndCallUseCase（通話終了のユースケース）
    pub end_call_usecase: Arc<EndCallUseCase>,
    /// DisconnectParticipantUseCase（切断のユースケース）
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    /// GetIceServersUseCase（ICE サーバー一覧取得のユースケース）
    pub get_ice_servers_usecase: Arc<GetIceServersUseCase>,
}
