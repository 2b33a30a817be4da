//! UseCase: 接続の受付
//!
//! WebSocket 接続ごとに ConnectionId を発行し、送信チャンネルを MessagePusher に登録します。
//! Room への参加は join エンベロープを受け取るまで行いません。

use std::sync::Arc;

use crate::domain::{Connection, ConnectionId, MessagePusher, PusherChannel};

/// 接続受付のユースケース
pub struct OpenConnectionUseCase {
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl OpenConnectionUseCase {
    /// 新しい OpenConnectionUseCase を作成
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    /// 接続を受け付け、Idle 状態の Connection を返す
    pub async fn execute(&self, sender: PusherChannel) -> Connection {
        let connection_id = ConnectionId::generate();
        self.message_pusher
            .register_client(connection_id, sender)
            .await;
        Connection::new(connection_id)
    }
}
