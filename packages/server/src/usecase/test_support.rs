//! ユースケースのテスト用ヘルパー

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    domain::{Connection, MessagePusher},
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository},
    usecase::{JoinRequest, JoinRoomUseCase, OpenConnectionUseCase},
};
use duocall_shared::time::FixedClock;

pub(crate) const NOW: i64 = 1_700_000_000_000;

/// テスト用のクライアント（接続と受信チャンネル）
pub(crate) struct TestClient {
    pub connection: Connection,
    pub rx: mpsc::UnboundedReceiver<String>,
}

impl TestClient {
    /// 受信済みのメッセージをすべて取り出す
    pub fn drain(&mut self) -> Vec<Value> {
        let mut messages = Vec::new();
        while let Ok(text) = self.rx.try_recv() {
            messages.push(serde_json::from_str(&text).unwrap());
        }
        messages
    }
}

pub(crate) struct TestContext {
    pub repository: Arc<InMemoryRoomRepository>,
    pub pusher: Arc<WebSocketMessagePusher>,
    pub open: OpenConnectionUseCase,
    pub join: JoinRoomUseCase,
}

impl TestContext {
    pub fn new() -> Self {
        let repository = Arc::new(InMemoryRoomRepository::new());
        let pusher = Arc::new(WebSocketMessagePusher::new());
        let pusher_dyn: Arc<dyn MessagePusher> = pusher.clone();
        Self {
            open: OpenConnectionUseCase::new(pusher_dyn.clone()),
            join: JoinRoomUseCase::new(
                repository.clone(),
                pusher_dyn,
                Arc::new(FixedClock::new(NOW)),
            ),
            repository,
            pusher,
        }
    }

    pub async fn connect(&self) -> TestClient {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = self.open.execute(tx).await;
        TestClient { connection, rx }
    }

    /// 接続して Room に参加し、受信済みのメッセージを捨てる
    pub async fn joined_client(&self, room: &str, id: &str, name: &str) -> TestClient {
        let mut client = self.connect().await;
        self.join
            .execute(&mut client.connection, join_request(room, id, name))
            .await
            .unwrap();
        client.drain();
        client
    }
}

pub(crate) fn join_request(room: &str, id: &str, name: &str) -> JoinRequest {
    JoinRequest::parse(room.to_string(), name.to_string(), id.to_string()).unwrap()
}
