//! 固定の ICE サーバー一覧を返す IceServerProvider 実装

use async_trait::async_trait;

use crate::domain::{IceServer, IceServerError, IceServerProvider, default_stun_servers};

/// 固定の ICE サーバー一覧
///
/// TURN の認証情報が設定されていない場合や、TURN API が失敗した場合のフォールバックとして使う。
#[derive(Debug, Clone)]
pub struct StaticIceServerProvider {
    servers: Vec<IceServer>,
}

impl StaticIceServerProvider {
    pub fn new(servers: Vec<IceServer>) -> Self {
        Self { servers }
    }

    pub fn servers(&self) -> &[IceServer] {
        &self.servers
    }
}

impl Default for StaticIceServerProvider {
    /// Google の公開 STUN サーバー 5 件
    fn default() -> Self {
        Self::new(default_stun_servers())
    }
}

#[async_trait]
impl IceServerProvider for StaticIceServerProvider {
    async fn ice_servers(&self) -> Result<Vec<IceServer>, IceServerError> {
        Ok(self.servers.clone())
    }
}
