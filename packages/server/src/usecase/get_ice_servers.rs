//! UseCase: ICE サーバー一覧の取得
//!
//! 取得に失敗してもエラーは返さず、フォールバックの STUN サーバー一覧を返します。
//! 接続できる可能性を残すため、ネゴシエーションは常に何らかの ICE サーバーで開始できます。

use std::sync::Arc;

use crate::domain::{IceServer, IceServerProvider, default_stun_servers};

/// ICE サーバー一覧取得のユースケース
pub struct GetIceServersUseCase {
    provider: Arc<dyn IceServerProvider>,
    fallback: Vec<IceServer>,
}

impl GetIceServersUseCase {
    /// 新しい GetIceServersUseCase を作成（フォールバックは公開 STUN サーバー）
    pub fn new(provider: Arc<dyn IceServerProvider>) -> Self {
        Self::with_fallback(provider, default_stun_servers())
    }

    pub fn with_fallback(provider: Arc<dyn IceServerProvider>, fallback: Vec<IceServer>) -> Self {
        Self { provider, fallback }
    }

    pub async fn execute(&self) -> Vec<IceServer> {
        match self.provider.ice_servers().await {
            Ok(servers) if !servers.is_empty() => servers,
            Ok(_) => {
                tracing::warn!("ICE server provider returned no servers, using fallback");
                self.fallback.clone()
            }
            Err(e) => {
                tracing::error!("Failed to get ICE servers, using fallback: {}", e);
                self.fallback.clone()
            }
        }
    }
}
