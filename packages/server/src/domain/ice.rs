//! ICE サーバー（STUN / TURN）の設定

use async_trait::async_trait;

use super::error::IceServerError;

const DEFAULT_STUN_URLS: [&str; 5] = [
    "stun:stun.l.google.com:19302",
    "stun:stun1.l.google.com:19302",
    "stun:stun2.l.google.com:19302",
    "stun:stun3.l.google.com:19302",
    "stun:stun4.l.google.com:19302",
];

/// ICE サーバー 1 件分の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceServer {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServer {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// 認証情報なしで使える STUN サーバー一覧
pub fn default_stun_servers() -> Vec<IceServer> {
    DEFAULT_STUN_URLS.iter().map(|url| IceServer::stun(*url)).collect()
}

/// ICE サーバー設定の取得元
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IceServerProvider: Send + Sync {
    async fn ice_servers(&self) -> Result<Vec<IceServer>, IceServerError>;
}
