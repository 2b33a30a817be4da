//! Cloudflare Calls TURN API を使った IceServerProvider 実装
//!
//! `POST /v1/turn/keys/{key_id}/credentials/generate` で期限付きの TURN 認証情報を発行し、
//! 公開 STUN サーバーを後ろに追加して返します。

use std::time::Duration;

use async_trait::async_trait;

use crate::{
    domain::{IceServer, IceServerError, IceServerProvider, default_stun_servers},
    infrastructure::dto::http::{TurnCredentialsRequest, TurnCredentialsResponse},
};

const CLOUDFLARE_TURN_API: &str = "https://rtc.live.cloudflare.com/v1/turn/keys";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// TURN API の認証情報
#[derive(Debug, Clone)]
pub struct TurnCredentials {
    pub key_id: String,
    pub api_token: String,
    /// 発行する認証情報の有効期間（秒）
    pub ttl_secs: u64,
}

/// Cloudflare TURN 認証情報プロバイダー
pub struct CloudflareTurnProvider {
    client: reqwest::Client,
    credentials: TurnCredentials,
    api_base: String,
}

impl CloudflareTurnProvider {
    pub fn new(credentials: TurnCredentials) -> Self {
        Self::with_api_base(credentials, CLOUDFLARE_TURN_API)
    }

    pub fn with_api_base(credentials: TurnCredentials, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            api_base: api_base.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}/credentials/generate",
            self.api_base.trim_end_matches('/'),
            self.credentials.key_id
        )
    }
}

/// TURN API のレスポンスを ICE サーバー一覧に変換し、STUN サーバーを追加する
pub fn ice_servers_from_response(response: TurnCredentialsResponse) -> Vec<IceServer> {
    let mut servers: Vec<IceServer> = response
        .ice_servers
        .into_iter()
        .map(IceServer::from)
        .collect();
    servers.extend(default_stun_servers());
    servers
}

#[async_trait]
impl IceServerProvider for CloudflareTurnProvider {
    async fn ice_servers(&self) -> Result<Vec<IceServer>, IceServerError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.credentials.api_token)
            .timeout(REQUEST_TIMEOUT)
            .json(&TurnCredentialsRequest {
                ttl: self.credentials.ttl_secs,
            })
            .send()
            .await
            .map_err(|e| IceServerError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IceServerError::Status(status.as_u16()));
        }

        let body: TurnCredentialsResponse = response
            .json()
            .await
            .map_err(|e| IceServerError::InvalidResponse(e.to_string()))?;

        let servers = ice_servers_from_response(body);
        tracing::debug!("Generated TURN credentials ({} ICE servers)", servers.len());
        Ok(servers)
    }
}
