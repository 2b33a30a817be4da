//! ICE server discovery.

use std::time::Duration;

use duocall_server::domain::{IceServer, default_stun_servers};
use duocall_server::infrastructure::dto::http::IceServersResponse;

const ICE_SERVERS_PATH: &str = "/get-ice-servers";
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Fetch the ICE server list from the relay's HTTP API.
///
/// Never fails: any error, or an empty list, yields the public STUN servers.
pub async fn fetch_ice_servers(api_url: &str) -> Vec<IceServer> {
    match request_ice_servers(api_url).await {
        Ok(servers) if !servers.is_empty() => {
            tracing::info!("Using {} ICE server(s) from {}", servers.len(), api_url);
            servers
        }
        Ok(_) => {
            tracing::warn!("Relay returned no ICE servers, using public STUN servers");
            default_stun_servers()
        }
        Err(err) => {
            tracing::warn!("Failed to fetch ICE servers ({}), using public STUN servers", err);
            default_stun_servers()
        }
    }
}

async fn request_ice_servers(api_url: &str) -> Result<Vec<IceServer>, reqwest::Error> {
    let url = format!("{}{}", api_url.trim_end_matches('/'), ICE_SERVERS_PATH);
    let response = reqwest::Client::new()
        .get(url)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .json::<IceServersResponse>()
        .await?;

    Ok(response.ice_servers.into_iter().map(IceServer::from).collect())
}

/// HTTP base URL of the relay serving `ws_url`
///
/// `ws://host:3001/ws` becomes `http://host:3001`, `wss://` becomes `https://`.
pub fn derive_api_url(ws_url: &str) -> String {
    let (scheme, rest) = if let Some(rest) = ws_url.strip_prefix("wss://") {
        ("https://", rest)
    } else if let Some(rest) = ws_url.strip_prefix("ws://") {
        ("http://", rest)
    } else {
        ("", ws_url)
    };

    let authority = rest.split('/').next().unwrap_or(rest);
    format!("{scheme}{authority}")
}
