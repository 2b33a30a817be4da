//! HTTP API DTOs.

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::IceServer;

/// Response body of `GET /get-ice-servers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceServersResponse {
    pub ice_servers: Vec<IceServerDto>,
}

/// One ICE server entry. `urls` is accepted as a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerDto {
    #[serde(deserialize_with = "one_or_many")]
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// Response body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Request body of the Cloudflare TURN credential API.
#[derive(Debug, Clone, Serialize)]
pub struct TurnCredentialsRequest {
    pub ttl: u64,
}

/// Response body of the Cloudflare TURN credential API.
#[derive(Debug, Clone, Deserialize)]
pub struct TurnCredentialsResponse {
    #[serde(default, deserialize_with = "one_or_many")]
    pub ice_servers: Vec<IceServerDto>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

impl From<IceServer> for IceServerDto {
    fn from(server: IceServer) -> Self {
        Self {
            urls: server.urls,
            username: server.username,
            credential: server.credential,
        }
    }
}

impl From<IceServerDto> for IceServer {
    fn from(dto: IceServerDto) -> Self {
        Self {
            urls: dto.urls,
            username: dto.username,
            credential: dto.credential,
        }
    }
}

impl From<Vec<IceServer>> for IceServersResponse {
    fn from(servers: Vec<IceServer>) -> Self {
        Self {
            ice_servers: servers.into_iter().map(IceServerDto::from).collect(),
        }
    }
}
