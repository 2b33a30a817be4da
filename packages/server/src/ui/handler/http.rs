//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State};

use crate::{
    infrastructure::dto::http::{HealthResponse, IceServersResponse},
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// ICE server list for the peer connection
///
/// Always answers 200; on provider failure the body holds the STUN fallback.
pub async fn get_ice_servers(State(state): State<Arc<AppState>>) -> Json<IceServersResponse> {
    let servers = state.get_ice_servers_usecase.execute().await;
    Json(IceServersResponse::from(servers))
}
