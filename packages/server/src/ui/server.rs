//! Server execution logic.

use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    domain::{IceServerProvider, MessagePusher, RoomRepository},
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository},
    usecase::{
        DisconnectParticipantUseCase, EndCallUseCase, GetIceServersUseCase, JoinRoomUseCase,
        LeaveRoomUseCase, OpenConnectionUseCase, RelaySignalUseCase,
    },
};
use duocall_shared::time::SystemClock;

use super::{
    handler::{get_ice_servers, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Signaling relay server
///
/// # Example
///
/// ```ignore
/// let server = Server::in_memory(Arc::new(StaticIceServerProvider::default()));
/// server.run("127.0.0.1".to_string(), 3001).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    /// Create a new Server from its use cases
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Wire a server backed by the in-memory room table and the WebSocket pusher
    pub fn in_memory(ice_server_provider: Arc<dyn IceServerProvider>) -> Self {
        // 1. Repository / MessagePusher
        let repository: Arc<dyn RoomRepository> = Arc::new(InMemoryRoomRepository::new());
        let message_pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::new());

        // 2. UseCases
        let leave_room_usecase = Arc::new(LeaveRoomUseCase::new(
            repository.clone(),
            message_pusher.clone(),
        ));
        let state = AppState {
            open_connection_usecase: Arc::new(OpenConnectionUseCase::new(message_pusher.clone())),
            join_room_usecase: Arc::new(JoinRoomUseCase::new(
                repository.clone(),
                message_pusher.clone(),
                Arc::new(SystemClock),
            )),
            relay_signal_usecase: Arc::new(RelaySignalUseCase::new(
                repository.clone(),
                message_pusher.clone(),
            )),
            end_call_usecase: Arc::new(EndCallUseCase::new(
                repository.clone(),
                message_pusher.clone(),
            )),
            disconnect_participant_usecase: Arc::new(DisconnectParticipantUseCase::new(
                leave_room_usecase.clone(),
                message_pusher,
            )),
            leave_room_usecase,
            get_ice_servers_usecase: Arc::new(GetIceServersUseCase::new(ice_server_provider)),
        };

        Self::new(state)
    }

    /// Build the router with every endpoint of the relay
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/get-ice-servers", get(get_ice_servers))
            .route("/api/health", get(health_check))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve on an already bound listener until the shutdown signal fires
    pub async fn serve(self, listener: TcpListener) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.router();

        tracing::info!("Signaling relay listening on {}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }

    /// Run the signaling relay
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener).await
    }
}
