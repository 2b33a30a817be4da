//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::{
    domain::Connection,
    infrastructure::dto::websocket::{InboundEnvelope, JoinMessage},
    ui::state::AppState,
    usecase::{JoinRequest, RelayError},
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Spawns a task that receives messages from the rx channel and pushes them to the WebSocket sender.
///
/// This function handles the outbound message flow: messages addressed to this connection
/// (via the rx channel) are written to its WebSocket.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, mut receiver) = socket.split();

    // Register this connection so that other connections can reach it
    let (tx, rx) = mpsc::unbounded_channel();
    let mut connection = state.open_connection_usecase.execute(tx).await;
    let connection_id = *connection.id();
    tracing::info!("Connection '{}' opened", connection_id);

    let mut send_task = pusher_loop(rx, sender);

    // Envelopes from one connection are handled one at a time, each to completion
    loop {
        let msg = tokio::select! {
            msg = receiver.next() => msg,
            _ = &mut send_task => {
                tracing::debug!("Writer of connection '{}' stopped", connection_id);
                break;
            }
        };

        let msg = match msg {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                tracing::warn!("WebSocket error on '{}': {}", connection_id, e);
                break;
            }
            None => break,
        };

        match msg {
            Message::Text(text) => handle_text(&state, &mut connection, text.as_str()).await,
            Message::Ping(_) => {
                tracing::debug!("Received ping");
            }
            Message::Close(_) => {
                tracing::info!("Connection '{}' requested close", connection_id);
                break;
            }
            _ => {}
        }
    }

    send_task.abort();

    let outcome = state
        .disconnect_participant_usecase
        .execute(connection)
        .await;
    tracing::info!("Connection '{}' closed: {:?}", connection_id, outcome);
}

async fn handle_text(state: &AppState, connection: &mut Connection, text: &str) {
    let envelope = match InboundEnvelope::parse(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(
                "Ignoring malformed envelope from '{}': {}",
                connection.id(),
                e
            );
            return;
        }
    };

    if connection.is_ended() {
        tracing::debug!(
            "Ignoring '{}' from '{}' after end-call",
            envelope.type_name(),
            connection.id()
        );
        return;
    }

    tracing::debug!(
        "Received '{}' from '{}'",
        envelope.type_name(),
        connection.id()
    );

    match envelope {
        InboundEnvelope::Join(join) => handle_join(state, connection, join).await,
        InboundEnvelope::Signal {
            kind,
            target,
            payload,
        } => {
            match state
                .relay_signal_usecase
                .execute(connection, kind, target, payload)
                .await
            {
                Ok(_) => {}
                Err(RelayError::NotInRoom) => {
                    tracing::debug!(
                        "Ignoring {:?} from '{}': not in a room",
                        kind,
                        connection.id()
                    );
                }
                Err(e) => tracing::warn!("Failed to relay {:?}: {}", kind, e),
            }
        }
        InboundEnvelope::Leave => {
            state.leave_room_usecase.execute(connection).await;
        }
        InboundEnvelope::EndCall => {
            if let Err(e) = state.end_call_usecase.execute(connection).await {
                tracing::debug!("Ignoring end-call from '{}': {}", connection.id(), e);
            }
        }
    }
}

async fn handle_join(state: &AppState, connection: &mut Connection, join: JoinMessage) {
    // Convert String -> Domain Models
    let request = match JoinRequest::parse(join.room_id, join.user_name, join.client_id) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Invalid join from '{}': {}", connection.id(), e);
            state
                .join_room_usecase
                .reject(connection.id(), format!("Invalid join request: {}", e))
                .await;
            return;
        }
    };

    if let Err(e) = state.join_room_usecase.execute(connection, request).await {
        tracing::info!("Join from '{}' failed: {}", connection.id(), e);
    }
}
