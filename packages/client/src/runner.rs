//! Client execution logic.

use std::time::Duration;

use duocall_shared::time::current_timestamp_millis;
use tokio::sync::mpsc;

use crate::formatter::MessageFormatter;
use crate::ice::{derive_api_url, fetch_ice_servers};
use crate::media::SyntheticMediaSource;
use crate::names::{extract_room_id, generate_client_id, random_display_name, random_room_id};
use crate::session::{ClientSession, SessionConfig, SessionEnd};
use crate::signaling::WebSocketSignaling;
use crate::ui::{HELP, redisplay_prompt, spawn_input_thread};
use crate::webrtc_peer::RtcPeerConnectionFactory;

/// Options of one client run
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// WebSocket URL of the relay
    pub url: String,
    /// HTTP base URL of the relay; derived from `url` when absent
    pub api_url: Option<String>,
    /// Room id or invite link; a random room is created when absent
    pub room: Option<String>,
    pub name: Option<String>,
    pub end_call_grace: Duration,
    pub audio_only: bool,
}

/// Join a room and run the call until it ends
pub async fn run_client(options: ClientOptions) -> Result<(), Box<dyn std::error::Error>> {
    let api_url = options
        .api_url
        .clone()
        .unwrap_or_else(|| derive_api_url(&options.url));
    let ice_servers = fetch_ice_servers(&api_url).await;

    let room_id = options
        .room
        .as_deref()
        .map(extract_room_id)
        .filter(|room_id| !room_id.is_empty())
        .unwrap_or_else(random_room_id);
    let display_name = options
        .name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(random_display_name);
    let client_id = generate_client_id(current_timestamp_millis());

    let mut signaling = WebSocketSignaling::connect(&options.url).await?;
    println!(
        "\nYou are '{}'. Type messages and press Enter to send.\n{}\n",
        display_name, HELP
    );

    let prompt = format!("{}> ", display_name);
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let _input_handle = spawn_input_thread(prompt.clone(), command_tx);

    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(notice) = notice_rx.recv().await {
            if let Some(formatted) = MessageFormatter::format_notice(&notice) {
                print!("{}", formatted);
                redisplay_prompt(&prompt);
            }
        }
    });

    let session = ClientSession::new(
        RtcPeerConnectionFactory::new(ice_servers),
        SyntheticMediaSource::new(!options.audio_only),
        signaling.sender(),
        SessionConfig {
            room_id,
            display_name,
            client_id,
            audio_only: options.audio_only,
            end_call_grace: options.end_call_grace,
        },
    );
    let result = session
        .run(signaling.inbound(), command_rx, notice_tx)
        .await;

    signaling.close().await;
    let _ = printer.await;

    match result? {
        SessionEnd::Left => tracing::info!("Left the room"),
        SessionEnd::EndedCall => tracing::info!("Ended the call for everyone"),
        SessionEnd::EndedByCreator { creator_name } => {
            tracing::info!("Call ended by {}", creator_name)
        }
    }
    Ok(())
}
