//! Terminal peer for duocall.
//!
//! Joins a room on the signaling relay, negotiates a WebRTC session with the other
//! participant and relays chat typed at the prompt. Lines starting with `/` are commands:
//! `/share`, `/audio <device>`, `/video <device>`, `/leave`, `/end`.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin duocall-client
//! cargo run --bin duocall-client -- --room k3j9x0a2bq --name "Calm Otter"
//! cargo run --bin duocall-client -- -u ws://call.example.com/ws --audio-only
//! ```

use std::time::Duration;

use clap::Parser;

use duocall_client::{ClientOptions, run_client};
use duocall_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "duocall-client")]
#[command(about = "Two-party WebRTC call client for the duocall signaling relay", long_about = None)]
struct Args {
    /// WebSocket URL of the signaling relay
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:3001/ws")]
    url: String,

    /// HTTP base URL of the relay (derived from --url when omitted)
    #[arg(long)]
    api_url: Option<String>,

    /// Room id or invite link to join (a new room is created when omitted)
    #[arg(short = 'r', long)]
    room: Option<String>,

    /// Display name (a random "Adjective Noun" when omitted)
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Milliseconds to keep the connection open after ending the call
    #[arg(long, default_value = "500")]
    end_call_grace_ms: u64,

    /// Join without a camera
    #[arg(long)]
    audio_only: bool,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_PKG_NAME"), env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let options = ClientOptions {
        url: args.url,
        api_url: args.api_url,
        room: args.room,
        name: args.name,
        end_call_grace: Duration::from_millis(args.end_call_grace_ms),
        audio_only: args.audio_only,
    };
    if let Err(e) = run_client(options).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
