//! Two-party WebRTC signaling relay.
//!
//! Brokers join / offer / answer / ice-candidate envelopes between the two participants of a
//! room and serves ICE server configuration over HTTP.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin duocall-server
//! cargo run --bin duocall-server -- --host 0.0.0.0 --port 3001
//! TURN_KEY_ID=... TURN_API_TOKEN=... cargo run --bin duocall-server
//! ```

use std::sync::Arc;

use clap::Parser;
use duocall_server::{
    domain::IceServerProvider,
    infrastructure::ice::{CloudflareTurnProvider, StaticIceServerProvider, TurnCredentials},
    ui::Server,
};
use duocall_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "duocall-server")]
#[command(about = "Two-party WebRTC signaling relay", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "3001")]
    port: u16,

    /// Cloudflare TURN key id
    #[arg(long, env = "TURN_KEY_ID")]
    turn_key_id: Option<String>,

    /// Cloudflare TURN API token
    #[arg(long, env = "TURN_API_TOKEN", hide_env_values = true)]
    turn_api_token: Option<String>,

    /// Lifetime of generated TURN credentials in seconds
    #[arg(long, default_value = "86400")]
    turn_ttl_secs: u64,
}

impl Args {
    fn ice_server_provider(&self) -> Arc<dyn IceServerProvider> {
        match (&self.turn_key_id, &self.turn_api_token) {
            (Some(key_id), Some(api_token)) if !key_id.is_empty() && !api_token.is_empty() => {
                tracing::info!("Using Cloudflare TURN credentials (key '{}')", key_id);
                Arc::new(CloudflareTurnProvider::new(TurnCredentials {
                    key_id: key_id.clone(),
                    api_token: api_token.clone(),
                    ttl_secs: self.turn_ttl_secs,
                }))
            }
            _ => {
                tracing::warn!("TURN credentials not configured, using STUN only");
                Arc::new(StaticIceServerProvider::default())
            }
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_PKG_NAME"), env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    let server = Server::in_memory(args.ice_server_provider());
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
