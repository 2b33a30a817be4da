//! Axum UI layer of the signaling relay.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
