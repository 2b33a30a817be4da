//! Data Transfer Objects (DTOs) for the signaling relay.
//!
//! DTOs are organized by protocol:
//! - `websocket`: signaling envelopes exchanged over the `/ws` channel
//! - `http`: HTTP API payloads (`/get-ice-servers`, `/api/health`, TURN credential API)
//! - `conversion`: mapping between DTOs and domain types

pub mod conversion;
pub mod http;
pub mod websocket;
