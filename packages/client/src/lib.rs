//! duocall client library.
//!
//! The negotiation state machine and renegotiation controller are written against the
//! capability traits in [`peer`]; [`webrtc_peer`] and [`media`] bind them to webrtc-rs, and
//! [`signaling`] carries envelopes to and from the relay over WebSocket.

pub mod domain;
pub mod error;
pub mod formatter;
pub mod ice;
pub mod media;
pub mod names;
pub mod negotiation;
pub mod peer;
pub mod renegotiation;
pub mod runner;
pub mod session;
pub mod signaling;
pub mod ui;
pub mod webrtc_peer;

pub use runner::{ClientOptions, run_client};

#[cfg(test)]
pub(crate) mod testing;
