//! Two-party signaling relay.
//!
//! This library provides the room relay that brokers offer/answer/candidate
//! envelopes between exactly two participants of a peer-to-peer call.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
