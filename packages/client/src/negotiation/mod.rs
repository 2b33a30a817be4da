//! Client-side negotiation of one peer-to-peer session.
//!
//! - `state`: phase and per-session negotiation flags
//! - `candidate_buffer`: incoming candidates held until a remote description exists
//! - `machine`: reacts to relay messages and peer events

pub mod candidate_buffer;
pub mod machine;
pub mod state;

pub use candidate_buffer::CandidateBuffer;
pub use machine::{JoinParams, NegotiationMachine};
pub use state::{NegotiationState, Phase};
