//! Request handlers.

mod http;
mod websocket;

pub use http::{get_ice_servers, health_check};
pub use websocket::websocket_handler;
