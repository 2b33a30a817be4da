//! Utilities shared by the duocall relay server and client.

pub mod logger;
pub mod time;
