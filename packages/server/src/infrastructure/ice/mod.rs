//! ICE サーバー設定の取得元
//!
//! - `static_provider`: 固定の STUN サーバー一覧
//! - `cloudflare`: Cloudflare Calls の TURN 認証情報 API

pub mod cloudflare;
pub mod static_provider;

pub use cloudflare::{CloudflareTurnProvider, TurnCredentials};
pub use static_provider::StaticIceServerProvider;
