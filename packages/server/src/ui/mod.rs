//! UI 層
//!
//! HTTP / WebSocket のエンドポイントを提供します。

pub mod error;
pub mod handler;
pub mod server;
pub mod signal;
pub mod state;

pub use error::ApiError;
pub use server::Server;
pub use state::AppState;
