//! Infrastructure 層
//!
//! ドメイン層の trait（永続化・共有ステート・メッセージ送信・サンドボックス）の具体的な実装と、
//! ワイヤ形式の DTO を提供します。

pub mod dto;
pub mod message_pusher;
pub mod repository;
pub mod sandbox;
pub mod state_store;
