//! Data Transfer Objects (DTOs) for the game server.
//!
//! DTOs are organized by protocol:
//! - `websocket`: WebSocket event envelope DTOs
//! - `http`: HTTP API response DTOs
//!
//! `conversion` maps between the envelope and the domain [`Event`](crate::domain::Event).

pub mod conversion;
pub mod http;
pub mod websocket;

pub use conversion::{EventDecodeError, decode_event, encode_event};
