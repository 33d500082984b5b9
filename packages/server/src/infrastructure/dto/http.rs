//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// Game state snapshot (debug endpoint)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStateDto {
    pub current_challenge_id: Option<i64>,
    pub current_user_ids: Vec<i64>,
    pub connections: Vec<ConnectionDto>,
    pub total_time: u32,
    pub remaining_time: u32,
    pub is_break: bool,
}

/// One registered connection (debug endpoint)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDto {
    pub user_id: i64,
    pub connection_id: String,
    /// RFC 3339 in UTC
    pub connected_at: String,
}

/// Error response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponseDto {
    pub status: u16,
    pub error: String,
}
