//! WebSocket event envelope DTOs.
//!
//! Every frame is `{"type": <int>, "user_id": <int64>, "body": <per type>}`.
//! The shape of `body` is fixed by `type`; events without a payload omit it.

use serde::{Deserialize, Serialize};

use crate::domain::{ChallengeInfo, Player, UserId};

/// Outer wire wrapper of an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeDto {
    #[serde(rename = "type")]
    pub r#type: i64,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserJoinedBody {
    pub user: Player,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLeftBody {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerChangedBody {
    pub total: u32,
    pub remaining: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeSetBody {
    pub challenge: ChallengeInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCodeBody {
    pub code: String,
    pub lang: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeRanBody {
    pub output: String,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialStateBody {
    pub current_challenge: Option<ChallengeInfo>,
    pub current_users: Vec<Player>,
    pub time_remaining: u32,
    pub total_time: u32,
}
