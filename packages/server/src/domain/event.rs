//! ゲームイベント
//!
//! すべてのイベントは `Event { origin, body }` で表し、本体は閉じた直和型 [`EventBody`]
//! で持つ。ワイヤ形式への変換は `infrastructure::dto` が担う。

use super::{
    entity::{ChallengeInfo, Player},
    value_object::UserId,
};

/// イベント種別（ワイヤ上の `type` 番号）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    UserJoined = 0,
    UserLeft = 1,
    TimerChanged = 2,
    TimerFinished = 3,
    ChallengeSet = 4,
    BreakStarted = 5,
    RunCodeRequest = 6,
    CodeRanResult = 7,
    InitialState = 8,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        EventKind::UserJoined,
        EventKind::UserLeft,
        EventKind::TimerChanged,
        EventKind::TimerFinished,
        EventKind::ChallengeSet,
        EventKind::BreakStarted,
        EventKind::RunCodeRequest,
        EventKind::CodeRanResult,
        EventKind::InitialState,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    /// ワイヤ上の番号から種別を引く。未知の番号は `None`。
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| i64::from(kind.code()) == code)
    }
}

/// イベント本体
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventBody {
    UserJoined {
        user: Player,
    },
    UserLeft {
        user_id: UserId,
    },
    TimerChanged {
        total: u32,
        remaining: u32,
    },
    TimerFinished,
    ChallengeSet {
        challenge: ChallengeInfo,
    },
    BreakStarted,
    RunCodeRequest {
        /// base64 エンコードされたソースコード
        code: String,
        lang: String,
    },
    CodeRanResult {
        output: String,
        passed: bool,
    },
    InitialState {
        challenge: Option<ChallengeInfo>,
        users: Vec<Player>,
        remaining: u32,
        total: u32,
    },
}

impl EventBody {
    pub fn kind(&self) -> EventKind {
        match self {
            EventBody::UserJoined { .. } => EventKind::UserJoined,
            EventBody::UserLeft { .. } => EventKind::UserLeft,
            EventBody::TimerChanged { .. } => EventKind::TimerChanged,
            EventBody::TimerFinished => EventKind::TimerFinished,
            EventBody::ChallengeSet { .. } => EventKind::ChallengeSet,
            EventBody::BreakStarted => EventKind::BreakStarted,
            EventBody::RunCodeRequest { .. } => EventKind::RunCodeRequest,
            EventBody::CodeRanResult { .. } => EventKind::CodeRanResult,
            EventBody::InitialState { .. } => EventKind::InitialState,
        }
    }
}

/// イベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// 送信元ユーザー（サーバー発行なら [`UserId::SERVER`]）
    pub origin: UserId,
    pub body: EventBody,
}

impl Event {
    pub fn new(origin: UserId, body: EventBody) -> Self {
        Self { origin, body }
    }

    /// サーバー発行のイベントを作る
    pub fn from_server(body: EventBody) -> Self {
        Self::new(UserId::SERVER, body)
    }

    pub fn kind(&self) -> EventKind {
        self.body.kind()
    }
}
