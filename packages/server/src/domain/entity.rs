//! エンティティ
//!
//! 永続化されるレコード（`User`, `Challenge`, `TestCase`）と、クライアントへ公開する
//! 射影（`Player`, `ChallengeInfo`）を定義します。
//!
//! 秘密情報（アクセストークン・外部 ID・期待出力）は公開射影に含めません。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value_object::{ChallengeId, UserId};

/// テストケース
///
/// 現状アサーションを持たない。チャレンジに順序付きで紐づくだけの不活性なレコード。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: i64,
    #[serde(default)]
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub updated: DateTime<Utc>,
}

/// チャレンジ（永続化レコード）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    #[serde(default)]
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub updated: DateTime<Utc>,
    pub title: String,
    pub description: String,
    /// 制限時間（秒）
    pub seconds: u32,
    /// 採点に使う期待出力（前後の空白を除いて完全一致で比較する）
    pub expected_output: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

impl Challenge {
    /// クライアントへ公開する射影を作る
    pub fn info(&self) -> ChallengeInfo {
        ChallengeInfo {
            id: self.id,
            created: self.created,
            updated: self.updated,
            title: self.title.clone(),
            description: self.description.clone(),
            seconds: self.seconds,
            test_cases: self.test_cases.clone(),
        }
    }
}

/// クライアントに公開するチャレンジ情報（期待出力を含まない）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeInfo {
    pub id: ChallengeId,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub seconds: u32,
    pub test_cases: Vec<TestCase>,
}

/// ユーザー（永続化レコード）
///
/// `github_id` と `access_token` はシリアライズしない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub updated: DateTime<Utc>,
    pub username: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default, skip_serializing)]
    pub github_id: i64,
    #[serde(default)]
    pub github_url: String,
    #[serde(default, skip_serializing)]
    pub access_token: String,
    #[serde(default)]
    pub score: i64,
}

impl User {
    /// クライアントへ公開する射影を作る
    pub fn player(&self) -> Player {
        Player {
            id: self.id,
            created: self.created,
            updated: self.updated,
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
            github_url: self.github_url.clone(),
            score: self.score,
        }
    }
}

/// クライアントに公開するユーザー情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: UserId,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub username: String,
    pub avatar_url: String,
    pub github_url: String,
    pub score: i64,
}
