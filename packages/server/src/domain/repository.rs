//! Repository trait 定義
//!
//! 永続化の協調者に対するインターフェース。リレーショナル DB などの内部実装は問わず、
//! 呼び出し契約のみを定める。

use async_trait::async_trait;

use super::{
    entity::{Challenge, User},
    error::RepositoryError,
    value_object::{ChallengeId, UserId},
};

/// Challenge Repository trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChallengeRepository: Send + Sync {
    /// ID でチャレンジを取得
    async fn get_challenge(&self, id: ChallengeId) -> Result<Challenge, RepositoryError>;

    /// 一様ランダムにチャレンジを 1 件取得（まだ 1 件もなければ `NotFound`）
    async fn get_random_challenge(&self) -> Result<Challenge, RepositoryError>;

    /// チャレンジを保存し、タイムスタンプを更新した値を返す
    async fn save_challenge(&self, challenge: Challenge) -> Result<Challenge, RepositoryError>;
}

/// User Repository trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// ID でユーザーを取得
    async fn get_user(&self, id: UserId) -> Result<User, RepositoryError>;

    /// アクセストークンでユーザーを取得（認証で使用）
    async fn get_user_by_access_token(&self, token: &str) -> Result<User, RepositoryError>;

    /// ユーザーを保存し、タイムスタンプを更新した値を返す
    async fn save_user(&self, user: User) -> Result<User, RepositoryError>;
}
