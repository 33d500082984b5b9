//! Seed data loading.
//!
//! The seed file is JSON of the form `{"challenges": [...], "users": [...]}`.
//! Records are written through the repository traits so that ids and
//! timestamps follow the same rules as any other save.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{Challenge, ChallengeRepository, RepositoryError, User, UserRepository};

/// Seed loading errors
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to store seed record: {0}")]
    Repository(#[from] RepositoryError),
}

/// Contents of a seed file
#[derive(Debug, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub challenges: Vec<Challenge>,
    #[serde(default)]
    pub users: Vec<User>,
}

impl SeedData {
    /// Save every record into the given repositories.
    ///
    /// Returns the number of (challenges, users) saved.
    pub async fn apply(
        self,
        challenges: &dyn ChallengeRepository,
        users: &dyn UserRepository,
    ) -> Result<(usize, usize), SeedError> {
        let challenge_count = self.challenges.len();
        let user_count = self.users.len();

        for challenge in self.challenges {
            challenges.save_challenge(challenge).await?;
        }
        for user in self.users {
            users.save_user(user).await?;
        }

        Ok((challenge_count, user_count))
    }
}

/// Read and parse a seed file.
pub async fn load_seed_file(path: impl AsRef<Path>) -> Result<SeedData, SeedError> {
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::{
        domain::{ChallengeId, UserId},
        infrastructure::repository::{InMemoryChallengeRepository, InMemoryUserRepository},
    };

    const SEED: &str = r#"{
        "challenges": [
            {"id": 1, "title": "Answer", "description": "Print 42", "seconds": 60, "expected_output": "42"}
        ],
        "users": [
            {"id": 1, "username": "alice", "access_token": "alice-token"},
            {"id": 2, "username": "bob", "access_token": "bob-token"}
        ]
    }"#;

    #[tokio::test]
    async fn test_load_and_apply_seed_file() {
        // テスト項目: シードファイルを読み込んで Repository に保存できる
        // given (前提条件):
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SEED.as_bytes()).unwrap();
        let challenges = InMemoryChallengeRepository::new();
        let users = InMemoryUserRepository::new();

        // when (操作):
        let seed = load_seed_file(file.path()).await.unwrap();
        let counts = seed.apply(&challenges, &users).await.unwrap();

        // then (期待する結果):
        assert_eq!(counts, (1, 2));
        let challenge = challenges.get_challenge(ChallengeId::new(1)).await.unwrap();
        assert_eq!(challenge.expected_output, "42");
        assert!(challenge.test_cases.is_empty());
        let bob = users.get_user_by_access_token("bob-token").await.unwrap();
        assert_eq!(bob.id, UserId::new(2));
    }

    #[tokio::test]
    async fn test_missing_seed_file_is_io_error() {
        // テスト項目: 存在しないファイルは Io エラーになる
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");

        // when (操作):
        let result = load_seed_file(&path).await;

        // then (期待する結果):
        assert!(matches!(result, Err(SeedError::Io(_))));
    }

    #[tokio::test]
    async fn test_malformed_seed_file_is_parse_error() {
        // テスト項目: JSON として不正なファイルは Parse エラーになる
        // given (前提条件):
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();

        // when (操作):
        let result = load_seed_file(file.path()).await;

        // then (期待する結果):
        assert!(matches!(result, Err(SeedError::Parse(_))));
    }
}
