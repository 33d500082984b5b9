//! UseCase: アクセストークンによるユーザー認証
//!
//! ログインやトークン発行は外部の協調者が担う。このユースケースは
//! 接続時に提示されたトークンを永続化層のユーザーに解決するだけ。

use std::sync::Arc;

use crate::domain::{RepositoryError, User, UserRepository};

use super::error::AuthError;

/// ユーザー認証のユースケース
pub struct AuthenticateUserUseCase {
    user_repository: Arc<dyn UserRepository>,
}

impl AuthenticateUserUseCase {
    pub fn new(user_repository: Arc<dyn UserRepository>) -> Self {
        Self { user_repository }
    }

    /// トークンからユーザーを解決する
    ///
    /// * `Err(AuthError::MissingToken)` - トークンがない、または空
    /// * `Err(AuthError::InvalidToken)` - 該当ユーザーがいない
    pub async fn execute(&self, token: Option<&str>) -> Result<User, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        match self.user_repository.get_user_by_access_token(token).await {
            Ok(user) => Ok(user),
            Err(RepositoryError::NotFound(_)) => Err(AuthError::InvalidToken),
            Err(e) => Err(AuthError::Repository(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{entity::fixtures, repository::MockUserRepository},
        infrastructure::repository::InMemoryUserRepository,
    };

    async fn create_usecase() -> AuthenticateUserUseCase {
        let repository = Arc::new(InMemoryUserRepository::new());
        repository.save_user(fixtures::user(1, "alice")).await.unwrap();
        AuthenticateUserUseCase::new(repository)
    }

    #[tokio::test]
    async fn test_valid_token_resolves_user() {
        // テスト項目: 正しいトークンでユーザーが解決される
        // given (前提条件):
        let usecase = create_usecase().await;

        // when (操作):
        let user = usecase.execute(Some("token-alice")).await.unwrap();

        // then (期待する結果):
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn test_missing_token_is_rejected() {
        // テスト項目: トークンなし・空文字のトークンは MissingToken
        // given (前提条件):
        let usecase = create_usecase().await;

        // when (操作):
        let none = usecase.execute(None).await;
        let blank = usecase.execute(Some("  ")).await;

        // then (期待する結果):
        assert!(matches!(none, Err(AuthError::MissingToken)));
        assert!(matches!(blank, Err(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn test_unknown_token_is_rejected() {
        // テスト項目: 該当ユーザーのいないトークンは InvalidToken
        // given (前提条件):
        let usecase = create_usecase().await;

        // when (操作):
        let result = usecase.execute(Some("token-mallory")).await;

        // then (期待する結果):
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_storage_error_is_propagated() {
        // テスト項目: 永続化層の障害は InvalidToken ではなく Repository エラーになる
        // given (前提条件):
        let mut repository = MockUserRepository::new();
        repository
            .expect_get_user_by_access_token()
            .returning(|_| Err(RepositoryError::Storage("connection refused".to_string())));
        let usecase = AuthenticateUserUseCase::new(Arc::new(repository));

        // when (操作):
        let result = usecase.execute(Some("token-alice")).await;

        // then (期待する結果):
        assert!(matches!(result, Err(AuthError::Repository(_))));
    }
}
